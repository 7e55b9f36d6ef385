/*!
addressing.rs - 6502 addressing-mode resolvers.

Overview
========
Every resolver has the shape `fn(&mut Cpu) -> Operand`: it consumes the
operand bytes following the opcode (advancing PC by exactly that many bytes)
and returns the effective address together with the byte found there.

Two families exist for each memory mode:
- Read resolvers (`zero_page`, `absolute`, ...) perform one extra bus read at
  the effective address so read-class instructions get the value directly.
- Address resolvers (`zero_page_addr`, `absolute_addr`, ...) stop after
  computing the address. Stores, JMP and JSR use these so a store never
  touches its target before writing it (some devices have read side effects).

Quirks emulated
===============
- Zero-page indexing wraps within page 0 (`$FF,X` with X=1 is `$00`).
- Zero-page pointers read their high byte from `(base + 1) & $FF`.
- JMP (indirect) never carries into the next page when fetching the high byte.
- Indexed absolute and (indirect),Y report page crossings so the table can
  charge the extra cycle.

Caller Assumptions
==================
- PC points at the first operand byte (the CPU has already consumed the
  opcode).
- Resolvers are the only place that advance PC during operand fetch.
*/

use crate::cpu::Cpu;

/// Result of operand resolution.
///
/// `addr` is 0 for modes without a memory operand; `value` is 0 for the
/// address-only resolvers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Operand {
    pub addr: u16,
    pub value: u8,
    pub page_crossed: bool,
}

impl Operand {
    #[inline]
    fn at(addr: u16) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }
}

/// Signature shared by every addressing resolver.
pub type AddrFn = fn(&mut Cpu) -> Operand;

// -------------------------
// Instruction stream fetch
// -------------------------

/// Fetch next byte from the instruction stream, incrementing PC.
pub(crate) fn fetch_byte(cpu: &mut Cpu) -> u8 {
    let v = cpu.bus.read(cpu.state.pc);
    cpu.state.advance_pc(1);
    v
}

/// Fetch next little-endian word (low, then high), incrementing PC twice.
pub(crate) fn fetch_word(cpu: &mut Cpu) -> u16 {
    let lo = fetch_byte(cpu) as u16;
    let hi = fetch_byte(cpu) as u16;
    (hi << 8) | lo
}

/// Read a pointer from zero page, wrapping the high byte within page 0.
fn read_word_zp(cpu: &mut Cpu, base: u8) -> u16 {
    let lo = cpu.bus.read(base as u16) as u16;
    let hi = cpu.bus.read(base.wrapping_add(1) as u16) as u16;
    (hi << 8) | lo
}

/// JMP (indirect) page-wrap bug: the high byte comes from the same page.
fn read_word_indirect_bug(cpu: &mut Cpu, addr: u16) -> u16 {
    let lo = cpu.bus.read(addr) as u16;
    let hi_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
    let hi = cpu.bus.read(hi_addr) as u16;
    (hi << 8) | lo
}

#[inline]
fn index(base: u16, offset: u8) -> (u16, bool) {
    let addr = base.wrapping_add(offset as u16);
    (addr, (base & 0xFF00) != (addr & 0xFF00))
}

/// Complete a read resolver: fetch the byte at the effective address.
#[inline]
fn load(cpu: &mut Cpu, addr: u16, page_crossed: bool) -> Operand {
    Operand {
        addr,
        value: cpu.bus.read(addr),
        page_crossed,
    }
}

// -------------------------
// Effective address math
// -------------------------

fn ea_zero_page(cpu: &mut Cpu) -> u16 {
    fetch_byte(cpu) as u16
}

fn ea_zero_page_x(cpu: &mut Cpu) -> u16 {
    fetch_byte(cpu).wrapping_add(cpu.state.x) as u16
}

fn ea_zero_page_y(cpu: &mut Cpu) -> u16 {
    fetch_byte(cpu).wrapping_add(cpu.state.y) as u16
}

fn ea_absolute_x(cpu: &mut Cpu) -> (u16, bool) {
    let base = fetch_word(cpu);
    index(base, cpu.state.x)
}

fn ea_absolute_y(cpu: &mut Cpu) -> (u16, bool) {
    let base = fetch_word(cpu);
    index(base, cpu.state.y)
}

fn ea_indexed_indirect(cpu: &mut Cpu) -> u16 {
    let zp = fetch_byte(cpu).wrapping_add(cpu.state.x);
    read_word_zp(cpu, zp)
}

fn ea_indirect_indexed(cpu: &mut Cpu) -> (u16, bool) {
    let zp = fetch_byte(cpu);
    let base = read_word_zp(cpu, zp);
    index(base, cpu.state.y)
}

// -------------------------
// Register / inline modes
// -------------------------

/// No operand. Touches neither the bus nor PC.
pub fn implied(_cpu: &mut Cpu) -> Operand {
    Operand::default()
}

/// Operand is the accumulator.
pub fn accumulator(cpu: &mut Cpu) -> Operand {
    Operand {
        value: cpu.state.a,
        ..Operand::default()
    }
}

/// Operand is the byte following the opcode.
pub fn immediate(cpu: &mut Cpu) -> Operand {
    Operand {
        value: fetch_byte(cpu),
        ..Operand::default()
    }
}

/// Signed displacement for branches. `addr` is the branch target, `value` the
/// raw displacement byte.
pub fn relative(cpu: &mut Cpu) -> Operand {
    let raw = fetch_byte(cpu);
    let next = cpu.state.pc;
    let target = next.wrapping_add(raw as i8 as u16);
    Operand {
        addr: target,
        value: raw,
        page_crossed: (next & 0xFF00) != (target & 0xFF00),
    }
}

/// JMP ($nnnn). Address-only.
pub fn indirect(cpu: &mut Cpu) -> Operand {
    let ptr = fetch_word(cpu);
    Operand::at(read_word_indirect_bug(cpu, ptr))
}

// -------------------------
// Read resolvers
// -------------------------

pub fn zero_page(cpu: &mut Cpu) -> Operand {
    let addr = ea_zero_page(cpu);
    load(cpu, addr, false)
}

pub fn zero_page_x(cpu: &mut Cpu) -> Operand {
    let addr = ea_zero_page_x(cpu);
    load(cpu, addr, false)
}

pub fn zero_page_y(cpu: &mut Cpu) -> Operand {
    let addr = ea_zero_page_y(cpu);
    load(cpu, addr, false)
}

/// Two operand bytes, low first; then one read of the target.
pub fn absolute(cpu: &mut Cpu) -> Operand {
    let addr = fetch_word(cpu);
    load(cpu, addr, false)
}

pub fn absolute_x(cpu: &mut Cpu) -> Operand {
    let (addr, crossed) = ea_absolute_x(cpu);
    load(cpu, addr, crossed)
}

pub fn absolute_y(cpu: &mut Cpu) -> Operand {
    let (addr, crossed) = ea_absolute_y(cpu);
    load(cpu, addr, crossed)
}

/// ($nn,X)
pub fn indexed_indirect(cpu: &mut Cpu) -> Operand {
    let addr = ea_indexed_indirect(cpu);
    load(cpu, addr, false)
}

/// ($nn),Y
pub fn indirect_indexed(cpu: &mut Cpu) -> Operand {
    let (addr, crossed) = ea_indirect_indexed(cpu);
    load(cpu, addr, crossed)
}

// -------------------------
// Address-only resolvers
// -------------------------

pub fn zero_page_addr(cpu: &mut Cpu) -> Operand {
    Operand::at(ea_zero_page(cpu))
}

pub fn zero_page_x_addr(cpu: &mut Cpu) -> Operand {
    Operand::at(ea_zero_page_x(cpu))
}

pub fn zero_page_y_addr(cpu: &mut Cpu) -> Operand {
    Operand::at(ea_zero_page_y(cpu))
}

pub fn absolute_addr(cpu: &mut Cpu) -> Operand {
    Operand::at(fetch_word(cpu))
}

pub fn absolute_x_addr(cpu: &mut Cpu) -> Operand {
    Operand::at(ea_absolute_x(cpu).0)
}

pub fn absolute_y_addr(cpu: &mut Cpu) -> Operand {
    Operand::at(ea_absolute_y(cpu).0)
}

pub fn indexed_indirect_addr(cpu: &mut Cpu) -> Operand {
    Operand::at(ea_indexed_indirect(cpu))
}

pub fn indirect_indexed_addr(cpu: &mut Cpu) -> Operand {
    Operand::at(ea_indirect_indexed(cpu).0)
}
