/*!
execute.rs - 6502 instruction effects (ALU, flags, stack, RMW, control flow).

Every effect has the shape `fn(&mut Cpu, Operand) -> Result<(), DeviceError>`.
The operand has already been resolved by the table's addressing function, so
effects never fetch instruction bytes themselves.

Conventions
===========
- Loads, transfers and ALU ops set ZERO/NEGATIVE from the result.
- Flag instructions touch exactly one bit.
- Stores touch no flags.
- Read-modify-write on memory writes the old value back before the new one.
- Branches charge their own extra cycles through `Cpu::add_cycles`.
- ADC/SBC are binary only; DECIMAL is stored but ignored.
- The stack is page 1: push writes `$0100|SP` then decrements, pull
  increments then reads.

Device errors surface only from bus writes (ROM, misuse). Reads never fail.
*/

use crate::cpu::Cpu;
use crate::cpu::addressing::Operand;
use crate::cpu::state::{BREAK, CARRY, DECIMAL, IRQ_DISABLE, NEGATIVE, OVERFLOW, UNUSED, ZERO};
use crate::error::DeviceError;

/// Signature shared by every opcode effect.
pub type ExecFn = fn(&mut Cpu, Operand) -> Result<(), DeviceError>;

/// Base of the hardware stack page.
const STACK_BASE: u16 = 0x0100;

/// IRQ/BRK vector.
pub(crate) const IRQ_VECTOR: u16 = 0xFFFE;

// ---------------------------------------------------------------------------
// Stack helpers
// ---------------------------------------------------------------------------

pub(crate) fn push(cpu: &mut Cpu, v: u8) -> Result<(), DeviceError> {
    let addr = STACK_BASE | cpu.state.sp as u16;
    cpu.state.sp = cpu.state.sp.wrapping_sub(1);
    cpu.bus.write(addr, v)
}

pub(crate) fn pop(cpu: &mut Cpu) -> u8 {
    cpu.state.sp = cpu.state.sp.wrapping_add(1);
    cpu.bus.read(STACK_BASE | cpu.state.sp as u16)
}

/// High byte first, so the word sits little-endian in memory.
pub(crate) fn push_word(cpu: &mut Cpu, v: u16) -> Result<(), DeviceError> {
    push(cpu, (v >> 8) as u8)?;
    push(cpu, (v & 0xFF) as u8)
}

pub(crate) fn pop_word(cpu: &mut Cpu) -> u16 {
    let lo = pop(cpu) as u16;
    let hi = pop(cpu) as u16;
    (hi << 8) | lo
}

/// Push P with control over Break flag semantics (BRK/PHP vs IRQ/NMI).
pub(crate) fn push_status(cpu: &mut Cpu, set_break: bool) -> Result<(), DeviceError> {
    let v = cpu.state.compose_status_for_push(set_break);
    push(cpu, v)
}

/// Status as restored by PLP/RTI: B is not a real latch and bit 5 always reads 1.
#[inline]
fn restore_status(cpu: &mut Cpu, v: u8) {
    cpu.state.status = (v | UNUSED) & !BREAK;
}

// ---------------------------------------------------------------------------
// Read-modify-write choreography
// ---------------------------------------------------------------------------

/// Dummy-write the old value, apply `transform`, write the result and set Z/N.
fn rmw<F>(cpu: &mut Cpu, op: Operand, transform: F) -> Result<(), DeviceError>
where
    F: FnOnce(&mut Cpu, u8) -> u8,
{
    cpu.bus.write(op.addr, op.value)?;
    let result = transform(cpu, op.value);
    cpu.bus.write(op.addr, result)?;
    cpu.state.update_zn(result);
    Ok(())
}

#[inline]
fn carry_in(cpu: &Cpu) -> u8 {
    cpu.state.is_flag_set(CARRY) as u8
}

fn shift_left(cpu: &mut Cpu, v: u8) -> u8 {
    cpu.state.assign_flag(CARRY, v & 0x80 != 0);
    v << 1
}

fn shift_right(cpu: &mut Cpu, v: u8) -> u8 {
    cpu.state.assign_flag(CARRY, v & 0x01 != 0);
    v >> 1
}

fn rotate_left(cpu: &mut Cpu, v: u8) -> u8 {
    let c = carry_in(cpu);
    cpu.state.assign_flag(CARRY, v & 0x80 != 0);
    (v << 1) | c
}

fn rotate_right(cpu: &mut Cpu, v: u8) -> u8 {
    let c = carry_in(cpu) << 7;
    cpu.state.assign_flag(CARRY, v & 0x01 != 0);
    (v >> 1) | c
}

fn set_a(cpu: &mut Cpu, v: u8) {
    cpu.state.a = v;
    cpu.state.update_zn(v);
}

// ---------------------------------------------------------------------------
// Loads / Stores
// ---------------------------------------------------------------------------

pub fn lda(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    set_a(cpu, op.value);
    Ok(())
}

pub fn ldx(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    cpu.state.x = op.value;
    cpu.state.update_zn(op.value);
    Ok(())
}

pub fn ldy(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    cpu.state.y = op.value;
    cpu.state.update_zn(op.value);
    Ok(())
}

pub fn sta(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    cpu.bus.write(op.addr, cpu.state.a)
}

pub fn stx(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    cpu.bus.write(op.addr, cpu.state.x)
}

pub fn sty(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    cpu.bus.write(op.addr, cpu.state.y)
}

// ---------------------------------------------------------------------------
// Register transfers
// ---------------------------------------------------------------------------

pub fn tax(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.x = cpu.state.a;
    cpu.state.update_zn(cpu.state.x);
    Ok(())
}

pub fn tay(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.y = cpu.state.a;
    cpu.state.update_zn(cpu.state.y);
    Ok(())
}

pub fn txa(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    let x = cpu.state.x;
    set_a(cpu, x);
    Ok(())
}

pub fn tya(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    let y = cpu.state.y;
    set_a(cpu, y);
    Ok(())
}

pub fn tsx(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.x = cpu.state.sp;
    cpu.state.update_zn(cpu.state.x);
    Ok(())
}

/// The only transfer that leaves the flags alone.
pub fn txs(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.sp = cpu.state.x;
    Ok(())
}

// ---------------------------------------------------------------------------
// Stack instructions
// ---------------------------------------------------------------------------

pub fn pha(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    let a = cpu.state.a;
    push(cpu, a)
}

pub fn php(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    push_status(cpu, true)
}

pub fn pla(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    let v = pop(cpu);
    set_a(cpu, v);
    Ok(())
}

pub fn plp(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    let v = pop(cpu);
    restore_status(cpu, v);
    Ok(())
}

// ---------------------------------------------------------------------------
// Logical / Arithmetic
// ---------------------------------------------------------------------------

pub fn and(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let r = cpu.state.a & op.value;
    set_a(cpu, r);
    Ok(())
}

pub fn ora(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let r = cpu.state.a | op.value;
    set_a(cpu, r);
    Ok(())
}

pub fn eor(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let r = cpu.state.a ^ op.value;
    set_a(cpu, r);
    Ok(())
}

pub fn bit(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let v = op.value;
    cpu.state.assign_flag(ZERO, cpu.state.a & v == 0);
    cpu.state.assign_flag(NEGATIVE, v & 0x80 != 0);
    cpu.state.assign_flag(OVERFLOW, v & 0x40 != 0);
    Ok(())
}

fn add_with_carry(cpu: &mut Cpu, v: u8) {
    let a = cpu.state.a;
    let sum = a as u16 + v as u16 + carry_in(cpu) as u16;
    let result = sum as u8;
    cpu.state.assign_flag(CARRY, sum > 0xFF);
    // Signed overflow: operands share a sign that the result does not.
    cpu.state.assign_flag(OVERFLOW, (!(a ^ v)) & (a ^ result) & 0x80 != 0);
    set_a(cpu, result);
}

pub fn adc(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    add_with_carry(cpu, op.value);
    Ok(())
}

/// A - M - (1 - C), computed as A + !M + C.
pub fn sbc(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    add_with_carry(cpu, op.value ^ 0xFF);
    Ok(())
}

fn compare(cpu: &mut Cpu, reg: u8, v: u8) {
    cpu.state.assign_flag(CARRY, reg >= v);
    cpu.state.update_zn(reg.wrapping_sub(v));
}

pub fn cmp(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let a = cpu.state.a;
    compare(cpu, a, op.value);
    Ok(())
}

pub fn cpx(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let x = cpu.state.x;
    compare(cpu, x, op.value);
    Ok(())
}

pub fn cpy(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let y = cpu.state.y;
    compare(cpu, y, op.value);
    Ok(())
}

// ---------------------------------------------------------------------------
// Increment / Decrement
// ---------------------------------------------------------------------------

pub fn inc(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    rmw(cpu, op, |_, v| v.wrapping_add(1))
}

pub fn dec(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    rmw(cpu, op, |_, v| v.wrapping_sub(1))
}

pub fn inx(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.x = cpu.state.x.wrapping_add(1);
    cpu.state.update_zn(cpu.state.x);
    Ok(())
}

pub fn iny(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.y = cpu.state.y.wrapping_add(1);
    cpu.state.update_zn(cpu.state.y);
    Ok(())
}

pub fn dex(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.x = cpu.state.x.wrapping_sub(1);
    cpu.state.update_zn(cpu.state.x);
    Ok(())
}

pub fn dey(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.y = cpu.state.y.wrapping_sub(1);
    cpu.state.update_zn(cpu.state.y);
    Ok(())
}

// ---------------------------------------------------------------------------
// Shifts / Rotates
// ---------------------------------------------------------------------------

pub fn asl(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    rmw(cpu, op, shift_left)
}

pub fn lsr(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    rmw(cpu, op, shift_right)
}

pub fn rol(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    rmw(cpu, op, rotate_left)
}

pub fn ror(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    rmw(cpu, op, rotate_right)
}

pub fn asl_acc(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let r = shift_left(cpu, op.value);
    set_a(cpu, r);
    Ok(())
}

pub fn lsr_acc(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let r = shift_right(cpu, op.value);
    set_a(cpu, r);
    Ok(())
}

pub fn rol_acc(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let r = rotate_left(cpu, op.value);
    set_a(cpu, r);
    Ok(())
}

pub fn ror_acc(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let r = rotate_right(cpu, op.value);
    set_a(cpu, r);
    Ok(())
}

// ---------------------------------------------------------------------------
// Flag instructions
// ---------------------------------------------------------------------------

pub fn clc(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.clear_flag_bit(CARRY);
    Ok(())
}

pub fn cld(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.clear_flag_bit(DECIMAL);
    Ok(())
}

pub fn cli(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.clear_flag_bit(IRQ_DISABLE);
    Ok(())
}

pub fn clv(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.clear_flag_bit(OVERFLOW);
    Ok(())
}

pub fn sec(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.set_flag_bit(CARRY);
    Ok(())
}

pub fn sed(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.set_flag_bit(DECIMAL);
    Ok(())
}

pub fn sei(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.set_flag_bit(IRQ_DISABLE);
    Ok(())
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Taken: jump to the resolved target, +1 cycle, +1 more across a page.
fn branch(cpu: &mut Cpu, op: Operand, take: bool) {
    if take {
        cpu.add_cycles(1 + op.page_crossed as u32);
        cpu.state.pc = op.addr;
    }
}

pub fn bcc(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let take = !cpu.state.is_flag_set(CARRY);
    branch(cpu, op, take);
    Ok(())
}

pub fn bcs(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let take = cpu.state.is_flag_set(CARRY);
    branch(cpu, op, take);
    Ok(())
}

pub fn bne(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let take = !cpu.state.is_flag_set(ZERO);
    branch(cpu, op, take);
    Ok(())
}

pub fn beq(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let take = cpu.state.is_flag_set(ZERO);
    branch(cpu, op, take);
    Ok(())
}

pub fn bpl(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let take = !cpu.state.is_flag_set(NEGATIVE);
    branch(cpu, op, take);
    Ok(())
}

pub fn bmi(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let take = cpu.state.is_flag_set(NEGATIVE);
    branch(cpu, op, take);
    Ok(())
}

pub fn bvc(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let take = !cpu.state.is_flag_set(OVERFLOW);
    branch(cpu, op, take);
    Ok(())
}

pub fn bvs(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let take = cpu.state.is_flag_set(OVERFLOW);
    branch(cpu, op, take);
    Ok(())
}

// ---------------------------------------------------------------------------
// Jumps / Subroutines / Interrupts
// ---------------------------------------------------------------------------

pub fn jmp(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    cpu.state.pc = op.addr;
    Ok(())
}

/// Pushes the address of the last operand byte; RTS adds the missing 1.
pub fn jsr(cpu: &mut Cpu, op: Operand) -> Result<(), DeviceError> {
    let ret = cpu.state.pc.wrapping_sub(1);
    push_word(cpu, ret)?;
    cpu.state.pc = op.addr;
    Ok(())
}

pub fn rts(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    cpu.state.pc = pop_word(cpu).wrapping_add(1);
    Ok(())
}

/// BRK skips a padding byte: the pushed return address is opcode + 2.
pub fn brk(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    let ret = cpu.state.pc.wrapping_add(1);
    push_word(cpu, ret)?;
    push_status(cpu, true)?;
    cpu.state.set_flag_bit(IRQ_DISABLE);
    cpu.state.pc = cpu.bus.read_word(IRQ_VECTOR);
    Ok(())
}

pub fn rti(cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    let p = pop(cpu);
    restore_status(cpu, p);
    cpu.state.pc = pop_word(cpu);
    Ok(())
}

pub fn nop(_cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    Ok(())
}

/// Placeholder effect for unimplemented table entries. Never reached: the
/// CPU rejects entries with an empty mnemonic before running them.
pub fn none(_cpu: &mut Cpu, _op: Operand) -> Result<(), DeviceError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
