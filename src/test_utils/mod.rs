//! Shared test utilities: iNES image builders, a recording fake device, and
//! small CPU fixtures.
//!
//! Notes on iNES header fields used here:
//! - bytes[0..4] = b"NES\x1A"
//! - byte 4 = PRG ROM size in 16 KiB units
//! - byte 5 = CHR ROM size in 8 KiB units (0 => loader allocates 8 KiB CHR RAM)
//! - byte 6 = Flags 6 (mirroring, battery, trainer, mapper low nibble)
//! - byte 7 = Flags 7 (NES 2.0 indicator, mapper high nibble)
//! - byte 8 = PRG RAM size in 8 KiB units
//!
//! Vectors:
//! - For 16 KiB PRG (NROM-128): vectors are at PRG offset 0x3FFA..=0x3FFF
//! - For 32 KiB PRG (NROM-256): vectors are at PRG offset 0x7FFA..=0x7FFF

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::device::Device;
use crate::error::DeviceError;
use crate::mem::Memory;

/// Build a minimal iNES (v1) image with configurable PRG/CHR sizes and flags.
///
/// PRG is filled with 0xAA and CHR with 0xCC so tests can tell them apart.
pub fn build_ines(
    prg_16k: usize,
    chr_8k: usize,
    flags6: u8,
    flags7: u8,
    prg_ram_8k: u8,
    trainer: Option<&[u8; 512]>,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(
        16 + trainer.map_or(0, |_| 512) + prg_16k * 16 * 1024 + chr_8k * 8 * 1024,
    );

    bytes.extend_from_slice(b"NES\x1A");
    bytes.push(prg_16k as u8);
    bytes.push(chr_8k as u8);
    bytes.push(flags6);
    bytes.push(flags7);
    bytes.push(prg_ram_8k);
    bytes.extend_from_slice(&[0u8; 7]);

    if let Some(t) = trainer {
        bytes.extend_from_slice(t);
    }
    bytes.extend(std::iter::repeat_n(0xAA, prg_16k * 16 * 1024));
    bytes.extend(std::iter::repeat_n(0xCC, chr_8k * 8 * 1024));
    bytes
}

/// Build an NROM-128 image with `prg` at the start of the single 16 KiB bank
/// ($8000 and mirrored at $C000) and all three vectors pointing at `reset`
/// (default $8000).
pub fn build_nrom_with_prg(prg: &[u8], reset: Option<u16>) -> Vec<u8> {
    assert!(
        prg.len() <= 16 * 1024,
        "Program must fit within a 16 KiB PRG bank"
    );
    let mut rom = build_ines(1, 1, 0, 0, 1, None);
    let prg_start = 16;
    let prg_end = prg_start + 16 * 1024;
    rom[prg_start..prg_start + prg.len()].copy_from_slice(prg);
    let target = reset.unwrap_or(0x8000);
    set_vectors_in_prg(&mut rom[prg_start..prg_end], target, target, target);
    rom
}

/// Write CPU vectors (NMI, RESET, IRQ/BRK) at the end of a 16 KiB or 32 KiB
/// PRG slice. Panics on any other length.
pub fn set_vectors_in_prg(prg: &mut [u8], reset: u16, nmi: u16, irq: u16) {
    let base = match prg.len() {
        16384 => 0x3FFA,
        32768 => 0x7FFA,
        other => panic!(
            "Unsupported PRG length for vector placement: {other} bytes (expected 16 KiB or 32 KiB)"
        ),
    };
    write_le_u16(prg, base, nmi);
    write_le_u16(prg, base + 2, reset);
    write_le_u16(prg, base + 4, irq);
}

#[inline]
fn write_le_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset] = (value & 0x00FF) as u8;
    buf[offset + 1] = (value >> 8) as u8;
}

// ---------------------------------------------------------------------------
// Recording fake device
// ---------------------------------------------------------------------------

/// What a `FakeDevice` has seen. Shared with the test through `Rc<RefCell<_>>`
/// because the bus owns the device itself.
#[derive(Debug)]
pub struct Accesses {
    /// Backing store indexed by device-local address.
    pub mem: Vec<u8>,
    /// Device-local addresses read, in order.
    pub reads: Vec<u16>,
    /// Device-local (address, value) pairs written, in order.
    pub writes: Vec<(u16, u8)>,
}

pub struct FakeDevice {
    name: String,
    seen: Rc<RefCell<Accesses>>,
}

impl FakeDevice {
    /// Create a 64 KiB fake device and the shared record of its accesses.
    pub fn new(name: &str) -> (Self, Rc<RefCell<Accesses>>) {
        let seen = Rc::new(RefCell::new(Accesses {
            mem: vec![0; 0x10000],
            reads: Vec::new(),
            writes: Vec::new(),
        }));
        (
            Self {
                name: name.to_string(),
                seen: Rc::clone(&seen),
            },
            seen,
        )
    }
}

impl Device for FakeDevice {
    fn read(&mut self, addr: u16) -> u8 {
        let mut p = self.seen.borrow_mut();
        p.reads.push(addr);
        p.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), DeviceError> {
        let mut p = self.seen.borrow_mut();
        p.writes.push((addr, value));
        p.mem[addr as usize] = value;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// CPU fixtures
// ---------------------------------------------------------------------------

/// A CPU whose whole address space is one `FakeDevice`. Not powered on.
pub fn fake_cpu() -> (Cpu, Rc<RefCell<Accesses>>) {
    let (dev, seen) = FakeDevice::new("FakeDevice");
    let mut bus = Bus::new();
    bus.add_device(Box::new(dev), 0x0000, 0xFFFF)
        .expect("map fake device");
    (Cpu::new(bus), seen)
}

/// A powered-on CPU with 32 KiB RAM at $0000-$7FFF and a 32 KiB PRG ROM at
/// $8000-$FFFF holding `program` at $8000. All vectors point at $8000.
pub fn cpu_with_program(program: &[u8]) -> Cpu {
    let mut prg = vec![0xEA; 0x8000];
    prg[..program.len()].copy_from_slice(program);
    set_vectors_in_prg(&mut prg, 0x8000, 0x8000, 0x8000);

    let mut bus = Bus::new();
    bus.add_device(Box::new(Memory::ram("RAM", 0x8000)), 0x0000, 0x7FFF)
        .expect("map ram");
    bus.add_device(Box::new(Memory::rom("PRG ROM", prg)), 0x8000, 0xFFFF)
        .expect("map rom");
    let mut cpu = Cpu::new(bus);
    cpu.power_on().expect("power on");
    cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_basic_ines() {
        let rom = build_ines(2, 1, 0x01, 0x00, 1, None);
        assert_eq!(&rom[0..4], b"NES\x1A");
        assert_eq!(rom[4], 2);
        assert_eq!(rom[5], 1);
        assert_eq!(rom[6], 0x01);
        assert_eq!(rom[8], 1);
        assert_eq!(rom.len(), 16 + 2 * 16 * 1024 + 8 * 1024);
    }

    #[test]
    fn writes_vectors_for_16k_prg() {
        let mut prg = vec![0u8; 16 * 1024];
        set_vectors_in_prg(&mut prg, 0x8123, 0x8456, 0x8ABC);
        assert_eq!(prg[0x3FFA], 0x56);
        assert_eq!(prg[0x3FFB], 0x84);
        assert_eq!(prg[0x3FFC], 0x23);
        assert_eq!(prg[0x3FFD], 0x81);
        assert_eq!(prg[0x3FFE], 0xBC);
        assert_eq!(prg[0x3FFF], 0x8A);
    }

    #[test]
    fn fake_device_records_accesses() {
        let (mut dev, seen) = FakeDevice::new("fake");
        dev.write(0x0010, 0x42).unwrap();
        assert_eq!(dev.read(0x0010), 0x42);
        let p = seen.borrow();
        assert_eq!(p.writes, vec![(0x0010, 0x42)]);
        assert_eq!(p.reads, vec![0x0010]);
    }
}
