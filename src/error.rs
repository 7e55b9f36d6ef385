/*!
Error kinds for the emulator core.

Each layer reports its own enum so callers can decide policy by matching on
the variant instead of inspecting messages:

- `BusError`       : address-map configuration faults (raised while assembling).
- `CartridgeError` : malformed or unsupported iNES images.
- `DeviceError`    : device misuse discovered during a bus transaction.
- `CpuError`       : instruction-table faults and lifecycle misuse.
- `NesError`       : umbrella used by the system driver and the binary.

Unmapped bus accesses are deliberately absent here: they are logged by the bus
and answered with open-bus value 0.
*/

use std::fmt;
use std::io;

use thiserror::Error;

/// Address-map configuration faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("cannot map {device} at ${low:04X}-${high:04X}: overlaps with {existing}")]
    Overlap {
        device: String,
        low: u16,
        high: u16,
        existing: String,
    },

    #[error("cannot map {device}: low address ${low:04X} is above high address ${high:04X}")]
    InvalidRange { device: String, low: u16, high: u16 },
}

/// Misuse of a device through the bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("write of ${value:02X} to read-only device {device} at offset ${address:04X}")]
    ReadOnlyWrite {
        device: String,
        address: u16,
        value: u8,
    },
}

/// iNES parsing and validation failures.
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("failed to read cartridge image: {0}")]
    Io(#[from] io::Error),

    #[error("invalid iNES header magic {0:02X?} (expected 4E 45 53 1A)")]
    BadMagic([u8; 4]),

    #[error("image too small for {section}: wanted {wanted} bytes, {available} available")]
    Truncated {
        section: &'static str,
        wanted: usize,
        available: usize,
    },

    #[error("NES 2.0 images are not supported")]
    Nes2Unsupported,

    #[error("unsupported mapper id {0} (only NROM is mapped)")]
    UnsupportedMapper(u16),

    #[error("cartridge declares no PRG ROM")]
    EmptyPrg,
}

/// Which entry sequence was running when an interrupt-class fault happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptKind {
    Reset,
    Nmi,
    Irq,
}

impl fmt::Display for InterruptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InterruptKind::Reset => "RESET",
            InterruptKind::Nmi => "NMI",
            InterruptKind::Irq => "IRQ",
        })
    }
}

/// Faults raised while stepping the CPU.
///
/// Every instruction fault carries the opcode byte and the address it was
/// fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("opcode ${opcode:02X} at ${pc:04X}: not implemented")]
    UnimplementedOpcode { opcode: u8, pc: u16 },

    #[error("opcode ${opcode:02X} at ${pc:04X}: no cycle count")]
    MissingCycleCount { opcode: u8, pc: u16 },

    #[error("opcode ${opcode:02X} at ${pc:04X}: {source}")]
    Device {
        opcode: u8,
        pc: u16,
        #[source]
        source: DeviceError,
    },

    #[error("{kind} sequence: {source}")]
    Interrupt {
        kind: InterruptKind,
        #[source]
        source: DeviceError,
    },

    #[error("CPU is not powered on")]
    PoweredOff,

    #[error("CPU halted after an earlier fault: {0}")]
    Halted(Box<CpuError>),
}

/// Top-level error for system assembly and the run loop.
#[derive(Debug, Error)]
pub enum NesError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Cpu(#[from] CpuError),

    #[error("power-on failed: {0}")]
    PowerOn(#[from] DeviceError),
}
