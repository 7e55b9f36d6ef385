#![doc = r#"
nescore library crate.

2A03 CPU core plus the address-decoding bus that routes every CPU access to
the device owning that address.

Modules:
- apu: APU register-window stub ($4000-$4015)
- bus: ordered address-range router with device-local translation
- cartridge: iNES v1 loader producing PRG/CHR memory blocks
- cpu: 6502 core (state, addressing resolvers, effects, opcode table, `Cpu`)
- device: `Device` trait and the disabled-range placeholder
- error: error kinds for every layer
- joypad: controller shift registers on $4016/$4017
- mem: RAM/ROM memory blocks with wraparound addressing
- nes: system assembly (memory map) and run loop
- ppu: PPU register stub ($2000-$3FFF)

In tests, shared iNES builders and a recording fake device are available
under `crate::test_utils`.
"#]

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod device;
pub mod error;
pub mod joypad;
pub mod mem;
pub mod nes;
pub mod ppu;

pub use bus::Bus;
pub use cartridge::Cartridge;
pub use cpu::Cpu;
pub use device::Device;
pub use error::NesError;
pub use nes::Nes;

#[cfg(test)]
pub mod test_utils;
