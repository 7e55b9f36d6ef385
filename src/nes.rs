/*!
NES system assembly: wires a cartridge and the stub peripherals onto one bus
and drives the CPU.

CPU memory map:

| Range         | Device                         |
|---------------|--------------------------------|
| $0000-$1FFF   | 2 KiB CPU RAM (mirrored x4)    |
| $2000-$3FFF   | PPU registers (mirrored /8)    |
| $4000-$4015   | APU registers                  |
| $4016-$4017   | Joypad ports                   |
| $4018-$401F   | Disabled (test mode registers) |
| $6000-$7FFF   | Cartridge PRG RAM              |
| $8000-$FFFF   | Cartridge PRG ROM              |

$4020-$5FFF (cartridge expansion) stays unmapped: accesses there are logged
and read as 0.

The host drives the peripherals through `device_mut` (or `controller_mut` for
the pads) and services interrupts through `cpu_mut().nmi()` / `irq()`.
*/

use std::any::Any;
use std::path::Path;

use log::info;

use crate::apu::Apu;
use crate::bus::Bus;
use crate::cartridge::{Cartridge, Mirroring};
use crate::cpu::Cpu;
use crate::device::DisabledDevice;
use crate::error::NesError;
use crate::joypad::{Controller, Joypad};
use crate::mem::{CPU_RAM_SIZE, Memory};
use crate::ppu::Ppu;

pub struct Nes {
    cpu: Cpu,
    chr: Memory,
    mirroring: Mirroring,
}

impl Nes {
    /// Build the memory map around `cart` and power the CPU on.
    pub fn new(cart: Cartridge) -> Result<Self, NesError> {
        info!("Loaded {cart:?}");
        let mirroring = cart.mirroring();
        let prg_ram_len = cart.prg_ram_len();
        let (prg, chr) = cart.into_memories();

        let mut bus = Bus::new();
        bus.add_device(Box::new(Memory::ram("CPU RAM", CPU_RAM_SIZE)), 0x0000, 0x1FFF)?;
        bus.add_device(Box::new(Ppu::new()), 0x2000, 0x3FFF)?;
        bus.add_device(Box::new(Apu::new()), 0x4000, 0x4015)?;
        bus.add_device(Box::new(Joypad::new()), 0x4016, 0x4017)?;
        bus.add_device(Box::new(DisabledDevice::new()), 0x4018, 0x401F)?;
        bus.add_device(Box::new(Memory::ram("PRG RAM", prg_ram_len)), 0x6000, 0x7FFF)?;
        bus.add_device(Box::new(prg), 0x8000, 0xFFFF)?;

        let mut cpu = Cpu::new(bus);
        cpu.power_on()?;
        info!("{}", cpu.state());

        Ok(Self {
            cpu,
            chr,
            mirroring,
        })
    }

    /// Load an iNES file and assemble the system.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, NesError> {
        Self::new(Cartridge::open(path)?)
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// A mapped peripheral by concrete type, e.g. `device_mut::<Ppu>()`.
    pub fn device_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.cpu.bus_mut().device_mut()
    }

    /// Controller on `port` (0 = $4016, 1 = $4017).
    pub fn controller_mut(&mut self, port: usize) -> Option<&mut Controller> {
        self.device_mut::<Joypad>()?.controller_mut(port)
    }

    /// Pattern-table memory (CHR ROM, or CHR RAM when the cartridge has none).
    pub fn chr(&self) -> &Memory {
        &self.chr
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> Result<u32, NesError> {
        Ok(self.cpu.step()?)
    }

    /// Execute `steps` instructions, or fewer if the CPU faults.
    pub fn run_for(&mut self, steps: u64) -> Result<(), NesError> {
        Ok(self.cpu.run(steps)?)
    }

    /// Run until the CPU faults. Only returns with an error.
    pub fn run(&mut self) -> Result<(), NesError> {
        loop {
            self.cpu.step()?;
        }
    }
}
