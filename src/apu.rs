/*!
Stub APU occupying the $4000-$4015 register window.

Scope:
- Stores every register write so later reads (and tests) can see it.
- $4015 (status) is the only register with real read semantics:
    bits 0..4: channel "active" bits, stubbed from the last enable mask written
    bit 5:     unused (0)
    bit 6:     frame interrupt flag, cleared by the read
    bit 7:     DMC interrupt flag
- $4014 (OAM DMA) lands in this window on the bus but is not emulated; writes
  are stored and logged.
- $4017 (frame counter) sits in the joypad range of the memory map, so it
  never reaches this device.

No audio is generated and no timing is modeled.
*/

use std::any::Any;

use log::{trace, warn};

use crate::device::Device;
use crate::error::DeviceError;

/// Number of registers in the window ($4000..=$4015).
pub const APU_REGISTERS: usize = 0x16;

const OAM_DMA: u16 = 0x14;
const STATUS: u16 = 0x15;

const CHANNEL_MASK: u8 = 0b0001_1111;
const FRAME_IRQ: u8 = 1 << 6;
const DMC_IRQ: u8 = 1 << 7;

#[derive(Clone, Debug, Default)]
pub struct Apu {
    regs: [u8; APU_REGISTERS],

    // Channel enable mask from the last $4015 write (bits 0..4).
    enabled_mask: u8,

    frame_irq_flag: bool,
    dmc_irq_flag: bool,
}

impl Apu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled_mask(&self) -> u8 {
        self.enabled_mask
    }

    pub fn set_frame_interrupt(&mut self, active: bool) {
        self.frame_irq_flag = active;
    }

    pub fn set_dmc_interrupt(&mut self, active: bool) {
        self.dmc_irq_flag = active;
    }

    /// Whether either interrupt source is asserting the IRQ line.
    pub fn irq_asserted(&self) -> bool {
        self.frame_irq_flag || self.dmc_irq_flag
    }

    /// $4015 read. Clears the frame interrupt flag.
    fn read_status(&mut self) -> u8 {
        let mut status = self.enabled_mask & CHANNEL_MASK;
        if self.frame_irq_flag {
            status |= FRAME_IRQ;
        }
        if self.dmc_irq_flag {
            status |= DMC_IRQ;
        }
        self.frame_irq_flag = false;
        status
    }
}

impl Device for Apu {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            STATUS => self.read_status(),
            _ => self.regs.get(addr as usize).copied().unwrap_or(0),
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), DeviceError> {
        let Some(slot) = self.regs.get_mut(addr as usize) else {
            warn!("APU write outside register window: offset ${addr:04X}");
            return Ok(());
        };
        *slot = value;

        match addr {
            STATUS => {
                self.enabled_mask = value & CHANNEL_MASK;
                // Writing $4015 acknowledges a pending DMC interrupt.
                self.dmc_irq_flag = false;
            }
            OAM_DMA => warn!("OAM DMA not emulated (page ${value:02X})"),
            _ => trace!("APU register ${:04X} <- ${value:02X}", 0x4000 + addr),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "APU"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
