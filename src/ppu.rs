/*!
PPU register stub for the $2000-$3FFF window.

Only the CPU-visible register interface exists; nothing is rendered and no
dot/scanline timing runs. The eight registers repeat every 8 bytes across the
window, so any device-local offset is reduced with `& 7`.

Register semantics kept:
- $2000 PPUCTRL / $2001 PPUMASK: stored.
- $2002 PPUSTATUS: read returns status, then clears vblank (bit 7) and the
  shared write toggle. Writes are ignored.
- $2003 OAMADDR / $2004 OAMDATA: OAM pointer; data writes increment it.
- $2005 PPUSCROLL / $2006 PPUADDR: two-write latches sharing the toggle.
- $2007 PPUDATA: flat 16 KiB VRAM with the buffered read below $3F00 and
  post-increment of 1 or 32 (PPUCTRL bit 2).
*/

use std::any::Any;

use log::trace;

use crate::device::Device;
use crate::error::DeviceError;

const PPUCTRL: u16 = 0;
const PPUMASK: u16 = 1;
const PPUSTATUS: u16 = 2;
const OAMADDR: u16 = 3;
const OAMDATA: u16 = 4;
const PPUSCROLL: u16 = 5;
const PPUADDR: u16 = 6;
const PPUDATA: u16 = 7;

const VBLANK: u8 = 0x80;
const VRAM_SIZE: usize = 0x4000;
const PALETTE_START: u16 = 0x3F00;

#[derive(Clone, Debug)]
pub struct Ppu {
    ctrl: u8,
    mask: u8,
    status: u8,
    oam_addr: u8,

    write_toggle: bool,
    scroll_x: u8,
    scroll_y: u8,

    vram_addr: u16,
    vram_buffer: u8,
    vram: Vec<u8>,
    oam: [u8; 256],
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            ctrl: 0,
            mask: 0,
            status: 0,
            oam_addr: 0,
            write_toggle: false,
            scroll_x: 0,
            scroll_y: 0,
            vram_addr: 0,
            vram_buffer: 0,
            vram: vec![0; VRAM_SIZE],
            oam: [0; 256],
        }
    }

    pub fn set_vblank(&mut self, on: bool) {
        if on {
            self.status |= VBLANK;
        } else {
            self.status &= !VBLANK;
        }
    }

    pub fn vblank(&self) -> bool {
        self.status & VBLANK != 0
    }

    /// Whether PPUCTRL asks for an NMI at the start of vblank.
    pub fn nmi_enabled(&self) -> bool {
        self.ctrl & 0x80 != 0
    }

    pub fn scroll(&self) -> (u8, u8) {
        (self.scroll_x, self.scroll_y)
    }

    pub fn oam(&self) -> &[u8; 256] {
        &self.oam
    }

    fn vram_increment(&self) -> u16 {
        if self.ctrl & 0x04 != 0 { 32 } else { 1 }
    }

    fn advance_vram_addr(&mut self) {
        self.vram_addr = self.vram_addr.wrapping_add(self.vram_increment()) & 0x3FFF;
    }
}

impl Device for Ppu {
    fn read(&mut self, addr: u16) -> u8 {
        match addr & 7 {
            PPUCTRL => self.ctrl,
            PPUMASK => self.mask,
            PPUSTATUS => {
                let v = self.status;
                self.status &= !VBLANK;
                self.write_toggle = false;
                v
            }
            OAMADDR => self.oam_addr,
            OAMDATA => self.oam[self.oam_addr as usize],
            PPUDATA => {
                let a = self.vram_addr & 0x3FFF;
                let value = self.vram[a as usize];
                let out = if a < PALETTE_START {
                    std::mem::replace(&mut self.vram_buffer, value)
                } else {
                    value
                };
                self.advance_vram_addr();
                out
            }
            // PPUSCROLL and PPUADDR are write-only.
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), DeviceError> {
        let reg = addr & 7;
        trace!("PPU register ${:04X} <- ${value:02X}", 0x2000 + reg);
        match reg {
            PPUCTRL => self.ctrl = value,
            PPUMASK => self.mask = value,
            OAMADDR => self.oam_addr = value,
            OAMDATA => {
                self.oam[self.oam_addr as usize] = value;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            PPUSCROLL => {
                if self.write_toggle {
                    self.scroll_y = value;
                } else {
                    self.scroll_x = value;
                }
                self.write_toggle = !self.write_toggle;
            }
            PPUADDR => {
                if self.write_toggle {
                    self.vram_addr = (self.vram_addr & 0x3F00) | value as u16;
                } else {
                    self.vram_addr = (self.vram_addr & 0x00FF) | (((value & 0x3F) as u16) << 8);
                }
                self.write_toggle = !self.write_toggle;
            }
            PPUDATA => {
                let a = (self.vram_addr & 0x3FFF) as usize;
                self.vram[a] = value;
                self.advance_vram_addr();
            }
            // PPUSTATUS is read-only.
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "PPU"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
