/*!
Controller ports at $4016/$4017.

Each `Controller` is an 8-bit serial shift register:
- Buttons are read in the order A, B, Select, Start, Up, Down, Left, Right
  (bit 0 through bit 7 of the mask).
- Writing bit 0 of $4016 drives the strobe line shared by both ports. While the
  strobe is high every read re-latches and returns the A button.
- With the strobe low, each read shifts out one bit of the snapshot taken when
  the strobe was last high. After 8 reads further reads return 1.

Bus layout (device-local offsets):
- 0: read = port 1 serial bit, write = strobe for both ports.
- 1: read = port 2 serial bit, write = APU frame counter (accepted, ignored).
*/

use std::any::Any;

use log::trace;

use crate::device::Device;
use crate::error::DeviceError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    #[inline]
    fn mask(self) -> u8 {
        1 << self as u8
    }
}

#[derive(Clone, Debug, Default)]
pub struct Controller {
    // Live button states. Bit set = pressed.
    buttons: u8,
    latched: u8,
    strobe: bool,
    // Next bit to shift out; 8 means exhausted.
    index: u8,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.buttons |= button.mask();
        } else {
            self.buttons &= !button.mask();
        }
    }

    /// Replace the whole button state. Bit layout follows `Button`.
    pub fn set_state_mask(&mut self, mask: u8) {
        self.buttons = mask;
    }

    fn write_strobe(&mut self, value: u8) {
        self.strobe = value & 1 != 0;
        if self.strobe {
            self.latch();
        }
    }

    fn read_bit(&mut self) -> u8 {
        if self.strobe {
            self.latch();
            return self.latched & 1;
        }
        if self.index < 8 {
            let bit = (self.latched >> self.index) & 1;
            self.index += 1;
            bit
        } else {
            1
        }
    }

    #[inline]
    fn latch(&mut self) {
        self.latched = self.buttons;
        self.index = 0;
    }
}

/// Both controller ports as one bus device.
#[derive(Clone, Debug, Default)]
pub struct Joypad {
    ports: [Controller; 2],
}

impl Joypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port 0 is player one ($4016), port 1 is player two ($4017).
    pub fn controller_mut(&mut self, port: usize) -> Option<&mut Controller> {
        self.ports.get_mut(port)
    }
}

impl Device for Joypad {
    fn read(&mut self, addr: u16) -> u8 {
        match self.ports.get_mut(addr as usize) {
            Some(port) => port.read_bit(),
            None => 0,
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), DeviceError> {
        match addr {
            0 => self.ports.iter_mut().for_each(|p| p.write_strobe(value)),
            _ => trace!("Frame counter write ignored: ${value:02X}"),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Joypad"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
