/*!
Device capability shared by everything that can sit on the CPU bus.

Semantics:
- Addresses passed to `read`/`write` are device-local: the `Bus` subtracts the
  low end of the mapped range before delegating.
- `read` takes `&mut self` because reads have side effects on real hardware
  (status latches, controller shift registers).
- `write` returns a `DeviceError` only for misuse that indicates a broken
  address map (e.g. writing program ROM). Ordinary ignored writes are `Ok`.
- `name` is a diagnostic label used in logs and overlap errors.
- `as_any_mut` lets the owner of the bus reach a mapped device by its concrete
  type (`<dyn Device>::downcast_mut`), e.g. to press controller buttons.
*/

use std::any::Any;

use log::warn;

use crate::error::DeviceError;

/// Common interface for every addressable peripheral.
pub trait Device {
    fn read(&mut self, addr: u16) -> u8;

    fn write(&mut self, addr: u16, value: u8) -> Result<(), DeviceError>;

    fn name(&self) -> &str;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Device {
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// Placeholder for ranges that exist on the bus but respond to nothing
/// (e.g. the APU/IO test registers at $4018-$401F).
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledDevice;

impl DisabledDevice {
    pub fn new() -> Self {
        Self
    }
}

impl Device for DisabledDevice {
    fn read(&mut self, addr: u16) -> u8 {
        warn!("Unexpected read on disabled device at offset ${addr:04X}.");
        0
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), DeviceError> {
        warn!("Unexpected write on disabled device at offset ${addr:04X}: ${value:02X}.");
        Ok(())
    }

    fn name(&self) -> &str {
        "DisabledDevice"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
