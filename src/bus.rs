/*!
Bus: address-decoding router between the CPU and memory-mapped devices.

The bus owns an ordered list of `(device, low, high)` mappings. Every read and
write scans the list in registration order, picks the first mapping whose
inclusive range contains the address, translates to a device-local offset
(`addr - low`) and delegates. Devices therefore never need to know where they
are mapped, and a stub can be swapped for a real implementation without
touching the CPU.

Rules:
- Ranges never overlap; `add_device` rejects any intersection up front and
  leaves the mapping set untouched.
- There is no unmapping; the map is fixed once the system is assembled.
- Unmapped reads log an error and return open-bus value 0. Unmapped writes log
  and are dropped. Neither is fatal.
- Device misuse (e.g. writing ROM) is returned to the caller as `DeviceError`.
*/

use std::any::Any;

use log::{error, info};

use crate::device::Device;
use crate::error::{BusError, DeviceError};

/// One device mapped to an inclusive address range.
pub struct BusMapping {
    device: Box<dyn Device>,
    low: u16,
    high: u16,
}

impl BusMapping {
    #[inline]
    fn contains(&self, addr: u16) -> bool {
        self.low <= addr && addr <= self.high
    }

    #[inline]
    fn intersects(&self, low: u16, high: u16) -> bool {
        low <= self.high && self.low <= high
    }
}

#[derive(Default)]
pub struct Bus {
    mappings: Vec<BusMapping>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `device` at `low..=high`.
    ///
    /// Fails with `BusError::Overlap` (naming the device already holding part
    /// of the range) or `BusError::InvalidRange` when `low > high`.
    pub fn add_device(
        &mut self,
        device: Box<dyn Device>,
        low: u16,
        high: u16,
    ) -> Result<(), BusError> {
        if low > high {
            return Err(BusError::InvalidRange {
                device: device.name().to_string(),
                low,
                high,
            });
        }
        if let Some(m) = self.mappings.iter().find(|m| m.intersects(low, high)) {
            return Err(BusError::Overlap {
                device: device.name().to_string(),
                low,
                high,
                existing: m.device.name().to_string(),
            });
        }
        info!(
            "Adding {} at address range ${low:04X} to ${high:04X}.",
            device.name()
        );
        self.mappings.push(BusMapping { device, low, high });
        Ok(())
    }

    /// Read a byte from whichever device owns `addr`.
    pub fn read(&mut self, addr: u16) -> u8 {
        match self.mappings.iter_mut().find(|m| m.contains(addr)) {
            Some(m) => m.device.read(addr - m.low),
            None => {
                error!("Bus read error: no device at ${addr:04X}");
                0
            }
        }
    }

    /// Write a byte to whichever device owns `addr`.
    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), DeviceError> {
        match self.mappings.iter_mut().find(|m| m.contains(addr)) {
            Some(m) => m.device.write(addr - m.low, value),
            None => {
                error!("Bus write error: no device at ${addr:04X} (value ${value:02X})");
                Ok(())
            }
        }
    }

    /// Little-endian word read (low byte at `addr`, high byte at `addr + 1`).
    pub fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// First mapped device of concrete type `T`, for host-side control of a
    /// peripheral (controller buttons, vblank) once the bus owns it.
    pub fn device_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.mappings
            .iter_mut()
            .find_map(|m| m.device.downcast_mut::<T>())
    }

    /// Registered mappings as `(device name, low, high)`, in lookup order.
    pub fn mappings(&self) -> impl Iterator<Item = (&str, u16, u16)> {
        self.mappings
            .iter()
            .map(|m| (m.device.name(), m.low, m.high))
    }
}
