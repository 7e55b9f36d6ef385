/*!
Memory blocks: fixed-size byte arrays mapped onto the bus.

Every access is reduced modulo the block length, so a block behaves as a ring
over its own span. This doubles as the NES mirroring rules: the 2 KiB internal
RAM mapped across $0000-$1FFF repeats every $0800, and a 16 KiB PRG ROM mapped
across $8000-$FFFF appears twice.

Two flavors:
- `Memory::ram`  : read-write, zero-initialized.
- `Memory::rom`  : read-only, built from image bytes. Writes are reported as
                   `DeviceError::ReadOnlyWrite`; the CPU treats that as fatal.
*/

use std::any::Any;

use crate::device::Device;
use crate::error::DeviceError;

/// Size of the NES CPU internal RAM (in bytes).
pub const CPU_RAM_SIZE: usize = 0x0800;

/// Size of cartridge PRG RAM mapped at $6000-$7FFF.
pub const PRG_RAM_SIZE: usize = 0x2000;

#[derive(Clone, Debug)]
pub struct Memory {
    data: Vec<u8>,
    name: String,
    read_only: bool,
}

impl Memory {
    /// Create a zero-filled read-write block.
    pub fn ram(name: impl Into<String>, size: usize) -> Self {
        Self {
            data: vec![0; size],
            name: name.into(),
            read_only: false,
        }
    }

    /// Create a read-only block holding `data`.
    pub fn rom(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            data,
            name: name.into(),
            read_only: true,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Contents of the block (diagnostics, pattern-table consumers).
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn index(&self, addr: u16) -> Option<usize> {
        if self.data.is_empty() {
            None
        } else {
            Some(addr as usize % self.data.len())
        }
    }
}

impl Device for Memory {
    fn read(&mut self, addr: u16) -> u8 {
        self.index(addr).map_or(0, |i| self.data[i])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), DeviceError> {
        if self.read_only {
            return Err(DeviceError::ReadOnlyWrite {
                device: self.name.clone(),
                address: addr,
                value,
            });
        }
        if let Some(i) = self.index(addr) {
            self.data[i] = value;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
