/*!
Cartridge with iNES (v1) loader producing the PRG and CHR memory blocks.

Features:
- Parse an iNES v1 image from bytes or a file path.
- PRG ROM becomes a read-only `Memory` named "PRG ROM"; mapped across
  $8000-$FFFF its wraparound mirrors a 16 KiB bank (NROM-128).
- CHR ROM becomes a read-only `Memory`; a CHR size of 0 allocates 8 KiB of
  CHR RAM instead.
- Header metadata: mirroring, battery, trainer, mapper id, PRG RAM size.

Notes:
- NES 2.0 images are detected and rejected.
- Only mapper 0 (NROM) is accepted: it is the only board whose PRG can sit on
  the bus as one flat block.
- PRG RAM size: header byte 8 in 8 KiB units, 0 meaning 8 KiB by convention.
*/

use std::fmt;
use std::fs;
use std::path::Path;

use log::info;

use crate::error::CartridgeError;
use crate::mem::{Memory, PRG_RAM_SIZE};

const HEADER_LEN: usize = 16;
const TRAINER_LEN: usize = 512;
const PRG_UNIT: usize = 16 * 1024;
const CHR_UNIT: usize = 8 * 1024;
const MAGIC: [u8; 4] = *b"NES\x1A";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

pub struct Cartridge {
    mapper_id: u16,
    mirroring: Mirroring,
    battery: bool,
    trainer: Option<Vec<u8>>,
    prg_ram_len: usize,
    chr_is_ram: bool,

    prg: Memory,
    chr: Memory,
}

impl fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cartridge")
            .field("mapper_id", &self.mapper_id)
            .field("mirroring", &self.mirroring)
            .field("battery", &self.battery)
            .field("has_trainer", &self.trainer.is_some())
            .field("prg_rom_len", &self.prg.len())
            .field("chr_len", &self.chr.len())
            .field("chr_is_ram", &self.chr_is_ram)
            .field("prg_ram_len", &self.prg_ram_len)
            .finish()
    }
}

/// Take `len` bytes at `*offset`, advancing it, or report which section ran short.
fn take<'a>(
    data: &'a [u8],
    offset: &mut usize,
    len: usize,
    section: &'static str,
) -> Result<&'a [u8], CartridgeError> {
    let available = data.len().saturating_sub(*offset);
    if available < len {
        return Err(CartridgeError::Truncated {
            section,
            wanted: len,
            available,
        });
    }
    let bytes = &data[*offset..*offset + len];
    *offset += len;
    Ok(bytes)
}

impl Cartridge {
    // -------------- Construction --------------

    pub fn from_ines_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        let mut offset = 0;
        let header = take(data, &mut offset, HEADER_LEN, "header")?;

        let magic = [header[0], header[1], header[2], header[3]];
        if magic != MAGIC {
            return Err(CartridgeError::BadMagic(magic));
        }

        let prg_units = header[4] as usize;
        let chr_units = header[5] as usize;
        let flags6 = header[6];
        let flags7 = header[7];
        let prg_ram_units = header[8] as usize;

        // NES 2.0 if (flags7 & 0x0C) == 0x08.
        if flags7 & 0x0C == 0x08 {
            return Err(CartridgeError::Nes2Unsupported);
        }

        let mapper_id = (flags7 & 0xF0) as u16 | (flags6 >> 4) as u16;
        if mapper_id != 0 {
            return Err(CartridgeError::UnsupportedMapper(mapper_id));
        }
        if prg_units == 0 {
            return Err(CartridgeError::EmptyPrg);
        }

        let mirroring = if flags6 & 0b0000_1000 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0b0000_0001 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        let battery = flags6 & 0b0000_0010 != 0;

        let trainer = if flags6 & 0b0000_0100 != 0 {
            info!("Reading trainer ({TRAINER_LEN} bytes).");
            Some(take(data, &mut offset, TRAINER_LEN, "trainer")?.to_vec())
        } else {
            None
        };

        let prg_len = prg_units * PRG_UNIT;
        info!("Reading PRG ROM ({prg_len} bytes).");
        let prg = Memory::rom("PRG ROM", take(data, &mut offset, prg_len, "PRG ROM")?.to_vec());

        let chr_is_ram = chr_units == 0;
        let chr = if chr_is_ram {
            info!("Allocating CHR RAM ({CHR_UNIT} bytes).");
            Memory::ram("CHR RAM", CHR_UNIT)
        } else {
            let chr_len = chr_units * CHR_UNIT;
            info!("Reading CHR ROM ({chr_len} bytes).");
            Memory::rom("CHR ROM", take(data, &mut offset, chr_len, "CHR ROM")?.to_vec())
        };

        let prg_ram_len = match prg_ram_units {
            0 => PRG_RAM_SIZE,
            n => n * PRG_RAM_SIZE,
        };

        Ok(Self {
            mapper_id,
            mirroring,
            battery,
            trainer,
            prg_ram_len,
            chr_is_ram,
            prg,
            chr,
        })
    }

    /// Load a cartridge from an iNES file (.nes).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        info!("Opening {}.", path.display());
        let bytes = fs::read(path)?;
        Self::from_ines_bytes(&bytes)
    }

    /// Hand the memory blocks over to the system: `(prg, chr)`.
    pub fn into_memories(self) -> (Memory, Memory) {
        (self.prg, self.chr)
    }

    // -------------- Accessors --------------

    pub fn mapper_id(&self) -> u16 {
        self.mapper_id
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub fn battery_backed(&self) -> bool {
        self.battery
    }

    pub fn trainer(&self) -> Option<&[u8]> {
        self.trainer.as_deref()
    }

    pub fn prg(&self) -> &Memory {
        &self.prg
    }

    pub fn chr(&self) -> &Memory {
        &self.chr
    }

    pub fn chr_is_ram(&self) -> bool {
        self.chr_is_ram
    }

    pub fn prg_ram_len(&self) -> usize {
        self.prg_ram_len
    }
}
