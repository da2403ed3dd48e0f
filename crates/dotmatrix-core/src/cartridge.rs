use std::{fs, io, path::Path};

use log::{info, warn};
use thiserror::Error;

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;

/// Cartridge header region is 0x100-0x14F; anything shorter has no header.
const HEADER_END: usize = 0x150;

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("failed to read cartridge: {0}")]
    Io(#[from] io::Error),
    #[error("cartridge image is too small for a header ({0} bytes)")]
    Truncated(usize),
    #[error("cartridge size {0} is not a multiple of 16 KiB")]
    Misaligned(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc3,
    Mbc5,
}

#[derive(Debug)]
enum MbcState {
    NoMbc,
    Mbc1 {
        rom_bank: u8,
        ram_bank: u8,
        ram_enable: bool,
    },
    Mbc3 {
        rom_bank: u8,
        /// 0x00-0x03 selects a RAM bank, 0x08-0x0C an RTC register.
        ram_bank: u8,
        ram_enable: bool,
        /// RTC registers are accepted as write-only scratch; no clock runs.
        rtc_scratch: [u8; 5],
    },
    Mbc5 {
        rom_bank: u16,
        ram_bank: u8,
        ram_enable: bool,
    },
}

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub mbc: MbcType,
    pub title: String,
    mbc_state: MbcState,
}

impl Cartridge {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::Truncated(data.len()));
        }
        if data.len() % ROM_BANK_SIZE != 0 {
            return Err(CartridgeError::Misaligned(data.len()));
        }

        let header = Header::parse(&data);
        let mbc = header.mbc_type();
        let title = header.title();
        let ram = vec![0; header.ram_size()];

        let mbc_state = match mbc {
            MbcType::NoMbc => MbcState::NoMbc,
            MbcType::Mbc1 => MbcState::Mbc1 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
            },
            MbcType::Mbc3 => MbcState::Mbc3 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
                rtc_scratch: [0; 5],
            },
            MbcType::Mbc5 => MbcState::Mbc5 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
            },
        };

        info!(
            "loaded ROM: {} ({:?}, {} KiB ROM, {} KiB RAM)",
            title,
            mbc,
            data.len() / 1024,
            ram.len() / 1024
        );

        Ok(Self {
            rom: data,
            ram,
            mbc,
            title,
            mbc_state,
        })
    }

    pub fn read(&self, addr: u16) -> u8 {
        match (&self.mbc_state, addr) {
            // Bank 0 is fixed for every mapper.
            (_, 0x0000..=0x3FFF) => self.rom.get(addr as usize).copied().unwrap_or(0xFF),
            (MbcState::NoMbc, 0x4000..=0x7FFF) => {
                self.rom.get(addr as usize).copied().unwrap_or(0xFF)
            }
            (MbcState::Mbc1 { rom_bank, .. }, 0x4000..=0x7FFF) => {
                self.read_rom_bank(*rom_bank as usize, addr)
            }
            (MbcState::Mbc3 { rom_bank, .. }, 0x4000..=0x7FFF) => {
                self.read_rom_bank(*rom_bank as usize, addr)
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x4000..=0x7FFF) => {
                self.read_rom_bank(*rom_bank as usize, addr)
            }
            (MbcState::NoMbc, 0xA000..=0xBFFF) => self
                .ram
                .get(addr as usize - 0xA000)
                .copied()
                .unwrap_or(0xFF),
            (MbcState::Mbc1 {
                ram_bank,
                ram_enable,
                ..
            }, 0xA000..=0xBFFF) => {
                if !ram_enable {
                    return 0xFF;
                }
                self.read_ram_bank(*ram_bank as usize, addr)
            }
            (MbcState::Mbc3 {
                ram_bank,
                ram_enable,
                ..
            }, 0xA000..=0xBFFF) => {
                if !ram_enable {
                    return 0xFF;
                }
                match ram_bank {
                    0x00..=0x03 => self.read_ram_bank(*ram_bank as usize, addr),
                    // RTC registers are write-only scratch here.
                    _ => 0xFF,
                }
            }
            (MbcState::Mbc5 {
                ram_bank,
                ram_enable,
                ..
            }, 0xA000..=0xBFFF) => {
                if !ram_enable {
                    return 0xFF;
                }
                self.read_ram_bank(*ram_bank as usize, addr)
            }
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match (&mut self.mbc_state, addr) {
            (MbcState::NoMbc, 0xA000..=0xBFFF) => {
                let idx = addr as usize - 0xA000;
                if let Some(b) = self.ram.get_mut(idx) {
                    *b = val;
                }
            }
            (MbcState::Mbc1 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (MbcState::Mbc1 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x1F;
                if *rom_bank == 0 {
                    *rom_bank = 1;
                }
            }
            (MbcState::Mbc1 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                *ram_bank = val & 0x03;
            }
            (MbcState::Mbc1 { ram_bank, ram_enable, .. }, 0xA000..=0xBFFF) => {
                if *ram_enable {
                    let idx = *ram_bank as usize * RAM_BANK_SIZE + (addr as usize - 0xA000);
                    if let Some(b) = self.ram.get_mut(idx) {
                        *b = val;
                    }
                }
            }
            (MbcState::Mbc3 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (MbcState::Mbc3 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x7F;
                if *rom_bank == 0 {
                    *rom_bank = 1;
                }
            }
            (MbcState::Mbc3 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                if val <= 0x03 || (0x08..=0x0C).contains(&val) {
                    *ram_bank = val;
                }
            }
            (MbcState::Mbc3 {
                ram_bank,
                ram_enable,
                rtc_scratch,
                ..
            }, 0xA000..=0xBFFF) => {
                if !*ram_enable {
                    return;
                }
                match *ram_bank {
                    0x00..=0x03 => {
                        let idx = *ram_bank as usize * RAM_BANK_SIZE + (addr as usize - 0xA000);
                        if let Some(b) = self.ram.get_mut(idx) {
                            *b = val;
                        }
                    }
                    0x08..=0x0C => rtc_scratch[(*ram_bank - 0x08) as usize] = val,
                    _ => {}
                }
            }
            (MbcState::Mbc5 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x2000..=0x2FFF) => {
                // Low 8 bits; unlike MBC1/3, bank 0 stays 0.
                *rom_bank = (*rom_bank & 0x100) | val as u16;
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x3000..=0x3FFF) => {
                *rom_bank = (*rom_bank & 0xFF) | (((val & 0x01) as u16) << 8);
            }
            (MbcState::Mbc5 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                *ram_bank = val & 0x0F;
            }
            (MbcState::Mbc5 { ram_bank, ram_enable, .. }, 0xA000..=0xBFFF) => {
                if *ram_enable {
                    let idx = *ram_bank as usize * RAM_BANK_SIZE + (addr as usize - 0xA000);
                    if let Some(b) = self.ram.get_mut(idx) {
                        *b = val;
                    }
                }
            }
            _ => {}
        }
    }

    fn read_rom_bank(&self, bank: usize, addr: u16) -> u8 {
        let offset = bank * ROM_BANK_SIZE + (addr as usize - 0x4000);
        self.rom.get(offset).copied().unwrap_or(0xFF)
    }

    fn read_ram_bank(&self, bank: usize, addr: u16) -> u8 {
        let idx = bank * RAM_BANK_SIZE + (addr as usize - 0xA000);
        self.ram.get(idx).copied().unwrap_or(0xFF)
    }

}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn title(&self) -> String {
        let mut slice = &self.data[0x0134..0x0143];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    fn mbc_type(&self) -> MbcType {
        let cart_type = self.data[0x0147];
        match cart_type {
            0x00 => MbcType::NoMbc,
            0x01..=0x03 => MbcType::Mbc1,
            0x0F..=0x13 => MbcType::Mbc3,
            0x19..=0x1E => MbcType::Mbc5,
            other => {
                warn!("unrecognized cartridge type {other:#04X}, assuming MBC1");
                MbcType::Mbc1
            }
        }
    }

    fn ram_size(&self) -> usize {
        match self.data[0x0149] {
            0x00 => 0,
            0x01 => 0x800,
            0x02 => 0x2000,  // 8 KiB
            0x03 => 0x8000,  // 32 KiB (4 banks)
            0x04 => 0x20000, // 128 KiB (16 banks)
            0x05 => 0x10000, // 64 KiB (8 banks)
            _ => 0x2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with_header(cart_type: u8, ram_code: u8, banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; banks * ROM_BANK_SIZE];
        rom[0x0147] = cart_type;
        rom[0x0149] = ram_code;
        rom[0x0134..0x0138].copy_from_slice(b"TEST");
        rom
    }

    #[test]
    fn header_title_and_type() {
        let cart = Cartridge::from_bytes(rom_with_header(0x01, 0x02, 2)).unwrap();
        assert_eq!(cart.title, "TEST");
        assert_eq!(cart.mbc, MbcType::Mbc1);
        assert_eq!(cart.ram.len(), 0x2000);
    }

    #[test]
    fn unknown_cart_type_falls_back_to_mbc1() {
        let cart = Cartridge::from_bytes(rom_with_header(0x42, 0x00, 2)).unwrap();
        assert_eq!(cart.mbc, MbcType::Mbc1);
    }

    #[test]
    fn ram_size_codes() {
        for (code, size) in [
            (0x00u8, 0usize),
            (0x02, 0x2000),
            (0x03, 0x8000),
            (0x04, 0x20000),
            (0x05, 0x10000),
        ] {
            let cart = Cartridge::from_bytes(rom_with_header(0x1A, code, 2)).unwrap();
            assert_eq!(cart.ram.len(), size, "code {code:#04X}");
        }
    }

    #[test]
    fn truncated_image_is_rejected() {
        assert!(matches!(
            Cartridge::from_bytes(vec![0; 0x100]),
            Err(CartridgeError::Truncated(_))
        ));
    }

    #[test]
    fn misaligned_image_is_rejected() {
        assert!(matches!(
            Cartridge::from_bytes(vec![0; 0x5000]),
            Err(CartridgeError::Misaligned(_))
        ));
    }

    #[test]
    fn rom_bank_zero_write_selects_bank_one() {
        let mut rom = rom_with_header(0x01, 0x00, 4);
        rom[0x4000] = 0x11;
        rom[0x8000] = 0x22;
        let mut cart = Cartridge::from_bytes(rom).unwrap();

        cart.write(0x2000, 0x00);
        assert_eq!(cart.read(0x4000), 0x11);
        cart.write(0x2000, 0x02);
        assert_eq!(cart.read(0x4000), 0x22);
    }

    #[test]
    fn out_of_range_bank_reads_open_bus() {
        let mut cart = Cartridge::from_bytes(rom_with_header(0x19, 0x00, 2)).unwrap();
        cart.write(0x2000, 0x7F);
        assert_eq!(cart.read(0x4000), 0xFF);
    }
}
