#![allow(dead_code)]

use dotmatrix_core::{cartridge::Cartridge, gameboy::GameBoy};

/// Build a minimal 32 KiB MBC-less ROM image with `program` at the entry
/// point (0x0100).
pub fn test_rom(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0134..0x0138].copy_from_slice(b"TEST");
    rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
    rom
}

/// Build a ROM image with an explicit cartridge type, RAM size code, and
/// bank count. The first byte of every 16 KiB bank is a marker equal to the
/// bank number, so banking tests can tell which bank is mapped.
pub fn banked_rom(cart_type: u8, ram_code: u8, banks: usize) -> Vec<u8> {
    let mut rom = vec![0u8; banks * 0x4000];
    rom[0x0147] = cart_type;
    rom[0x0149] = ram_code;
    for bank in 0..banks {
        rom[bank * 0x4000] = bank as u8;
    }
    rom
}

/// A machine booted into the post-boot state with `program` at 0x0100.
pub fn boot_with(program: &[u8]) -> GameBoy {
    let mut gb = GameBoy::new();
    gb.load_cart(Cartridge::from_bytes(test_rom(program)).unwrap());
    gb
}
