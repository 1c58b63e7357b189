#![allow(dead_code)]

use gbc_emu_core::cartridge::{BOOT_LOGO, Header, ROM_BANK_SIZE};

/// Builds a cartridge image with a valid logo and header checksum. The first
/// byte of every bank holds the bank number so tests can tell banks apart.
pub fn rom_image(cart_type: u8, rom_code: u8, ram_code: u8) -> Vec<u8> {
    let banks = 2usize << rom_code;
    let mut rom = vec![0u8; banks * ROM_BANK_SIZE];
    for bank in 1..banks {
        rom[bank * ROM_BANK_SIZE] = bank as u8;
    }
    rom[0x0104..0x0134].copy_from_slice(&BOOT_LOGO);
    rom[0x0134..0x0138].copy_from_slice(b"TEST");
    rom[0x0147] = cart_type;
    rom[0x0148] = rom_code;
    rom[0x0149] = ram_code;
    fix_checksum(&mut rom);
    rom
}

pub fn fix_checksum(rom: &mut [u8]) {
    rom[0x014D] = Header::parse(rom).computed_checksum();
}

/// A 32 KiB no-controller image that jumps from the entry point to `code`
/// placed right after the header at 0x0150.
pub fn program(code: &[u8]) -> Vec<u8> {
    let mut rom = rom_image(0x00, 0x00, 0x00);
    rom[0x0100..0x0104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    rom[0x0150..0x0150 + code.len()].copy_from_slice(code);
    rom
}

/// A 32 KiB no-controller image with up to four bytes at the entry point.
pub fn entry_program(code: &[u8]) -> Vec<u8> {
    assert!(code.len() <= 4, "entry point only has room for four bytes");
    let mut rom = rom_image(0x00, 0x00, 0x00);
    rom[0x0100..0x0100 + code.len()].copy_from_slice(code);
    rom
}
