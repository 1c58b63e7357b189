mod common;

use gbc_emu_core::{cartridge::Cartridge, mmu::Mmu};

fn mmu_with_rom() -> Mmu {
    let mut mmu = Mmu::new();
    let cart = Cartridge::load(common::rom_image(0x00, 0x00, 0x00)).unwrap();
    mmu.load_cart(cart);
    mmu
}

#[test]
fn wram_echo_and_bank_switch() {
    let mut mmu = Mmu::new_with_mode(true);
    mmu.write_byte(0xC000, 0x42);
    assert_eq!(mmu.read_byte(0xE000), 0x42);
    mmu.write_byte(0xE001, 0xBB);
    assert_eq!(mmu.read_byte(0xC001), 0xBB);

    mmu.write_byte(0xFF70, 0x02);
    mmu.write_byte(0xD000, 0xCC);
    assert_eq!(mmu.read_byte(0xD000), 0xCC);

    mmu.write_byte(0xFF70, 0x03);
    assert_eq!(mmu.read_byte(0xD000), 0x00);
    mmu.write_byte(0xD000, 0xDD);
    assert_eq!(mmu.read_byte(0xD000), 0xDD);

    mmu.write_byte(0xFF70, 0x02);
    assert_eq!(mmu.read_byte(0xD000), 0xCC);
}

#[test]
fn echo_low_bank_is_independent_of_bank_select() {
    let mut mmu = Mmu::new_with_mode(true);
    mmu.write_byte(0xC123, 0x5A);
    mmu.write_byte(0xFF70, 0x05);
    assert_eq!(mmu.read_byte(0xE123), 0x5A);
}

#[test]
fn echo_high_half_ignores_wram_bank_select() {
    let mut mmu = Mmu::new_with_mode(true);
    mmu.set_svbk(0x03);
    assert_eq!(mmu.svbk(), 0xFB);
    mmu.write_byte(0xD010, 0x77);
    assert_eq!(mmu.read_byte(0xF010), 0x00);

    mmu.set_svbk(0x01);
    mmu.write_byte(0xD010, 0x66);
    assert_eq!(mmu.read_byte(0xF010), 0x66);
    mmu.write_byte(0xF011, 0x55);

    mmu.set_svbk(0x03);
    assert_eq!(mmu.read_byte(0xF011), 0x55);
    assert_eq!(mmu.read_byte(0xD010), 0x77);
}

#[test]
fn bank_select_accessors() {
    let mut mmu = Mmu::new_with_mode(true);
    mmu.set_vbk(0x01);
    assert_eq!(mmu.vbk(), 0xFF);
    assert_eq!(mmu.ppu.vram_bank, 1);
    mmu.set_svbk(0x00);
    assert_eq!(mmu.svbk(), 0xF9);

    let dmg = Mmu::new();
    assert_eq!(dmg.vbk(), 0xFF);
    assert_eq!(dmg.svbk(), 0xFF);
}

#[test]
fn vram_bank_switch() {
    let mut mmu = Mmu::new_with_mode(true);
    mmu.write_byte(0x8000, 0x11);
    mmu.write_byte(0xFF4F, 0x01);
    assert_eq!(mmu.read_byte(0x8000), 0x00);
    mmu.write_byte(0x8000, 0x22);
    mmu.write_byte(0xFF4F, 0x00);
    assert_eq!(mmu.read_byte(0x8000), 0x11);
    mmu.write_byte(0xFF4F, 0x01);
    assert_eq!(mmu.read_byte(0x8000), 0x22);
}

#[test]
fn rom_writes_without_controller_are_ignored() {
    let mut mmu = mmu_with_rom();
    let original = mmu.read_byte(0x0000);
    mmu.write_byte(0x0000, 0x42);
    assert_eq!(mmu.read_byte(0x0000), original);
    mmu.write_byte(0x2000, 0x03);
    assert_eq!(mmu.read_byte(0x4000), 0x01);
}

#[test]
fn oam_dma_copies_160_bytes() {
    let mut mmu = Mmu::new();
    for i in 0..0xA0u16 {
        mmu.write_byte(0xC100 + i, (i as u8) ^ 0x5A);
    }
    mmu.write_byte(0xC1A0, 0xEE);
    mmu.write_byte(0xFF46, 0xC1);
    for i in 0..0xA0u16 {
        assert_eq!(mmu.read_byte(0xFE00 + i), (i as u8) ^ 0x5A);
    }
    assert_eq!(mmu.read_byte(0xFF46), 0xC1);
}

#[test]
fn disabled_cart_ram_reads_ff() {
    let mut mmu = Mmu::new();
    mmu.load_cart(Cartridge::load(common::rom_image(0x03, 0x01, 0x02)).unwrap());
    mmu.write_byte(0xA000, 0x12);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
    mmu.write_byte(0x0000, 0x0A);
    mmu.write_byte(0xA000, 0x12);
    assert_eq!(mmu.read_byte(0xA000), 0x12);
}

#[test]
fn timer_registers_are_mapped() {
    let mut mmu = Mmu::new();
    mmu.set_tma(0xF0);
    mmu.set_tac(0x05);
    mmu.set_tima(0xFF);
    mmu.if_reg = 0;
    mmu.tick(16);
    assert_eq!(mmu.tima(), 0xF0);
    assert_eq!(mmu.if_reg & 0x04, 0x04);
}

#[test]
fn hram_and_ie() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF80, 0x01);
    mmu.write_byte(0xFFFE, 0x02);
    mmu.write_byte(0xFFFF, 0x1F);
    assert_eq!(mmu.read_byte(0xFF80), 0x01);
    assert_eq!(mmu.read_byte(0xFFFE), 0x02);
    assert_eq!(mmu.ie_reg, 0x1F);
}
