use gbc_emu_core::{
    hardware::SCREEN_WIDTH,
    mmu::Mmu,
    ppu::{DMG_PALETTE, MODE_OAM, MODE_VBLANK, MODE2_CYCLES, MODE3_CYCLES},
};

const FIRST_LINE: u32 = MODE2_CYCLES + MODE3_CYCLES;

fn write_tile_row(mmu: &mut Mmu, tile: u16, row: u16, lo: u8, hi: u8) {
    let addr = 0x8000 + tile * 16 + row * 2;
    mmu.write_byte(addr, lo);
    mmu.write_byte(addr + 1, hi);
}

fn pixel(mmu: &Mmu, x: usize, y: usize) -> u32 {
    mmu.ppu.framebuffer()[y * SCREEN_WIDTH + x]
}

#[test]
fn background_tile_uses_bgp() {
    let mut mmu = Mmu::new();
    write_tile_row(&mut mmu, 0, 0, 0xFF, 0x00);
    mmu.set_bgp(0xE4);
    mmu.tick(FIRST_LINE);
    assert_eq!(pixel(&mmu, 0, 0), DMG_PALETTE[1]);
    assert_eq!(pixel(&mmu, 159, 0), DMG_PALETTE[1]);
}

#[test]
fn scroll_shifts_background() {
    let mut mmu = Mmu::new();
    // Tile 1 is solid color 3, placed at map column 1.
    for row in 0..8 {
        write_tile_row(&mut mmu, 1, row, 0xFF, 0xFF);
    }
    mmu.write_byte(0x9801, 0x01);
    mmu.set_bgp(0xE4);
    mmu.set_scx(4);
    mmu.tick(FIRST_LINE);
    assert_eq!(pixel(&mmu, 3, 0), DMG_PALETTE[0]);
    assert_eq!(pixel(&mmu, 4, 0), DMG_PALETTE[3]);
    assert_eq!(pixel(&mmu, 11, 0), DMG_PALETTE[3]);
    assert_eq!(pixel(&mmu, 12, 0), DMG_PALETTE[0]);
}

#[test]
fn sprite_draws_over_background() {
    let mut mmu = Mmu::new();
    write_tile_row(&mut mmu, 1, 0, 0x00, 0xFF);
    mmu.write_byte(0xFE00, 16);
    mmu.write_byte(0xFE01, 8);
    mmu.write_byte(0xFE02, 1);
    mmu.write_byte(0xFE03, 0);
    mmu.set_obp0(0xE4);
    mmu.set_lcdc(0x93);
    mmu.tick(FIRST_LINE);
    assert_eq!(pixel(&mmu, 0, 0), DMG_PALETTE[2]);
    assert_eq!(pixel(&mmu, 8, 0), DMG_PALETTE[0]);
}

#[test]
fn dmg_sprite_with_lower_x_wins_overlap() {
    let mut mmu = Mmu::new();
    write_tile_row(&mut mmu, 1, 0, 0xFF, 0x00);
    write_tile_row(&mut mmu, 2, 0, 0xFF, 0xFF);
    // OAM entry 0 sits further right but comes first in OAM.
    for (i, b) in [16, 10, 1, 0, 16, 8, 2, 0].into_iter().enumerate() {
        mmu.write_byte(0xFE00 + i as u16, b);
    }
    mmu.set_obp0(0xE4);
    mmu.set_lcdc(0x93);
    mmu.tick(FIRST_LINE);
    assert_eq!(pixel(&mmu, 4, 0), DMG_PALETTE[3]);
    assert_eq!(pixel(&mmu, 9, 0), DMG_PALETTE[1]);
}

#[test]
fn window_covers_background_and_counts_lines() {
    let mut mmu = Mmu::new();
    for row in 0..8 {
        write_tile_row(&mut mmu, 2, row, 0xFF, 0xFF);
    }
    mmu.write_byte(0x9C00, 0x02);
    mmu.set_bgp(0xE4);
    mmu.set_wy(0);
    mmu.set_wx(7 + 80);
    mmu.set_lcdc(0x91 | 0x20 | 0x40);
    mmu.tick(FIRST_LINE);
    assert_eq!(pixel(&mmu, 79, 0), DMG_PALETTE[0]);
    assert_eq!(pixel(&mmu, 80, 0), DMG_PALETTE[3]);
    assert_eq!(pixel(&mmu, 87, 0), DMG_PALETTE[3]);
    assert_eq!(mmu.ppu.window_line_counter(), 1);
}

#[test]
fn offscreen_window_does_not_advance_counter() {
    let mut mmu = Mmu::new();
    mmu.set_wy(0);
    mmu.set_wx(200);
    mmu.set_lcdc(0x91 | 0x20);
    mmu.tick(456 * 4);
    assert_eq!(mmu.ppu.window_line_counter(), 0);
}

#[test]
fn cgb_background_palette_through_ports() {
    let mut mmu = Mmu::new_with_mode(true);
    write_tile_row(&mut mmu, 0, 0, 0xFF, 0x00);
    // Palette 0 color 1 = pure blue (0x7C00).
    mmu.set_bgpi(0x82);
    mmu.set_bgpd(0x00);
    mmu.set_bgpd(0x7C);
    mmu.tick(FIRST_LINE);
    assert_eq!(pixel(&mmu, 0, 0), 0x0000_00FF);
}

#[test]
fn vblank_then_ten_lines_back_to_oam() {
    let mut mmu = Mmu::new();
    mmu.tick(456 * 144);
    assert_eq!(mmu.ppu.mode, MODE_VBLANK);
    assert!(mmu.ppu.frame_ready());
    mmu.tick(456 * 10);
    assert_eq!(mmu.ppu.mode, MODE_OAM);
    assert_eq!(mmu.ly(), 0);
}

#[test]
fn sprite_height_is_fixed_at_oam_scan() {
    let mut mmu = Mmu::new();
    write_tile_row(&mut mmu, 0, 0, 0xFF, 0x00);
    // Y-flipped 8x16 sprite covering lines 0-15.
    mmu.write_byte(0xFE00, 16);
    mmu.write_byte(0xFE01, 8);
    mmu.write_byte(0xFE02, 0);
    mmu.write_byte(0xFE03, 0x40);
    mmu.set_obp0(0xE4);
    mmu.set_lcdc(0x97);

    mmu.tick(456 * 15 + MODE2_CYCLES);
    // Back to 8x8 between the scan and pixel transfer of line 15.
    mmu.set_lcdc(0x93);
    mmu.tick(MODE3_CYCLES);

    assert_eq!(mmu.ly(), 15);
    assert_eq!(pixel(&mmu, 0, 15), DMG_PALETTE[1]);
    assert_eq!(pixel(&mmu, 8, 15), DMG_PALETTE[0]);
}
