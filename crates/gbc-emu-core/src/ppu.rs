use crate::hardware::{SCREEN_HEIGHT, SCREEN_WIDTH};

#[cfg(feature = "ppu-trace")]
macro_rules! ppu_trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*);
    };
}
#[cfg(not(feature = "ppu-trace"))]
macro_rules! ppu_trace {
    ($($arg:tt)*) => {};
}

// Mode lengths in T-cycles
pub const MODE0_CYCLES: u32 = 204; // HBlank
pub const MODE1_CYCLES: u32 = 456; // One line during VBlank
pub const MODE2_CYCLES: u32 = 80; // OAM scan
pub const MODE3_CYCLES: u32 = 172; // Pixel transfer

// Lines 144-153
const VBLANK_LINES: u8 = 10;

// Sprite limits
const MAX_SPRITES_PER_LINE: usize = 10;
const TOTAL_SPRITES: usize = 40;

// Internal memory sizes
pub const VRAM_BANK_SIZE: usize = 0x2000;
pub const OAM_SIZE: usize = 0xA0;
const PAL_RAM_SIZE: usize = 0x40;
const PAL_INDEX_MASK: u8 = 0x3F;
const PAL_UNUSED_BIT: u8 = 0x40;
const PAL_AUTO_INCREMENT_BIT: u8 = 0x80;

// WX past this puts the window off screen
const WINDOW_X_MAX: u8 = 166;

// VRAM layout constants
const BG_MAP_0_BASE: usize = 0x1800;
const BG_MAP_1_BASE: usize = 0x1C00;
const TILE_DATA_0_BASE: usize = 0x0000;
const TILE_DATA_1_BASE: usize = 0x0800;

// STAT mode numbers
pub const MODE_HBLANK: u8 = 0;
pub const MODE_VBLANK: u8 = 1;
pub const MODE_OAM: u8 = 2;
pub const MODE_TRANSFER: u8 = 3;

/// DMG shades in 0x00RRGGBB order, lightest first.
pub const DMG_PALETTE: [u32; 4] = [0x00FF_FFFF, 0x00AA_AAAA, 0x0055_5555, 0x0000_0000];

pub struct Ppu {
    pub vram: [[u8; VRAM_BANK_SIZE]; 2],
    pub vram_bank: usize,
    pub oam: [u8; OAM_SIZE],

    cgb: bool,

    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    lyc_eq_ly: bool,
    pub dma: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,

    win_line_counter: u8,

    bgpi: u8,
    bgpd: [u8; PAL_RAM_SIZE],
    obpi: u8,
    obpd: [u8; PAL_RAM_SIZE],

    mode_clock: u32,
    pub mode: u8,

    pub framebuffer: [u32; SCREEN_WIDTH * SCREEN_HEIGHT],
    line_priority: [bool; SCREEN_WIDTH],
    line_color_zero: [bool; SCREEN_WIDTH],
    line_sprites: [Sprite; MAX_SPRITES_PER_LINE],
    sprite_count: usize,
    /// Set on VBlank entry, cleared by the caller
    frame_ready: bool,
    stat_irq_line: bool,
    frame_counter: u64,
}

#[derive(Copy, Clone, Default)]
struct Sprite {
    x: i16,
    y: i16,
    tile: u8,
    flags: u8,
    oam_index: usize,
    /// LCDC.2 height at OAM scan time.
    height: i16,
}

/// One decoded background or window pixel.
#[derive(Copy, Clone)]
struct TilePixel {
    color: u32,
    color_id: u8,
    priority: bool,
}

impl Ppu {
    pub fn new_with_mode(cgb: bool) -> Self {
        Self {
            vram: [[0; VRAM_BANK_SIZE]; 2],
            vram_bank: 0,
            oam: [0; OAM_SIZE],
            cgb,
            lcdc: 0,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            lyc_eq_ly: false,
            dma: 0,
            bgp: 0,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
            win_line_counter: 0,
            bgpi: PAL_UNUSED_BIT,
            bgpd: [0; PAL_RAM_SIZE],
            obpi: PAL_UNUSED_BIT,
            obpd: [0; PAL_RAM_SIZE],
            mode_clock: 0,
            mode: MODE_OAM,
            framebuffer: [DMG_PALETTE[0]; SCREEN_WIDTH * SCREEN_HEIGHT],
            line_priority: [false; SCREEN_WIDTH],
            line_color_zero: [false; SCREEN_WIDTH],
            line_sprites: [Sprite::default(); MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            frame_ready: false,
            stat_irq_line: false,
            frame_counter: 0,
        }
    }

    pub fn new() -> Self {
        Self::new_with_mode(false)
    }

    /// OAM scan for the current line, keeping the first ten hits.
    fn oam_scan(&mut self) {
        let sprite_height: i16 = if self.lcdc & 0x04 != 0 { 16 } else { 8 };
        self.sprite_count = 0;
        for i in 0..TOTAL_SPRITES {
            if self.sprite_count >= MAX_SPRITES_PER_LINE {
                break;
            }
            let base = i * 4;
            let y = self.oam[base] as i16 - 16;
            if self.ly as i16 >= y && (self.ly as i16) < y + sprite_height {
                self.line_sprites[self.sprite_count] = Sprite {
                    x: self.oam[base + 1] as i16 - 8,
                    y,
                    tile: self.oam[base + 2],
                    flags: self.oam[base + 3],
                    oam_index: i,
                    height: sprite_height,
                };
                self.sprite_count += 1;
            }
        }
        if !self.cgb {
            // Lower X wins; OAM order breaks ties. CGB keeps plain OAM order.
            self.line_sprites[..self.sprite_count].sort_by_key(|s| (s.x, s.oam_index));
        }
    }

    pub fn in_hblank(&self) -> bool {
        self.mode == MODE_HBLANK
    }

    pub fn decode_cgb_color(lo: u8, hi: u8) -> u32 {
        let raw = ((hi as u16) << 8) | lo as u16;
        let expand = |c: u16| {
            let c = (c & 0x1F) as u8;
            (c << 3 | c >> 2) as u32
        };
        (expand(raw) << 16) | (expand(raw >> 5) << 8) | expand(raw >> 10)
    }

    /// Register values left behind by the boot ROM (LCD on, BGP=0xFC).
    pub fn apply_boot_state(&mut self) {
        self.lcdc = 0x91;
        self.dma = 0xFF;
        self.bgp = 0xFC;
        self.stat = 0x00;
        self.ly = 0;
        self.mode = MODE_OAM;
        self.mode_clock = 0;
        self.win_line_counter = 0;
        self.lyc_eq_ly = self.ly == self.lyc;
        self.stat_irq_line = false;
        if self.cgb {
            // White background and object palettes until software loads its own.
            self.bgpd = [0xFF; PAL_RAM_SIZE];
            self.obpd = [0xFF; PAL_RAM_SIZE];
        }
    }

    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Window rows drawn so far this frame.
    pub fn window_line_counter(&self) -> u8 {
        self.win_line_counter
    }

    /// Pixels of the last rendered lines. Only whole once `frame_ready()`.
    pub fn framebuffer(&self) -> &[u32; SCREEN_WIDTH * SCREEN_HEIGHT] {
        &self.framebuffer
    }

    /// Acknowledges the finished frame.
    pub fn clear_frame_flag(&mut self) {
        self.frame_ready = false;
    }

    pub fn frames(&self) -> u64 {
        self.frame_counter
    }

    pub fn is_cgb(&self) -> bool {
        self.cgb
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & 0x80 != 0
    }

    /// Background palette entry `color_id` of `palette`, as 0x00RRGGBB.
    pub fn bg_palette_color(&self, palette: usize, color_id: usize) -> u32 {
        let off = palette * 8 + color_id * 2;
        Self::decode_cgb_color(self.bgpd[off], self.bgpd[off + 1])
    }

    /// Get a CGB object palette color as 0x00RRGGBB.
    pub fn ob_palette_color(&self, palette: usize, color_id: usize) -> u32 {
        let off = palette * 8 + color_id * 2;
        Self::decode_cgb_color(self.obpd[off], self.obpd[off + 1])
    }

    fn sanitize_palette_index(value: u8) -> u8 {
        (value & (PAL_AUTO_INCREMENT_BIT | PAL_INDEX_MASK)) | PAL_UNUSED_BIT
    }

    fn palette_ram_index(index: u8) -> usize {
        (index & PAL_INDEX_MASK) as usize
    }

    fn step_palette_index(index: &mut u8) {
        let current = *index;
        let idx = current & PAL_INDEX_MASK;
        let next_idx = if current & PAL_AUTO_INCREMENT_BIT != 0 {
            idx.wrapping_add(1) & PAL_INDEX_MASK
        } else {
            idx
        };
        let auto = current & PAL_AUTO_INCREMENT_BIT;
        *index = auto | PAL_UNUSED_BIT | next_idx;
    }

    fn update_lyc_compare(&mut self) {
        if self.lcdc & 0x80 != 0 {
            self.lyc_eq_ly = self.ly == self.lyc;
        }
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => {
                (self.stat & 0x78)
                    | 0x80
                    | (self.mode & 0x03)
                    | if self.lyc_eq_ly { 0x04 } else { 0 }
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF46 => self.dma,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            0xFF68 if self.cgb => self.bgpi,
            0xFF69 if self.cgb => self.bgpd[Self::palette_ram_index(self.bgpi)],
            0xFF6A if self.cgb => self.obpi,
            0xFF6B if self.cgb => self.obpd[Self::palette_ram_index(self.obpi)],
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF40 => {
                let was_on = self.lcdc & 0x80 != 0;
                self.lcdc = val;
                if was_on && self.lcdc & 0x80 == 0 {
                    self.mode = MODE_HBLANK;
                    self.mode_clock = 0;
                    self.win_line_counter = 0;
                    self.ly = 0;
                    self.framebuffer.fill(DMG_PALETTE[0]);
                } else if !was_on && self.lcdc & 0x80 != 0 {
                    self.mode = MODE_OAM;
                    self.mode_clock = 0;
                }
                if self.lcdc & 0x80 != 0 {
                    self.update_lyc_compare();
                }
            }
            0xFF41 => self.stat = (self.stat & 0x07) | (val & 0xF8),
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            0xFF44 => {}
            0xFF45 => {
                self.lyc = val;
                self.update_lyc_compare();
            }
            0xFF46 => self.dma = val,
            0xFF47 => self.bgp = val,
            0xFF48 => self.obp0 = val,
            0xFF49 => self.obp1 = val,
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            0xFF68 => {
                if self.cgb {
                    self.bgpi = Self::sanitize_palette_index(val);
                }
            }
            0xFF69 => {
                if self.cgb {
                    let idx = Self::palette_ram_index(self.bgpi);
                    self.bgpd[idx] = val;
                    Self::step_palette_index(&mut self.bgpi);
                }
            }
            0xFF6A => {
                if self.cgb {
                    self.obpi = Self::sanitize_palette_index(val);
                }
            }
            0xFF6B => {
                if self.cgb {
                    let idx = Self::palette_ram_index(self.obpi);
                    self.obpd[idx] = val;
                    Self::step_palette_index(&mut self.obpi);
                }
            }
            _ => {}
        }
    }

    #[inline(always)]
    fn dmg_shade(palette: u8, color_id: u8) -> u8 {
        (palette >> (color_id * 2)) & 0x03
    }

    /// Decodes one pixel of the background/window tile at `map_base` for the
    /// layer-space coordinates `(x, y)`.
    fn tile_pixel(&self, map_base: usize, x: usize, y: usize) -> TilePixel {
        let map_idx = map_base + (y / 8) * 32 + (x / 8);
        let tile_index = self.vram[0][map_idx];
        let addr = if self.lcdc & 0x10 != 0 {
            TILE_DATA_0_BASE + tile_index as usize * 16
        } else {
            TILE_DATA_1_BASE + ((tile_index as i8 as i16 + 128) as usize) * 16
        };

        let mut bit = 7 - (x % 8);
        let mut tile_y = y % 8;
        let mut priority = false;
        let mut palette = 0usize;
        let mut bank = 0usize;
        if self.cgb {
            let attr = self.vram[1][map_idx];
            palette = (attr & 0x07) as usize;
            bank = ((attr >> 3) & 0x01) as usize;
            if attr & 0x20 != 0 {
                bit = x % 8;
            }
            if attr & 0x40 != 0 {
                tile_y = 7 - tile_y;
            }
            priority = attr & 0x80 != 0;
        }

        let lo = self.vram[bank][addr + tile_y * 2];
        let hi = self.vram[bank][addr + tile_y * 2 + 1];
        let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
        if self.cgb {
            TilePixel {
                color: self.bg_palette_color(palette, color_id as usize),
                color_id,
                priority,
            }
        } else {
            TilePixel {
                color: DMG_PALETTE[Self::dmg_shade(self.bgp, color_id) as usize],
                color_id,
                priority,
            }
        }
    }

    fn put_layer_pixel(&mut self, x: usize, px: TilePixel) {
        let idx = self.ly as usize * SCREEN_WIDTH + x;
        self.framebuffer[idx] = px.color;
        self.line_priority[x] = px.priority;
        self.line_color_zero[x] = px.color_id == 0;
    }

    fn render_scanline(&mut self) {
        if self.lcdc & 0x80 == 0 || self.ly as usize >= SCREEN_HEIGHT {
            return;
        }

        self.line_priority.fill(false);
        self.line_color_zero.fill(true);

        // On DMG, LCDC bit 0 blanks both background and window. On CGB it only
        // strips their priority over sprites.
        let bg_enabled = self.cgb || self.lcdc & 0x01 != 0;
        let master_priority = !self.cgb || self.lcdc & 0x01 != 0;

        // Pre-fill with color 0 so a disabled background still leaves every
        // pixel of the line defined.
        let bg_color = if self.cgb {
            self.bg_palette_color(0, 0)
        } else {
            DMG_PALETTE[Self::dmg_shade(self.bgp, 0) as usize]
        };
        let row = self.ly as usize * SCREEN_WIDTH;
        self.framebuffer[row..row + SCREEN_WIDTH].fill(bg_color);

        if bg_enabled {
            self.render_background();
            if self.render_window() {
                self.win_line_counter = self.win_line_counter.wrapping_add(1);
            }
        }

        if self.lcdc & 0x02 != 0 {
            self.render_sprites(bg_enabled, master_priority);
        }
    }

    fn render_background(&mut self) {
        let map_base = if self.lcdc & 0x08 != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let y = self.ly.wrapping_add(self.scy) as usize;
        for x in 0..SCREEN_WIDTH {
            let px = (x as u8).wrapping_add(self.scx) as usize;
            let pixel = self.tile_pixel(map_base, px, y);
            self.put_layer_pixel(x, pixel);
        }
    }

    /// Draws the window over the current line. Returns whether any window
    /// pixel landed on screen.
    fn render_window(&mut self) -> bool {
        if self.lcdc & 0x20 == 0 || self.ly < self.wy || self.wx > WINDOW_X_MAX {
            return false;
        }
        let map_base = if self.lcdc & 0x40 != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let left = self.wx as isize - 7;
        let window_y = self.win_line_counter as usize;
        for x in left.max(0) as usize..SCREEN_WIDTH {
            let window_x = (x as isize - left) as usize;
            let pixel = self.tile_pixel(map_base, window_x, window_y);
            self.put_layer_pixel(x, pixel);
        }
        ppu_trace!("window line {} drawn from x={}", window_y, left);
        true
    }

    fn render_sprites(&mut self, bg_enabled: bool, master_priority: bool) {
        let mut drawn = [false; SCREEN_WIDTH];
        let row = self.ly as usize * SCREEN_WIDTH;
        for i in 0..self.sprite_count {
            let s = self.line_sprites[i];
            let mut tile = s.tile;
            if s.height == 16 {
                tile &= 0xFE;
            }
            let mut line_idx = self.ly as i16 - s.y;
            if !(0..s.height).contains(&line_idx) {
                continue;
            }
            if s.flags & 0x40 != 0 {
                line_idx = s.height - 1 - line_idx;
            }
            let bank = if self.cgb {
                ((s.flags >> 3) & 0x01) as usize
            } else {
                0
            };
            let addr = (tile as usize + (line_idx as usize >> 3)) * 16 + (line_idx as usize & 7) * 2;
            let lo = self.vram[bank][addr];
            let hi = self.vram[bank][addr + 1];
            for px in 0..8u8 {
                let bit = if s.flags & 0x20 != 0 { px } else { 7 - px };
                let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
                if color_id == 0 {
                    continue;
                }
                let sx = s.x + px as i16;
                if !(0i16..SCREEN_WIDTH as i16).contains(&sx) || drawn[sx as usize] {
                    continue;
                }
                let sx = sx as usize;
                let bg_zero = !bg_enabled || self.line_color_zero[sx];
                if master_priority {
                    if self.cgb && self.line_priority[sx] && !bg_zero {
                        continue;
                    }
                    if s.flags & 0x80 != 0 && !bg_zero {
                        continue;
                    }
                }
                let color = if self.cgb {
                    self.ob_palette_color((s.flags & 0x07) as usize, color_id as usize)
                } else if s.flags & 0x10 != 0 {
                    DMG_PALETTE[Self::dmg_shade(self.obp1, color_id) as usize]
                } else {
                    DMG_PALETTE[Self::dmg_shade(self.obp0, color_id) as usize]
                };
                self.framebuffer[row + sx] = color;
                // Claimed by a higher priority sprite, even behind the background.
                drawn[sx] = true;
            }
        }
    }

    /// Advances the mode state machine. Returns true when HBlank was entered.
    pub fn step(&mut self, cycles: u32, if_reg: &mut u8) -> bool {
        let mut remaining = cycles;
        let mut hblank_triggered = false;
        while remaining > 0 {
            let increment = remaining.min(4);
            remaining -= increment;
            if self.lcdc & 0x80 == 0 {
                self.mode = MODE_HBLANK;
                self.ly = 0;
                self.mode_clock = 0;
                self.win_line_counter = 0;
                continue;
            }

            self.mode_clock += increment;

            match self.mode {
                MODE_HBLANK => {
                    if self.mode_clock >= MODE0_CYCLES {
                        self.mode_clock -= MODE0_CYCLES;
                        self.ly += 1;
                        self.update_lyc_compare();
                        if self.ly == SCREEN_HEIGHT as u8 {
                            self.frame_ready = true;
                            self.mode = MODE_VBLANK;
                            *if_reg |= 0x01;
                            ppu_trace!("vblank frame={}", self.frame_counter);
                        } else {
                            self.mode = MODE_OAM;
                        }
                    }
                }
                MODE_VBLANK => {
                    if self.mode_clock >= MODE1_CYCLES {
                        self.mode_clock -= MODE1_CYCLES;
                        self.ly += 1;
                        if self.ly > SCREEN_HEIGHT as u8 + VBLANK_LINES - 1 {
                            self.ly = 0;
                            self.win_line_counter = 0;
                            self.frame_counter = self.frame_counter.wrapping_add(1);
                            self.mode = MODE_OAM;
                        }
                        self.update_lyc_compare();
                    }
                }
                MODE_OAM => {
                    if self.mode_clock >= MODE2_CYCLES {
                        self.mode_clock -= MODE2_CYCLES;
                        self.oam_scan();
                        self.mode = MODE_TRANSFER;
                    }
                }
                MODE_TRANSFER => {
                    if self.mode_clock >= MODE3_CYCLES {
                        self.mode_clock -= MODE3_CYCLES;
                        self.render_scanline();
                        self.mode = MODE_HBLANK;
                        hblank_triggered = true;
                    }
                }
                _ => {}
            }

            self.update_stat_irq(if_reg);
        }
        hblank_triggered
    }

    // STAT requests fire on the rising edge of the combined source line.
    fn update_stat_irq(&mut self, if_reg: &mut u8) {
        let coincidence = self.lyc_eq_ly && self.stat & 0x40 != 0;
        let mode_signal = match self.mode {
            MODE_HBLANK => self.stat & 0x08 != 0,
            MODE_VBLANK => self.stat & 0x10 != 0,
            MODE_OAM => self.stat & 0x20 != 0,
            _ => false,
        };
        let current = coincidence || mode_signal;
        if current && !self.stat_irq_line {
            *if_reg |= 0x02;
        }
        self.stat_irq_line = current;
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
