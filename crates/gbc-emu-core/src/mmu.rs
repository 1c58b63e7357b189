use crate::{apu::Apu, cartridge::Cartridge, ppu::Ppu, timer::Timer};

const WRAM_BANK_SIZE: usize = 0x1000;
const HRAM_SIZE: usize = 0x7F;
const DMA_LEN: u16 = 0xA0;

/// Generates a getter and setter pair for a memory mapped register. Both go
/// through `read_byte`/`write_byte` so the usual side effects apply.
macro_rules! io_registers {
    ($($(#[$meta:meta])* $get:ident, $set:ident => $addr:literal;)*) => {
        $(
            $(#[$meta])*
            pub fn $get(&self) -> u8 {
                self.read_byte($addr)
            }

            pub fn $set(&mut self, val: u8) {
                self.write_byte($addr, val)
            }
        )*
    };
}

pub struct Mmu {
    pub wram: [[u8; WRAM_BANK_SIZE]; 8],
    pub wram_bank: usize,
    pub hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    pub if_reg: u8,
    pub ie_reg: u8,
    pub ppu: Ppu,
    pub apu: Apu,
    pub timer: Timer,
    /// P1 select lines (bits 4-5). No buttons are ever reported pressed.
    joypad_select: u8,
    serial_data: u8,
    serial_control: u8,
    cgb_mode: bool,
}

impl Mmu {
    pub fn new_with_mode(cgb: bool) -> Self {
        Self::new_with_config(cgb, crate::apu::DEFAULT_BUFFER_LEN)
    }

    pub fn new_with_config(cgb: bool, sample_buffer_len: usize) -> Self {
        let mut mmu = Self {
            wram: [[0; WRAM_BANK_SIZE]; 8],
            wram_bank: 1,
            hram: [0; HRAM_SIZE],
            cart: None,
            if_reg: 0,
            ie_reg: 0,
            ppu: Ppu::new_with_mode(cgb),
            apu: Apu::with_buffer_len(sample_buffer_len),
            timer: Timer::new(),
            joypad_select: 0,
            serial_data: 0,
            serial_control: 0,
            cgb_mode: cgb,
        };
        mmu.apply_boot_state();
        mmu
    }

    pub fn new() -> Self {
        Self::new_with_mode(false)
    }

    /// I/O state as the boot ROM leaves it just before jumping to 0x0100.
    pub fn apply_boot_state(&mut self) {
        self.ppu.apply_boot_state();
        self.apu.apply_boot_state();
        self.if_reg = 0xE1;
        self.ie_reg = 0;
        self.joypad_select = 0;
        self.wram_bank = 1;
        self.ppu.vram_bank = 0;
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    pub fn is_cgb(&self) -> bool {
        self.cgb_mode
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF)
            }
            0x8000..=0x9FFF => self.ppu.vram[self.ppu.vram_bank][(addr - 0x8000) as usize],
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize],
            0xD000..=0xDFFF => self.wram[self.wram_bank][(addr - 0xD000) as usize],
            0xE000..=0xEFFF => self.wram[0][(addr - 0xE000) as usize],
            // Echo covers the DMG layout only: bank 1, whatever SVBK selects.
            0xF000..=0xFDFF => self.wram[1][(addr - 0xF000) as usize],
            0xFE00..=0xFE9F => self.ppu.oam[(addr - 0xFE00) as usize],
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00 => 0xC0 | self.joypad_select | 0x0F,
            0xFF01 => self.serial_data,
            0xFF02 => self.serial_control | 0x7E,
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.if_reg | 0xE0,
            0xFF10..=0xFF3F => self.apu.read_reg(addr),
            0xFF40..=0xFF4B | 0xFF68..=0xFF6B => self.ppu.read_reg(addr),
            0xFF4F if self.cgb_mode => 0xFE | self.ppu.vram_bank as u8,
            0xFF70 if self.cgb_mode => 0xF8 | self.wram_bank as u8,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie_reg,
            _ => 0xFF,
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => {
                self.ppu.vram[self.ppu.vram_bank][(addr - 0x8000) as usize] = val;
            }
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize] = val,
            0xD000..=0xDFFF => self.wram[self.wram_bank][(addr - 0xD000) as usize] = val,
            0xE000..=0xEFFF => self.wram[0][(addr - 0xE000) as usize] = val,
            0xF000..=0xFDFF => self.wram[1][(addr - 0xF000) as usize] = val,
            0xFE00..=0xFE9F => self.ppu.oam[(addr - 0xFE00) as usize] = val,
            0xFF00 => self.joypad_select = val & 0x30,
            0xFF01 => self.serial_data = val,
            0xFF02 => self.serial_control = val & 0x81,
            0xFF04..=0xFF07 => self.timer.write(addr, val),
            0xFF0F => self.if_reg = val & 0x1F,
            0xFF10..=0xFF3F => self.apu.write_reg(addr, val),
            0xFF46 => self.dma_transfer(val),
            0xFF40..=0xFF4B | 0xFF68..=0xFF6B => self.ppu.write_reg(addr, val),
            0xFF4F => {
                if self.cgb_mode {
                    self.ppu.vram_bank = (val & 0x01) as usize;
                }
            }
            0xFF70 => {
                if self.cgb_mode {
                    let bank = (val & 0x07) as usize;
                    self.wram_bank = if bank == 0 { 1 } else { bank };
                }
            }
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie_reg = val,
            _ => {}
        }
    }

    /// Copies 160 bytes from `page << 8` into OAM in one go.
    fn dma_transfer(&mut self, page: u8) {
        let base = (page as u16) << 8;
        for i in 0..DMA_LEN {
            let byte = self.read_byte(base.wrapping_add(i));
            self.ppu.oam[i as usize] = byte;
        }
        self.ppu.dma = page;
    }

    pub fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read_byte(addr) as u16;
        let hi = self.read_byte(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write_word(&mut self, addr: u16, val: u16) {
        self.write_byte(addr, val as u8);
        self.write_byte(addr.wrapping_add(1), (val >> 8) as u8);
    }

    pub fn request_interrupt(&mut self, bit: u8) {
        self.if_reg |= 1 << bit;
    }

    /// Interrupts that are both requested and enabled.
    pub fn pending_interrupts(&self) -> u8 {
        self.if_reg & self.ie_reg & 0x1F
    }

    /// Feeds elapsed cycles to the video, audio and timer units, then the
    /// cartridge clock.
    pub fn tick(&mut self, cycles: u32) {
        self.ppu.step(cycles, &mut self.if_reg);
        self.apu.step(cycles);
        self.timer.step(cycles, &mut self.if_reg);
        if let Some(cart) = self.cart.as_mut() {
            cart.step_rtc(cycles);
        }
    }

    io_registers! {
        /// Joypad select register.
        p1, set_p1 => 0xFF00;
        div, set_div => 0xFF04;
        tima, set_tima => 0xFF05;
        tma, set_tma => 0xFF06;
        tac, set_tac => 0xFF07;
        /// LCD control.
        lcdc, set_lcdc => 0xFF40;
        stat, set_stat => 0xFF41;
        scy, set_scy => 0xFF42;
        scx, set_scx => 0xFF43;
        lyc, set_lyc => 0xFF45;
        dma, set_dma => 0xFF46;
        bgp, set_bgp => 0xFF47;
        obp0, set_obp0 => 0xFF48;
        obp1, set_obp1 => 0xFF49;
        wy, set_wy => 0xFF4A;
        wx, set_wx => 0xFF4B;
        bgpi, set_bgpi => 0xFF68;
        bgpd, set_bgpd => 0xFF69;
        obpi, set_obpi => 0xFF6A;
        obpd, set_obpd => 0xFF6B;
        /// CGB VRAM bank select.
        vbk, set_vbk => 0xFF4F;
        /// CGB WRAM bank select.
        svbk, set_svbk => 0xFF70;
        nr10, set_nr10 => 0xFF10;
        nr11, set_nr11 => 0xFF11;
        nr12, set_nr12 => 0xFF12;
        nr13, set_nr13 => 0xFF13;
        nr14, set_nr14 => 0xFF14;
        nr21, set_nr21 => 0xFF16;
        nr22, set_nr22 => 0xFF17;
        nr23, set_nr23 => 0xFF18;
        nr24, set_nr24 => 0xFF19;
        nr30, set_nr30 => 0xFF1A;
        nr31, set_nr31 => 0xFF1B;
        nr32, set_nr32 => 0xFF1C;
        nr33, set_nr33 => 0xFF1D;
        nr34, set_nr34 => 0xFF1E;
        nr41, set_nr41 => 0xFF20;
        nr42, set_nr42 => 0xFF21;
        nr43, set_nr43 => 0xFF22;
        nr44, set_nr44 => 0xFF23;
        /// Master volume.
        nr50, set_nr50 => 0xFF24;
        /// Channel panning.
        nr51, set_nr51 => 0xFF25;
        /// Sound power and live channel status.
        nr52, set_nr52 => 0xFF26;
    }

    /// Current scanline. LY is read only.
    pub fn ly(&self) -> u8 {
        self.read_byte(0xFF44)
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_regions_read_ff() {
        let mut mmu = Mmu::new();
        assert_eq!(mmu.read_byte(0x0000), 0xFF);
        assert_eq!(mmu.read_byte(0xA000), 0xFF);
        mmu.write_byte(0xFEA0, 0x12);
        assert_eq!(mmu.read_byte(0xFEA0), 0xFF);
        assert_eq!(mmu.read_byte(0xFF4C), 0xFF);
    }

    #[test]
    fn dmg_ignores_bank_registers() {
        let mut mmu = Mmu::new();
        mmu.write_byte(0xFF70, 3);
        mmu.write_byte(0xFF4F, 1);
        assert_eq!(mmu.wram_bank, 1);
        assert_eq!(mmu.ppu.vram_bank, 0);
        assert_eq!(mmu.read_byte(0xFF70), 0xFF);
        assert_eq!(mmu.read_byte(0xFF4F), 0xFF);
    }

    #[test]
    fn wram_bank_zero_selects_one() {
        let mut mmu = Mmu::new_with_mode(true);
        mmu.write_byte(0xFF70, 0);
        assert_eq!(mmu.wram_bank, 1);
        assert_eq!(mmu.read_byte(0xFF70), 0xF9);
    }

    #[test]
    fn interrupt_flag_upper_bits_read_set() {
        let mut mmu = Mmu::new();
        mmu.write_byte(0xFF0F, 0x04);
        assert_eq!(mmu.read_byte(0xFF0F), 0xE4);
        mmu.ie_reg = 0x05;
        assert_eq!(mmu.pending_interrupts(), 0x04);
    }

    #[test]
    fn joypad_reports_released_buttons() {
        let mut mmu = Mmu::new();
        mmu.write_byte(0xFF00, 0x20);
        assert_eq!(mmu.read_byte(0xFF00), 0xEF);
        mmu.write_byte(0xFF00, 0x10);
        assert_eq!(mmu.read_byte(0xFF00), 0xDF);
    }

    #[test]
    fn boot_state_registers() {
        let mmu = Mmu::new();
        assert_eq!(mmu.lcdc(), 0x91);
        assert_eq!(mmu.bgp(), 0xFC);
        assert_eq!(mmu.read_byte(0xFF0F), 0xE1);
        assert_eq!(mmu.nr52() & 0x80, 0x80);
    }

    #[test]
    fn named_accessors_route_through_io() {
        let mut mmu = Mmu::new();
        mmu.set_scx(0x12);
        mmu.set_wy(0x34);
        mmu.set_nr50(0x77);
        assert_eq!(mmu.read_byte(0xFF43), 0x12);
        assert_eq!(mmu.wy(), 0x34);
        assert_eq!(mmu.nr50(), 0x77);
    }

    #[test]
    fn word_access_is_little_endian() {
        let mut mmu = Mmu::new();
        mmu.write_word(0xC100, 0xBEEF);
        assert_eq!(mmu.read_byte(0xC100), 0xEF);
        assert_eq!(mmu.read_byte(0xC101), 0xBE);
        assert_eq!(mmu.read_word(0xC100), 0xBEEF);
    }

    #[test]
    fn tick_requests_vblank() {
        let mut mmu = Mmu::new();
        mmu.if_reg = 0;
        mmu.tick(456 * 144);
        assert_eq!(mmu.if_reg & 0x01, 0x01);
    }
}
