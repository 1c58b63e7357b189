use log::{debug, info, warn};

use crate::error::LoadError;

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;

/// Largest image accepted: 512 banks of 16 KiB, the MBC5 addressing limit.
pub const MAX_ROM_SIZE: usize = 512 * ROM_BANK_SIZE;

/// Images shorter than this cannot hold a complete header.
pub const HEADER_END: usize = 0x0150;

/// The RTC counts seconds off the 32.768 kHz cartridge crystal.
pub const RTC_CYCLES_PER_SECOND: u32 = 32_768;

const MBC2_RAM_SIZE: usize = 0x200;

pub const BOOT_LOGO: [u8; 48] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00, 0x0D,
    0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E, 0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD, 0xD9, 0x99,
    0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E, 0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB, 0xB9, 0x33, 0x3E,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
}

/// Controller family plus the bank counts assumed when the size bytes are
/// missing or unrecognized, keyed by header byte 0x147.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TypeInfo {
    mbc: MbcType,
    max_rom_banks: usize,
    default_ram_banks: usize,
}

const fn type_info(cart_type: u8) -> TypeInfo {
    let (mbc, max_rom_banks, default_ram_banks) = match cart_type {
        0x00 => (MbcType::NoMbc, 2, 0),
        0x01 => (MbcType::Mbc1, 128, 0),
        0x02 | 0x03 => (MbcType::Mbc1, 128, 4),
        0x05 | 0x06 => (MbcType::Mbc2, 16, 0),
        0x08 | 0x09 => (MbcType::NoMbc, 2, 1),
        0x0F | 0x11 => (MbcType::Mbc3, 128, 0),
        0x10 | 0x12 | 0x13 => (MbcType::Mbc3, 128, 4),
        0x19 | 0x1C => (MbcType::Mbc5, 512, 0),
        0x1A | 0x1B | 0x1D | 0x1E => (MbcType::Mbc5, 512, 16),
        _ => (MbcType::NoMbc, 2, 0),
    };
    TypeInfo {
        mbc,
        max_rom_banks,
        default_ram_banks,
    }
}

/// Read-only view over the cartridge header at 0x0100-0x014F.
pub struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    pub fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn byte(&self, addr: usize) -> u8 {
        self.data.get(addr).copied().unwrap_or(0)
    }

    pub fn title(&self) -> String {
        let end = 0x0143.min(self.data.len());
        let mut slice = &self.data[0x0134.min(end)..end];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    pub fn cgb_supported(&self) -> bool {
        self.byte(0x0143) & 0x80 != 0
    }

    pub fn cgb_only(&self) -> bool {
        self.byte(0x0143) == 0xC0
    }

    pub fn sgb_supported(&self) -> bool {
        self.byte(0x0146) == 0x03
    }

    pub fn japanese(&self) -> bool {
        self.byte(0x014A) == 0x00
    }

    pub fn cart_type(&self) -> u8 {
        self.byte(0x0147)
    }

    pub fn mbc_type(&self) -> MbcType {
        type_info(self.cart_type()).mbc
    }

    pub fn has_battery(&self) -> bool {
        matches!(
            self.cart_type(),
            0x03 | 0x06 | 0x09 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E
        )
    }

    pub fn has_rtc(&self) -> bool {
        matches!(self.cart_type(), 0x0F | 0x10)
    }

    pub fn has_rumble(&self) -> bool {
        matches!(self.cart_type(), 0x1C..=0x1E)
    }

    /// ROM bank count encoded by byte 0x148 (32 KiB << n).
    pub fn declared_rom_banks(&self) -> Option<usize> {
        match self.byte(0x0148) {
            code @ 0x00..=0x08 => Some(2usize << code),
            _ => None,
        }
    }

    /// External RAM size in bytes encoded by byte 0x149.
    pub fn declared_ram_size(&self) -> Option<usize> {
        match self.byte(0x0149) {
            0x00 => Some(0),
            0x01 => Some(0x800),
            0x02 => Some(0x2000),
            0x03 => Some(0x8000),
            0x04 => Some(0x20000),
            0x05 => Some(0x10000),
            _ => None,
        }
    }

    pub fn logo_valid(&self) -> bool {
        self.data.get(0x0104..0x0134) == Some(&BOOT_LOGO[..])
    }

    pub fn header_checksum(&self) -> u8 {
        self.byte(0x014D)
    }

    pub fn computed_checksum(&self) -> u8 {
        (0x0134..=0x014C).fold(0u8, |x, addr| x.wrapping_sub(self.byte(addr)).wrapping_sub(1))
    }

    pub fn controller_name(&self) -> &'static str {
        match self.cart_type() {
            0x00 => "ROM ONLY",
            0x01 => "MBC1",
            0x02 => "MBC1+RAM",
            0x03 => "MBC1+RAM+BATTERY",
            0x05 => "MBC2",
            0x06 => "MBC2+BATTERY",
            0x08 => "ROM+RAM",
            0x09 => "ROM+RAM+BATTERY",
            0x0F => "MBC3+TIMER+BATTERY",
            0x10 => "MBC3+TIMER+RAM+BATTERY",
            0x11 => "MBC3",
            0x12 => "MBC3+RAM",
            0x13 => "MBC3+RAM+BATTERY",
            0x19 => "MBC5",
            0x1A => "MBC5+RAM",
            0x1B => "MBC5+RAM+BATTERY",
            0x1C => "MBC5+RUMBLE",
            0x1D => "MBC5+RUMBLE+RAM",
            0x1E => "MBC5+RUMBLE+RAM+BATTERY",
            _ => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RtcRegisters {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub days: u16,
    pub halt: bool,
    pub carry: bool,
}

impl RtcRegisters {
    /// One second with carry into the larger units. Each field counts within
    /// its bit width, so a value software parked past the wrap point runs up
    /// to the width limit and rolls to 0 without carrying.
    fn tick(&mut self) {
        self.seconds = (self.seconds + 1) & 0x3F;
        if self.seconds != 60 {
            return;
        }
        self.seconds = 0;
        self.minutes = (self.minutes + 1) & 0x3F;
        if self.minutes != 60 {
            return;
        }
        self.minutes = 0;
        self.hours = (self.hours + 1) & 0x1F;
        if self.hours != 24 {
            return;
        }
        self.hours = 0;
        self.days = (self.days + 1) & 0x01FF;
        if self.days == 0 {
            self.carry = true;
        }
    }

    fn control_byte(&self) -> u8 {
        let mut out = ((self.days >> 8) as u8) & 0x01;
        if self.halt {
            out |= 0x40;
        }
        if self.carry {
            out |= 0x80;
        }
        out
    }

    fn read(&self, reg: u8) -> u8 {
        match reg {
            0x08 => self.seconds & 0x3F,
            0x09 => self.minutes & 0x3F,
            0x0A => self.hours & 0x1F,
            0x0B => (self.days & 0x00FF) as u8,
            0x0C => self.control_byte(),
            _ => 0xFF,
        }
    }
}

/// MBC3 real-time clock.
///
/// `regs` always counts. `latched` holds the snapshot taken by the last latch
/// sequence; reads come from it once one exists.
#[derive(Debug, Clone, Default)]
pub struct Rtc {
    regs: RtcRegisters,
    latched: Option<RtcRegisters>,
    subsecond_cycles: u32,
}

impl Rtc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> RtcRegisters {
        self.regs
    }

    pub fn latched(&self) -> Option<RtcRegisters> {
        self.latched
    }

    pub fn latch(&mut self) {
        self.latched = Some(self.regs);
    }

    pub fn read_register(&self, reg: u8) -> u8 {
        self.latched.as_ref().unwrap_or(&self.regs).read(reg)
    }

    /// Writes a live register. While halted only the control register accepts
    /// writes, so the halt bit can always be cleared again.
    pub fn write_register(&mut self, reg: u8, value: u8) {
        if self.regs.halt && reg != 0x0C {
            return;
        }
        match reg {
            0x08 => {
                self.regs.seconds = value & 0x3F;
                self.subsecond_cycles = 0;
            }
            0x09 => {
                self.regs.minutes = value & 0x3F;
            }
            0x0A => {
                self.regs.hours = value & 0x1F;
            }
            0x0B => {
                self.regs.days = (self.regs.days & 0x0100) | value as u16;
            }
            0x0C => {
                self.regs.days = (self.regs.days & 0x00FF) | (((value & 0x01) as u16) << 8);
                self.regs.halt = value & 0x40 != 0;
                self.regs.carry = value & 0x80 != 0;
            }
            _ => {}
        }
    }

    /// Advances the live clock by `cycles` cartridge-crystal cycles.
    pub fn step(&mut self, cycles: u64) {
        if self.regs.halt {
            return;
        }
        let total = self.subsecond_cycles as u64 + cycles;
        self.subsecond_cycles = (total % RTC_CYCLES_PER_SECOND as u64) as u32;
        for _ in 0..total / RTC_CYCLES_PER_SECOND as u64 {
            self.regs.tick();
        }
    }
}

#[derive(Debug)]
enum MbcState {
    NoMbc,
    Mbc1 {
        rom_bank: u8,
        ram_bank: u8,
        mode: u8,
        ram_enable: bool,
    },
    Mbc2 {
        rom_bank: u8,
        ram_enable: bool,
    },
    Mbc3 {
        rom_bank: u8,
        ram_bank: u8,
        ram_enable: bool,
        rtc: Option<Rtc>,
        latch_armed: bool,
    },
    Mbc5 {
        rom_bank: u16,
        ram_bank: u8,
        ram_enable: bool,
        rumble: bool,
    },
}

impl MbcState {
    fn power_on(mbc: MbcType, has_rtc: bool, has_rumble: bool) -> Self {
        match mbc {
            MbcType::NoMbc => MbcState::NoMbc,
            MbcType::Mbc1 => MbcState::Mbc1 {
                rom_bank: 1,
                ram_bank: 0,
                mode: 0,
                ram_enable: false,
            },
            MbcType::Mbc2 => MbcState::Mbc2 {
                rom_bank: 1,
                ram_enable: false,
            },
            MbcType::Mbc3 => MbcState::Mbc3 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
                rtc: has_rtc.then(Rtc::new),
                latch_armed: false,
            },
            MbcType::Mbc5 => MbcState::Mbc5 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
                rumble: has_rumble,
            },
        }
    }
}

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub mbc: MbcType,
    pub cgb: bool,
    pub title: String,
    cart_type: u8,
    rom_banks: usize,
    ram_banks: usize,
    mbc_state: MbcState,
}

impl Cartridge {
    /// Loads an image, logging header problems instead of rejecting them.
    pub fn load(data: Vec<u8>) -> Result<Self, LoadError> {
        Self::from_image(data, false)
    }

    /// Loads an image, rejecting a bad boot logo or header checksum.
    pub fn load_strict(data: Vec<u8>) -> Result<Self, LoadError> {
        Self::from_image(data, true)
    }

    fn from_image(mut data: Vec<u8>, strict: bool) -> Result<Self, LoadError> {
        if data.len() > MAX_ROM_SIZE {
            return Err(LoadError::TooLarge {
                len: data.len(),
                max: MAX_ROM_SIZE,
            });
        }
        if data.len() < HEADER_END {
            return Err(LoadError::TooSmall { len: data.len() });
        }

        let header = Header::parse(&data);
        check_header(&header, strict)?;

        let cart_type = header.cart_type();
        let info = type_info(cart_type);
        let has_rtc = header.has_rtc();
        let has_rumble = header.has_rumble();
        let cgb = header.cgb_supported();
        let title = header.title();

        let image_banks = data.len().div_ceil(ROM_BANK_SIZE).next_power_of_two().max(2);
        let rom_banks = header
            .declared_rom_banks()
            .unwrap_or(image_banks)
            .min(info.max_rom_banks);
        if rom_banks != image_banks {
            warn!(
                "ROM size byte declares {rom_banks} banks but image holds {image_banks}",
            );
        }

        let ram_size = match info.mbc {
            MbcType::Mbc2 => MBC2_RAM_SIZE,
            _ => match header.declared_ram_size() {
                Some(0) | None => info.default_ram_banks * RAM_BANK_SIZE,
                Some(size) => size,
            },
        };
        let ram_banks = ram_size.div_ceil(RAM_BANK_SIZE);

        let padded = rom_banks * ROM_BANK_SIZE;
        if data.len() < padded {
            data.resize(padded, 0xFF);
        }

        let mbc_state = MbcState::power_on(info.mbc, has_rtc, has_rumble);
        info!(
            "Loaded ROM: {} ({}, {} ROM banks, {} RAM banks, CGB: {})",
            title,
            Header::parse(&data).controller_name(),
            rom_banks,
            ram_banks,
            if cgb { "yes" } else { "no" }
        );

        Ok(Self {
            rom: data,
            ram: vec![0; ram_size],
            mbc: info.mbc,
            cgb,
            title,
            cart_type,
            rom_banks,
            ram_banks,
            mbc_state,
        })
    }

    pub fn header(&self) -> Header<'_> {
        Header::parse(&self.rom)
    }

    pub fn rom_bank_count(&self) -> usize {
        self.rom_banks
    }

    pub fn ram_bank_count(&self) -> usize {
        self.ram_banks
    }

    /// Returns the controller registers to their power-on values. External RAM
    /// and the RTC counters are battery backed and survive.
    pub fn reset(&mut self) {
        let rtc = self.rtc().cloned();
        let header = self.header();
        self.mbc_state = MbcState::power_on(self.mbc, header.has_rtc(), header.has_rumble());
        if let (Some(slot), Some(mut saved)) = (self.rtc_mut(), rtc) {
            saved.latched = None;
            *slot = saved;
        }
    }

    pub fn step_rtc(&mut self, cpu_cycles: u32) {
        if let Some(rtc) = self.rtc_mut() {
            rtc.step(cpu_cycles as u64);
        }
    }

    pub fn rtc(&self) -> Option<&Rtc> {
        match &self.mbc_state {
            MbcState::Mbc3 { rtc: Some(rtc), .. } => Some(rtc),
            _ => None,
        }
    }

    fn rtc_mut(&mut self) -> Option<&mut Rtc> {
        match &mut self.mbc_state {
            MbcState::Mbc3 { rtc: Some(rtc), .. } => Some(rtc),
            _ => None,
        }
    }

    /// Bank currently mapped at 0x4000-0x7FFF.
    pub fn rom_bank(&self) -> usize {
        self.switchable_rom_bank()
    }

    pub fn ram_enabled(&self) -> bool {
        match &self.mbc_state {
            MbcState::NoMbc => !self.ram.is_empty(),
            MbcState::Mbc1 { ram_enable, .. }
            | MbcState::Mbc2 { ram_enable, .. }
            | MbcState::Mbc3 { ram_enable, .. }
            | MbcState::Mbc5 { ram_enable, .. } => *ram_enable,
        }
    }

    fn fixed_rom_bank(&self) -> usize {
        match &self.mbc_state {
            MbcState::Mbc1 { ram_bank, mode, .. } if *mode == 1 => {
                (((*ram_bank as usize) & 0x03) << 5) % self.rom_banks
            }
            _ => 0,
        }
    }

    fn switchable_rom_bank(&self) -> usize {
        let bank = match &self.mbc_state {
            MbcState::NoMbc => 1,
            MbcState::Mbc1 {
                rom_bank, ram_bank, ..
            } => {
                let high = ((*ram_bank as usize) & 0x03) << 5;
                let mut bank = high | (*rom_bank as usize & 0x1F);
                if bank & 0x1F == 0 {
                    bank += 1;
                }
                bank
            }
            MbcState::Mbc2 { rom_bank, .. } => match (*rom_bank & 0x0F) as usize {
                0 => 1,
                n => n,
            },
            MbcState::Mbc3 { rom_bank, .. } => match (*rom_bank & 0x7F) as usize {
                0 => 1,
                n => n,
            },
            MbcState::Mbc5 { rom_bank, .. } => (*rom_bank & 0x01FF) as usize,
        };
        bank % self.rom_banks
    }

    fn rom_byte(&self, bank: usize, offset: usize) -> u8 {
        self.rom
            .get(bank * ROM_BANK_SIZE + offset)
            .copied()
            .unwrap_or(0xFF)
    }

    fn ram_index(&self, bank: usize, addr: u16) -> Option<usize> {
        if self.ram_banks == 0 {
            return None;
        }
        let idx = (bank % self.ram_banks) * RAM_BANK_SIZE + (addr as usize - 0xA000);
        (idx < self.ram.len()).then_some(idx)
    }

    pub fn read(&self, addr: u16) -> u8 {
        match (&self.mbc_state, addr) {
            (_, 0x0000..=0x3FFF) => self.rom_byte(self.fixed_rom_bank(), addr as usize),
            (_, 0x4000..=0x7FFF) => {
                self.rom_byte(self.switchable_rom_bank(), addr as usize - 0x4000)
            }
            (MbcState::NoMbc, 0xA000..=0xBFFF) => self
                .ram_index(0, addr)
                .map(|i| self.ram[i])
                .unwrap_or(0xFF),
            (MbcState::Mbc1 { ram_enable: false, .. }, 0xA000..=0xBFFF)
            | (MbcState::Mbc2 { ram_enable: false, .. }, 0xA000..=0xBFFF)
            | (MbcState::Mbc3 { ram_enable: false, .. }, 0xA000..=0xBFFF)
            | (MbcState::Mbc5 { ram_enable: false, .. }, 0xA000..=0xBFFF) => 0xFF,
            (MbcState::Mbc1 { ram_bank, mode, .. }, 0xA000..=0xBFFF) => {
                let bank = if *mode == 0 { 0 } else { *ram_bank as usize };
                self.ram_index(bank, addr)
                    .map(|i| self.ram[i])
                    .unwrap_or(0xFF)
            }
            (MbcState::Mbc2 { .. }, 0xA000..=0xBFFF) => {
                // 512 x 4-bit built-in RAM, mirrored across the window.
                let idx = (addr as usize - 0xA000) & 0x01FF;
                let nibble = self.ram.get(idx).copied().unwrap_or(0x0F) & 0x0F;
                0xF0 | nibble
            }
            (MbcState::Mbc3 { ram_bank, rtc, .. }, 0xA000..=0xBFFF) => match *ram_bank {
                0x00..=0x03 => self
                    .ram_index(*ram_bank as usize, addr)
                    .map(|i| self.ram[i])
                    .unwrap_or(0xFF),
                0x08..=0x0C => rtc
                    .as_ref()
                    .map(|r| r.read_register(*ram_bank))
                    .unwrap_or(0xFF),
                _ => 0xFF,
            },
            (MbcState::Mbc5 { ram_bank, .. }, 0xA000..=0xBFFF) => self
                .ram_index(*ram_bank as usize, addr)
                .map(|i| self.ram[i])
                .unwrap_or(0xFF),
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match (&mut self.mbc_state, addr) {
            (MbcState::NoMbc, 0xA000..=0xBFFF) => {
                if let Some(idx) = self.ram_index(0, addr) {
                    self.ram[idx] = val;
                }
            }
            (
                MbcState::Mbc2 {
                    rom_bank,
                    ram_enable,
                },
                0x0000..=0x3FFF,
            ) => {
                // Address bit 8 picks the register: clear for RAM enable, set
                // for ROM bank.
                if (addr & 0x0100) == 0 {
                    *ram_enable = val & 0x0F == 0x0A;
                } else {
                    *rom_bank = val & 0x0F;
                    if *rom_bank == 0 {
                        *rom_bank = 1;
                    }
                }
            }
            (MbcState::Mbc2 { ram_enable, .. }, 0xA000..=0xBFFF) => {
                if *ram_enable {
                    let idx = (addr as usize - 0xA000) & 0x01FF;
                    if let Some(b) = self.ram.get_mut(idx) {
                        *b = val & 0x0F;
                    }
                }
            }
            (MbcState::Mbc1 { ram_enable, .. }, 0x0000..=0x1FFF)
            | (MbcState::Mbc3 { ram_enable, .. }, 0x0000..=0x1FFF)
            | (MbcState::Mbc5 { ram_enable, .. }, 0x0000..=0x1FFF) => {
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
            (MbcState::Mbc1 { mode, .. }, 0x6000..=0x7FFF) => {
                *mode = val & 0x01;
            }
            (
                MbcState::Mbc1 {
                    ram_enable: true,
                    ram_bank,
                    mode,
                    ..
                },
                0xA000..=0xBFFF,
            ) => {
                let bank = if *mode == 0 { 0 } else { *ram_bank as usize };
                if let Some(idx) = self.ram_index(bank, addr) {
                    self.ram[idx] = val;
                }
            }
            (MbcState::Mbc3 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x7F;
                if *rom_bank == 0 {
                    *rom_bank = 1;
                }
            }
            (MbcState::Mbc3 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                *ram_bank = val;
            }
            (
                MbcState::Mbc3 {
                    latch_armed, rtc, ..
                },
                0x6000..=0x7FFF,
            ) => {
                if val == 0x01 {
                    *latch_armed = true;
                } else {
                    if val == 0x00
                        && *latch_armed
                        && let Some(rtc) = rtc
                    {
                        rtc.latch();
                    }
                    *latch_armed = false;
                }
            }
            (
                MbcState::Mbc3 {
                    ram_enable: true,
                    ram_bank,
                    rtc,
                    ..
                },
                0xA000..=0xBFFF,
            ) => {
                let bank = *ram_bank;
                match bank {
                    0x00..=0x03 => {
                        if let Some(idx) = self.ram_index(bank as usize, addr) {
                            self.ram[idx] = val;
                        }
                    }
                    0x08..=0x0C => {
                        if let Some(rtc) = rtc.as_mut() {
                            rtc.write_register(bank, val);
                        }
                    }
                    _ => {}
                }
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x2000..=0x2FFF) => {
                *rom_bank = (*rom_bank & 0x100) | val as u16;
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x3000..=0x3FFF) => {
                *rom_bank = (*rom_bank & 0xFF) | (((val & 0x01) as u16) << 8);
            }
            (MbcState::Mbc5 { ram_bank, rumble, .. }, 0x4000..=0x5FFF) => {
                // Bit 3 drives the rumble motor on rumble carts.
                *ram_bank = if *rumble { val & 0x07 } else { val & 0x0F };
            }
            (
                MbcState::Mbc5 {
                    ram_enable: true,
                    ram_bank,
                    ..
                },
                0xA000..=0xBFFF,
            ) => {
                let bank = *ram_bank as usize;
                if let Some(idx) = self.ram_index(bank, addr) {
                    self.ram[idx] = val;
                }
            }
            _ => {}
        }
        if (0x2000..=0x3FFF).contains(&addr) && !matches!(self.mbc_state, MbcState::NoMbc) {
            debug!("ROM bank {} mapped at 0x4000", self.switchable_rom_bank());
        }
    }

    pub fn cart_type(&self) -> u8 {
        self.cart_type
    }
}

fn check_header(header: &Header<'_>, strict: bool) -> Result<(), LoadError> {
    if !header.logo_valid() {
        if strict {
            return Err(LoadError::BadLogo);
        }
        warn!("Cartridge boot logo does not match");
    }

    let expected = header.header_checksum();
    let computed = header.computed_checksum();
    if expected != computed {
        if strict {
            return Err(LoadError::BadHeaderChecksum { expected, computed });
        }
        warn!("Header checksum mismatch: header {expected:#04X}, computed {computed:#04X}");
    }
    Ok(())
}
