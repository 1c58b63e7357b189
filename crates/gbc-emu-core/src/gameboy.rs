use log::info;

use crate::{
    apu::DEFAULT_BUFFER_LEN,
    cartridge::Cartridge,
    cpu::Cpu,
    error::{ExecError, LoadError},
    hardware::{CYCLES_PER_FRAME, Model, ModelPreference, SCREEN_HEIGHT, SCREEN_WIDTH},
    mmu::Mmu,
};

/// Settings fixed for the lifetime of a [`GameBoy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub model: ModelPreference,
    /// Reject images whose boot logo or header checksum is wrong.
    pub strict_header: bool,
    /// Mixed samples kept before the oldest are dropped.
    pub sample_buffer_len: usize,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            model: ModelPreference::Auto,
            strict_header: false,
            sample_buffer_len: DEFAULT_BUFFER_LEN,
        }
    }
}

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    config: EmulatorConfig,
    model: Model,
    frames: u64,
    total_cycles: u64,
}

impl GameBoy {
    pub fn new() -> Self {
        Self::with_config(EmulatorConfig::default())
    }

    pub fn with_config(config: EmulatorConfig) -> Self {
        let model = config.model.resolve(false);
        let cgb = model.is_cgb();
        Self {
            cpu: Cpu::new_with_mode(cgb),
            mmu: Mmu::new_with_config(cgb, config.sample_buffer_len),
            config,
            model,
            frames: 0,
            total_cycles: 0,
        }
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Parses `data` as a cartridge image and powers the machine on with it.
    /// The previous cartridge, if any, is discarded.
    pub fn load_image(&mut self, data: &[u8]) -> Result<(), LoadError> {
        let cart = if self.config.strict_header {
            Cartridge::load_strict(data.to_vec())?
        } else {
            Cartridge::load(data.to_vec())?
        };
        self.model = self.config.model.resolve(cart.cgb);
        info!("Running in {:?} mode", self.model);
        self.power_on(Some(cart));
        Ok(())
    }

    fn power_on(&mut self, cart: Option<Cartridge>) {
        let cgb = self.model.is_cgb();
        self.cpu = Cpu::new_with_mode(cgb);
        self.mmu = Mmu::new_with_config(cgb, self.config.sample_buffer_len);
        if let Some(cart) = cart {
            self.mmu.load_cart(cart);
        }
        self.frames = 0;
        self.total_cycles = 0;
    }

    /// Returns every component to its post-boot state with the same cartridge
    /// inserted. Battery backed RAM and the RTC keep their contents.
    pub fn reset(&mut self) {
        let mut cart = self.mmu.cart.take();
        if let Some(cart) = cart.as_mut() {
            cart.reset();
        }
        self.power_on(cart);
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.mmu.cart.as_ref()
    }

    /// Runs one instruction, advances the other units by the cycles it took,
    /// then services interrupts. A halted CPU that wakes with IME set
    /// dispatches in the same call.
    pub fn step_instruction(&mut self) -> Result<u32, ExecError> {
        let mut cycles = self.cpu.step(&mut self.mmu)?;
        self.mmu.tick(cycles);

        let irq = self.cpu.handle_interrupts(&mut self.mmu);
        if irq > 0 {
            self.mmu.tick(irq);
            cycles += irq;
        }

        self.total_cycles += cycles as u64;
        Ok(cycles)
    }

    /// Steps until the PPU finishes a frame. With the LCD off no frame is ever
    /// produced, so this returns after one frame's worth of cycles instead.
    pub fn step_frame(&mut self) -> Result<(), ExecError> {
        self.mmu.ppu.clear_frame_flag();
        let mut elapsed = 0u32;
        while !self.mmu.ppu.frame_ready() {
            elapsed += self.step_instruction()?;
            if elapsed >= CYCLES_PER_FRAME && !self.mmu.ppu.lcd_enabled() {
                break;
            }
        }
        self.frames += 1;
        Ok(())
    }

    /// Runs for at least `cycles` T-cycles.
    pub fn run_cycles(&mut self, cycles: u64) -> Result<(), ExecError> {
        let target = self.total_cycles + cycles;
        while self.total_cycles < target {
            self.step_instruction()?;
        }
        Ok(())
    }

    /// The last completed frame as 0x00RRGGBB pixels, row major.
    pub fn frame_buffer(&self) -> &[u32; SCREEN_WIDTH * SCREEN_HEIGHT] {
        self.mmu.ppu.framebuffer()
    }

    /// Drains the mixed audio samples produced since the last call.
    pub fn take_audio_buffer(&mut self) -> Vec<f32> {
        self.mmu.apu.take_samples()
    }

    /// Frames completed through [`GameBoy::step_frame`] since power on.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{HALT_CYCLES, INTERRUPT_CYCLES};

    fn with_code(code: &[u8]) -> GameBoy {
        let mut gb = GameBoy::new();
        for (i, b) in code.iter().enumerate() {
            gb.mmu.write_byte(0xC000 + i as u16, *b);
        }
        gb.cpu.pc = 0xC000;
        gb.mmu.if_reg = 0;
        gb
    }

    #[test]
    fn halt_wake_with_ime_services_in_same_step() {
        let mut gb = with_code(&[0x76, 0x00]);
        gb.cpu.ime = true;
        gb.mmu.ie_reg = 0x04;
        assert_eq!(gb.step_instruction().unwrap(), 4);
        assert!(gb.cpu.halted);

        gb.mmu.if_reg |= 0x04;
        let cycles = gb.step_instruction().unwrap();
        assert_eq!(cycles, HALT_CYCLES + INTERRUPT_CYCLES);
        assert!(!gb.cpu.halted);
        assert_eq!(gb.cpu.pc, 0x0050);
        assert_eq!(gb.mmu.read_word(gb.cpu.sp), 0xC001);
        assert_eq!(gb.mmu.if_reg & 0x04, 0);
    }

    #[test]
    fn halt_wake_without_ime_resumes_next_step() {
        let mut gb = with_code(&[0x76, 0x00, 0x00]);
        gb.mmu.ie_reg = 0x04;
        gb.step_instruction().unwrap();
        assert!(gb.cpu.halted);

        gb.mmu.if_reg |= 0x04;
        assert_eq!(gb.step_instruction().unwrap(), HALT_CYCLES);
        assert!(!gb.cpu.halted);
        assert_eq!(gb.cpu.pc, 0xC001);

        gb.step_instruction().unwrap();
        assert_eq!(gb.cpu.pc, 0xC002);
        assert_eq!(gb.mmu.if_reg & 0x04, 0x04);
    }

    #[test]
    fn force_cgb_applies_before_any_image() {
        let gb = GameBoy::with_config(EmulatorConfig {
            model: ModelPreference::ForceCgb,
            ..EmulatorConfig::default()
        });
        assert_eq!(gb.model(), Model::Cgb);
        assert_eq!(gb.cpu.a, 0x11);
        assert!(gb.mmu.is_cgb());
    }

    #[test]
    fn lcd_off_frame_is_bounded() {
        let mut gb = with_code(&[0x18, 0xFE]);
        gb.mmu.write_byte(0xFF40, 0x00);
        gb.step_frame().unwrap();
        assert_eq!(gb.frames(), 1);
        assert!(gb.total_cycles() >= CYCLES_PER_FRAME as u64);
        assert!(gb.total_cycles() < 2 * CYCLES_PER_FRAME as u64);
    }
}
