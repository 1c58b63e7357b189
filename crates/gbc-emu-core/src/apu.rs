use std::collections::VecDeque;

#[cfg(feature = "apu-trace")]
macro_rules! apu_trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*);
    };
}
#[cfg(not(feature = "apu-trace"))]
macro_rules! apu_trace {
    ($($arg:tt)*) => {};
}

// 512 Hz frame sequencer tick
pub const FRAME_SEQUENCER_PERIOD: u32 = 8192;

/// One mixed sample every 95 cycles, about 44.1 kHz.
pub const CYCLES_PER_SAMPLE: u32 = 95;

pub const DEFAULT_BUFFER_LEN: usize = 4096;

// Register values left behind by the boot ROM, NR10 through NR52.
const POWER_ON_REGS: [u8; 0x17] = [
    0x80, 0xBF, 0xF3, 0xFF, 0xBF, 0xFF, 0x3F, 0x00, 0xFF, 0xBF, 0x7F, 0xFF, 0x9F, 0xFF, 0xBF, 0xFF,
    0xFF, 0x00, 0x00, 0xBF, 0x77, 0xF3, 0xF1,
];

// Duty table for pulse channels (CH1, CH2). Each entry is an 8-step
// waveform. Index (0..3) corresponds to duty selector in NRx1:
// 0 -> 00000001 (12.5%)
// 1 -> 10000001 (25%)
// 2 -> 10000111 (50%)
// 3 -> 01111110 (75%)
const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 0],
];

/// Capabilities every sound channel exposes to the mixer and the frame
/// sequencer.
pub trait SoundChannel {
    /// Advances the frequency timer by `cycles` T-cycles.
    fn step(&mut self, cycles: u32);
    /// Current digital output level, 0-15.
    fn output(&self) -> u8;
    fn clock_length(&mut self);
    fn clock_envelope(&mut self) {}
    fn enabled(&self) -> bool;
}

#[derive(Default, Clone, Copy, Debug)]
struct Envelope {
    initial: u8,
    period: u8,
    add: bool,
    volume: u8,
    timer: u8,
}

impl Envelope {
    fn write(&mut self, val: u8) {
        self.initial = val >> 4;
        self.period = val & 0x07;
        self.add = val & 0x08 != 0;
    }

    fn trigger(&mut self) {
        self.volume = self.initial;
        self.timer = self.period;
    }

    // A period of 0 leaves the volume fixed.
    fn clock(&mut self) {
        if self.period == 0 {
            return;
        }
        self.timer = self.timer.saturating_sub(1);
        if self.timer == 0 {
            self.timer = self.period;
            if self.add && self.volume < 15 {
                self.volume += 1;
            } else if !self.add && self.volume > 0 {
                self.volume -= 1;
            }
        }
    }
}

#[derive(Default, Clone, Copy, Debug)]
struct Sweep {
    period: u8,
    negate: bool,
    shift: u8,
    timer: u8,
    shadow: u16,
    enabled: bool,
}

impl Sweep {
    fn calculate(&self) -> u16 {
        let delta = self.shadow >> self.shift;
        if self.negate {
            self.shadow.wrapping_sub(delta)
        } else {
            self.shadow.wrapping_add(delta)
        }
    }

    fn write(&mut self, val: u8) {
        self.period = (val >> 4) & 0x07;
        self.negate = val & 0x08 != 0;
        self.shift = val & 0x07;
    }

    fn reload(&mut self, freq: u16) {
        self.shadow = freq;
        self.timer = self.period;
        self.enabled = self.period != 0 || self.shift != 0;
    }
}

#[derive(Default, Debug)]
pub struct SquareChannel {
    enabled: bool,
    dac_enabled: bool,
    length: u8,
    length_enable: bool,
    duty: u8,
    duty_pos: u8,
    frequency: u16,
    timer: u32,
    envelope: Envelope,
    sweep: Option<Sweep>,
}

impl SquareChannel {
    fn new(with_sweep: bool) -> Self {
        Self {
            sweep: with_sweep.then(Sweep::default),
            ..Default::default()
        }
    }

    fn period(&self) -> u32 {
        (2048 - self.frequency as u32) * 4
    }

    fn write_length(&mut self, val: u8) {
        self.duty = val >> 6;
        self.length = 64 - (val & 0x3F);
    }

    fn write_envelope(&mut self, val: u8) {
        self.envelope.write(val);
        self.dac_enabled = val & 0xF8 != 0;
        if !self.dac_enabled {
            self.enabled = false;
        }
    }

    fn write_frequency_low(&mut self, value: u8) {
        self.frequency = (self.frequency & 0x700) | value as u16;
    }

    fn write_frequency_high(&mut self, value: u8) {
        self.frequency = (self.frequency & 0xFF) | (((value & 0x07) as u16) << 8);
        self.length_enable = value & 0x40 != 0;
        if value & 0x80 != 0 {
            self.trigger();
        }
    }

    fn trigger(&mut self) {
        self.enabled = self.dac_enabled;
        if self.length == 0 {
            self.length = 64;
        }
        self.timer = self.period();
        self.envelope.trigger();
        let freq = self.frequency;
        if let Some(sweep) = self.sweep.as_mut() {
            sweep.reload(freq);
            if sweep.shift != 0 && sweep.calculate() > 2047 {
                self.enabled = false;
            }
        }
    }

    fn clock_sweep(&mut self) {
        let Some(sweep) = self.sweep.as_mut() else {
            return;
        };
        if !sweep.enabled || sweep.period == 0 {
            return;
        }
        sweep.timer = sweep.timer.saturating_sub(1);
        if sweep.timer > 0 {
            return;
        }
        sweep.timer = sweep.period;
        let new_freq = sweep.calculate();
        if new_freq > 2047 {
            self.enabled = false;
            sweep.enabled = false;
        } else if sweep.shift != 0 {
            sweep.shadow = new_freq;
            self.frequency = new_freq;
            apu_trace!("sweep -> {:#05X}", new_freq);
        }
    }
}

impl SoundChannel for SquareChannel {
    fn step(&mut self, cycles: u32) {
        if !self.enabled {
            return;
        }
        let mut cycles = cycles;
        while self.timer <= cycles {
            cycles -= self.timer;
            self.timer = self.period();
            self.duty_pos = (self.duty_pos + 1) & 7;
        }
        self.timer -= cycles;
    }

    fn output(&self) -> u8 {
        if !self.enabled {
            return 0;
        }
        DUTY_TABLE[self.duty as usize][self.duty_pos as usize] * self.envelope.volume
    }

    fn clock_length(&mut self) {
        if self.length_enable && self.length > 0 {
            self.length -= 1;
            if self.length == 0 {
                self.enabled = false;
            }
        }
    }

    fn clock_envelope(&mut self) {
        if self.enabled {
            self.envelope.clock();
        }
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[derive(Default, Debug)]
pub struct WaveChannel {
    enabled: bool,
    dac_enabled: bool,
    length: u16,
    length_enable: bool,
    volume: u8,
    position: u8,
    frequency: u16,
    timer: u32,
    wave_ram: [u8; 0x10],
}

impl WaveChannel {
    fn period(&self) -> u32 {
        (2048 - self.frequency as u32) * 2
    }

    fn sample(&self) -> u8 {
        let byte = self.wave_ram[(self.position / 2) as usize];
        if self.position & 1 == 0 {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    fn write_frequency_high(&mut self, value: u8) {
        self.frequency = (self.frequency & 0xFF) | (((value & 0x07) as u16) << 8);
        self.length_enable = value & 0x40 != 0;
        if value & 0x80 != 0 {
            self.enabled = self.dac_enabled;
            self.position = 0;
            self.timer = self.period();
            if self.length == 0 {
                self.length = 256;
            }
        }
    }
}

impl SoundChannel for WaveChannel {
    fn step(&mut self, cycles: u32) {
        if !self.enabled {
            return;
        }
        let mut cycles = cycles;
        while self.timer <= cycles {
            cycles -= self.timer;
            self.timer = self.period();
            self.position = (self.position + 1) & 0x1F;
        }
        self.timer -= cycles;
    }

    fn output(&self) -> u8 {
        if !self.enabled {
            return 0;
        }
        match self.volume {
            1 => self.sample(),
            2 => self.sample() >> 1,
            3 => self.sample() >> 2,
            _ => 0,
        }
    }

    fn clock_length(&mut self) {
        if self.length_enable && self.length > 0 {
            self.length -= 1;
            if self.length == 0 {
                self.enabled = false;
            }
        }
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[derive(Default, Debug)]
pub struct NoiseChannel {
    enabled: bool,
    dac_enabled: bool,
    length: u8,
    length_enable: bool,
    envelope: Envelope,
    clock_shift: u8,
    divisor: u8,
    width7: bool,
    lfsr: u16,
    timer: u32,
}

impl NoiseChannel {
    fn period(&self) -> u32 {
        let r = match self.divisor {
            0 => 8,
            d => d as u32 * 16,
        };
        r << self.clock_shift
    }

    fn write_polynomial(&mut self, val: u8) {
        self.clock_shift = val >> 4;
        self.width7 = val & 0x08 != 0;
        self.divisor = val & 0x07;
    }

    fn write_control(&mut self, value: u8) {
        self.length_enable = value & 0x40 != 0;
        if value & 0x80 != 0 {
            self.enabled = self.dac_enabled;
            self.lfsr = 0;
            self.timer = self.period();
            self.envelope.trigger();
            if self.length == 0 {
                self.length = 64;
            }
        }
    }
}

impl SoundChannel for NoiseChannel {
    fn step(&mut self, cycles: u32) {
        if !self.enabled || self.clock_shift >= 14 {
            return;
        }
        let mut cycles = cycles;
        while self.timer <= cycles {
            cycles -= self.timer;
            self.timer = self.period();
            // XNOR feedback of the two low bits, so a cleared register runs.
            let bit = !(self.lfsr ^ (self.lfsr >> 1)) & 1;
            self.lfsr >>= 1;
            self.lfsr |= bit << 14;
            if self.width7 {
                self.lfsr = (self.lfsr & !0x40) | (bit << 6);
            }
        }
        self.timer -= cycles;
    }

    fn output(&self) -> u8 {
        if !self.enabled {
            return 0;
        }
        if self.lfsr & 1 == 0 {
            self.envelope.volume
        } else {
            0
        }
    }

    fn clock_length(&mut self) {
        if self.length_enable && self.length > 0 {
            self.length -= 1;
            if self.length == 0 {
                self.enabled = false;
            }
        }
    }

    fn clock_envelope(&mut self) {
        if self.enabled {
            self.envelope.clock();
        }
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

struct FrameSequencer {
    step: u8,
    counter: u32,
}

impl FrameSequencer {
    fn new() -> Self {
        Self { step: 0, counter: 0 }
    }

    fn advance(&mut self) -> u8 {
        let s = self.step;
        self.step = (self.step + 1) & 7;
        s
    }
}

/// Bounded ring of mixed samples. Once full the oldest sample is dropped.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, s: f32) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(s);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn drain(&mut self) -> Vec<f32> {
        self.samples.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

pub struct Apu {
    ch1: SquareChannel,
    ch2: SquareChannel,
    ch3: WaveChannel,
    ch4: NoiseChannel,
    /// Raw register values for NR10-NR51, readback goes through `read_mask`.
    regs: [u8; 0x16],
    nr52: u8,
    sequencer: FrameSequencer,
    sample_counter: u32,
    samples: SampleBuffer,
}

impl Apu {
    pub fn new() -> Self {
        Self::with_buffer_len(DEFAULT_BUFFER_LEN)
    }

    pub fn with_buffer_len(len: usize) -> Self {
        Self {
            ch1: SquareChannel::new(true),
            ch2: SquareChannel::new(false),
            ch3: WaveChannel::default(),
            ch4: NoiseChannel::default(),
            regs: [0; 0x16],
            nr52: 0,
            sequencer: FrameSequencer::new(),
            sample_counter: 0,
            samples: SampleBuffer::new(len),
        }
    }

    /// Load the register state the boot ROM leaves behind. No channel is left
    /// running.
    pub fn apply_boot_state(&mut self) {
        self.write_reg(0xFF26, 0x80);
        for (i, &val) in POWER_ON_REGS[..0x16].iter().enumerate() {
            let addr = 0xFF10 + i as u16;
            // Trigger bits are not replayed.
            let val = if matches!(addr, 0xFF14 | 0xFF19 | 0xFF1E | 0xFF23) {
                val & 0x7F
            } else {
                val
            };
            self.write_reg(addr, val);
        }
        self.ch1.length = 0;
        self.ch2.length = 0;
        self.ch3.length = 0;
        self.ch4.length = 0;
    }

    fn read_mask(addr: u16) -> u8 {
        match addr {
            0xFF10 => 0x80,
            0xFF11 => 0x3F,
            0xFF12 => 0x00,
            0xFF13 => 0xFF,
            0xFF14 => 0xBF,
            0xFF16 => 0x3F,
            0xFF17 => 0x00,
            0xFF18 => 0xFF,
            0xFF19 => 0xBF,
            0xFF1A => 0x7F,
            0xFF1B => 0xFF,
            0xFF1C => 0x9F,
            0xFF1D => 0xFF,
            0xFF1E => 0xBF,
            0xFF20 => 0xFF,
            0xFF21 => 0x00,
            0xFF22 => 0x00,
            0xFF23 => 0xBF,
            0xFF24 => 0x00,
            0xFF25 => 0x00,
            0xFF26 => 0x70,
            0xFF30..=0xFF3F => 0x00,
            _ => 0xFF,
        }
    }

    pub fn enabled(&self) -> bool {
        self.nr52 & 0x80 != 0
    }

    /// Powers the unit on or off, same as writing bit 7 of NR52.
    pub fn set_enabled(&mut self, on: bool) {
        self.write_reg(0xFF26, if on { 0x80 } else { 0x00 });
    }

    fn power_off(&mut self) {
        let wave_ram = self.ch3.wave_ram;
        self.ch1 = SquareChannel::new(true);
        self.ch2 = SquareChannel::new(false);
        self.ch3 = WaveChannel {
            wave_ram,
            ..WaveChannel::default()
        };
        self.ch4 = NoiseChannel::default();
        self.regs.fill(0);
        self.sequencer = FrameSequencer::new();
        self.sample_counter = 0;
    }

    /// NR52 with the live channel-enable bits in the low nibble.
    pub fn nr52(&self) -> u8 {
        let mut val = self.nr52 & 0x80;
        for (bit, ch) in self.channels().iter().enumerate() {
            if ch.enabled() {
                val |= 1 << bit;
            }
        }
        val | Apu::read_mask(0xFF26)
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF26 => self.nr52(),
            0xFF30..=0xFF3F => self.ch3.wave_ram[(addr - 0xFF30) as usize],
            0xFF10..=0xFF25 => self.regs[(addr - 0xFF10) as usize] | Apu::read_mask(addr),
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8) {
        if (0xFF30..=0xFF3F).contains(&addr) {
            self.ch3.wave_ram[(addr - 0xFF30) as usize] = val;
            return;
        }
        if addr == 0xFF26 {
            let was_on = self.enabled();
            self.nr52 = val & 0x80;
            if was_on && !self.enabled() {
                self.power_off();
            }
            return;
        }
        if !self.enabled() || !(0xFF10..=0xFF25).contains(&addr) {
            return;
        }

        self.regs[(addr - 0xFF10) as usize] = val;

        match addr {
            0xFF10 => {
                if let Some(s) = self.ch1.sweep.as_mut() {
                    s.write(val);
                }
            }
            0xFF11 => self.ch1.write_length(val),
            0xFF12 => self.ch1.write_envelope(val),
            0xFF13 => self.ch1.write_frequency_low(val),
            0xFF14 => self.ch1.write_frequency_high(val),
            0xFF16 => self.ch2.write_length(val),
            0xFF17 => self.ch2.write_envelope(val),
            0xFF18 => self.ch2.write_frequency_low(val),
            0xFF19 => self.ch2.write_frequency_high(val),
            0xFF1A => {
                self.ch3.dac_enabled = val & 0x80 != 0;
                if !self.ch3.dac_enabled {
                    self.ch3.enabled = false;
                }
            }
            0xFF1B => self.ch3.length = 256 - val as u16,
            0xFF1C => self.ch3.volume = (val >> 5) & 0x03,
            0xFF1D => self.ch3.frequency = (self.ch3.frequency & 0x700) | val as u16,
            0xFF1E => self.ch3.write_frequency_high(val),
            0xFF20 => self.ch4.length = 64 - (val & 0x3F),
            0xFF21 => {
                self.ch4.envelope.write(val);
                self.ch4.dac_enabled = val & 0xF8 != 0;
                if !self.ch4.dac_enabled {
                    self.ch4.enabled = false;
                }
            }
            0xFF22 => self.ch4.write_polynomial(val),
            0xFF23 => self.ch4.write_control(val),
            _ => {}
        }
        if val & 0x80 != 0 && matches!(addr, 0xFF14 | 0xFF19 | 0xFF1E | 0xFF23) {
            apu_trace!("trigger {:#06X} nr52={:#04X}", addr, self.nr52());
        }
    }

    fn channels(&self) -> [&dyn SoundChannel; 4] {
        [&self.ch1, &self.ch2, &self.ch3, &self.ch4]
    }

    fn channels_mut(&mut self) -> [&mut dyn SoundChannel; 4] {
        [&mut self.ch1, &mut self.ch2, &mut self.ch3, &mut self.ch4]
    }

    fn clock_frame_sequencer(&mut self, step: u8) {
        if matches!(step, 0 | 2 | 4 | 6) {
            for ch in self.channels_mut() {
                ch.clock_length();
            }
        }
        if step == 2 || step == 6 {
            self.ch1.clock_sweep();
        }
        if step == 7 {
            self.ch1.clock_envelope();
            self.ch2.clock_envelope();
            self.ch4.clock_envelope();
        }
    }

    /// Average of the four channel levels, scaled to 0.0-1.0.
    pub fn mix_output(&self) -> f32 {
        let sum: u32 = self.channels().iter().map(|ch| ch.output() as u32).sum();
        sum as f32 / (4.0 * 15.0)
    }

    pub fn step(&mut self, cycles: u32) {
        if !self.enabled() {
            return;
        }

        self.sequencer.counter += cycles;
        while self.sequencer.counter >= FRAME_SEQUENCER_PERIOD {
            self.sequencer.counter -= FRAME_SEQUENCER_PERIOD;
            let step = self.sequencer.advance();
            self.clock_frame_sequencer(step);
        }

        for ch in self.channels_mut() {
            ch.step(cycles);
        }

        self.sample_counter += cycles;
        while self.sample_counter >= CYCLES_PER_SAMPLE {
            self.sample_counter -= CYCLES_PER_SAMPLE;
            let s = self.mix_output();
            self.samples.push(s);
        }
    }

    /// Hands every buffered sample to the caller and empties the buffer.
    pub fn take_samples(&mut self) -> Vec<f32> {
        self.samples.drain()
    }

    pub fn buffered_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn sequencer_step(&self) -> u8 {
        self.sequencer.step
    }

    pub fn ch1_frequency(&self) -> u16 {
        self.ch1.frequency
    }

    pub fn ch1_volume(&self) -> u8 {
        self.ch1.envelope.volume
    }

    pub fn ch1_duty_pos(&self) -> u8 {
        self.ch1.duty_pos
    }

    pub fn ch2_volume(&self) -> u8 {
        self.ch2.envelope.volume
    }

    pub fn ch3_position(&self) -> u8 {
        self.ch3.position
    }

    pub fn ch4_lfsr(&self) -> u16 {
        self.ch4.lfsr
    }

    pub fn ch4_volume(&self) -> u8 {
        self.ch4.envelope.volume
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn powered() -> Apu {
        let mut apu = Apu::new();
        apu.set_enabled(true);
        apu
    }

    #[test]
    fn length_expiry_disables_channel() {
        let mut apu = powered();
        apu.write_reg(0xFF12, 0xF0);
        apu.write_reg(0xFF11, 0x3F); // length 1
        apu.write_reg(0xFF14, 0xC0);
        assert_eq!(apu.nr52() & 0x01, 0x01);
        apu.step(FRAME_SEQUENCER_PERIOD);
        assert_eq!(apu.nr52() & 0x01, 0x00);
    }

    #[test]
    fn envelope_steps_on_sequencer_step_seven() {
        let mut apu = powered();
        apu.write_reg(0xFF17, 0xA1); // volume 10, decrease, period 1
        apu.write_reg(0xFF19, 0x80);
        apu.step(FRAME_SEQUENCER_PERIOD * 7);
        assert_eq!(apu.ch2_volume(), 10);
        apu.step(FRAME_SEQUENCER_PERIOD);
        assert_eq!(apu.ch2_volume(), 9);
    }

    #[test]
    fn envelope_period_zero_holds_volume() {
        let mut apu = powered();
        apu.write_reg(0xFF21, 0x58);
        apu.write_reg(0xFF23, 0x80);
        apu.step(FRAME_SEQUENCER_PERIOD * 32);
        assert_eq!(apu.ch4_volume(), 5);
    }

    #[test]
    fn sweep_overflow_disables_channel_one() {
        let mut apu = powered();
        apu.write_reg(0xFF10, 0x11); // period 1, add, shift 1
        apu.write_reg(0xFF12, 0xF0);
        apu.write_reg(0xFF13, 0x00);
        apu.write_reg(0xFF14, 0x85); // freq 0x500, trigger
        assert!(apu.read_reg(0xFF26) & 0x01 != 0);

        // Sweep clocks on sequencer steps 2 and 6.
        apu.step(FRAME_SEQUENCER_PERIOD * 3);
        assert_eq!(apu.ch1_frequency(), 0x780);
        apu.step(FRAME_SEQUENCER_PERIOD * 4);
        assert_eq!(apu.read_reg(0xFF26) & 0x01, 0);
    }

    #[test]
    fn sweep_with_zero_shift_keeps_frequency() {
        let mut apu = powered();
        apu.write_reg(0xFF10, 0x10); // period 1, add, shift 0
        apu.write_reg(0xFF12, 0xF0);
        apu.write_reg(0xFF13, 0x00);
        apu.write_reg(0xFF14, 0x83); // freq 0x300, trigger

        apu.step(FRAME_SEQUENCER_PERIOD * 7);
        assert_eq!(apu.ch1_frequency(), 0x300);
        assert!(apu.read_reg(0xFF26) & 0x01 != 0);
    }

    #[test]
    fn pulse_duty_advances_with_frequency_timer() {
        let mut apu = powered();
        apu.write_reg(0xFF12, 0xF0);
        apu.write_reg(0xFF13, 0x00);
        apu.write_reg(0xFF14, 0x87); // freq 0x700, period (2048-1792)*4 = 1024
        apu.step(1024 * 3);
        assert_eq!(apu.ch1_duty_pos(), 3);
    }

    #[test]
    fn wave_position_wraps_at_32() {
        let mut apu = powered();
        apu.write_reg(0xFF1A, 0x80);
        apu.write_reg(0xFF1D, 0xFF);
        apu.write_reg(0xFF1E, 0x87); // period (2048-2047)*2 = 2
        apu.step(2 * 33);
        assert_eq!(apu.ch3_position(), 1);
    }

    #[test]
    fn noise_lfsr_shifts_in_xnor() {
        let mut apu = powered();
        apu.write_reg(0xFF21, 0xF0);
        apu.write_reg(0xFF22, 0x00); // period 8
        apu.write_reg(0xFF23, 0x80);
        apu.step(8);
        assert_eq!(apu.ch4_lfsr(), 0x4000);
    }

    #[test]
    fn power_off_clears_and_blocks_writes() {
        let mut apu = powered();
        apu.write_reg(0xFF30, 0x12);
        apu.write_reg(0xFF12, 0xF0);
        apu.write_reg(0xFF14, 0x80);
        apu.set_enabled(false);
        assert_eq!(apu.read_reg(0xFF26), 0x70);
        apu.write_reg(0xFF12, 0xF0);
        assert_eq!(apu.read_reg(0xFF12), 0x00);
        assert_eq!(apu.read_reg(0xFF30), 0x12);
    }

    #[test]
    fn samples_accumulate_and_drain() {
        let mut apu = powered();
        apu.step(CYCLES_PER_SAMPLE * 10);
        let samples = apu.take_samples();
        assert_eq!(samples.len(), 10);
        assert!(samples.iter().all(|&s| s == 0.0));
        assert!(apu.take_samples().is_empty());
    }

    #[test]
    fn full_buffer_drops_oldest() {
        let mut buf = SampleBuffer::new(3);
        for s in [0.1, 0.2, 0.3, 0.4] {
            buf.push(s);
        }
        assert_eq!(buf.drain(), vec![0.2, 0.3, 0.4]);
    }

    #[test]
    fn mix_is_average_of_levels() {
        let mut apu = powered();
        apu.write_reg(0xFF12, 0xF0);
        apu.write_reg(0xFF11, 0xC0); // 75% duty, position 1 is high
        apu.write_reg(0xFF13, 0x00);
        apu.write_reg(0xFF14, 0x87);
        apu.step(1024);
        assert_eq!(apu.mix_output(), 15.0 / 60.0);
    }
}
