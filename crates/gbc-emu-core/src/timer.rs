/// Cycles per DIV increment (16384 Hz).
pub const DIV_PERIOD: u32 = 256;

/// Cycles per TIMA increment for each TAC clock select value.
const TIMA_PERIODS: [u32; 4] = [1024, 16, 64, 256];

pub struct Timer {
    /// Divider register, incremented every [`DIV_PERIOD`] cycles.
    pub div: u8,
    /// Timer counter
    pub tima: u8,
    /// Timer modulo
    pub tma: u8,
    /// Timer control
    pub tac: u8,
    div_counter: u32,
    tima_counter: u32,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            div: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            div_counter: 0,
            tima_counter: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.tac & 0x04 != 0
    }

    /// Cycles between TIMA increments for the current clock select.
    pub fn period(&self) -> u32 {
        TIMA_PERIODS[(self.tac & 0x03) as usize]
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => self.div,
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF04 => {
                // Any write clears the whole divider chain.
                self.div = 0;
                self.div_counter = 0;
            }
            0xFF05 => self.tima = val,
            0xFF06 => self.tma = val,
            0xFF07 => {
                if (val ^ self.tac) & 0x03 != 0 {
                    self.tima_counter = 0;
                }
                self.tac = val & 0x07;
            }
            _ => {}
        }
    }

    /// Advance the timer by `cycles` CPU cycles and update IF when TIMA
    /// overflows.
    pub fn step(&mut self, cycles: u32, if_reg: &mut u8) {
        self.div_counter += cycles;
        while self.div_counter >= DIV_PERIOD {
            self.div_counter -= DIV_PERIOD;
            self.div = self.div.wrapping_add(1);
        }

        if !self.enabled() {
            return;
        }

        let period = self.period();
        self.tima_counter += cycles;
        while self.tima_counter >= period {
            self.tima_counter -= period;
            self.increment(if_reg);
        }
    }

    fn increment(&mut self, if_reg: &mut u8) {
        if self.tima == 0xFF {
            self.tima = self.tma;
            *if_reg |= 0x04;
        } else {
            self.tima += 1;
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
