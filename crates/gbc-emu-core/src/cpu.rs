mod cb;
mod ops;

use log::error;

use crate::{error::ExecError, mmu::Mmu};

pub use cb::execute as execute_cb;

#[cfg(feature = "cpu-trace")]
macro_rules! cpu_trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*);
    };
}
#[cfg(not(feature = "cpu-trace"))]
macro_rules! cpu_trace {
    ($($arg:tt)*) => {};
}

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
pub const FLAG_Z: u8 = 0x80; // Zero
pub const FLAG_N: u8 = 0x40; // Subtract
pub const FLAG_H: u8 = 0x20; // Half Carry
pub const FLAG_C: u8 = 0x10; // Carry

// Interrupt vectors in priority order: VBlank, STAT, Timer, Serial, Joypad.
const INTERRUPT_VECTORS: [u16; 5] = [0x40, 0x48, 0x50, 0x58, 0x60];

/// Cycles spent dispatching an interrupt.
pub const INTERRUPT_CYCLES: u32 = 20;

/// Cycles reported for each step spent in HALT or STOP.
pub const HALT_CYCLES: u32 = 4;

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

const DMG_BOOT_REGS: [u8; 8] = [0x01, 0xB0, 0x00, 0x13, 0x00, 0xD8, 0x01, 0x4D];
const CGB_BOOT_REGS: [u8; 8] = [0x11, 0x80, 0x00, 0x00, 0x00, 0x08, 0x00, 0x7C];

/// Handler for one opcode. Receives the opcode byte and returns the elapsed
/// T-cycles.
pub type OpFn = fn(&mut Cpu, &mut Mmu, u8) -> u32;

pub struct Cpu {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub pc: u16,
    pub sp: u16,
    pub cycles: u64,
    pub ime: bool,
    pub halted: bool,
    pub stopped: bool,
    /// Steps left until a pending EI takes effect.
    ime_enable_delay: u8,
    fault: Option<ExecError>,
}

impl Cpu {
    pub fn new() -> Self {
        Self::new_with_mode(false)
    }

    /// Create a CPU initialized to the post-boot register state for the
    /// selected hardware mode.
    pub fn new_with_mode(cgb: bool) -> Self {
        let [a, f, b, c, d, e, h, l] = if cgb { CGB_BOOT_REGS } else { DMG_BOOT_REGS };
        Self {
            a,
            f,
            b,
            c,
            d,
            e,
            h,
            l,
            pc: BOOT_PC,
            sp: BOOT_SP,
            cycles: 0,
            ime: false,
            halted: false,
            stopped: false,
            ime_enable_delay: 0,
            fault: None,
        }
    }

    pub fn get_af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f as u16
    }

    /// The low nibble of F does not exist in hardware and always reads 0.
    pub fn set_af(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        self.f = val as u8 & 0xF0;
    }

    pub fn get_bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }

    pub fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    pub fn get_de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }

    pub fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    pub fn get_hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }

    pub fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    #[inline]
    pub fn flag(&self, mask: u8) -> bool {
        self.f & mask != 0
    }

    #[inline]
    fn set_flags(&mut self, z: bool, n: bool, h: bool, c: bool) {
        self.f = if z { FLAG_Z } else { 0 }
            | if n { FLAG_N } else { 0 }
            | if h { FLAG_H } else { 0 }
            | if c { FLAG_C } else { 0 };
    }

    /// The fault that stopped execution, if any. Cleared by constructing a
    /// new CPU.
    pub fn fault(&self) -> Option<&ExecError> {
        self.fault.as_ref()
    }

    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} CY:{}",
            self.get_af(),
            self.get_bc(),
            self.get_de(),
            self.get_hl(),
            self.pc,
            self.sp,
            self.cycles
        )
    }

    fn fetch8(&mut self, mmu: &Mmu) -> u8 {
        let val = mmu.read_byte(self.pc);
        self.pc = self.pc.wrapping_add(1);
        val
    }

    fn fetch16(&mut self, mmu: &Mmu) -> u16 {
        let lo = self.fetch8(mmu) as u16;
        let hi = self.fetch8(mmu) as u16;
        (hi << 8) | lo
    }

    fn push_stack(&mut self, mmu: &mut Mmu, val: u16) {
        self.sp = self.sp.wrapping_sub(1);
        mmu.write_byte(self.sp, (val >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        mmu.write_byte(self.sp, val as u8);
    }

    fn pop_stack(&mut self, mmu: &Mmu) -> u16 {
        let lo = mmu.read_byte(self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        let hi = mmu.read_byte(self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    /// Operand encoding shared by most opcode blocks: B, C, D, E, H, L, (HL), A.
    fn read_reg(&self, mmu: &Mmu, index: u8) -> u8 {
        match index & 0x07 {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            6 => mmu.read_byte(self.get_hl()),
            _ => self.a,
        }
    }

    fn write_reg(&mut self, mmu: &mut Mmu, index: u8, val: u8) {
        match index & 0x07 {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            6 => mmu.write_byte(self.get_hl(), val),
            _ => self.a = val,
        }
    }

    /// BC, DE, HL, SP
    fn read_pair(&self, index: u8) -> u16 {
        match index & 0x03 {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => self.get_hl(),
            _ => self.sp,
        }
    }

    fn write_pair(&mut self, index: u8, val: u16) {
        match index & 0x03 {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => self.set_hl(val),
            _ => self.sp = val,
        }
    }

    /// NZ, Z, NC, C
    fn condition(&self, index: u8) -> bool {
        match index & 0x03 {
            0 => !self.flag(FLAG_Z),
            1 => self.flag(FLAG_Z),
            2 => !self.flag(FLAG_C),
            _ => self.flag(FLAG_C),
        }
    }

    /// ADD, ADC, SUB, SBC, AND, XOR, OR, CP selected by `kind`.
    fn alu(&mut self, kind: u8, val: u8) {
        let a = self.a;
        match kind & 0x07 {
            0 | 1 => {
                let carry = (kind & 1 == 1 && self.flag(FLAG_C)) as u8;
                let res = a as u16 + val as u16 + carry as u16;
                let half = (a & 0x0F) + (val & 0x0F) + carry > 0x0F;
                self.a = res as u8;
                self.set_flags(self.a == 0, false, half, res > 0xFF);
            }
            2 | 3 | 7 => {
                let carry = (kind == 3 && self.flag(FLAG_C)) as u8;
                let res = a as i16 - val as i16 - carry as i16;
                let half = (a & 0x0F) < (val & 0x0F) + carry;
                let out = res as u8;
                if kind != 7 {
                    self.a = out;
                }
                self.set_flags(out == 0, true, half, res < 0);
            }
            4 => {
                self.a &= val;
                self.set_flags(self.a == 0, false, true, false);
            }
            5 => {
                self.a ^= val;
                self.set_flags(self.a == 0, false, false, false);
            }
            _ => {
                self.a |= val;
                self.set_flags(self.a == 0, false, false, false);
            }
        }
    }

    fn inc8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_add(1);
        let c = self.flag(FLAG_C);
        self.set_flags(res == 0, false, val & 0x0F == 0x0F, c);
        res
    }

    fn dec8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_sub(1);
        let c = self.flag(FLAG_C);
        self.set_flags(res == 0, true, val & 0x0F == 0, c);
        res
    }

    fn add_hl(&mut self, val: u16) {
        let hl = self.get_hl();
        let res = hl as u32 + val as u32;
        let z = self.flag(FLAG_Z);
        self.set_flags(z, false, (hl & 0x0FFF) + (val & 0x0FFF) > 0x0FFF, res > 0xFFFF);
        self.set_hl(res as u16);
    }

    /// SP plus a signed immediate. Flags come from the unsigned low byte add.
    fn sp_offset(&mut self, offset: u8) -> u16 {
        let sp = self.sp;
        let val = offset as i8 as i16 as u16;
        self.set_flags(
            false,
            false,
            (sp & 0x0F) + (val & 0x0F) > 0x0F,
            (sp & 0xFF) + (val & 0xFF) > 0xFF,
        );
        sp.wrapping_add(val)
    }

    /// Executes one instruction and returns its cycle count. A halted or
    /// stopped CPU idles for [`HALT_CYCLES`].
    pub fn step(&mut self, mmu: &mut Mmu) -> Result<u32, ExecError> {
        if let Some(err) = &self.fault {
            return Err(err.clone());
        }

        let cycles = if self.halted || self.stopped {
            HALT_CYCLES
        } else {
            let pc = self.pc;
            let opcode = self.fetch8(mmu);
            cpu_trace!("{:02X} {}", opcode, self.debug_state());
            let cycles = ops::OPCODES[opcode as usize](self, mmu, opcode);
            if cycles == 0 {
                let err = ExecError::UnimplementedOpcode { opcode, pc };
                error!("{err}; halting execution");
                self.pc = pc;
                self.fault = Some(err.clone());
                return Err(err);
            }
            cycles
        };

        if self.ime_enable_delay > 0 {
            self.ime_enable_delay -= 1;
            if self.ime_enable_delay == 0 {
                self.ime = true;
            }
        }

        self.cycles += cycles as u64;
        Ok(cycles)
    }

    /// Wakes a halted CPU on any requested and enabled interrupt, then
    /// dispatches the highest priority one if IME is set. Returns the cycles
    /// spent dispatching.
    pub fn handle_interrupts(&mut self, mmu: &mut Mmu) -> u32 {
        let pending = mmu.pending_interrupts();
        if pending == 0 {
            return 0;
        }

        self.halted = false;
        self.stopped = false;

        if !self.ime {
            return 0;
        }

        let bit = pending.trailing_zeros() as usize;
        mmu.if_reg &= !(1 << bit);
        self.ime = false;
        self.ime_enable_delay = 0;
        let pc = self.pc;
        self.push_stack(mmu, pc);
        self.pc = INTERRUPT_VECTORS[bit];
        cpu_trace!("interrupt {} -> {:04X}", bit, self.pc);
        self.cycles += INTERRUPT_CYCLES as u64;
        INTERRUPT_CYCLES
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(code: &[u8]) -> (Cpu, Mmu) {
        let mut mmu = Mmu::new();
        for (i, b) in code.iter().enumerate() {
            mmu.write_byte(0xC000 + i as u16, *b);
        }
        let mut cpu = Cpu::new();
        cpu.pc = 0xC000;
        (cpu, mmu)
    }

    #[test]
    fn post_boot_registers() {
        let cpu = Cpu::new_with_mode(false);
        assert_eq!(cpu.get_af(), 0x01B0);
        assert_eq!(cpu.get_bc(), 0x0013);
        assert_eq!(cpu.get_de(), 0x00D8);
        assert_eq!(cpu.get_hl(), 0x014D);
        let cpu = Cpu::new_with_mode(true);
        assert_eq!(cpu.get_af(), 0x1180);
        assert_eq!(cpu.get_hl(), 0x007C);
        assert_eq!(cpu.pc, 0x0100);
        assert_eq!(cpu.sp, 0xFFFE);
    }

    #[test]
    fn af_low_nibble_is_masked() {
        let mut cpu = Cpu::new();
        cpu.set_af(0x12FF);
        assert_eq!(cpu.get_af(), 0x12F0);
    }

    #[test]
    fn adc_and_sbc_use_carry() {
        let mut cpu = Cpu::new();
        cpu.a = 0x0F;
        cpu.f = FLAG_C;
        cpu.alu(1, 0x00);
        assert_eq!(cpu.a, 0x10);
        assert_eq!(cpu.f, FLAG_H);

        cpu.a = 0x10;
        cpu.f = FLAG_C;
        cpu.alu(3, 0x0F);
        assert_eq!(cpu.a, 0x00);
        assert_eq!(cpu.f, FLAG_Z | FLAG_N | FLAG_H);
    }

    #[test]
    fn cp_leaves_accumulator() {
        let mut cpu = Cpu::new();
        cpu.a = 0x20;
        cpu.alu(7, 0x30);
        assert_eq!(cpu.a, 0x20);
        assert_eq!(cpu.f, FLAG_N | FLAG_C);
    }

    #[test]
    fn add_hl_sets_half_carry_at_bit_11() {
        let mut cpu = Cpu::new();
        cpu.f = FLAG_Z;
        cpu.set_hl(0x0FFF);
        cpu.add_hl(0x0001);
        assert_eq!(cpu.get_hl(), 0x1000);
        assert_eq!(cpu.f, FLAG_Z | FLAG_H);
    }

    #[test]
    fn undefined_opcode_faults_until_reset() {
        let (mut cpu, mut mmu) = setup(&[0xD3]);
        let err = cpu.step(&mut mmu).unwrap_err();
        assert_eq!(
            err,
            ExecError::UnimplementedOpcode {
                opcode: 0xD3,
                pc: 0xC000
            }
        );
        assert_eq!(cpu.pc, 0xC000);
        assert!(cpu.step(&mut mmu).is_err());
        assert!(cpu.fault().is_some());
    }

    #[test]
    fn ei_takes_effect_after_next_instruction() {
        let (mut cpu, mut mmu) = setup(&[0xFB, 0x00, 0x00]);
        cpu.step(&mut mmu).unwrap();
        assert!(!cpu.ime);
        cpu.step(&mut mmu).unwrap();
        assert!(cpu.ime);
    }

    #[test]
    fn di_cancels_pending_ei() {
        let (mut cpu, mut mmu) = setup(&[0xFB, 0xF3, 0x00]);
        cpu.step(&mut mmu).unwrap();
        cpu.step(&mut mmu).unwrap();
        cpu.step(&mut mmu).unwrap();
        assert!(!cpu.ime);
    }

    #[test]
    fn interrupt_dispatch_pushes_pc_and_jumps() {
        let (mut cpu, mut mmu) = setup(&[0x00]);
        cpu.ime = true;
        mmu.ie_reg = 0x1F;
        mmu.if_reg = 0x14;
        let cycles = cpu.handle_interrupts(&mut mmu);
        assert_eq!(cycles, INTERRUPT_CYCLES);
        assert_eq!(cpu.pc, 0x50);
        assert_eq!(mmu.if_reg & 0x1F, 0x10);
        assert_eq!(cpu.sp, 0xFFFC);
        assert_eq!(mmu.read_word(0xFFFC), 0xC000);
        assert!(!cpu.ime);
    }

    #[test]
    fn halt_wakes_without_ime() {
        let (mut cpu, mut mmu) = setup(&[0x76, 0x00]);
        cpu.step(&mut mmu).unwrap();
        assert!(cpu.halted);
        assert_eq!(cpu.step(&mut mmu).unwrap(), HALT_CYCLES);
        mmu.ie_reg = 0x04;
        mmu.if_reg = 0x04;
        assert_eq!(cpu.handle_interrupts(&mut mmu), 0);
        assert!(!cpu.halted);
        assert_eq!(cpu.pc, 0xC001);
        assert_eq!(mmu.if_reg & 0x04, 0x04);
    }
}
