//! Primary opcode table. Each handler decodes its operands from the opcode
//! bits, so one function covers a whole row or column of the opcode map.

use super::{Cpu, FLAG_C, FLAG_H, FLAG_N, FLAG_Z, OpFn, cb};
use crate::mmu::Mmu;

pub(super) static OPCODES: [OpFn; 256] = build_table();

const fn build_table() -> [OpFn; 256] {
    let mut table: [OpFn; 256] = [undefined as OpFn; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = decode(i as u8);
        i += 1;
    }
    table
}

const fn decode(op: u8) -> OpFn {
    match op {
        0x00 => nop,
        0x01 | 0x11 | 0x21 | 0x31 => ld_rr_d16,
        0x02 | 0x12 | 0x22 | 0x32 => ld_ind_a,
        0x03 | 0x13 | 0x23 | 0x33 => inc_rr,
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => inc_r,
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => dec_r,
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => ld_r_d8,
        0x07 => rlca,
        0x08 => ld_a16_sp,
        0x09 | 0x19 | 0x29 | 0x39 => add_hl_rr,
        0x0A | 0x1A | 0x2A | 0x3A => ld_a_ind,
        0x0B | 0x1B | 0x2B | 0x3B => dec_rr,
        0x0F => rrca,
        0x10 => stop,
        0x17 => rla,
        0x18 => jr,
        0x1F => rra,
        0x20 | 0x28 | 0x30 | 0x38 => jr_cc,
        0x27 => daa,
        0x2F => cpl,
        0x37 => scf,
        0x3F => ccf,
        0x76 => halt,
        0x40..=0x7F => ld_r_r,
        0x80..=0xBF => alu_r,
        0xC0 | 0xC8 | 0xD0 | 0xD8 => ret_cc,
        0xC1 | 0xD1 | 0xE1 | 0xF1 => pop,
        0xC2 | 0xCA | 0xD2 | 0xDA => jp_cc,
        0xC3 => jp,
        0xC4 | 0xCC | 0xD4 | 0xDC => call_cc,
        0xC5 | 0xD5 | 0xE5 | 0xF5 => push,
        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => alu_d8,
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => rst,
        0xC9 => ret,
        0xCB => prefix_cb,
        0xCD => call,
        0xD9 => reti,
        0xE0 => ldh_a8_a,
        0xE2 => ld_c_a,
        0xE8 => add_sp_r8,
        0xE9 => jp_hl,
        0xEA => ld_a16_a,
        0xF0 => ldh_a_a8,
        0xF2 => ld_a_c,
        0xF3 => di,
        0xF8 => ld_hl_sp_r8,
        0xF9 => ld_sp_hl,
        0xFA => ld_a_a16,
        0xFB => ei,
        // 0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD
        _ => undefined,
    }
}

/// Destination register index encoded in bits 3-5.
#[inline]
const fn dst(op: u8) -> u8 {
    (op >> 3) & 0x07
}

/// Source register index encoded in bits 0-2.
#[inline]
const fn src(op: u8) -> u8 {
    op & 0x07
}

/// Register pair or condition index encoded in bits 4-5 / 3-4.
#[inline]
const fn pair(op: u8) -> u8 {
    (op >> 4) & 0x03
}

#[inline]
const fn cond(op: u8) -> u8 {
    (op >> 3) & 0x03
}

// Returning 0 marks the opcode as having no implementation.
fn undefined(_: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    0
}

fn nop(_: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    4
}

fn ld_rr_d16(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let val = cpu.fetch16(mmu);
    cpu.write_pair(pair(op), val);
    12
}

/// Address for the (BC), (DE), (HL+), (HL-) family, applying the HL step.
fn indirect_addr(cpu: &mut Cpu, op: u8) -> u16 {
    match pair(op) {
        0 => cpu.get_bc(),
        1 => cpu.get_de(),
        2 => {
            let hl = cpu.get_hl();
            cpu.set_hl(hl.wrapping_add(1));
            hl
        }
        _ => {
            let hl = cpu.get_hl();
            cpu.set_hl(hl.wrapping_sub(1));
            hl
        }
    }
}

fn ld_ind_a(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let addr = indirect_addr(cpu, op);
    mmu.write_byte(addr, cpu.a);
    8
}

fn ld_a_ind(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let addr = indirect_addr(cpu, op);
    cpu.a = mmu.read_byte(addr);
    8
}

fn inc_rr(cpu: &mut Cpu, _: &mut Mmu, op: u8) -> u32 {
    let val = cpu.read_pair(pair(op)).wrapping_add(1);
    cpu.write_pair(pair(op), val);
    8
}

fn dec_rr(cpu: &mut Cpu, _: &mut Mmu, op: u8) -> u32 {
    let val = cpu.read_pair(pair(op)).wrapping_sub(1);
    cpu.write_pair(pair(op), val);
    8
}

fn inc_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let r = dst(op);
    let val = cpu.read_reg(mmu, r);
    let res = cpu.inc8(val);
    cpu.write_reg(mmu, r, res);
    if r == 6 { 12 } else { 4 }
}

fn dec_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let r = dst(op);
    let val = cpu.read_reg(mmu, r);
    let res = cpu.dec8(val);
    cpu.write_reg(mmu, r, res);
    if r == 6 { 12 } else { 4 }
}

fn ld_r_d8(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let val = cpu.fetch8(mmu);
    let r = dst(op);
    cpu.write_reg(mmu, r, val);
    if r == 6 { 12 } else { 8 }
}

// The accumulator rotates always clear Z, unlike their CB forms.
fn rlca(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    let carry = cpu.a & 0x80 != 0;
    cpu.a = cpu.a.rotate_left(1);
    cpu.set_flags(false, false, false, carry);
    4
}

fn rrca(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    let carry = cpu.a & 0x01 != 0;
    cpu.a = cpu.a.rotate_right(1);
    cpu.set_flags(false, false, false, carry);
    4
}

fn rla(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    let carry = cpu.a & 0x80 != 0;
    cpu.a = (cpu.a << 1) | cpu.flag(FLAG_C) as u8;
    cpu.set_flags(false, false, false, carry);
    4
}

fn rra(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    let carry = cpu.a & 0x01 != 0;
    cpu.a = (cpu.a >> 1) | ((cpu.flag(FLAG_C) as u8) << 7);
    cpu.set_flags(false, false, false, carry);
    4
}

fn ld_a16_sp(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    let addr = cpu.fetch16(mmu);
    mmu.write_word(addr, cpu.sp);
    20
}

fn add_hl_rr(cpu: &mut Cpu, _: &mut Mmu, op: u8) -> u32 {
    let val = cpu.read_pair(pair(op));
    cpu.add_hl(val);
    8
}

fn stop(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    // STOP is followed by a padding byte.
    cpu.fetch8(mmu);
    cpu.stopped = true;
    mmu.write_byte(0xFF04, 0);
    4
}

fn jr(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    let offset = cpu.fetch8(mmu) as i8;
    cpu.pc = cpu.pc.wrapping_add(offset as u16);
    12
}

fn jr_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let offset = cpu.fetch8(mmu) as i8;
    if cpu.condition(cond(op)) {
        cpu.pc = cpu.pc.wrapping_add(offset as u16);
        12
    } else {
        8
    }
}

fn daa(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    let mut correction = 0u8;
    let mut carry = false;
    let subtract = cpu.flag(FLAG_N);
    if cpu.flag(FLAG_H) || (!subtract && (cpu.a & 0x0F) > 9) {
        correction |= 0x06;
    }
    if cpu.flag(FLAG_C) || (!subtract && cpu.a > 0x99) {
        correction |= 0x60;
        carry = true;
    }
    if subtract {
        cpu.a = cpu.a.wrapping_sub(correction);
    } else {
        cpu.a = cpu.a.wrapping_add(correction);
    }
    cpu.set_flags(cpu.a == 0, subtract, false, carry);
    4
}

fn cpl(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    cpu.a = !cpu.a;
    cpu.f |= FLAG_N | FLAG_H;
    4
}

fn scf(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    cpu.f = (cpu.f & FLAG_Z) | FLAG_C;
    4
}

fn ccf(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    cpu.f = (cpu.f & (FLAG_Z | FLAG_C)) ^ FLAG_C;
    4
}

fn halt(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    cpu.halted = true;
    4
}

fn ld_r_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let (d, s) = (dst(op), src(op));
    let val = cpu.read_reg(mmu, s);
    cpu.write_reg(mmu, d, val);
    if d == 6 || s == 6 { 8 } else { 4 }
}

fn alu_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let s = src(op);
    let val = cpu.read_reg(mmu, s);
    cpu.alu(dst(op), val);
    if s == 6 { 8 } else { 4 }
}

fn alu_d8(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let val = cpu.fetch8(mmu);
    cpu.alu(dst(op), val);
    8
}

fn ret_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    if cpu.condition(cond(op)) {
        cpu.pc = cpu.pop_stack(mmu);
        20
    } else {
        8
    }
}

fn ret(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    cpu.pc = cpu.pop_stack(mmu);
    16
}

fn reti(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    cpu.pc = cpu.pop_stack(mmu);
    cpu.ime = true;
    cpu.ime_enable_delay = 0;
    16
}

fn pop(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let val = cpu.pop_stack(mmu);
    match pair(op) {
        3 => cpu.set_af(val),
        p => cpu.write_pair(p, val),
    }
    12
}

fn push(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let val = match pair(op) {
        3 => cpu.get_af(),
        p => cpu.read_pair(p),
    };
    cpu.push_stack(mmu, val);
    16
}

fn jp(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    cpu.pc = cpu.fetch16(mmu);
    16
}

fn jp_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let addr = cpu.fetch16(mmu);
    if cpu.condition(cond(op)) {
        cpu.pc = addr;
        16
    } else {
        12
    }
}

fn jp_hl(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    cpu.pc = cpu.get_hl();
    4
}

fn call(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    let addr = cpu.fetch16(mmu);
    let ret = cpu.pc;
    cpu.push_stack(mmu, ret);
    cpu.pc = addr;
    24
}

fn call_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let addr = cpu.fetch16(mmu);
    if cpu.condition(cond(op)) {
        let ret = cpu.pc;
        cpu.push_stack(mmu, ret);
        cpu.pc = addr;
        24
    } else {
        12
    }
}

fn rst(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let ret = cpu.pc;
    cpu.push_stack(mmu, ret);
    cpu.pc = (op & 0x38) as u16;
    16
}

fn prefix_cb(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    let op = cpu.fetch8(mmu);
    cb::execute(cpu, mmu, op)
}

fn ldh_a8_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    let offset = cpu.fetch8(mmu) as u16;
    mmu.write_byte(0xFF00 | offset, cpu.a);
    12
}

fn ldh_a_a8(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    let offset = cpu.fetch8(mmu) as u16;
    cpu.a = mmu.read_byte(0xFF00 | offset);
    12
}

fn ld_c_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    mmu.write_byte(0xFF00 | cpu.c as u16, cpu.a);
    8
}

fn ld_a_c(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    cpu.a = mmu.read_byte(0xFF00 | cpu.c as u16);
    8
}

fn add_sp_r8(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    let offset = cpu.fetch8(mmu);
    cpu.sp = cpu.sp_offset(offset);
    16
}

fn ld_hl_sp_r8(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    let offset = cpu.fetch8(mmu);
    let val = cpu.sp_offset(offset);
    cpu.set_hl(val);
    12
}

fn ld_sp_hl(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    cpu.sp = cpu.get_hl();
    8
}

fn ld_a16_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    let addr = cpu.fetch16(mmu);
    mmu.write_byte(addr, cpu.a);
    16
}

fn ld_a_a16(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u32 {
    let addr = cpu.fetch16(mmu);
    cpu.a = mmu.read_byte(addr);
    16
}

fn di(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    cpu.ime = false;
    cpu.ime_enable_delay = 0;
    4
}

fn ei(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u32 {
    // Counts down at the end of this step and the next one.
    if !cpu.ime {
        cpu.ime_enable_delay = 2;
    }
    4
}
