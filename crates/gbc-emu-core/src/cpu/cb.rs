//! CB-prefixed opcode table.
//!
//! Rows of eight opcodes share one operation. Bits 0-2 pick the operand
//! (B, C, D, E, H, L, (HL), A); for BIT/RES/SET bits 3-5 pick the bit.
//! Cycle counts include the prefix fetch.

use super::{Cpu, FLAG_C, FLAG_H, OpFn};
use crate::mmu::Mmu;

static CB_OPCODES: [OpFn; 256] = build_table();

const fn build_table() -> [OpFn; 256] {
    let mut table: [OpFn; 256] = [bit as OpFn; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = decode(i as u8);
        i += 1;
    }
    table
}

const fn decode(op: u8) -> OpFn {
    match op {
        0x00..=0x07 => rlc,
        0x08..=0x0F => rrc,
        0x10..=0x17 => rl,
        0x18..=0x1F => rr,
        0x20..=0x27 => sla,
        0x28..=0x2F => sra,
        0x30..=0x37 => swap,
        0x38..=0x3F => srl,
        0x40..=0x7F => bit,
        0x80..=0xBF => res,
        _ => set,
    }
}

/// Runs the CB-prefixed opcode `op` and returns its total cycle count.
pub fn execute(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    CB_OPCODES[op as usize](cpu, mmu, op)
}

#[inline]
fn cycles(op: u8) -> u32 {
    if op & 0x07 == 6 { 16 } else { 8 }
}

/// Read-modify-write of the operand through `f`, which returns the new value
/// and the carry out. Z from the result, N and H cleared.
fn shift_op(cpu: &mut Cpu, mmu: &mut Mmu, op: u8, f: impl Fn(u8, bool) -> (u8, bool)) -> u32 {
    let val = cpu.read_reg(mmu, op);
    let (res, carry) = f(val, cpu.flag(FLAG_C));
    cpu.write_reg(mmu, op, res);
    cpu.set_flags(res == 0, false, false, carry);
    cycles(op)
}

fn rlc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    shift_op(cpu, mmu, op, |v, _| (v.rotate_left(1), v & 0x80 != 0))
}

fn rrc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    shift_op(cpu, mmu, op, |v, _| (v.rotate_right(1), v & 0x01 != 0))
}

fn rl(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    shift_op(cpu, mmu, op, |v, c| ((v << 1) | c as u8, v & 0x80 != 0))
}

fn rr(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    shift_op(cpu, mmu, op, |v, c| ((v >> 1) | ((c as u8) << 7), v & 0x01 != 0))
}

fn sla(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    shift_op(cpu, mmu, op, |v, _| (v << 1, v & 0x80 != 0))
}

fn sra(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    shift_op(cpu, mmu, op, |v, _| ((v >> 1) | (v & 0x80), v & 0x01 != 0))
}

fn swap(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    shift_op(cpu, mmu, op, |v, _| (v.rotate_left(4), false))
}

fn srl(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    shift_op(cpu, mmu, op, |v, _| (v >> 1, v & 0x01 != 0))
}

// BIT never writes back, so (HL) costs 12 rather than 16.
fn bit(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let n = (op >> 3) & 0x07;
    let val = cpu.read_reg(mmu, op);
    let c = cpu.flag(FLAG_C);
    cpu.set_flags(val & (1 << n) == 0, false, true, c);
    if op & 0x07 == 6 { 12 } else { 8 }
}

fn res(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let n = (op >> 3) & 0x07;
    let val = cpu.read_reg(mmu, op);
    cpu.write_reg(mmu, op, val & !(1 << n));
    cycles(op)
}

fn set(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u32 {
    let n = (op >> 3) & 0x07;
    let val = cpu.read_reg(mmu, op);
    cpu.write_reg(mmu, op, val | (1 << n));
    cycles(op)
}
