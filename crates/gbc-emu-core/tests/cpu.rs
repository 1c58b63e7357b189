mod common;

use gbc_emu_core::{
    ExecError, GameBoy,
    cpu::{Cpu, FLAG_C, FLAG_H, FLAG_Z, INTERRUPT_CYCLES},
};

fn boot(image: Vec<u8>) -> GameBoy {
    let mut gb = GameBoy::new();
    gb.load_image(&image).unwrap();
    gb
}

/// Runs the NOP and JP at the entry point so the next step executes the
/// first byte at 0x0150.
fn boot_program(code: &[u8]) -> GameBoy {
    let mut gb = boot(common::program(code));
    gb.step_instruction().unwrap();
    gb.step_instruction().unwrap();
    assert_eq!(gb.cpu.pc, 0x0150);
    gb
}

#[test]
fn load_immediate_at_entry_point() {
    let mut gb = boot(common::entry_program(&[0x3E, 0x42]));
    assert_eq!(gb.cpu.pc, 0x0100);
    let cycles = gb.step_instruction().unwrap();
    assert_eq!(gb.cpu.a, 0x42);
    assert_eq!(gb.cpu.pc, 0x0102);
    assert_eq!(cycles, 8);
}

#[test]
fn post_boot_registers_follow_model() {
    let gb = boot(common::entry_program(&[]));
    assert_eq!(gb.cpu.get_af(), 0x01B0);
    assert_eq!(gb.cpu.get_bc(), 0x0013);
    assert_eq!(gb.cpu.get_de(), 0x00D8);
    assert_eq!(gb.cpu.get_hl(), 0x014D);
    assert_eq!(gb.cpu.sp, 0xFFFE);

    let mut image = common::entry_program(&[]);
    image[0x0143] = 0x80;
    common::fix_checksum(&mut image);
    let gb = boot(image);
    assert_eq!(gb.cpu.get_af(), 0x1180);
    assert_eq!(gb.cpu.get_de(), 0x0008);
    assert_eq!(gb.cpu.get_hl(), 0x007C);
}

#[test]
fn register_pairs_round_trip() {
    let mut cpu = Cpu::new();
    cpu.set_bc(0x1234);
    cpu.set_de(0x5678);
    cpu.set_hl(0x9ABC);
    assert_eq!((cpu.b, cpu.c), (0x12, 0x34));
    assert_eq!((cpu.d, cpu.e), (0x56, 0x78));
    assert_eq!((cpu.h, cpu.l), (0x9A, 0xBC));
    cpu.set_af(0xFFFF);
    assert_eq!(cpu.get_af(), 0xFFF0);
}

#[test]
fn inc_wraps_to_zero_and_keeps_carry() {
    // LD B,0xFF ; SCF ; INC B
    let mut gb = boot_program(&[0x06, 0xFF, 0x37, 0x04]);
    for _ in 0..3 {
        gb.step_instruction().unwrap();
    }
    assert_eq!(gb.cpu.b, 0x00);
    assert_eq!(gb.cpu.f, FLAG_Z | FLAG_H | FLAG_C);
}

#[test]
fn cb_prefixed_instruction_runs_from_rom() {
    // LD A,0x0F ; SWAP A
    let mut gb = boot_program(&[0x3E, 0x0F, 0xCB, 0x37]);
    gb.step_instruction().unwrap();
    assert_eq!(gb.step_instruction().unwrap(), 8);
    assert_eq!(gb.cpu.a, 0xF0);
    assert_eq!(gb.cpu.pc, 0x0154);
}

#[test]
fn counted_loop_terminates() {
    // LD B,3 ; loop: DEC B ; JR NZ,loop ; LD A,B
    let mut gb = boot_program(&[0x06, 0x03, 0x05, 0x20, 0xFD, 0x78]);
    let mut steps = 0;
    while gb.cpu.pc != 0x0156 {
        gb.step_instruction().unwrap();
        steps += 1;
        assert!(steps < 32, "loop did not exit");
    }
    assert_eq!(gb.cpu.b, 0);
    // LD + 3 DEC + 3 JR + final LD
    assert_eq!(steps, 8);
    assert_eq!(gb.cpu.a, 0);
}

#[test]
fn ei_takes_effect_after_following_instruction() {
    // EI ; NOP ; NOP
    let mut gb = boot_program(&[0xFB, 0x00, 0x00]);
    gb.mmu.ie_reg = 0x01;
    gb.mmu.request_interrupt(0);

    assert_eq!(gb.step_instruction().unwrap(), 4);
    assert_eq!(gb.cpu.pc, 0x0151);

    assert_eq!(gb.step_instruction().unwrap(), 4 + INTERRUPT_CYCLES);
    assert_eq!(gb.cpu.pc, 0x0040);
    assert!(!gb.cpu.ime);
    assert_eq!(gb.mmu.read_word(gb.cpu.sp), 0x0152);
    assert_eq!(gb.mmu.if_reg & 0x01, 0);
}

#[test]
fn timer_interrupt_wakes_halt() {
    // LD A,0x05 ; LDH (TAC),A ; LD A,0x04 ; LDH (IE),A ; XOR A ; LDH (IF),A ; EI ; HALT
    let mut gb = boot_program(&[
        0x3E, 0x05, 0xE0, 0x07, 0x3E, 0x04, 0xE0, 0xFF, 0xAF, 0xE0, 0x0F, 0xFB, 0x76,
    ]);
    let mut woke = false;
    for _ in 0..10_000 {
        gb.step_instruction().unwrap();
        if gb.cpu.pc == 0x0050 {
            woke = true;
            break;
        }
    }
    assert!(woke);
    assert!(!gb.cpu.halted);
    assert_eq!(gb.mmu.read_word(gb.cpu.sp), 0x015D);
}

#[test]
fn undefined_opcode_stops_execution() {
    let mut gb = boot_program(&[0xD3]);
    let err = gb.step_instruction().unwrap_err();
    assert_eq!(
        err,
        ExecError::UnimplementedOpcode {
            opcode: 0xD3,
            pc: 0x0150
        }
    );
    assert_eq!(gb.cpu.pc, 0x0150);
    assert_eq!(gb.step_instruction().unwrap_err(), err);
    assert_eq!(gb.cpu.fault(), Some(&err));
}
