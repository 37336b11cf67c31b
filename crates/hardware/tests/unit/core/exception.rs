//! Exception entry tests.

use pretty_assertions::assert_eq;

use n64_core::core::arch::cp0::{self, STATUS_EXL};

use crate::common::harness::*;

const GENERAL_VECTOR: u64 = 0xFFFF_FFFF_8000_0180;

#[test]
fn addi_overflow_raises_integer_overflow() {
    let mut ctx = TestContext::new();
    ctx.set_gpr(1, 0x7FFF_FFFF);
    ctx.set_gpr(2, 0xDEAD);
    ctx.load_program(&[addi(2, 1, 1)]);
    ctx.step(1);

    let cp0 = &ctx.m().cpu.cp0;
    assert_eq!((cp0.cause >> 2) & 0x1F, 12); // IntegerOverflow
    assert_eq!(cp0.epc, CODE_VADDR);
    assert_ne!(cp0.sr & STATUS_EXL, 0);
    assert_eq!(ctx.m().cpu.pc, GENERAL_VECTOR);
    // The destination register is untouched.
    assert_eq!(ctx.gpr(2), 0xDEAD);
}

#[test]
fn syscall_vectors_with_exl() {
    let mut ctx = TestContext::new();
    ctx.load_program(&[syscall()]);
    ctx.step(1);
    let cp0 = &ctx.m().cpu.cp0;
    assert_eq!((cp0.cause >> 2) & 0x1F, 8);
    assert_eq!(cp0.epc, CODE_VADDR);
    assert_eq!(ctx.m().cpu.pc, GENERAL_VECTOR);
}

#[test]
fn trap_instruction_raises_on_condition() {
    let mut ctx = TestContext::new();
    ctx.set_gpr(1, 7);
    ctx.set_gpr(2, 7);
    ctx.load_program(&[teq(1, 2)]);
    ctx.step(1);
    assert_eq!((ctx.m().cpu.cp0.cause >> 2) & 0x1F, 13);
}

#[test]
fn exception_in_delay_slot_backs_up_epc() {
    let mut ctx = TestContext::new();
    // The delay-slot instruction traps; EPC must point at the branch and
    // Cause.BD must be set.
    ctx.set_gpr(1, 7);
    ctx.set_gpr(2, 7);
    ctx.load_program(&[beq(0, 0, 4), teq(1, 2)]);
    ctx.step(2);
    let cp0 = &ctx.m().cpu.cp0;
    assert_eq!(cp0.epc, CODE_VADDR);
    assert_ne!(cp0.cause & cp0::CAUSE_BD, 0);
}

#[test]
fn eret_returns_to_epc_and_clears_exl() {
    let mut ctx = TestContext::new();
    ctx.load_program(&[syscall()]);
    ctx.step(1);
    assert_ne!(ctx.m().cpu.cp0.sr & STATUS_EXL, 0);

    // Plant an ERET at the vector.
    let vector_paddr = 0x180;
    assert!(ctx.m().bus_store_u32(vector_paddr, eret()));
    // Advance EPC past the syscall so we do not loop.
    ctx.m().cpu.cp0.epc = CODE_VADDR + 4;
    ctx.step(1);

    assert_eq!(ctx.m().cpu.pc, CODE_VADDR + 4);
    assert_eq!(ctx.m().cpu.cp0.sr & STATUS_EXL, 0);
}

#[test]
fn nested_exception_preserves_epc() {
    let mut ctx = TestContext::new();
    ctx.load_program(&[syscall()]);
    ctx.step(1);
    let epc = ctx.m().cpu.cp0.epc;

    // A second exception while EXL is set must not move EPC.
    assert!(ctx.m().bus_store_u32(0x180, syscall()));
    ctx.step(1);
    assert_eq!(ctx.m().cpu.cp0.epc, epc);
}

#[test]
fn mi_interrupt_delivers_through_ip2() {
    let mut ctx = TestContext::new();
    // Unmask IP2 and enable interrupts.
    ctx.m().cpu.cp0.sr = (1 << 10) | cp0::STATUS_IE;
    ctx.m().hwreg.mi_intr_mask = n64_core::soc::devices::mi::MI_INTR_VI;
    n64_core::soc::devices::mi::raise(ctx.m(), n64_core::soc::devices::mi::MI_INTR_VI);

    ctx.load_program(&[addiu(1, 0, 1)]);
    ctx.step(1);

    // The interrupt preempted the instruction.
    assert_eq!(ctx.gpr(1), 0);
    assert_eq!((ctx.m().cpu.cp0.cause >> 2) & 0x1F, 0);
    assert_eq!(ctx.m().cpu.pc, GENERAL_VECTOR);
    assert_eq!(ctx.m().cpu.cp0.epc, CODE_VADDR);
}

#[test]
fn timer_interrupt_fires_on_count_compare_match() {
    let mut ctx = TestContext::new();
    ctx.m().cpu.cp0.compare = 3;
    ctx.m().cpu.cp0.count = 0;
    ctx.load_program(&[nop(), nop(), nop(), nop()]);
    ctx.step(3);
    assert_ne!(ctx.m().cpu.cp0.cause & cp0::CAUSE_IP7, 0);
}

#[test]
fn wired_out_of_range_halts() {
    let mut ctx = TestContext::new();
    ctx.m().cpu.cp0.wired = 32;
    ctx.load_program(&[nop()]);
    ctx.step(1);
    assert!(ctx.m().halted);
}
