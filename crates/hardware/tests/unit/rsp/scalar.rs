//! RSP scalar core, DMA and control-register tests.

use pretty_assertions::assert_eq;

use n64_core::common::constants::{SP_DMEM_BASE, SP_REGS_BASE};
use n64_core::soc::devices::mi::{MI_INTR_SP, self};
use n64_core::soc::devices::sp::{SP_STATUS_BROKE, SP_STATUS_HALT};

use crate::common::harness::*;

fn be32(word: u32) -> [u8; 4] {
    word.to_be_bytes()
}

fn load_rsp_program(ctx: &mut TestContext, instructions: &[u32]) {
    for (i, instr) in instructions.iter().enumerate() {
        let bytes = be32(*instr);
        ctx.m().imem[4 * i..4 * i + 4].copy_from_slice(&bytes);
    }
    ctx.m().rsp.pc = 0;
    // Release the halt so stepping runs.
    ctx.m().hwreg.sp_status &= !SP_STATUS_HALT;
}

#[test]
fn scalar_alu_and_dmem_access() {
    let mut ctx = TestContext::new();
    load_rsp_program(
        &mut ctx,
        &[
            addiu(1, 0, 0x123),
            sll(2, 1, 4),
            sw(2, 0, 0x20),
            lw(3, 0, 0x20),
        ],
    );
    for _ in 0..4 {
        ctx.m().step_rsp();
    }
    assert_eq!(ctx.m().rsp.gpr.read(2), 0x1230);
    assert_eq!(ctx.m().rsp.gpr.read(3), 0x1230);
    assert_eq!(ctx.m().dmem[0x22], 0x12);
}

#[test]
fn rsp_pc_wraps_in_imem() {
    let mut ctx = TestContext::new();
    load_rsp_program(&mut ctx, &[nop()]);
    ctx.m().rsp.pc = 0xFFC;
    ctx.m().step_rsp();
    assert_eq!(ctx.m().rsp.pc, 0);
}

#[test]
fn break_sets_halt_and_broke() {
    let mut ctx = TestContext::new();
    let brk = 0x0000_000D;
    load_rsp_program(&mut ctx, &[brk]);
    ctx.m().step_rsp();
    let status = ctx.m().hwreg.sp_status;
    assert_ne!(status & SP_STATUS_HALT, 0);
    assert_ne!(status & SP_STATUS_BROKE, 0);
    // Without INTR_BREAK no SP interrupt is raised.
    assert_eq!(ctx.m().hwreg.mi_intr & MI_INTR_SP, 0);
}

#[test]
fn break_raises_interrupt_when_armed() {
    let mut ctx = TestContext::new();
    let brk = 0x0000_000D;
    load_rsp_program(&mut ctx, &[brk]);
    ctx.m().hwreg.sp_status |= n64_core::soc::devices::sp::SP_STATUS_INTR_BREAK;
    ctx.m().step_rsp();
    assert_ne!(ctx.m().hwreg.mi_intr & MI_INTR_SP, 0);

    // Acknowledging through the status write clears the line.
    mi::lower(ctx.m(), MI_INTR_SP);
    assert_eq!(ctx.m().hwreg.mi_intr & MI_INTR_SP, 0);
}

#[test]
fn sp_dma_reads_dram_into_dmem() {
    let mut ctx = TestContext::new();
    for i in 0..32u64 {
        assert!(ctx.m().bus_store_u8(0x2000 + i, 0xA0 + i as u8));
    }
    let m = ctx.m();
    // DRAM 0x2000 -> DMEM 0x40, 32 bytes.
    assert!(m.bus_store_u32(SP_REGS_BASE, 0x40));
    assert!(m.bus_store_u32(SP_REGS_BASE + 4, 0x2000));
    assert!(m.bus_store_u32(SP_REGS_BASE + 8, 31)); // length - 1
    assert_eq!(m.dmem[0x40], 0xA0);
    assert_eq!(m.dmem[0x5F], 0xBF);
}

#[test]
fn sp_dma_write_back_to_dram() {
    let mut ctx = TestContext::new();
    for i in 0..8 {
        ctx.m().dmem[i] = i as u8 + 1;
    }
    let m = ctx.m();
    assert!(m.bus_store_u32(SP_REGS_BASE, 0));
    assert!(m.bus_store_u32(SP_REGS_BASE + 4, 0x3000));
    assert!(m.bus_store_u32(SP_REGS_BASE + 12, 7));
    assert_eq!(m.bus_load_u8(0x3000), Some(1));
    assert_eq!(m.bus_load_u8(0x3007), Some(8));
}

#[test]
fn sp_semaphore_read_sets_write_clears() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    let sem = SP_REGS_BASE + 0x1C;
    assert_eq!(m.bus_load_u32(sem), Some(0));
    assert_eq!(m.bus_load_u32(sem), Some(1));
    assert!(m.bus_store_u32(sem, 0));
    assert_eq!(m.bus_load_u32(sem), Some(0));
}

#[test]
fn sp_status_paired_bits() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    let status = SP_REGS_BASE + 0x10;
    // Power-on: halted.
    assert_eq!(m.bus_load_u32(status).unwrap() & SP_STATUS_HALT, SP_STATUS_HALT);
    // Clear halt.
    assert!(m.bus_store_u32(status, 1));
    assert_eq!(m.bus_load_u32(status).unwrap() & SP_STATUS_HALT, 0);
    // Set halt.
    assert!(m.bus_store_u32(status, 2));
    assert_ne!(m.bus_load_u32(status).unwrap() & SP_STATUS_HALT, 0);
}

#[test]
fn mtc0_kicks_sp_dma_from_the_rsp_side() {
    let mut ctx = TestContext::new();
    for i in 0..8u64 {
        assert!(ctx.m().bus_store_u8(0x4000 + i, 0x50 + i as u8));
    }
    load_rsp_program(
        &mut ctx,
        &[
            addiu(8, 0, 0x100), // DMEM address
            mtc0(8, 0),
            addiu(9, 0, 0x4000), // DRAM address
            mtc0(9, 1),
            addiu(10, 0, 7), // length - 1
            mtc0(10, 2),
        ],
    );
    for _ in 0..6 {
        ctx.m().step_rsp();
    }
    assert_eq!(ctx.m().dmem[0x100], 0x50);
    assert_eq!(ctx.m().dmem[0x107], 0x57);
}

#[test]
fn rsp_halted_by_default() {
    let mut ctx = TestContext::new();
    let before = ctx.m().stats.rsp_instructions;
    ctx.m().step_rsp();
    assert_eq!(ctx.m().stats.rsp_instructions, before);
}

#[test]
fn dmem_is_visible_through_the_bus() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    assert!(m.bus_store_u32(SP_DMEM_BASE, 0xCAFE_BABE));
    assert_eq!(m.dmem[0], 0xCA);
    assert_eq!(m.bus_load_u32(SP_DMEM_BASE), Some(0xCAFE_BABE));
}
