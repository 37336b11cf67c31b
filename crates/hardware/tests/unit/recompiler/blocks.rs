//! End-to-end recompiled block execution.
//!
//! These run generated x86-64 code and compare against the interpreter,
//! so they are host-specific.

#![cfg(all(target_arch = "x86_64", unix))]

use pretty_assertions::assert_eq;

use crate::common::harness::*;

#[test]
fn recompiled_jr_commits_pc_and_two_cycles() {
    let mut ctx = TestContext::new_with_jit();
    ctx.set_gpr(31, 0xFFFF_FFFF_8000_1234);
    ctx.load_program(&[jr(31), addiu(1, 0, 5)]);

    let before = ctx.m().cycles;
    assert!(ctx.m().jit_step(), "block did not run");
    assert_eq!(ctx.m().cpu.pc, 0xFFFF_FFFF_8000_1234);
    assert_eq!(ctx.gpr(1), 5);
    assert_eq!(ctx.m().cycles - before, 2);
    assert_eq!(ctx.m().stats.blocks_compiled, 1);
}

#[test]
fn recompiled_block_matches_interpreter() {
    let program = [
        lui(8, 0x1234),
        ori(8, 8, 0x5678),
        addu(9, 8, 8),
        slt(10, 8, 9),
        daddiu(11, 8, -5),
        jr(31),
        addiu(12, 0, 7),
    ];
    let steps = program.len();

    let mut jit = TestContext::new_with_jit();
    jit.set_gpr(31, CODE_VADDR + 0x100);
    jit.load_program(&program);
    assert!(jit.m().jit_step());

    let mut interp = TestContext::new();
    interp.set_gpr(31, CODE_VADDR + 0x100);
    interp.load_program(&program);
    interp.step(steps);

    for r in 0..32 {
        assert_eq!(jit.gpr(r), interp.gpr(r), "gpr {r}");
    }
    assert_eq!(jit.m().cpu.pc, interp.m().cpu.pc);
    assert_eq!(jit.m().cycles, interp.m().cycles);
    assert_eq!(jit.m().cpu.cp0.count, interp.m().cpu.cp0.count);
    assert_eq!(jit.m().cpu.cp0.random, interp.m().cpu.cp0.random);
}

#[test]
fn recompiled_conditional_branch_picks_the_right_arm() {
    let mut ctx = TestContext::new_with_jit();
    ctx.set_gpr(1, 5);
    ctx.set_gpr(2, 5);
    ctx.load_program(&[beq(1, 2, 4), addiu(3, 0, 1)]);
    assert!(ctx.m().jit_step());
    assert_eq!(ctx.gpr(3), 1);
    assert_eq!(ctx.m().cpu.pc, CODE_VADDR + 4 + (4 << 2));

    // Same block, not taken this time: the cache serves it.
    let mut ctx2 = TestContext::new_with_jit();
    ctx2.set_gpr(1, 5);
    ctx2.set_gpr(2, 6);
    ctx2.load_program(&[beq(1, 2, 4), addiu(3, 0, 1)]);
    assert!(ctx2.m().jit_step());
    assert_eq!(ctx2.gpr(3), 1);
    assert_eq!(ctx2.m().cpu.pc, CODE_VADDR + 8);
}

#[test]
fn recompiled_loads_and_stores_hit_the_bus() {
    let mut ctx = TestContext::new_with_jit();
    assert!(ctx.m().bus_store_u32(0x100, 0xDEAD_BEEF));
    ctx.set_gpr(4, 0xFFFF_FFFF_8000_0100);
    ctx.set_gpr(31, CODE_VADDR + 0x100);
    ctx.load_program(&[lw(1, 4, 0), sw(1, 4, 8), jr(31), nop()]);
    assert!(ctx.m().jit_step());
    assert_eq!(ctx.gpr(1), 0xFFFF_FFFF_DEAD_BEEF);
    assert_eq!(ctx.m().bus_load_u32(0x108), Some(0xDEAD_BEEF));
}

#[test]
fn faulting_load_exits_the_block_through_the_exception() {
    let mut ctx = TestContext::new_with_jit();
    // r4 = 0: kuseg with an empty TLB refills.
    ctx.set_gpr(31, CODE_VADDR + 0x100);
    ctx.load_program(&[addiu(9, 0, 1), lw(1, 4, 0), jr(31), nop()]);
    assert!(ctx.m().jit_step());
    // The instruction before the load retired, the load faulted.
    assert_eq!(ctx.gpr(9), 1);
    assert_eq!(ctx.m().cpu.pc, 0xFFFF_FFFF_8000_0000);
    assert_eq!((ctx.m().cpu.cp0.cause >> 2) & 0x1F, 2);
    // Cycles cover the retired instructions up to the suspension point.
    assert_eq!(ctx.m().cycles, 2);
}

#[test]
fn abandoned_addresses_fall_back_to_the_interpreter() {
    let mut ctx = TestContext::new_with_jit();
    ctx.load_program(&[syscall()]);
    // A block headed by an untranslatable instruction never installs.
    assert!(!ctx.m().jit_step());
    assert_eq!(ctx.m().stats.blocks_abandoned, 1);
    // The second probe takes the abandoned fast path.
    assert!(!ctx.m().jit_step());
    assert_eq!(ctx.m().stats.blocks_abandoned, 1);
}

#[test]
fn dram_stores_invalidate_overlapping_blocks() {
    let mut ctx = TestContext::new_with_jit();
    ctx.set_gpr(31, CODE_VADDR + 0x100);
    ctx.load_program(&[addiu(1, 0, 1), jr(31), nop()]);
    assert!(ctx.m().jit_step());
    assert_eq!(ctx.m().stats.blocks_compiled, 1);

    // Overwrite the block's first instruction: the cached block dies.
    assert!(ctx.m().bus_store_u32(CODE_PADDR, addiu(1, 0, 2)));
    ctx.m().cpu.pc = CODE_VADDR;
    assert!(ctx.m().jit_step());
    assert_eq!(ctx.m().stats.blocks_compiled, 2);
    assert_eq!(ctx.gpr(1), 2);
}

#[test]
fn cache_hit_reuses_the_installed_block() {
    let mut ctx = TestContext::new_with_jit();
    ctx.set_gpr(31, CODE_VADDR);
    // An infinite self-loop through JR: every entry is a cache hit after
    // the first.
    ctx.load_program(&[jr(31), nop()]);
    assert!(ctx.m().jit_step());
    assert!(ctx.m().jit_step());
    assert!(ctx.m().jit_step());
    assert_eq!(ctx.m().stats.blocks_compiled, 1);
    assert_eq!(ctx.m().stats.block_hits, 3);
}
