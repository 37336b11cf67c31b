//! Branch and delay-slot sequencer tests.

use pretty_assertions::assert_eq;

use crate::common::harness::*;

#[test]
fn taken_branch_executes_delay_slot_first() {
    let mut ctx = TestContext::new();
    // beq r0, r0, +2  -> target = base + 4 + 8
    // addiu r1, r0, 1    (delay slot, must run)
    // addiu r2, r0, 2    (skipped)
    // addiu r3, r0, 3    (branch target)
    ctx.load_program(&[beq(0, 0, 2), addiu(1, 0, 1), addiu(2, 0, 2), addiu(3, 0, 3)]);
    ctx.step(3);
    assert_eq!(ctx.gpr(1), 1);
    assert_eq!(ctx.gpr(2), 0);
    assert_eq!(ctx.gpr(3), 3);
}

#[test]
fn not_taken_branch_still_runs_delay_slot() {
    let mut ctx = TestContext::new();
    ctx.set_gpr(4, 1);
    ctx.load_program(&[bne(4, 4, 2), addiu(1, 0, 1), addiu(2, 0, 2)]);
    ctx.step(3);
    assert_eq!(ctx.gpr(1), 1);
    assert_eq!(ctx.gpr(2), 2);
}

#[test]
fn branch_likely_nullifies_delay_slot_when_not_taken() {
    let mut ctx = TestContext::new();
    ctx.set_gpr(4, 1);
    // beql r4, r0: not taken (r4 != 0), so the delay slot is skipped.
    ctx.load_program(&[beql(4, 0, 2), addiu(1, 0, 1), addiu(2, 0, 2)]);
    ctx.step(2);
    assert_eq!(ctx.gpr(1), 0);
    assert_eq!(ctx.gpr(2), 2);
}

#[test]
fn branch_likely_runs_delay_slot_when_taken() {
    let mut ctx = TestContext::new();
    ctx.load_program(&[beql(0, 0, 2), addiu(1, 0, 1), addiu(2, 0, 2), addiu(3, 0, 3)]);
    ctx.step(3);
    assert_eq!(ctx.gpr(1), 1);
    assert_eq!(ctx.gpr(2), 0);
    assert_eq!(ctx.gpr(3), 3);
}

#[test]
fn jal_links_and_jumps() {
    let mut ctx = TestContext::new();
    let target = CODE_VADDR + 0x20;
    ctx.load_program(&[jal(target), addiu(1, 0, 1)]);
    ctx.step(2);
    assert_eq!(ctx.gpr(31), CODE_VADDR + 8);
    assert_eq!(ctx.gpr(1), 1);
    assert_eq!(ctx.m().cpu.pc, target);
}

#[test]
fn jr_targets_register_value() {
    let mut ctx = TestContext::new();
    ctx.set_gpr(31, CODE_VADDR + 0x40);
    ctx.load_program(&[jr(31), addiu(1, 0, 5)]);
    ctx.step(2);
    assert_eq!(ctx.m().cpu.pc, CODE_VADDR + 0x40);
    assert_eq!(ctx.gpr(1), 5);
}

#[test]
fn jalr_reads_target_before_linking() {
    let mut ctx = TestContext::new();
    ctx.set_gpr(2, CODE_VADDR + 0x40);
    ctx.load_program(&[jalr(31, 2), nop()]);
    ctx.step(2);
    assert_eq!(ctx.gpr(31), CODE_VADDR + 8);
    assert_eq!(ctx.m().cpu.pc, CODE_VADDR + 0x40);
}

/// A branch in the delay slot of a taken branch is architecturally
/// undefined; the sequencer's natural interpretation is that the second
/// branch wins and its own delay slot is the first branch's target.
#[test]
fn branch_in_delay_slot_of_taken_branch() {
    let mut ctx = TestContext::new();
    let far = CODE_VADDR + 0x1000;
    // 0x00: beq r0, r0, +1   -> target 0x08
    // 0x04: j far            (in the delay slot)
    // 0x08: addiu r1, r0, 1  (runs as the delay slot of the j)
    // 0x0c: addiu r2, r0, 2  (never runs)
    ctx.load_program(&[beq(0, 0, 1), j(far), addiu(1, 0, 1), addiu(2, 0, 2)]);
    ctx.step(3);
    assert_eq!(ctx.gpr(1), 1);
    assert_eq!(ctx.gpr(2), 0);
    assert_eq!(ctx.m().cpu.pc, far);
}

#[test]
fn cycles_count_one_per_instruction() {
    let mut ctx = TestContext::new();
    ctx.load_program(&[nop(), nop(), nop(), nop()]);
    let before = ctx.m().cycles;
    ctx.step(4);
    assert_eq!(ctx.m().cycles - before, 4);
}
