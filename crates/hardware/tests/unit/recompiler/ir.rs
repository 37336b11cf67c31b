//! IR construction tests: the shapes the builder must produce.

use pretty_assertions::assert_eq;

use n64_core::config::RecompilerConfig;
use n64_core::recompiler::builder::build_block;
use n64_core::recompiler::ir::{Global, Instr, Operand, Terminator};
use n64_core::state::Machine;

use crate::common::harness::*;

fn code_bytes(instructions: &[u32]) -> Vec<u8> {
    instructions.iter().flat_map(|i| i.to_be_bytes()).collect()
}

fn build(instructions: &[u32]) -> n64_core::recompiler::ir::Graph {
    // The thunk pointer is captured but never called at build time.
    let machine = std::ptr::null_mut::<Machine>();
    let cfg = RecompilerConfig::default();
    let (graph, _) = build_block(&code_bytes(instructions), CODE_VADDR, machine, &cfg)
        .expect("block builds");
    graph
}

fn writes_of(graph: &n64_core::recompiler::ir::Graph) -> Vec<Global> {
    graph
        .blocks()
        .iter()
        .flat_map(|b| &b.instrs)
        .filter_map(|i| match i {
            Instr::WriteGlobal { global, .. } => Some(*global),
            _ => None,
        })
        .collect()
}

#[test]
fn straight_line_block_ends_with_pc_commit() {
    let graph = build(&[addiu(1, 0, 5), ori(2, 1, 1), syscall()]);
    // One linear block: the untranslatable syscall commits PC and exits.
    assert_eq!(graph.blocks().len(), 1);
    let writes = writes_of(&graph);
    assert!(writes.contains(&Global::Gpr(1)));
    assert!(writes.contains(&Global::Gpr(2)));
    assert_eq!(*writes.last().unwrap(), Global::Cycles);
    assert!(matches!(
        graph.blocks()[0].term,
        Some(Terminator::Exit)
    ));

    // The PC commit points at the untranslated instruction.
    let pc_write = graph.blocks()[0]
        .instrs
        .iter()
        .find_map(|i| match i {
            Instr::WriteGlobal {
                global: Global::Pc,
                val: Operand::Const(v, _),
            } => Some(*v),
            _ => None,
        })
        .expect("pc commit");
    assert_eq!(pc_write, CODE_VADDR + 8);
}

#[test]
fn writes_to_r0_are_dropped() {
    let graph = build(&[addiu(0, 0, 5), syscall()]);
    assert!(!writes_of(&graph).contains(&Global::Gpr(0)));
}

#[test]
fn conditional_branch_has_two_exiting_continuations() {
    let graph = build(&[beq(1, 2, 4), addiu(3, 0, 1)]);
    // Entry block plus the two continuations.
    assert_eq!(graph.blocks().len(), 3);
    assert!(matches!(
        graph.blocks()[0].term,
        Some(Terminator::Br { .. })
    ));

    // Both continuations write PC with the architectural targets and exit.
    let targets: Vec<u64> = graph.blocks()[1..]
        .iter()
        .map(|b| {
            assert!(matches!(b.term, Some(Terminator::Exit)));
            b.instrs
                .iter()
                .find_map(|i| match i {
                    Instr::WriteGlobal {
                        global: Global::Pc,
                        val: Operand::Const(v, _),
                    } => Some(*v),
                    _ => None,
                })
                .expect("pc commit in continuation")
        })
        .collect();
    assert!(targets.contains(&(CODE_VADDR + 4 + (4 << 2))));
    assert!(targets.contains(&(CODE_VADDR + 8)));
}

#[test]
fn branch_likely_inlines_delay_slot_only_on_taken_path() {
    let graph = build(&[beql(1, 2, 4), addiu(3, 0, 1)]);
    let blocks = graph.blocks();
    assert_eq!(blocks.len(), 3);
    // Exactly one continuation carries the delay-slot register write.
    let with_delay = blocks[1..]
        .iter()
        .filter(|b| {
            b.instrs.iter().any(|i| {
                matches!(
                    i,
                    Instr::WriteGlobal {
                        global: Global::Gpr(3),
                        ..
                    }
                )
            })
        })
        .count();
    assert_eq!(with_delay, 1);
}

#[test]
fn loads_commit_cycles_before_the_call() {
    let graph = build(&[addiu(1, 0, 5), lw(2, 4, 0), syscall()]);
    let entry = &graph.blocks()[0];
    let cycle_write = entry
        .instrs
        .iter()
        .position(|i| matches!(i, Instr::WriteGlobal { global: Global::Cycles, .. }))
        .expect("cycle commit");
    let call = entry
        .instrs
        .iter()
        .position(|i| matches!(i, Instr::Call { .. }))
        .expect("load call");
    assert!(cycle_write < call);
    // The load result is guarded by an assert.
    assert!(entry.instrs.iter().any(|i| matches!(i, Instr::Assert { .. })));
}

#[test]
fn cop1_head_is_abandoned() {
    let machine = std::ptr::null_mut::<Machine>();
    let cfg = RecompilerConfig::default();
    // LWC1 at the head would guard and immediately exit: abandoned.
    let res = build_block(
        &code_bytes(&[(0x31 << 26), nop()]),
        CODE_VADDR,
        machine,
        &cfg,
    );
    assert!(res.is_err());
}

#[test]
fn cop1_mid_block_emits_one_guard() {
    let graph = build(&[addiu(1, 0, 5), (0x31 << 26), nop()]);
    // The guard adds the SR read and a branch with a call on the taken arm.
    let reads_sr = graph
        .blocks()
        .iter()
        .flat_map(|b| &b.instrs)
        .filter(|i| matches!(i, Instr::ReadGlobal { global: Global::Sr, .. }))
        .count();
    assert_eq!(reads_sr, 1);
    assert!(matches!(
        graph.blocks()[0].term,
        Some(Terminator::Br { .. })
    ));
}

#[test]
fn ir_budget_is_enforced() {
    let mut cfg = RecompilerConfig::default();
    cfg.block_ir_max = 4;
    let machine = std::ptr::null_mut::<Machine>();
    let res = build_block(
        &code_bytes(&[addiu(1, 0, 1), addiu(2, 0, 2), addiu(3, 0, 3), syscall()]),
        CODE_VADDR,
        machine,
        &cfg,
    );
    assert!(res.is_err());
}

#[test]
fn consumed_bytes_cover_the_delay_slot() {
    let machine = std::ptr::null_mut::<Machine>();
    let cfg = RecompilerConfig::default();
    let (_, consumed) = build_block(
        &code_bytes(&[jr(31), addiu(1, 0, 1)]),
        CODE_VADDR,
        machine,
        &cfg,
    )
    .expect("block builds");
    assert_eq!(consumed, 8);
}
