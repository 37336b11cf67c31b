//! Memory-trace record and replay tests.

use std::fs::File;

use pretty_assertions::assert_eq;

use n64_core::sim::trace::Tracer;

use crate::common::harness::*;

fn program() -> Vec<u32> {
    vec![
        lui(4, 0x8000),
        ori(4, 4, 0x0100),
        sw(4, 4, 0),
        lw(5, 4, 0),
        addiu(6, 5, 1),
    ]
}

/// Runs a program under the given tracer.
///
/// # Returns
///
/// (halted, trace_mismatch, halt_reason).
fn run_traced(tracer: Option<Tracer>, program: &[u32]) -> (bool, bool, String) {
    let mut ctx = TestContext::new();
    ctx.load_program(program);
    ctx.m().tracer = tracer;
    ctx.step(program.len());
    if let Some(t) = ctx.sim.machine.tracer.as_mut() {
        t.finish();
    }
    let m = ctx.m();
    (m.halted, m.trace_mismatch, m.halt_reason.clone())
}

#[test]
fn record_then_replay_matches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.trace");

    let recorder = Tracer::record(Box::new(File::create(&path).unwrap()));
    let (halted, _, _) = run_traced(Some(recorder), &program());
    assert!(!halted);

    let replayer = Tracer::replay(Box::new(File::open(&path).unwrap())).unwrap();
    let (halted, mismatch, reason) = run_traced(Some(replayer), &program());
    assert!(!halted, "replay diverged: {reason}");
    assert!(!mismatch);
}

#[test]
fn replay_mismatch_sets_the_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.trace");

    let recorder = Tracer::record(Box::new(File::create(&path).unwrap()));
    let _ = run_traced(Some(recorder), &program());

    // Same program with one changed store address.
    let mut altered = program();
    altered[1] = ori(4, 4, 0x0104);
    let replayer = Tracer::replay(Box::new(File::open(&path).unwrap())).unwrap();
    let (halted, mismatch, _) = run_traced(Some(replayer), &altered);
    assert!(mismatch);
    assert!(halted);
}

#[test]
fn trace_records_pc_and_cycles_per_instruction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.trace");

    let recorder = Tracer::record(Box::new(File::create(&path).unwrap()));
    let _ = run_traced(Some(recorder), &program());

    let contents = std::fs::read_to_string(&path).unwrap();
    let points: Vec<&str> = contents.lines().filter(|l| l.contains("Point")).collect();
    assert_eq!(points.len(), program().len());
    // The first point is the first fetch.
    assert!(points[0].contains(&format!("{}", CODE_VADDR)));
}
