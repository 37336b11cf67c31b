//! Clip-test pipeline: VCH, VCL, VCR.
//!
//! These pin the per-lane truth tables bit-for-bit, including the VCL
//! recomputation conditioned on the stored clamp-edge flag.

use pretty_assertions::assert_eq;

use n64_core::isa::opcodes::vu;
use n64_core::rsp::VectorReg;

use crate::common::harness::*;

fn lanes(vals: [u16; 8]) -> VectorReg {
    VectorReg::from_lanes(vals)
}

#[test]
fn vch_opposite_signs() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    // Lane 0: s = 100, t = -100 -> sum is exactly zero.
    m.rsp.vr[1] = lanes([100, 0, 0, 0, 0, 0, 0, 0]);
    m.rsp.vr[2] = lanes([0xFF9C, 0, 0, 0, 0, 0, 0, 0]);
    m.eval_rsp_instr(vop(vu::VCH, 3, 1, 2, 0));

    // le and ge both set, result is -t.
    assert_eq!(m.rsp.vr[3].lane(0), 100);
    assert_eq!(m.rsp.vcc & 1, 1);
    assert_ne!(m.rsp.vcc & (1 << 8), 0);
    // sign set, neq clear (sum was zero), vce clear.
    assert_eq!(m.rsp.vco & 1, 1);
    assert_eq!(m.rsp.vco & (1 << 8), 0);
    assert_eq!(m.rsp.vce & 1, 0);
}

#[test]
fn vch_same_signs() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    // s = 100, t = 50: ge (100 - 50 >= 0), result t.
    m.rsp.vr[1] = lanes([100, 0, 0, 0, 0, 0, 0, 0]);
    m.rsp.vr[2] = lanes([50, 0, 0, 0, 0, 0, 0, 0]);
    m.eval_rsp_instr(vop(vu::VCH, 3, 1, 2, 0));

    assert_eq!(m.rsp.vr[3].lane(0), 50);
    assert_ne!(m.rsp.vcc & (1 << 8), 0); // ge
    assert_eq!(m.rsp.vcc & 1, 0); // le clear (t positive)
    assert_eq!(m.rsp.vco & 1, 0); // sign clear
    assert_ne!(m.rsp.vco & (1 << 8), 0); // neq (difference nonzero)
}

#[test]
fn vch_sets_vce_on_minus_one_sum() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    // s = 100, t = -101: sum is -1, the clamp edge case.
    m.rsp.vr[1] = lanes([100, 0, 0, 0, 0, 0, 0, 0]);
    m.rsp.vr[2] = lanes([0xFF9B, 0, 0, 0, 0, 0, 0, 0]);
    m.eval_rsp_instr(vop(vu::VCH, 3, 1, 2, 0));
    assert_eq!(m.rsp.vce & 1, 1);
    assert_eq!(m.rsp.vco & (1 << 8), 0); // -1 does not count as neq
}

/// The VCL `le` recomputation depends on the stored VCE flag when the sum
/// carries: without VCE both the zero-sum and the carry are required,
/// with VCE either suffices.
#[test]
fn vcl_le_depends_on_vce() {
    // s = 1, t = 0xFFFE: sum = 0xFFFF, no carry, nonzero.
    let run = |vce: u8| {
        let mut ctx = TestContext::new();
        let m = ctx.m();
        m.rsp.vr[1] = lanes([1, 0, 0, 0, 0, 0, 0, 0]);
        m.rsp.vr[2] = lanes([0xFFFE, 0, 0, 0, 0, 0, 0, 0]);
        m.rsp.vco = 1; // sign set, neq clear
        m.rsp.vcc = 0;
        m.rsp.vce = vce;
        m.eval_rsp_instr(vop(vu::VCL, 3, 1, 2, 0));
        (m.rsp.vr[3].lane(0), m.rsp.vcc & 1)
    };

    // Without the edge flag: le stays clear, result is s.
    assert_eq!(run(0), (1, 0));
    // With the edge flag: !carry alone sets le, result is -t.
    assert_eq!(run(1), (2, 1));
}

#[test]
fn vcl_clears_vco_and_vce() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([5, 0, 0, 0, 0, 0, 0, 0]);
    m.rsp.vr[2] = lanes([3, 0, 0, 0, 0, 0, 0, 0]);
    m.rsp.vco = 0x0101;
    m.rsp.vce = 0xFF;
    m.eval_rsp_instr(vop(vu::VCL, 3, 1, 2, 0));
    assert_eq!(m.rsp.vco, 0);
    assert_eq!(m.rsp.vce, 0);
}

#[test]
fn vcl_same_sign_recomputes_ge() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    // sign clear, neq clear: ge = (s - t >= 0).
    m.rsp.vr[1] = lanes([5, 2, 0, 0, 0, 0, 0, 0]);
    m.rsp.vr[2] = lanes([3, 7, 0, 0, 0, 0, 0, 0]);
    m.rsp.vco = 0;
    m.rsp.vcc = 0;
    m.eval_rsp_instr(vop(vu::VCL, 3, 1, 2, 0));
    assert_eq!(m.rsp.vr[3].lane(0), 3); // ge -> t
    assert_eq!(m.rsp.vr[3].lane(1), 2); // !ge -> s
    assert_ne!(m.rsp.vcc & (1 << 8), 0);
    assert_eq!(m.rsp.vcc & (1 << 9), 0);
}

#[test]
fn vcr_ones_complement_select() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    // Lane 0: s = -200, t = 100 -> le, result !t.
    // Lane 1: s = 100, t = 50 -> ge, result t.
    m.rsp.vr[1] = lanes([0xFF38, 100, 0, 0, 0, 0, 0, 0]);
    m.rsp.vr[2] = lanes([100, 50, 0, 0, 0, 0, 0, 0]);
    m.eval_rsp_instr(vop(vu::VCR, 3, 1, 2, 0));

    assert_eq!(m.rsp.vr[3].lane(0), !100u16);
    assert_eq!(m.rsp.vcc & 1, 1);
    assert_eq!(m.rsp.vr[3].lane(1), 50);
    assert_ne!(m.rsp.vcc & (1 << 9), 0);
    // VCR leaves no carry state behind.
    assert_eq!(m.rsp.vco, 0);
    assert_eq!(m.rsp.vce, 0);
}
