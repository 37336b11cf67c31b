//! Vector ALU tests: element broadcast, add group, select group, logical
//! group, VSAR.

use pretty_assertions::assert_eq;

use n64_core::isa::opcodes::vu;
use n64_core::rsp::VectorReg;

use crate::common::harness::*;

fn lanes(vals: [u16; 8]) -> VectorReg {
    VectorReg::from_lanes(vals)
}

#[rstest::rstest]
#[case(0, [10, 20, 30, 40, 50, 60, 70, 80])]
#[case(1, [10, 20, 30, 40, 50, 60, 70, 80])]
#[case(3, [20, 20, 40, 40, 60, 60, 80, 80])]
#[case(4, [10, 10, 10, 10, 50, 50, 50, 50])]
#[case(7, [40, 40, 40, 40, 80, 80, 80, 80])]
#[case(8, [10, 10, 10, 10, 10, 10, 10, 10])]
#[case(15, [80, 80, 80, 80, 80, 80, 80, 80])]
fn element_table_rows(#[case] e: u32, #[case] expect: [u16; 8]) {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([0; 8]);
    m.rsp.vr[2] = lanes([10, 20, 30, 40, 50, 60, 70, 80]);
    m.eval_rsp_instr(vop(vu::VADD, 3, 1, 2, e));
    assert_eq!(m.rsp.vr[3].lanes(), expect);
}

#[test]
fn element_broadcast_whole_lane() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([1, 1, 1, 1, 1, 1, 1, 1]);
    m.rsp.vr[2] = lanes([10, 20, 30, 40, 50, 60, 70, 80]);
    // e = 8 + 3 broadcasts lane 3 of vt into every pipeline lane.
    m.eval_rsp_instr(vop(vu::VADD, 3, 1, 2, 11));
    assert_eq!(m.rsp.vr[3].lanes(), [41; 8]);
}

#[test]
fn element_broadcast_quarters() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([0; 8]);
    m.rsp.vr[2] = lanes([10, 20, 30, 40, 50, 60, 70, 80]);
    // e = 2: pairs broadcast their even lane.
    m.eval_rsp_instr(vop(vu::VADD, 3, 1, 2, 2));
    assert_eq!(m.rsp.vr[3].lanes(), [10, 10, 30, 30, 50, 50, 70, 70]);
}

#[test]
fn vadd_saturates_and_clears_vco() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([0x7FFF, 0x8000, 1, 0, 0, 0, 0, 0]);
    m.rsp.vr[2] = lanes([1, 0x8000, 1, 0, 0, 0, 0, 0]);
    m.rsp.vco = 0xFFFF;
    m.eval_rsp_instr(vop(vu::VADD, 3, 1, 2, 0));
    let out = m.rsp.vr[3].lanes();
    assert_eq!(out[0], 0x7FFF); // saturated high (carry included)
    assert_eq!(out[1], 0x8000); // saturated low
    assert_eq!(out[2], 3); // 1 + 1 + carry
    assert_eq!(m.rsp.vco, 0);
}

#[test]
fn vaddc_sets_carry_bits() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([0xFFFF, 1, 0, 0, 0, 0, 0, 0]);
    m.rsp.vr[2] = lanes([1, 1, 0, 0, 0, 0, 0, 0]);
    m.eval_rsp_instr(vop(vu::VADDC, 3, 1, 2, 0));
    assert_eq!(m.rsp.vr[3].lanes()[0], 0); // wrapped
    assert_eq!(m.rsp.vr[3].lanes()[1], 2);
    assert_eq!(m.rsp.vco & 1, 1);
    assert_eq!((m.rsp.vco >> 1) & 1, 0);
}

#[test]
fn vsubc_sets_borrow_and_neq() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([1, 5, 5, 0, 0, 0, 0, 0]);
    m.rsp.vr[2] = lanes([2, 5, 3, 0, 0, 0, 0, 0]);
    m.eval_rsp_instr(vop(vu::VSUBC, 3, 1, 2, 0));
    // Lane 0: borrow -> carry and neq set.
    assert_eq!(m.rsp.vco & 1, 1);
    assert_ne!(m.rsp.vco & (1 << 8), 0);
    // Lane 1: equal -> neither.
    assert_eq!((m.rsp.vco >> 1) & 1, 0);
    assert_eq!(m.rsp.vco & (1 << 9), 0);
    // Lane 2: positive difference -> neq only.
    assert_eq!((m.rsp.vco >> 2) & 1, 0);
    assert_ne!(m.rsp.vco & (1 << 10), 0);
}

#[test]
fn vlt_selects_minimum_into_vcc() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([1, 9, 0x8000, 0, 0, 0, 0, 0]);
    m.rsp.vr[2] = lanes([2, 3, 1, 0, 0, 0, 0, 0]);
    m.eval_rsp_instr(vop(vu::VLT, 3, 1, 2, 0));
    let out = m.rsp.vr[3].lanes();
    assert_eq!(out[0], 1);
    assert_eq!(out[1], 3);
    assert_eq!(out[2], 0x8000); // -32768 < 1 signed
    assert_eq!(m.rsp.vcc & 1, 1);
    assert_eq!((m.rsp.vcc >> 1) & 1, 0);
    assert_eq!((m.rsp.vcc >> 2) & 1, 1);
    assert_eq!(m.rsp.vco, 0);
}

#[test]
fn vmrg_selects_on_compare_bits() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([1, 1, 1, 1, 1, 1, 1, 1]);
    m.rsp.vr[2] = lanes([2, 2, 2, 2, 2, 2, 2, 2]);
    m.rsp.vcc = 0b0000_0101;
    m.eval_rsp_instr(vop(vu::VMRG, 3, 1, 2, 0));
    assert_eq!(m.rsp.vr[3].lanes(), [1, 2, 1, 2, 2, 2, 2, 2]);
}

#[test]
fn logical_group_writes_acc_lo() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([0xF0F0; 8]);
    m.rsp.vr[2] = lanes([0x0FF0; 8]);
    m.eval_rsp_instr(vop(vu::VXOR, 3, 1, 2, 0));
    assert_eq!(m.rsp.vr[3].lanes(), [0xFF00; 8]);
    assert_eq!(m.rsp.acc.lo, [0xFF00; 8]);

    m.eval_rsp_instr(vop(vu::VNAND, 4, 1, 2, 0));
    assert_eq!(m.rsp.vr[4].lanes(), [!0x00F0u16; 8]);
}

#[test]
fn vabs_applies_sign_of_vs() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([1, 0xFFFF, 0, 0xFFFF, 0, 0, 0, 0]); // +, -, 0, -
    m.rsp.vr[2] = lanes([5, 5, 5, 0x8000, 0, 0, 0, 0]);
    m.eval_rsp_instr(vop(vu::VABS, 3, 1, 2, 0));
    let out = m.rsp.vr[3].lanes();
    assert_eq!(out[0], 5);
    assert_eq!(out[1], 0xFFFB); // -5
    assert_eq!(out[2], 0);
    assert_eq!(out[3], 0x8000); // negating i16::MIN wraps
}

#[test]
fn vsar_reads_accumulator_slices_without_writing() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    for i in 0..8 {
        m.rsp.acc.hi[i] = 0x0A00 + i as u16;
        m.rsp.acc.md[i] = 0x0B00 + i as u16;
        m.rsp.acc.lo[i] = 0x0C00 + i as u16;
    }
    m.eval_rsp_instr(vop(vu::VSAR, 3, 0, 0, 8));
    assert_eq!(m.rsp.vr[3].lane(0), 0x0A00);
    m.eval_rsp_instr(vop(vu::VSAR, 3, 0, 0, 9));
    assert_eq!(m.rsp.vr[3].lane(7), 0x0B07);
    m.eval_rsp_instr(vop(vu::VSAR, 3, 0, 0, 10));
    assert_eq!(m.rsp.vr[3].lane(3), 0x0C03);

    // e = 0..2 returns zero and leaves the accumulator untouched.
    m.eval_rsp_instr(vop(vu::VSAR, 3, 0, 0, 0));
    assert_eq!(m.rsp.vr[3].lanes(), [0; 8]);
    assert_eq!(m.rsp.acc.hi[0], 0x0A00);
}

#[test]
fn vmov_moves_single_lane() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    m.rsp.vr[1] = lanes([10, 20, 30, 40, 50, 60, 70, 80]);
    m.rsp.vr[3] = lanes([0; 8]);
    // VMOV vd=3, de=2, vt=1, e=5: vr3[2] = vr1[5].
    let instr = (0x12 << 26) | (1 << 25) | (5 << 21) | (1 << 16) | (2 << 11) | (3 << 6) | vu::VMOV;
    m.eval_rsp_instr(instr);
    assert_eq!(m.rsp.vr[3].lane(2), 60);
    assert_eq!(m.rsp.acc.lo[2], 60);
}
