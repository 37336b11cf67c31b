//! Load/store tests, including the unaligned byte-merging family.

use pretty_assertions::assert_eq;

use crate::common::harness::*;

/// kseg0 view of a scratch data area at physical 0x100.
const DATA_VADDR: u64 = 0xFFFF_FFFF_8000_0100;
const DATA_PADDR: u64 = 0x100;

#[test]
fn lw_sign_extends_and_lb_reads_bytes() {
    let mut ctx = TestContext::new();
    assert!(ctx.m().bus_store_u32(DATA_PADDR, 0x8899_AABB));
    ctx.set_gpr(4, DATA_VADDR);
    ctx.load_program(&[lw(1, 4, 0), lb(2, 4, 0)]);
    ctx.step(2);
    assert_eq!(ctx.gpr(1), 0xFFFF_FFFF_8899_AABB);
    assert_eq!(ctx.gpr(2), 0xFFFF_FFFF_FFFF_FF88);
}

#[test]
fn sw_stores_big_endian() {
    let mut ctx = TestContext::new();
    ctx.set_gpr(4, DATA_VADDR);
    ctx.set_gpr(1, 0x1122_3344);
    ctx.load_program(&[sw(1, 4, 0)]);
    ctx.step(1);
    assert_eq!(ctx.m().bus_load_u8(DATA_PADDR), Some(0x11));
    assert_eq!(ctx.m().bus_load_u8(DATA_PADDR + 3), Some(0x44));
}

#[test]
fn sd_ld_round_trip() {
    let mut ctx = TestContext::new();
    ctx.set_gpr(4, DATA_VADDR);
    ctx.set_gpr(1, 0x1122_3344_5566_7788);
    ctx.load_program(&[sd(1, 4, 0), ld(2, 4, 0)]);
    ctx.step(2);
    assert_eq!(ctx.gpr(2), 0x1122_3344_5566_7788);
}

#[test]
fn unaligned_lw_raises_address_error() {
    let mut ctx = TestContext::new();
    ctx.set_gpr(4, DATA_VADDR + 1);
    ctx.load_program(&[lw(1, 4, 0)]);
    ctx.step(1);
    let cp0 = &ctx.m().cpu.cp0;
    assert_eq!((cp0.cause >> 2) & 0x1F, 4); // AdEL
    assert_eq!(cp0.bad_vaddr, DATA_VADDR + 1);
}

#[test]
fn lwl_lwr_pair_reproduces_unaligned_word() {
    let mut ctx = TestContext::new();
    for (i, byte) in [0x10u8, 0x21, 0x32, 0x43, 0x54, 0x65, 0x76, 0x87]
        .iter()
        .enumerate()
    {
        assert!(ctx.m().bus_store_u8(DATA_PADDR + i as u64, *byte));
    }
    ctx.set_gpr(4, DATA_VADDR);
    // The unaligned word at +1 spans bytes 1..=4.
    ctx.load_program(&[lwl(1, 4, 1), lwr(1, 4, 4)]);
    ctx.step(2);
    assert_eq!(ctx.gpr(1), 0x2132_4354);
}

#[test]
fn lwl_merges_against_register() {
    let mut ctx = TestContext::new();
    assert!(ctx.m().bus_store_u32(DATA_PADDR, 0xAABB_CCDD));
    ctx.set_gpr(4, DATA_VADDR);
    ctx.set_gpr(1, 0x1111_1111);
    // LWL at +2 loads two bytes into the top half.
    ctx.load_program(&[lwl(1, 4, 2)]);
    ctx.step(1);
    assert_eq!(ctx.gpr(1), 0xFFFF_FFFF_CCDD_1111);
}

#[test]
fn swl_swr_pair_writes_unaligned_word() {
    let mut ctx = TestContext::new();
    for i in 0..8 {
        assert!(ctx.m().bus_store_u8(DATA_PADDR + i, 0xEE));
    }
    ctx.set_gpr(4, DATA_VADDR);
    ctx.set_gpr(1, 0x0102_0304);
    let swl = |rt: u32, rs: u32, off: i16| (0x2A << 26) | (rs << 21) | (rt << 16) | (off as u16 as u32);
    let swr = |rt: u32, rs: u32, off: i16| (0x2E << 26) | (rs << 21) | (rt << 16) | (off as u16 as u32);
    ctx.load_program(&[swl(1, 4, 1), swr(1, 4, 4)]);
    ctx.step(2);
    assert_eq!(ctx.m().bus_load_u8(DATA_PADDR), Some(0xEE));
    assert_eq!(ctx.m().bus_load_u8(DATA_PADDR + 1), Some(0x01));
    assert_eq!(ctx.m().bus_load_u8(DATA_PADDR + 2), Some(0x02));
    assert_eq!(ctx.m().bus_load_u8(DATA_PADDR + 3), Some(0x03));
    assert_eq!(ctx.m().bus_load_u8(DATA_PADDR + 4), Some(0x04));
    assert_eq!(ctx.m().bus_load_u8(DATA_PADDR + 5), Some(0xEE));
}

#[test]
fn ll_sc_pair_succeeds_without_intervening_eret() {
    let mut ctx = TestContext::new();
    assert!(ctx.m().bus_store_u32(DATA_PADDR, 7));
    ctx.set_gpr(4, DATA_VADDR);
    ctx.set_gpr(2, 9);
    let ll = (0x30 << 26) | (4 << 21) | (1 << 16);
    let sc = (0x38 << 26) | (4 << 21) | (2 << 16);
    ctx.load_program(&[ll, sc]);
    ctx.step(2);
    assert_eq!(ctx.gpr(1), 7);
    assert_eq!(ctx.gpr(2), 1); // success flag
    assert_eq!(ctx.m().bus_load_u32(DATA_PADDR), Some(9));
}

mod properties {
    use proptest::prelude::*;

    use super::{DATA_PADDR, DATA_VADDR};
    use crate::common::harness::*;

    proptest! {
        /// LWL;LWR of the same effective address reproduces the word at
        /// that address for every alignment and memory content.
        #[test]
        fn lwl_lwr_pair_is_idempotent(
            words in proptest::array::uniform4(any::<u32>()),
            misalign in 0u64..4,
            old_rt in any::<u64>(),
        ) {
            let mut ctx = TestContext::new();
            for (i, w) in words.iter().enumerate() {
                prop_assert!(ctx.m().bus_store_u32(DATA_PADDR + 4 * i as u64, *w));
            }
            ctx.set_gpr(4, DATA_VADDR + misalign);
            ctx.set_gpr(1, old_rt);
            ctx.load_program(&[lwl(1, 4, 0), lwr(1, 4, 3)]);
            ctx.step(2);

            let mut expect = 0u32;
            for i in 0..4 {
                let byte = ctx.m().bus_load_u8(DATA_PADDR + misalign + i).unwrap();
                expect = (expect << 8) | byte as u32;
            }
            prop_assert_eq!(ctx.gpr(1), expect as i32 as i64 as u64);
        }
    }
}

#[test]
fn sc_fails_without_link() {
    let mut ctx = TestContext::new();
    assert!(ctx.m().bus_store_u32(DATA_PADDR, 7));
    ctx.set_gpr(4, DATA_VADDR);
    ctx.set_gpr(2, 9);
    let sc = (0x38 << 26) | (4 << 21) | (2 << 16);
    ctx.load_program(&[sc]);
    ctx.step(1);
    assert_eq!(ctx.gpr(2), 0);
    assert_eq!(ctx.m().bus_load_u32(DATA_PADDR), Some(7));
}
