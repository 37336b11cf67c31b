//! Command list and fill-mode tests.

use pretty_assertions::assert_eq;

use n64_core::common::constants::DP_REGS_BASE;

use crate::common::harness::*;

const LIST_PADDR: u64 = 0x2000;

/// Writes a command list to DRAM and drains it through the DPC registers.
fn run_list(ctx: &mut TestContext, commands: &[u64]) {
    let m = ctx.m();
    for (i, cmd) in commands.iter().enumerate() {
        assert!(m.bus_store_u64(LIST_PADDR + 8 * i as u64, *cmd));
    }
    assert!(m.bus_store_u32(DP_REGS_BASE, LIST_PADDR as u32));
    assert!(m.bus_store_u32(DP_REGS_BASE + 4, (LIST_PADDR + 8 * commands.len() as u64) as u32));
}

fn set_other_modes_fill() -> u64 {
    (0x2F << 56) | (3u64 << 52)
}

fn set_color_image_rgba5551(width: u32, addr: u32) -> u64 {
    (0x3F << 56) | (2u64 << 51) | (((width - 1) as u64) << 32) | addr as u64
}

fn set_scissor(xh: u32, yh: u32, xl: u32, yl: u32) -> u64 {
    (0x2D << 56)
        | ((xh as u64) << 44)
        | ((yh as u64) << 32)
        | ((xl as u64) << 12)
        | yl as u64
}

fn set_fill_color(color: u32) -> u64 {
    (0x37 << 56) | color as u64
}

fn fill_rectangle(xh: u32, yh: u32, xl: u32, yl: u32) -> u64 {
    (0x36 << 56)
        | ((xl as u64) << 44)
        | ((yl as u64) << 32)
        | ((xh as u64) << 12)
        | yh as u64
}

/// A 320x240 16-bit frame filled with an all-ones color writes exactly
/// 320*240*2 bytes of 0xFF.
#[test]
fn fill_rectangle_covers_the_frame() {
    let mut ctx = TestContext::new();
    let fb = 0x10_0000u32;
    run_list(
        &mut ctx,
        &[
            set_other_modes_fill(),
            set_color_image_rgba5551(320, fb),
            set_scissor(0, 0, 320 << 2, 240 << 2),
            set_fill_color(0xFFFF_FFFF),
            fill_rectangle(0, 0, 320 << 2, 240 << 2),
        ],
    );

    let m = ctx.m();
    assert!(!m.halted, "halted: {}", m.halt_reason);
    let frame = &m.dram[fb as usize..fb as usize + 320 * 240 * 2];
    assert!(frame.iter().all(|b| *b == 0xFF));
    // One byte past the frame is untouched.
    assert_eq!(m.dram[fb as usize + 320 * 240 * 2], 0);
}

#[test]
fn fill_respects_the_scissor_box() {
    let mut ctx = TestContext::new();
    let fb = 0x10_0000u32;
    run_list(
        &mut ctx,
        &[
            set_other_modes_fill(),
            set_color_image_rgba5551(320, fb),
            // Scissor covers only the first 8 columns and 2 rows.
            set_scissor(0, 0, 8 << 2, 2 << 2),
            set_fill_color(0xFFFF_FFFF),
            fill_rectangle(0, 0, 320 << 2, 240 << 2),
        ],
    );

    let m = ctx.m();
    assert_eq!(m.dram[fb as usize], 0xFF);
    // Outside the scissor: column 8 of row 0.
    assert_eq!(m.dram[fb as usize + 16], 0x00);
    // Row 2 entirely clipped.
    assert_eq!(m.dram[fb as usize + 2 * 320 * 2], 0x00);
}

#[test]
fn fill_splats_the_32bit_register_across_pixel_pairs() {
    let mut ctx = TestContext::new();
    let fb = 0x10_0000u32;
    run_list(
        &mut ctx,
        &[
            set_other_modes_fill(),
            set_color_image_rgba5551(16, fb),
            set_scissor(0, 0, 16 << 2, 1 << 2),
            set_fill_color(0x1111_2222),
            fill_rectangle(0, 0, 16 << 2, 1 << 2),
        ],
    );

    let m = ctx.m();
    // Even pixels take the high half, odd pixels the low half.
    assert_eq!(m.dram[fb as usize], 0x11);
    assert_eq!(m.dram[fb as usize + 1], 0x11);
    assert_eq!(m.dram[fb as usize + 2], 0x22);
    assert_eq!(m.dram[fb as usize + 3], 0x22);
}

#[test]
fn fill_outside_fill_mode_halts() {
    let mut ctx = TestContext::new();
    run_list(
        &mut ctx,
        &[
            set_color_image_rgba5551(320, 0x10_0000),
            set_scissor(0, 0, 320 << 2, 240 << 2),
            fill_rectangle(0, 0, 32 << 2, 32 << 2),
        ],
    );
    assert!(ctx.m().halted);
}

#[test]
fn dpc_current_advances_to_end() {
    let mut ctx = TestContext::new();
    run_list(&mut ctx, &[set_fill_color(0x1234_5678)]);
    let m = ctx.m();
    assert_eq!(m.hwreg.dpc_current, (LIST_PADDR + 8) as u32);
    assert_eq!(m.rdp.fill_color, 0x1234_5678);
}

#[test]
fn sync_full_raises_the_dp_interrupt() {
    let mut ctx = TestContext::new();
    run_list(&mut ctx, &[0x29u64 << 56]);
    let m = ctx.m();
    assert_ne!(
        m.hwreg.mi_intr & n64_core::soc::devices::mi::MI_INTR_DP,
        0
    );
}
