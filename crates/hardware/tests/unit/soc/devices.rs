//! Device register semantics: DMA engines, interrupt plumbing, status
//! write encodings.

use pretty_assertions::assert_eq;

use n64_core::common::constants::*;
use n64_core::core::arch::cp0::CAUSE_IP2;
use n64_core::soc::devices::{mi, pi};

use crate::common::harness::*;

/// Steps the simulator loop (events included) with the CPU parked on NOPs.
fn run_sim(ctx: &mut TestContext, steps: usize) {
    for _ in 0..steps {
        ctx.sim.step();
    }
}

#[test]
fn pi_dma_copies_cartridge_to_dram() {
    let mut ctx = TestContext::new();
    let mut rom = vec![0u8; 8192];
    for (i, b) in rom.iter_mut().enumerate() {
        *b = i as u8;
    }
    ctx.m().load_rom_bytes(rom).unwrap();

    let m = ctx.m();
    assert!(m.bus_store_u32(PI_REGS_BASE, 0x1000)); // DRAM address
    assert!(m.bus_store_u32(PI_REGS_BASE + 4, CART_ROM_BASE as u32 + 0x40));
    assert!(m.bus_store_u32(PI_REGS_BASE + 0xC, 0xFF)); // WR_LEN: 256 bytes

    assert_eq!(m.bus_load_u8(0x1000), Some(0x40));
    assert_eq!(m.bus_load_u8(0x10FF), Some(0x3F));
    // Busy until the completion event fires.
    assert_ne!(m.hwreg.pi_status & pi::PI_STATUS_DMA_BUSY, 0);
}

#[test]
fn pi_dma_completion_raises_interrupt_then_ack_clears() {
    let mut ctx = TestContext::new();
    ctx.m().load_rom_bytes(vec![0u8; 4096]).unwrap();
    ctx.load_program(&[nop(); 16]);
    ctx.m().hwreg.mi_intr_mask = mi::MI_INTR_PI;

    let m = ctx.m();
    assert!(m.bus_store_u32(PI_REGS_BASE, 0x1000));
    assert!(m.bus_store_u32(PI_REGS_BASE + 4, CART_ROM_BASE as u32));
    assert!(m.bus_store_u32(PI_REGS_BASE + 0xC, 7));

    // Run the loop until the scheduled completion fires.
    run_sim(&mut ctx, 200);
    let m = ctx.m();
    assert_ne!(m.hwreg.mi_intr & mi::MI_INTR_PI, 0);
    assert_ne!(m.hwreg.pi_status & pi::PI_STATUS_INTERRUPT, 0);
    assert_ne!(m.cpu.cp0.cause & CAUSE_IP2, 0);

    // Acknowledge through the status write.
    assert!(m.bus_store_u32(PI_REGS_BASE + 0x10, 2));
    assert_eq!(m.hwreg.mi_intr & mi::MI_INTR_PI, 0);
    assert_eq!(m.cpu.cp0.cause & CAUSE_IP2, 0);
}

#[test]
fn si_dma_round_trips_pif_ram() {
    let mut ctx = TestContext::new();
    for i in 0..64u64 {
        assert!(ctx.m().bus_store_u8(0x3000 + i, i as u8));
    }
    let m = ctx.m();
    assert!(m.bus_store_u32(SI_REGS_BASE, 0x3000));
    assert!(m.bus_store_u32(SI_REGS_BASE + 0x10, 0)); // WR64B: DRAM -> PIF
    assert_eq!(m.pif_ram[5], 5);

    assert!(m.bus_store_u32(SI_REGS_BASE, 0x4000));
    assert!(m.bus_store_u32(SI_REGS_BASE + 0x04, 0)); // RD64B: PIF -> DRAM
    assert_eq!(m.bus_load_u8(0x4000 + 9), Some(9));
}

#[test]
fn ai_len_write_schedules_completion() {
    let mut ctx = TestContext::new();
    ctx.load_program(&[nop(); 16]);
    let m = ctx.m();
    assert!(m.bus_store_u32(AI_REGS_BASE + 8, 1)); // DMA enable
    assert!(m.bus_store_u32(AI_REGS_BASE, 0x2000));
    assert!(m.bus_store_u32(AI_REGS_BASE + 4, 0x100));
    assert_ne!(m.hwreg.ai_status & (1 << 30), 0);

    run_sim(&mut ctx, 2000);
    let m = ctx.m();
    assert_eq!(m.hwreg.ai_status & (1 << 30), 0);
    assert_ne!(m.hwreg.mi_intr & mi::MI_INTR_AI, 0);
}

#[test]
fn mi_mask_write_uses_paired_bits() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    // Set the SP (bit pair 0) and VI (bit pair 3) mask bits.
    assert!(m.bus_store_u32(MI_REGS_BASE + 0xC, (1 << 1) | (1 << 7)));
    assert_eq!(m.hwreg.mi_intr_mask, mi::MI_INTR_SP | mi::MI_INTR_VI);
    // Clear the SP bit.
    assert!(m.bus_store_u32(MI_REGS_BASE + 0xC, 1 << 0));
    assert_eq!(m.hwreg.mi_intr_mask, mi::MI_INTR_VI);
}

#[test]
fn masked_interrupt_does_not_reach_the_cpu() {
    let mut ctx = TestContext::new();
    mi::raise(ctx.m(), mi::MI_INTR_DP);
    assert_eq!(ctx.m().cpu.cp0.cause & CAUSE_IP2, 0);
    ctx.m().hwreg.mi_intr_mask = mi::MI_INTR_DP;
    mi::check_interrupts(ctx.m());
    assert_ne!(ctx.m().cpu.cp0.cause & CAUSE_IP2, 0);
}

#[test]
fn vi_current_tracks_the_cycle_counter() {
    let mut ctx = TestContext::new();
    ctx.m().cycles = VI_CYCLES_PER_LINE * 7;
    let line = ctx.m().bus_load_u32(VI_REGS_BASE + 0x10).unwrap();
    assert_eq!(line, 7 << 1);
}

#[test]
fn vi_line_event_raises_and_current_write_acks() {
    let mut ctx = TestContext::new();
    ctx.load_program(&[nop(); 4]);
    ctx.m().hwreg.mi_intr_mask = mi::MI_INTR_VI;
    ctx.m().hwreg.vi_intr = 1 << 1; // interrupt at line 1

    // Advance past one scan line so the line event fires.
    ctx.m().cycles = VI_CYCLES_PER_LINE + 1;
    run_sim(&mut ctx, 2);
    assert_ne!(ctx.m().hwreg.mi_intr & mi::MI_INTR_VI, 0);

    assert!(ctx.m().bus_store_u32(VI_REGS_BASE + 0x10, 0));
    assert_eq!(ctx.m().hwreg.mi_intr & mi::MI_INTR_VI, 0);
}

#[test]
fn ri_select_reads_nonzero_for_boot() {
    let mut ctx = TestContext::new();
    assert_ne!(ctx.m().bus_load_u32(RI_BASE + 0xC), Some(0));
}

#[test]
fn pif_joybus_flags_absent_devices() {
    let mut ctx = TestContext::new();
    let m = ctx.m();
    // One channel: 1 tx byte, 4 rx bytes, then end of list.
    m.pif_ram[0] = 0x01;
    m.pif_ram[1] = 0x04;
    m.pif_ram[2] = 0x01; // controller status command
    m.pif_ram[7] = 0xFE;
    m.pif_ram[63] = 0x01; // run joybus on next read
    assert!(m.bus_store_u32(SI_REGS_BASE, 0x5000));
    assert!(m.bus_store_u32(SI_REGS_BASE + 0x04, 0)); // RD64B runs the bus
    assert_eq!(m.pif_ram[1] & 0x80, 0x80);
}
