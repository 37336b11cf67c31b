//! The MMIO register block.
//!
//! A plain-old-data struct of every memory-mapped register value for the
//! SP, DP, MI, VI, AI, PI, SI and RI interfaces. Bus-side behaviour (paired
//! set/clear write bits, DMA kicks, interrupt raising) lives in
//! `soc::devices`; this block is only the storage, which keeps it trivially
//! snapshotable.

use serde::{Deserialize, Serialize};

/// Every MMIO register value, in one POD block.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct HwRegs {
    // SP interface.
    pub sp_mem_addr: u32,
    pub sp_dram_addr: u32,
    pub sp_rd_len: u32,
    pub sp_wr_len: u32,
    pub sp_status: u32,
    pub sp_semaphore: u32,
    pub sp_pc: u32,

    // DP command interface.
    pub dpc_start: u32,
    pub dpc_end: u32,
    pub dpc_current: u32,
    pub dpc_status: u32,
    pub dpc_clock: u32,
    pub dpc_buf_busy: u32,
    pub dpc_pipe_busy: u32,
    pub dpc_tmem: u32,

    // MIPS interface.
    pub mi_mode: u32,
    pub mi_version: u32,
    pub mi_intr: u32,
    pub mi_intr_mask: u32,

    // Video interface.
    pub vi_control: u32,
    pub vi_origin: u32,
    pub vi_width: u32,
    pub vi_intr: u32,
    pub vi_current: u32,
    pub vi_burst: u32,
    pub vi_v_sync: u32,
    pub vi_h_sync: u32,
    pub vi_leap: u32,
    pub vi_h_start: u32,
    pub vi_v_start: u32,
    pub vi_v_burst: u32,
    pub vi_x_scale: u32,
    pub vi_y_scale: u32,

    // Audio interface.
    pub ai_dram_addr: u32,
    pub ai_len: u32,
    pub ai_control: u32,
    pub ai_status: u32,
    pub ai_dacrate: u32,
    pub ai_bitrate: u32,

    // Peripheral interface.
    pub pi_dram_addr: u32,
    pub pi_cart_addr: u32,
    pub pi_rd_len: u32,
    pub pi_wr_len: u32,
    pub pi_status: u32,
    /// BSD domain 1/2 timing registers (LAT, PWD, PGS, RLS × 2).
    pub pi_domain: [u32; 8],

    // Serial interface.
    pub si_dram_addr: u32,
    pub si_status: u32,

    // RAM interface.
    pub ri_mode: u32,
    pub ri_config: u32,
    pub ri_current_load: u32,
    pub ri_select: u32,
    pub ri_refresh: u32,
    pub ri_latency: u32,
    pub ri_rerror: u32,
    pub ri_werror: u32,
}

impl HwRegs {
    /// Power-on register values.
    ///
    /// The SP comes out of reset halted; MI_VERSION is a constant the boot
    /// flow reads; RI_SELECT must be non-zero or the boot code loops
    /// forever waiting for RDRAM calibration.
    pub fn new() -> Self {
        Self {
            sp_status: crate::soc::devices::sp::SP_STATUS_HALT,
            mi_version: 0x0202_0102,
            ri_select: 0x14,
            ..Self::default()
        }
    }
}
