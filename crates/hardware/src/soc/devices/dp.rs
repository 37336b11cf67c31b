//! DP command registers.
//!
//! `DPC_START` and `DPC_END` form the command FIFO: writing END drains
//! commands from CURRENT to the new end pointer, invoking the rasteriser
//! synchronously. The status register uses paired set/clear write bits for
//! the xbus/freeze/flush flags and exposes the busy counters.

use crate::state::Machine;

/// Status read bits.
pub const DPC_STATUS_XBUS_DMEM_DMA: u32 = 1 << 0;
pub const DPC_STATUS_FREEZE: u32 = 1 << 1;
pub const DPC_STATUS_FLUSH: u32 = 1 << 2;
pub const DPC_STATUS_START_GCLK: u32 = 1 << 3;
pub const DPC_STATUS_TMEM_BUSY: u32 = 1 << 4;
pub const DPC_STATUS_PIPE_BUSY: u32 = 1 << 5;
pub const DPC_STATUS_CMD_BUSY: u32 = 1 << 6;
pub const DPC_STATUS_CBUF_READY: u32 = 1 << 7;
pub const DPC_STATUS_DMA_BUSY: u32 = 1 << 8;
pub const DPC_STATUS_END_VALID: u32 = 1 << 9;
pub const DPC_STATUS_START_VALID: u32 = 1 << 10;

// Status write bits.
const WRITE_CLR_XBUS: u32 = 1 << 0;
const WRITE_SET_XBUS: u32 = 1 << 1;
const WRITE_CLR_FREEZE: u32 = 1 << 2;
const WRITE_SET_FREEZE: u32 = 1 << 3;
const WRITE_CLR_FLUSH: u32 = 1 << 4;
const WRITE_SET_FLUSH: u32 = 1 << 5;
const WRITE_CLR_TMEM_CTR: u32 = 1 << 6;
const WRITE_CLR_PIPE_CTR: u32 = 1 << 7;
const WRITE_CLR_CMD_CTR: u32 = 1 << 8;
const WRITE_CLR_CLOCK_CTR: u32 = 1 << 9;

const DPC_START_REG: u64 = 0x00;
const DPC_END_REG: u64 = 0x04;
const DPC_CURRENT_REG: u64 = 0x08;
const DPC_STATUS_REG: u64 = 0x0C;
const DPC_CLOCK_REG: u64 = 0x10;
const DPC_BUF_BUSY_REG: u64 = 0x14;
const DPC_PIPE_BUSY_REG: u64 = 0x18;
const DPC_TMEM_REG: u64 = 0x1C;

/// Applies a DPC status write (paired set/clear bits and counter clears).
pub fn write_status(m: &mut Machine, val: u32) {
    let mut status = m.hwreg.dpc_status;
    if val & WRITE_CLR_XBUS != 0 {
        status &= !DPC_STATUS_XBUS_DMEM_DMA;
    }
    if val & WRITE_SET_XBUS != 0 {
        status |= DPC_STATUS_XBUS_DMEM_DMA;
    }
    if val & WRITE_CLR_FREEZE != 0 {
        status &= !DPC_STATUS_FREEZE;
    }
    if val & WRITE_SET_FREEZE != 0 {
        status |= DPC_STATUS_FREEZE;
    }
    if val & WRITE_CLR_FLUSH != 0 {
        status &= !DPC_STATUS_FLUSH;
    }
    if val & WRITE_SET_FLUSH != 0 {
        status |= DPC_STATUS_FLUSH;
    }
    if val & WRITE_CLR_TMEM_CTR != 0 {
        m.hwreg.dpc_tmem = 0;
    }
    if val & WRITE_CLR_PIPE_CTR != 0 {
        m.hwreg.dpc_pipe_busy = 0;
    }
    if val & WRITE_CLR_CMD_CTR != 0 {
        m.hwreg.dpc_buf_busy = 0;
    }
    if val & WRITE_CLR_CLOCK_CTR != 0 {
        m.hwreg.dpc_clock = 0;
    }
    m.hwreg.dpc_status = status;
}

/// Reads a DPC register.
pub fn read(m: &mut Machine, offset: u64) -> Option<u32> {
    match offset {
        DPC_START_REG => Some(m.hwreg.dpc_start),
        DPC_END_REG => Some(m.hwreg.dpc_end),
        DPC_CURRENT_REG => Some(m.hwreg.dpc_current),
        DPC_STATUS_REG => Some(m.hwreg.dpc_status),
        DPC_CLOCK_REG => Some(m.hwreg.dpc_clock),
        DPC_BUF_BUSY_REG => Some(m.hwreg.dpc_buf_busy),
        DPC_PIPE_BUSY_REG => Some(m.hwreg.dpc_pipe_busy),
        DPC_TMEM_REG => Some(m.hwreg.dpc_tmem),
        _ => None,
    }
}

/// Writes a DPC register. Writing END drains the command FIFO.
pub fn write(m: &mut Machine, offset: u64, val: u32) -> bool {
    match offset {
        DPC_START_REG => {
            // Approximated as also loading CURRENT: the real part latches
            // START into CURRENT when the transfer begins.
            m.hwreg.dpc_start = val & 0x00FF_FFFF;
            m.hwreg.dpc_current = val & 0x00FF_FFFF;
            true
        }
        DPC_END_REG => {
            m.hwreg.dpc_end = val & 0x00FF_FFFF;
            m.rdp_drain_commands();
            true
        }
        DPC_CURRENT_REG => true, // read-only
        DPC_STATUS_REG => {
            write_status(m, val);
            true
        }
        DPC_CLOCK_REG | DPC_BUF_BUSY_REG | DPC_PIPE_BUSY_REG | DPC_TMEM_REG => true,
        _ => false,
    }
}
