//! SP control registers.
//!
//! The CPU's view of the signal processor: DMA address/length registers,
//! the status register with its paired set/clear write encoding, and the
//! hardware semaphore. The same registers back the RSP's own COP0 view
//! (`rsp::cop0`); both go through the helpers here so the side effects
//! agree.

use crate::sim::events::EventKind;
use crate::soc::devices::mi;
use crate::soc::interconnect::RegionKind;
use crate::state::Machine;

/// Status read bits.
pub const SP_STATUS_HALT: u32 = 1 << 0;
pub const SP_STATUS_BROKE: u32 = 1 << 1;
pub const SP_STATUS_DMA_BUSY: u32 = 1 << 2;
pub const SP_STATUS_DMA_FULL: u32 = 1 << 3;
pub const SP_STATUS_IO_BUSY: u32 = 1 << 4;
pub const SP_STATUS_SSTEP: u32 = 1 << 5;
pub const SP_STATUS_INTR_BREAK: u32 = 1 << 6;
/// First of the eight signal bits (7..=14).
pub const SP_STATUS_SIG0: u32 = 1 << 7;

// Status write bits: paired set/clear encodings.
const WRITE_CLR_HALT: u32 = 1 << 0;
const WRITE_SET_HALT: u32 = 1 << 1;
const WRITE_CLR_BROKE: u32 = 1 << 2;
const WRITE_CLR_INTR: u32 = 1 << 3;
const WRITE_SET_INTR: u32 = 1 << 4;
const WRITE_CLR_SSTEP: u32 = 1 << 5;
const WRITE_SET_SSTEP: u32 = 1 << 6;
const WRITE_CLR_INTR_BREAK: u32 = 1 << 7;
const WRITE_SET_INTR_BREAK: u32 = 1 << 8;
/// First of the sixteen paired signal clear/set bits (9..=24).
const WRITE_CLR_SIG0: u32 = 1 << 9;

const SP_MEM_ADDR_REG: u64 = 0x00;
const SP_DRAM_ADDR_REG: u64 = 0x04;
const SP_RD_LEN_REG: u64 = 0x08;
const SP_WR_LEN_REG: u64 = 0x0C;
const SP_STATUS_REG: u64 = 0x10;
const SP_DMA_FULL_REG: u64 = 0x14;
const SP_DMA_BUSY_REG: u64 = 0x18;
const SP_SEMAPHORE_REG: u64 = 0x1C;

const SP_PC_REG: u64 = 0x00;
const SP_IBIST_REG: u64 = 0x04;

/// Whether the RSP is currently halted (or broke).
pub fn halted(m: &Machine) -> bool {
    m.hwreg.sp_status & (SP_STATUS_HALT | SP_STATUS_BROKE) != 0
}

/// Reads the semaphore: returns the previous value and sets it, atomically
/// from the guest's point of view.
pub fn read_semaphore(m: &mut Machine) -> u32 {
    let prev = m.hwreg.sp_semaphore;
    m.hwreg.sp_semaphore = 1;
    prev
}

/// Applies a status-register write (paired set/clear bits).
pub fn write_status(m: &mut Machine, val: u32) {
    let mut status = m.hwreg.sp_status;

    if val & WRITE_CLR_HALT != 0 {
        status &= !SP_STATUS_HALT;
    }
    if val & WRITE_SET_HALT != 0 {
        status |= SP_STATUS_HALT;
    }
    if val & WRITE_CLR_BROKE != 0 {
        status &= !SP_STATUS_BROKE;
    }
    if val & WRITE_CLR_INTR != 0 {
        mi::lower(m, mi::MI_INTR_SP);
    }
    if val & WRITE_SET_INTR != 0 {
        mi::raise(m, mi::MI_INTR_SP);
    }
    if val & WRITE_CLR_SSTEP != 0 {
        status &= !SP_STATUS_SSTEP;
    }
    if val & WRITE_SET_SSTEP != 0 {
        status |= SP_STATUS_SSTEP;
    }
    if val & WRITE_CLR_INTR_BREAK != 0 {
        status &= !SP_STATUS_INTR_BREAK;
    }
    if val & WRITE_SET_INTR_BREAK != 0 {
        status |= SP_STATUS_INTR_BREAK;
    }
    for sig in 0..8 {
        if val & (WRITE_CLR_SIG0 << (2 * sig)) != 0 {
            status &= !(SP_STATUS_SIG0 << sig);
        }
        if val & (WRITE_CLR_SIG0 << (2 * sig + 1)) != 0 {
            status |= SP_STATUS_SIG0 << sig;
        }
    }

    m.hwreg.sp_status = status;
}

/// Reads an SP register (control bank or PC bank).
pub fn read(m: &mut Machine, kind: RegionKind, offset: u64) -> Option<u32> {
    if kind == RegionKind::SpPc {
        return match offset {
            SP_PC_REG => Some(m.hwreg.sp_pc),
            SP_IBIST_REG => Some(0),
            _ => None,
        };
    }
    match offset {
        SP_MEM_ADDR_REG => Some(m.hwreg.sp_mem_addr),
        SP_DRAM_ADDR_REG => Some(m.hwreg.sp_dram_addr),
        SP_RD_LEN_REG => Some(m.hwreg.sp_rd_len),
        SP_WR_LEN_REG => Some(m.hwreg.sp_wr_len),
        SP_STATUS_REG => Some(m.hwreg.sp_status),
        SP_DMA_FULL_REG => Some((m.hwreg.sp_status & SP_STATUS_DMA_FULL != 0) as u32),
        SP_DMA_BUSY_REG => Some((m.hwreg.sp_status & SP_STATUS_DMA_BUSY != 0) as u32),
        SP_SEMAPHORE_REG => Some(read_semaphore(m)),
        _ => None,
    }
}

/// Writes an SP register (control bank or PC bank).
pub fn write(m: &mut Machine, kind: RegionKind, offset: u64, val: u32) -> bool {
    if kind == RegionKind::SpPc {
        return match offset {
            SP_PC_REG => {
                m.hwreg.sp_pc = val & 0xFFC;
                m.rsp.pc = (val & 0xFFC) as u64;
                true
            }
            SP_IBIST_REG => true,
            _ => false,
        };
    }
    match offset {
        SP_MEM_ADDR_REG => {
            m.hwreg.sp_mem_addr = val & 0x1FFF;
            true
        }
        SP_DRAM_ADDR_REG => {
            m.hwreg.sp_dram_addr = val & 0x00FF_FFFF;
            true
        }
        SP_RD_LEN_REG => {
            m.hwreg.sp_rd_len = val;
            m.sp_dma(val, false);
            m.events.schedule(m.cycles + 1, EventKind::SpDmaFinish);
            true
        }
        SP_WR_LEN_REG => {
            m.hwreg.sp_wr_len = val;
            m.sp_dma(val, true);
            m.events.schedule(m.cycles + 1, EventKind::SpDmaFinish);
            true
        }
        SP_STATUS_REG => {
            write_status(m, val);
            true
        }
        SP_DMA_FULL_REG | SP_DMA_BUSY_REG => true, // read-only
        SP_SEMAPHORE_REG => {
            m.hwreg.sp_semaphore = 0;
            true
        }
        _ => false,
    }
}
