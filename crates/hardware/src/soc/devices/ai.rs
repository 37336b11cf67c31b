//! Audio interface registers.
//!
//! The AI streams sample buffers from DRAM to the DAC. Audio output itself
//! is out of scope; the register contract the guest depends on is the
//! length/busy handshake: writing `AI_LEN` with DMA enabled starts a
//! transfer whose completion interrupt arrives after a cycle estimate
//! derived from the buffer length.

use crate::sim::events::EventKind;
use crate::soc::devices::mi;
use crate::state::Machine;

/// Status: a transfer is pending behind the current one.
pub const AI_STATUS_FULL: u32 = 1 << 31;
/// Status: a transfer is in progress.
pub const AI_STATUS_DMA_BUSY: u32 = 1 << 30;

/// Control: DMA enable.
const AI_CONTROL_DMA_EN: u32 = 1 << 0;

const AI_DRAM_ADDR_REG: u64 = 0x00;
const AI_LEN_REG: u64 = 0x04;
const AI_CONTROL_REG: u64 = 0x08;
const AI_STATUS_REG: u64 = 0x0C;
const AI_DACRATE_REG: u64 = 0x10;
const AI_BITRATE_REG: u64 = 0x14;

/// Cycles per transferred byte used for the completion estimate.
const AI_CYCLES_PER_BYTE: u64 = 4;

/// Completion event: drop the busy bit and raise the AI interrupt.
pub fn dma_finish(m: &mut Machine) {
    m.hwreg.ai_status &= !(AI_STATUS_DMA_BUSY | AI_STATUS_FULL);
    m.hwreg.ai_len = 0;
    mi::raise(m, mi::MI_INTR_AI);
}

/// Reads an AI register.
pub fn read(m: &mut Machine, offset: u64) -> Option<u32> {
    match offset {
        AI_DRAM_ADDR_REG => Some(m.hwreg.ai_dram_addr),
        AI_LEN_REG => Some(m.hwreg.ai_len),
        AI_CONTROL_REG => Some(m.hwreg.ai_control),
        AI_STATUS_REG => Some(m.hwreg.ai_status),
        AI_DACRATE_REG => Some(m.hwreg.ai_dacrate),
        AI_BITRATE_REG => Some(m.hwreg.ai_bitrate),
        _ => None,
    }
}

/// Writes an AI register.
pub fn write(m: &mut Machine, offset: u64, val: u32) -> bool {
    match offset {
        AI_DRAM_ADDR_REG => m.hwreg.ai_dram_addr = val & 0x00FF_FFF8,
        AI_LEN_REG => {
            m.hwreg.ai_len = val & 0x0003_FFF8;
            if m.hwreg.ai_control & AI_CONTROL_DMA_EN != 0 && m.hwreg.ai_len != 0 {
                m.hwreg.ai_status |= AI_STATUS_DMA_BUSY;
                let eta = m.cycles + m.hwreg.ai_len as u64 * AI_CYCLES_PER_BYTE;
                m.events.schedule(eta, EventKind::AiDmaFinish);
                m.stats.dma_bytes += m.hwreg.ai_len as u64;
            }
        }
        AI_CONTROL_REG => m.hwreg.ai_control = val & 1,
        AI_STATUS_REG => {
            // Any status write acknowledges the AI interrupt.
            mi::lower(m, mi::MI_INTR_AI);
        }
        AI_DACRATE_REG => m.hwreg.ai_dacrate = val & 0x3FFF,
        AI_BITRATE_REG => m.hwreg.ai_bitrate = val & 0xF,
        _ => return false,
    }
    true
}
