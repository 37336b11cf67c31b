//! Serial interface registers.
//!
//! The SI shuttles the 64-byte PIF RAM to and from DRAM. Like the PI, the
//! byte move is synchronous and the completion interrupt is scheduled.

use crate::common::constants::PIF_RAM_SIZE;
use crate::sim::events::EventKind;
use crate::soc::devices::mi;
use crate::state::Machine;

/// Status: DMA in progress.
pub const SI_STATUS_DMA_BUSY: u32 = 1 << 0;
/// Status: IO read in progress.
pub const SI_STATUS_RD_BUSY: u32 = 1 << 1;
/// Status: DMA error.
pub const SI_STATUS_DMA_ERROR: u32 = 1 << 3;
/// Status: interrupt pending.
pub const SI_STATUS_INTERRUPT: u32 = 1 << 12;

const SI_DRAM_ADDR_REG: u64 = 0x00;
const SI_PIF_ADDR_RD64B_REG: u64 = 0x04;
const SI_PIF_ADDR_WR64B_REG: u64 = 0x10;
const SI_STATUS_REG: u64 = 0x18;

/// Cycles per transferred byte used for the completion estimate.
const SI_CYCLES_PER_BYTE: u64 = 64;

/// Completion event: drop the busy bit and raise the SI interrupt.
pub fn dma_finish(m: &mut Machine) {
    m.hwreg.si_status &= !SI_STATUS_DMA_BUSY;
    m.hwreg.si_status |= SI_STATUS_INTERRUPT;
    mi::raise(m, mi::MI_INTR_SI);
}

/// Runs one 64-byte PIF DMA. `to_pif` is the WR64B direction.
fn dma(m: &mut Machine, to_pif: bool) {
    let dram_addr = (m.hwreg.si_dram_addr & 0x00FF_FFF8) as usize;
    if to_pif {
        for i in 0..PIF_RAM_SIZE {
            m.pif_ram[i] = m.dram.get(dram_addr + i).copied().unwrap_or(0);
        }
        m.pif_command_write();
    } else {
        m.pif_command_read();
        for i in 0..PIF_RAM_SIZE {
            if dram_addr + i < m.dram.len() {
                m.dram[dram_addr + i] = m.pif_ram[i];
            }
        }
        m.invalidate_blocks(dram_addr as u64, PIF_RAM_SIZE as u64);
    }
    m.stats.dma_bytes += PIF_RAM_SIZE as u64;
    m.hwreg.si_status |= SI_STATUS_DMA_BUSY;
    let eta = m.cycles + (PIF_RAM_SIZE as u64) * SI_CYCLES_PER_BYTE;
    m.events.schedule(eta, EventKind::SiDmaFinish);
}

/// Reads an SI register.
pub fn read(m: &mut Machine, offset: u64) -> Option<u32> {
    match offset {
        SI_DRAM_ADDR_REG => Some(m.hwreg.si_dram_addr),
        SI_PIF_ADDR_RD64B_REG | SI_PIF_ADDR_WR64B_REG => Some(0),
        SI_STATUS_REG => Some(m.hwreg.si_status),
        _ => None,
    }
}

/// Writes an SI register.
pub fn write(m: &mut Machine, offset: u64, val: u32) -> bool {
    match offset {
        SI_DRAM_ADDR_REG => m.hwreg.si_dram_addr = val & 0x00FF_FFFF,
        SI_PIF_ADDR_RD64B_REG => dma(m, false),
        SI_PIF_ADDR_WR64B_REG => dma(m, true),
        SI_STATUS_REG => {
            // Any status write acknowledges the SI interrupt.
            m.hwreg.si_status &= !SI_STATUS_INTERRUPT;
            mi::lower(m, mi::MI_INTR_SI);
        }
        _ => return false,
    }
    true
}
