//! Peripheral interface registers.
//!
//! The PI moves bytes between the cartridge bus and DRAM. Transfers are
//! modelled as atomic: the length-register write completes the whole move,
//! then the completion interrupt is scheduled after a byte-count estimate.

use crate::common::constants::CART_ROM_BASE;
use crate::sim::events::EventKind;
use crate::soc::devices::mi;
use crate::state::Machine;

/// Status: DMA in progress.
pub const PI_STATUS_DMA_BUSY: u32 = 1 << 0;
/// Status: IO access in progress.
pub const PI_STATUS_IO_BUSY: u32 = 1 << 1;
/// Status: transfer error.
pub const PI_STATUS_ERROR: u32 = 1 << 2;
/// Status: interrupt pending (mirrors the MI line).
pub const PI_STATUS_INTERRUPT: u32 = 1 << 3;

/// Status write: reset the PI state machine.
const WRITE_RESET: u32 = 1 << 0;
/// Status write: acknowledge the PI interrupt.
const WRITE_CLR_INTR: u32 = 1 << 1;

const PI_DRAM_ADDR_REG: u64 = 0x00;
const PI_CART_ADDR_REG: u64 = 0x04;
const PI_RD_LEN_REG: u64 = 0x08;
const PI_WR_LEN_REG: u64 = 0x0C;
const PI_STATUS_REG: u64 = 0x10;
/// First of the eight BSD domain timing registers (0x14..0x30).
const PI_DOMAIN_BASE: u64 = 0x14;

/// Cycles per transferred byte used for the completion estimate.
const PI_CYCLES_PER_BYTE: u64 = 9;

/// Completion event: drop the busy bit and raise the PI interrupt.
pub fn dma_finish(m: &mut Machine) {
    m.hwreg.pi_status &= !PI_STATUS_DMA_BUSY;
    m.hwreg.pi_status |= PI_STATUS_INTERRUPT;
    mi::raise(m, mi::MI_INTR_PI);
}

/// Runs a PI DMA. `to_dram` is the WR_LEN direction (cartridge → DRAM).
fn dma(m: &mut Machine, len_reg: u32, to_dram: bool) {
    let length = (len_reg & 0x00FF_FFFF) as usize + 1;
    let dram_addr = (m.hwreg.pi_dram_addr & 0x00FF_FFFE) as usize;
    let cart_addr = m.hwreg.pi_cart_addr as u64;

    if to_dram {
        let rom_off = cart_addr.wrapping_sub(CART_ROM_BASE) as usize;
        for i in 0..length {
            let byte = m.rom.get(rom_off + i).copied().unwrap_or(0);
            if dram_addr + i < m.dram.len() {
                m.dram[dram_addr + i] = byte;
            }
        }
        m.invalidate_blocks(dram_addr as u64, length as u64);
    } else {
        // DRAM → cartridge: the address space is read-only on every shipped
        // cartridge; accept and discard, as the console does for ROM.
        tracing::debug!(cart_addr, length, "PI DMA to cartridge discarded");
    }

    m.stats.dma_bytes += length as u64;
    m.hwreg.pi_status |= PI_STATUS_DMA_BUSY;
    let eta = m.cycles + length as u64 * PI_CYCLES_PER_BYTE;
    m.events.schedule(eta, EventKind::PiDmaFinish);
}

/// Reads a PI register.
pub fn read(m: &mut Machine, offset: u64) -> Option<u32> {
    match offset {
        PI_DRAM_ADDR_REG => Some(m.hwreg.pi_dram_addr),
        PI_CART_ADDR_REG => Some(m.hwreg.pi_cart_addr),
        PI_RD_LEN_REG => Some(m.hwreg.pi_rd_len),
        PI_WR_LEN_REG => Some(m.hwreg.pi_wr_len),
        PI_STATUS_REG => Some(m.hwreg.pi_status),
        o if (PI_DOMAIN_BASE..PI_DOMAIN_BASE + 0x20).contains(&o) && o & 3 == 0 => {
            Some(m.hwreg.pi_domain[((o - PI_DOMAIN_BASE) / 4) as usize])
        }
        _ => None,
    }
}

/// Writes a PI register.
pub fn write(m: &mut Machine, offset: u64, val: u32) -> bool {
    match offset {
        PI_DRAM_ADDR_REG => m.hwreg.pi_dram_addr = val & 0x00FF_FFFE,
        PI_CART_ADDR_REG => m.hwreg.pi_cart_addr = val & !1,
        PI_RD_LEN_REG => {
            m.hwreg.pi_rd_len = val;
            dma(m, val, false);
        }
        PI_WR_LEN_REG => {
            m.hwreg.pi_wr_len = val;
            dma(m, val, true);
        }
        PI_STATUS_REG => {
            if val & WRITE_RESET != 0 {
                m.hwreg.pi_status = 0;
                m.events.cancel(EventKind::PiDmaFinish);
            }
            if val & WRITE_CLR_INTR != 0 {
                m.hwreg.pi_status &= !PI_STATUS_INTERRUPT;
                mi::lower(m, mi::MI_INTR_PI);
            }
        }
        o if (PI_DOMAIN_BASE..PI_DOMAIN_BASE + 0x20).contains(&o) && o & 3 == 0 => {
            m.hwreg.pi_domain[((o - PI_DOMAIN_BASE) / 4) as usize] = val & 0xFF;
        }
        _ => return false,
    }
    true
}
