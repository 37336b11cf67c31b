//! SP DMA engine.
//!
//! Descriptor-driven byte moves between DRAM and the SP scratch memories.
//! The transfer is atomic: the register write that triggers it completes
//! the entire move synchronously, then the busy bit is dropped by a
//! scheduled completion event.
//!
//! The length register packs three fields: bits 0-11 are the row length
//! minus one, bits 12-19 the row count minus one, bits 20-31 a DRAM skip
//! applied between rows.

use crate::soc::devices::sp::{SP_STATUS_DMA_BUSY, SP_STATUS_HALT};
use crate::state::Machine;

impl Machine {
    /// Runs one SP DMA transfer described by a RD_LEN/WR_LEN write.
    ///
    /// # Arguments
    ///
    /// * `len_reg` - The raw length register value.
    /// * `to_dram` - Direction: `true` for scratch→DRAM (WR_LEN), `false`
    ///   for DRAM→scratch (RD_LEN).
    pub(crate) fn sp_dma(&mut self, len_reg: u32, to_dram: bool) {
        let length = ((len_reg & 0xFFF) as usize | 7) + 1; // rounded up to 8
        let count = ((len_reg >> 12) & 0xFF) as usize + 1;
        let skip = ((len_reg >> 20) & 0xFFF) as usize;

        let use_imem = self.hwreg.sp_mem_addr & 0x1000 != 0;
        let mut mem_addr = (self.hwreg.sp_mem_addr & 0xFF8) as usize;
        let mut dram_addr = (self.hwreg.sp_dram_addr & 0x00FF_FFF8) as usize;

        for _ in 0..count {
            for i in 0..length {
                let mem_off = (mem_addr + i) & 0xFFF;
                let dram_off = dram_addr + i;
                if dram_off >= self.dram.len() {
                    continue;
                }
                if to_dram {
                    let byte = if use_imem {
                        self.imem[mem_off]
                    } else {
                        self.dmem[mem_off]
                    };
                    self.dram[dram_off] = byte;
                } else {
                    let byte = self.dram[dram_off];
                    if use_imem {
                        self.imem[mem_off] = byte;
                    } else {
                        self.dmem[mem_off] = byte;
                    }
                }
            }
            mem_addr = (mem_addr + length) & 0xFFF;
            dram_addr += length + skip;
        }

        let total = (length * count) as u64;
        self.stats.dma_bytes += total;
        self.cycles += total / 8;

        if to_dram {
            // Recompiled VR blocks may cover the DMA'd DRAM range.
            self.invalidate_blocks((self.hwreg.sp_dram_addr & 0x00FF_FFF8) as u64, total);
        }

        self.hwreg.sp_status |= SP_STATUS_DMA_BUSY;
        self.hwreg.sp_mem_addr = (mem_addr as u32 & 0xFFF) | ((use_imem as u32) << 12);
        self.hwreg.sp_dram_addr = dram_addr as u32 & 0x00FF_FFFF;

        tracing::trace!(
            length,
            count,
            skip,
            to_dram,
            imem = use_imem,
            "SP DMA transfer"
        );
    }

    /// Drops the DMA busy bit (completion event).
    pub(crate) fn sp_dma_finish(&mut self) {
        self.hwreg.sp_status &= !SP_STATUS_DMA_BUSY;
    }

    /// Whether the RSP should execute instructions this tick.
    pub(crate) fn sp_running(&self) -> bool {
        self.hwreg.sp_status & SP_STATUS_HALT == 0
            && self.hwreg.sp_status & crate::soc::devices::sp::SP_STATUS_BROKE == 0
    }
}
