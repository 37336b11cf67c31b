//! RSP COP0 register bridge.
//!
//! The RSP sees the SP and DP control registers as its coprocessor 0.
//! Registers 0-7 map the SP bank, 8-15 the DP command bank; moves go
//! through the same device helpers the CPU-side bus uses so the side
//! effects (DMA kicks, semaphore, FIFO drain) are identical.

use crate::isa::InstructionBits;
use crate::soc::devices::sp::{self, SP_STATUS_DMA_BUSY, SP_STATUS_DMA_FULL};
use crate::soc::devices::dp;
use crate::state::Machine;

impl Machine {
    /// MFC0: reads an SP/DPC register into a scalar register.
    fn eval_rsp_mfc0(&mut self, instr: u32) {
        let rd = instr.rd() & 0xF;
        let val = match rd {
            0 => self.hwreg.sp_mem_addr,
            1 => self.hwreg.sp_dram_addr,
            2 => self.hwreg.sp_rd_len,
            3 => self.hwreg.sp_wr_len,
            4 => self.hwreg.sp_status,
            5 => (self.hwreg.sp_status & SP_STATUS_DMA_FULL != 0) as u32,
            6 => (self.hwreg.sp_status & SP_STATUS_DMA_BUSY != 0) as u32,
            7 => sp::read_semaphore(self),
            8 => self.hwreg.dpc_start,
            9 => self.hwreg.dpc_end,
            10 => self.hwreg.dpc_current,
            11 => self.hwreg.dpc_status,
            12 => self.hwreg.dpc_clock,
            13 => self.hwreg.dpc_buf_busy,
            14 => self.hwreg.dpc_pipe_busy,
            15 => self.hwreg.dpc_tmem,
            _ => unreachable!(),
        };
        tracing::trace!(reg = rd, val = format_args!("{val:#010x}"), "RSP MFC0");
        self.rsp.gpr.write(instr.rt(), val as i32 as i64 as u64);
    }

    /// MTC0: writes a scalar register into an SP/DPC register.
    fn eval_rsp_mtc0(&mut self, instr: u32) {
        let rd = instr.rd() & 0xF;
        let val = self.rsp.gpr.read(instr.rt()) as u32;
        tracing::trace!(reg = rd, val = format_args!("{val:#010x}"), "RSP MTC0");
        match rd {
            0 => self.hwreg.sp_mem_addr = val & 0x1FFF,
            1 => self.hwreg.sp_dram_addr = val & 0x00FF_FFFF,
            2 => {
                self.hwreg.sp_rd_len = val;
                self.sp_dma(val, false);
                self.events.schedule(
                    self.cycles + 1,
                    crate::sim::events::EventKind::SpDmaFinish,
                );
            }
            3 => {
                self.hwreg.sp_wr_len = val;
                self.sp_dma(val, true);
                self.events.schedule(
                    self.cycles + 1,
                    crate::sim::events::EventKind::SpDmaFinish,
                );
            }
            4 => sp::write_status(self, val),
            5 | 6 => {} // DMA_FULL / DMA_BUSY are read-only
            7 => self.hwreg.sp_semaphore = 0,
            8 => {
                self.hwreg.dpc_start = val & 0x00FF_FFFF;
                self.hwreg.dpc_current = val & 0x00FF_FFFF;
            }
            9 => {
                self.hwreg.dpc_end = val & 0x00FF_FFFF;
                self.rdp_drain_commands();
            }
            10 => {} // DPC_CURRENT is read-only
            11 => dp::write_status(self, val),
            12..=15 => self.halt("RSP write to DPC busy counter"),
            _ => unreachable!(),
        }
    }

    /// Dispatches an RSP COP0 instruction.
    pub(crate) fn eval_rsp_cop0(&mut self, instr: u32) {
        use crate::isa::opcodes::copz;
        match instr.rs() as u32 {
            copz::MF => self.eval_rsp_mfc0(instr),
            copz::MT => self.eval_rsp_mtc0(instr),
            _ => self.halt("invalid RSP COP0 instruction"),
        }
    }
}
