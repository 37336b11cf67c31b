//! Exception entry and return.
//!
//! Architectural exceptions are in-band control flow: taking one writes the
//! COP0 context, asserts `Status.EXL` and redirects the program counter to
//! the architectural vector. Nothing unwinds; the interpreter resumes at
//! the handler on the next step.

use crate::common::Exception;
use crate::common::constants::{
    EXC_VECTOR_BASE, EXC_VECTOR_BASE_BEV, EXC_VECTOR_OFFSET_GENERAL,
    EXC_VECTOR_OFFSET_TLB_REFILL, EXC_VECTOR_OFFSET_XTLB_REFILL,
};
use crate::core::arch::NextAction;
use crate::core::arch::cp0::{
    CAUSE_BD, CAUSE_CE_MASK, CAUSE_EXCCODE_MASK, STATUS_EXL, cause_ce,
};
use crate::state::Machine;

impl Machine {
    /// Takes an architectural exception.
    ///
    /// Writes `EPC` (backed up to the branch and flagged with `Cause.BD`
    /// when the faulting instruction was in a delay slot), the faulting
    /// address registers for address/TLB faults, `Cause.ExcCode` and
    /// `Cause.CE`, asserts `Status.EXL`, and redirects `pc` to the vector:
    /// offset 0x000/0x080 for TLB/XTLB refills taken with EXL clear, 0x180
    /// otherwise, on the base selected by `Status.BEV`.
    ///
    /// # Arguments
    ///
    /// * `exn` - The exception kind.
    /// * `bad_vaddr` - Faulting virtual address (address/TLB faults only).
    /// * `in_instr_fetch` - Whether the fault occurred fetching the
    ///   instruction itself rather than executing it.
    /// * `is_load` - Load/fetch vs. store direction of the faulting access.
    /// * `ce` - Coprocessor index for CoprocessorUnusable.
    pub fn take_exception(
        &mut self,
        exn: Exception,
        bad_vaddr: u64,
        in_instr_fetch: bool,
        is_load: bool,
        ce: u32,
    ) {
        self.stats.exceptions += 1;
        if exn == Exception::Interrupt {
            self.stats.interrupts += 1;
        }

        let cp0 = &mut self.cpu.cp0;
        let refill = matches!(exn, Exception::TLBRefill | Exception::XTLBRefill);

        // EPC and Cause.BD only update when not already at exception level:
        // a nested fault inside a handler keeps the original context.
        let mut cause = cp0.cause & !(CAUSE_BD | CAUSE_CE_MASK | CAUSE_EXCCODE_MASK);
        if !cp0.exl() {
            if self.cpu.in_delay_slot && !in_instr_fetch {
                cp0.epc = self.cpu.pc.wrapping_sub(4);
                cause |= CAUSE_BD;
            } else {
                cp0.epc = self.cpu.pc;
            }
        }
        cause |= exn.exc_code(is_load) << 2;
        cause |= cause_ce(ce);

        // Address context for the translation faults.
        if matches!(
            exn,
            Exception::AddressError
                | Exception::TLBRefill
                | Exception::XTLBRefill
                | Exception::TLBInvalid
                | Exception::TLBModified
        ) {
            cp0.bad_vaddr = bad_vaddr;
            if exn != Exception::AddressError {
                let vpn2 = (bad_vaddr >> 13) & 0x7_FFFF;
                cp0.context = (cp0.context & !0x7F_FFF0) | (vpn2 << 4);
                let xvpn2 = (bad_vaddr >> 13) & 0x7FF_FFFF;
                let region = (bad_vaddr >> 62) & 0x3;
                cp0.xcontext = (cp0.xcontext & !0x1_FFFF_FFF0) | (region << 31) | (xvpn2 << 4);
                cp0.entry_hi = (cp0.entry_hi & 0xFF) | (bad_vaddr & 0xC000_00FF_FFFF_E000);
            }
        }

        let offset = if refill && !cp0.exl() {
            if exn == Exception::XTLBRefill {
                EXC_VECTOR_OFFSET_XTLB_REFILL
            } else {
                EXC_VECTOR_OFFSET_TLB_REFILL
            }
        } else {
            EXC_VECTOR_OFFSET_GENERAL
        };
        let base = if cp0.bev() {
            EXC_VECTOR_BASE_BEV
        } else {
            EXC_VECTOR_BASE
        };

        cp0.cause = cause;
        cp0.sr |= STATUS_EXL;
        self.cpu.ll_bit = false;

        // Redirect through the sequencer so a step that raised mid-eval
        // still commits to the vector, whatever stage it was in.
        self.cpu.pc = base + offset;
        self.cpu.next_action = NextAction::Jump;
        self.cpu.next_pc = base + offset;
        self.cpu.in_delay_slot = false;

        tracing::debug!(
            exception = %exn,
            epc = format_args!("{:#x}", self.cpu.cp0.epc),
            vector = format_args!("{:#x}", base + offset),
            "exception taken"
        );
    }

    /// Returns from exception (`ERET`).
    ///
    /// Restores `pc` from ErrorEPC or EPC depending on `Status.ERL`,
    /// clears the corresponding level bit and the LL bit. ERET has no
    /// delay slot.
    pub fn eret(&mut self) {
        let cp0 = &mut self.cpu.cp0;
        if cp0.erl() {
            self.cpu.next_pc = cp0.error_epc;
            cp0.sr &= !crate::core::arch::cp0::STATUS_ERL;
        } else {
            self.cpu.next_pc = cp0.epc;
            cp0.sr &= !STATUS_EXL;
        }
        self.cpu.next_action = NextAction::Jump;
        self.cpu.pc = self.cpu.next_pc;
        self.cpu.ll_bit = false;
        self.invalidate_blocks_on_status_write();
    }

    /// Delivers a pending interrupt if enabled and unmasked.
    ///
    /// # Returns
    ///
    /// `true` when an interrupt was taken and the step should not execute
    /// an instruction.
    pub(crate) fn check_interrupts(&mut self) -> bool {
        let cp0 = &self.cpu.cp0;
        if !cp0.interrupts_enabled() {
            return false;
        }
        let pending = cp0.cause & cp0.sr & crate::core::arch::cp0::CAUSE_IP_MASK;
        if pending == 0 {
            return false;
        }
        self.take_exception(Exception::Interrupt, 0, false, true, 0);
        true
    }
}
