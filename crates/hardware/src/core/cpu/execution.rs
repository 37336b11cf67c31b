//! VR interpreter.
//!
//! One step: translate `pc`, fetch the 32-bit instruction, count the cycle,
//! dispatch by primary then secondary opcode, and run the delay-slot
//! sequencer. Branches never mutate `pc` directly; they arm the sequencer
//! with the target so the delay-slot instruction executes first.

use crate::common::Exception;
use crate::core::arch::NextAction;
use crate::core::arch::cp0::{self, CAUSE_IP7, INDEX_P};
use crate::isa::InstructionBits;
use crate::isa::opcodes::{cop0 as tlbop, copz, primary, regimm, special};
use crate::state::Machine;

impl Machine {
    /// Executes one VR instruction (or delivers a pending interrupt).
    pub fn step_cpu(&mut self) {
        if self.halted {
            return;
        }

        self.cycles += 1;
        self.stats.cpu_instructions += 1;

        if self.cpu.cp0.wired >= 32 {
            self.halt("bad invariant: cp0.wired >= 32");
            return;
        }
        self.advance_cp0_timers(1);

        self.cpu.in_delay_slot = self.cpu.next_action == NextAction::Jump;

        if !self.check_interrupts() {
            let vaddr = self.cpu.pc;
            match self.translate_address(vaddr, false) {
                Ok(paddr) => match self.bus_load_u32(paddr) {
                    Some(instr) => {
                        self.trace_point(vaddr);
                        self.eval_instr(instr);
                    }
                    None => self.take_exception(Exception::BusError, vaddr, true, true, 0),
                },
                Err(exn) => self.take_exception(exn, vaddr, true, true, 0),
            }
        }

        match self.cpu.next_action {
            NextAction::Continue => self.cpu.pc = self.cpu.pc.wrapping_add(4),
            NextAction::Delay => {
                self.cpu.next_action = NextAction::Jump;
                self.cpu.pc = self.cpu.pc.wrapping_add(4);
            }
            NextAction::Jump => {
                self.cpu.next_action = NextAction::Continue;
                self.cpu.pc = self.cpu.next_pc;
            }
        }
    }

    /// Advances the Count and Random registers by `delta` retired
    /// instructions.
    ///
    /// Shared by the interpreter (one per step) and the recompiled-block
    /// path, which applies the block's whole cycle delta at once so both
    /// execution modes leave identical COP0 timer state.
    pub(crate) fn advance_cp0_timers(&mut self, delta: u64) {
        if delta == 0 {
            return;
        }
        let cp0 = &mut self.cpu.cp0;

        // Compare matches when Count passes through it.
        let until_match = cp0.compare.wrapping_sub(cp0.count) as u64;
        cp0.count = cp0.count.wrapping_add(delta as u32);
        if until_match != 0 && until_match <= delta {
            cp0.set_ip(CAUSE_IP7);
        }

        // Random decrements once per instruction, wrapping from Wired
        // to 31.
        let wired = cp0.wired.min(31) as u64;
        let width = 32 - wired;
        let pos = (cp0.random as u64).saturating_sub(wired) % width;
        let new_pos = (pos + width - delta % width) % width;
        cp0.random = (wired + new_pos) as u32;
    }

    /// Dispatches one decoded instruction.
    ///
    /// The null instruction is `sll r0, r0, 0`, i.e. a NOP; it is by far
    /// the most common instruction (delay-slot filler), so it is special
    /// cased ahead of the match.
    pub fn eval_instr(&mut self, instr: u32) {
        if instr == 0 {
            return;
        }
        match instr.opcode() {
            primary::SPECIAL => self.eval_special(instr),
            primary::REGIMM => self.eval_regimm(instr),
            primary::J => {
                let tg = (self.cpu.pc & 0xFFFF_FFFF_F000_0000) | (instr.target() << 2);
                self.cpu.next_action = NextAction::Delay;
                self.cpu.next_pc = tg;
            }
            primary::JAL => {
                let tg = (self.cpu.pc & 0xFFFF_FFFF_F000_0000) | (instr.target() << 2);
                self.cpu.gpr.write(31, self.cpu.pc.wrapping_add(8));
                self.cpu.next_action = NextAction::Delay;
                self.cpu.next_pc = tg;
            }
            primary::BEQ => {
                let c = self.cpu.gpr.read(instr.rs()) == self.cpu.gpr.read(instr.rt());
                self.branch(c, instr.imm_se());
            }
            primary::BNE => {
                let c = self.cpu.gpr.read(instr.rs()) != self.cpu.gpr.read(instr.rt());
                self.branch(c, instr.imm_se());
            }
            primary::BLEZ => {
                let c = (self.cpu.gpr.read(instr.rs()) as i64) <= 0;
                self.branch(c, instr.imm_se());
            }
            primary::BGTZ => {
                let c = (self.cpu.gpr.read(instr.rs()) as i64) > 0;
                self.branch(c, instr.imm_se());
            }
            primary::BEQL => {
                let c = self.cpu.gpr.read(instr.rs()) == self.cpu.gpr.read(instr.rt());
                self.branch_likely(c, instr.imm_se());
            }
            primary::BNEL => {
                let c = self.cpu.gpr.read(instr.rs()) != self.cpu.gpr.read(instr.rt());
                self.branch_likely(c, instr.imm_se());
            }
            primary::BLEZL => {
                let c = (self.cpu.gpr.read(instr.rs()) as i64) <= 0;
                self.branch_likely(c, instr.imm_se());
            }
            primary::BGTZL => {
                let c = (self.cpu.gpr.read(instr.rs()) as i64) > 0;
                self.branch_likely(c, instr.imm_se());
            }
            primary::ADDI => {
                let a = self.cpu.gpr.read(instr.rs()) as u32 as i32;
                let b = instr.imm_se() as u32 as i32;
                match a.checked_add(b) {
                    Some(r) => self.cpu.gpr.write(instr.rt(), r as i64 as u64),
                    None => self.take_exception(Exception::IntegerOverflow, 0, false, false, 0),
                }
            }
            primary::ADDIU => {
                let r = (self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se())) as u32;
                self.cpu.gpr.write(instr.rt(), r as i32 as i64 as u64);
            }
            primary::SLTI => {
                let r = (self.cpu.gpr.read(instr.rs()) as i64) < (instr.imm_se() as i64);
                self.cpu.gpr.write(instr.rt(), r as u64);
            }
            primary::SLTIU => {
                let r = self.cpu.gpr.read(instr.rs()) < instr.imm_se();
                self.cpu.gpr.write(instr.rt(), r as u64);
            }
            primary::ANDI => {
                let r = self.cpu.gpr.read(instr.rs()) & instr.imm_ze();
                self.cpu.gpr.write(instr.rt(), r);
            }
            primary::ORI => {
                let r = self.cpu.gpr.read(instr.rs()) | instr.imm_ze();
                self.cpu.gpr.write(instr.rt(), r);
            }
            primary::XORI => {
                let r = self.cpu.gpr.read(instr.rs()) ^ instr.imm_ze();
                self.cpu.gpr.write(instr.rt(), r);
            }
            primary::LUI => {
                self.cpu.gpr.write(instr.rt(), instr.imm_se() << 16);
            }
            primary::COP0 => self.eval_cop0(instr),
            primary::COP1 => self.eval_cop1(instr),
            primary::COP2 | primary::COP3 => {
                let ce = instr.opcode() - primary::COP0;
                self.take_exception(Exception::CoprocessorUnusable, 0, false, false, ce);
            }
            primary::DADDI => {
                let a = self.cpu.gpr.read(instr.rs()) as i64;
                match a.checked_add(instr.imm_se() as i64) {
                    Some(r) => self.cpu.gpr.write(instr.rt(), r as u64),
                    None => self.take_exception(Exception::IntegerOverflow, 0, false, false, 0),
                }
            }
            primary::DADDIU => {
                let r = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                self.cpu.gpr.write(instr.rt(), r);
            }
            primary::LDL => self.eval_ldl(instr),
            primary::LDR => self.eval_ldr(instr),
            primary::LB => self.eval_load(instr, 1, true),
            primary::LH => self.eval_load(instr, 2, true),
            primary::LWL => self.eval_lwl(instr),
            primary::LW => self.eval_load(instr, 4, true),
            primary::LBU => self.eval_load(instr, 1, false),
            primary::LHU => self.eval_load(instr, 2, false),
            primary::LWR => self.eval_lwr(instr),
            primary::LWU => self.eval_load(instr, 4, false),
            primary::SB => self.eval_store(instr, 1),
            primary::SH => self.eval_store(instr, 2),
            primary::SWL => self.eval_swl(instr),
            primary::SW => self.eval_store(instr, 4),
            primary::SDL => self.eval_sdl(instr),
            primary::SDR => self.eval_sdr(instr),
            primary::SWR => self.eval_swr(instr),
            primary::CACHE => {}
            primary::LL => {
                let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                match self.virt_load(vaddr, 4) {
                    Ok(v) => {
                        self.cpu.gpr.write(instr.rt(), v as u32 as i32 as i64 as u64);
                        self.cpu.ll_bit = true;
                        self.cpu.cp0.ll_addr = (vaddr >> 4) as u32;
                    }
                    Err(exn) => self.take_exception(exn, vaddr, false, true, 0),
                }
            }
            primary::LWC1 => self.eval_lwc1(instr),
            primary::LWC2 | primary::LWC3 => {
                let ce = instr.opcode() - primary::LWC1 + 1;
                self.take_exception(Exception::CoprocessorUnusable, 0, false, true, ce);
            }
            primary::LLD => {
                let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                match self.virt_load(vaddr, 8) {
                    Ok(v) => {
                        self.cpu.gpr.write(instr.rt(), v);
                        self.cpu.ll_bit = true;
                        self.cpu.cp0.ll_addr = (vaddr >> 4) as u32;
                    }
                    Err(exn) => self.take_exception(exn, vaddr, false, true, 0),
                }
            }
            primary::LDC1 => self.eval_ldc1(instr),
            primary::LDC2 => {
                self.take_exception(Exception::CoprocessorUnusable, 0, false, true, 2);
            }
            primary::LD => self.eval_load(instr, 8, false),
            primary::SC => {
                let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                if self.cpu.ll_bit {
                    let val = self.cpu.gpr.read(instr.rt());
                    match self.virt_store(vaddr, 4, val) {
                        Ok(()) => self.cpu.gpr.write(instr.rt(), 1),
                        Err(exn) => self.take_exception(exn, vaddr, false, false, 0),
                    }
                } else {
                    self.cpu.gpr.write(instr.rt(), 0);
                }
            }
            primary::SWC1 => self.eval_swc1(instr),
            primary::SWC2 | primary::SWC3 => {
                let ce = instr.opcode() - primary::SWC1 + 1;
                self.take_exception(Exception::CoprocessorUnusable, 0, false, false, ce);
            }
            primary::SCD => {
                let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                if self.cpu.ll_bit {
                    let val = self.cpu.gpr.read(instr.rt());
                    match self.virt_store(vaddr, 8, val) {
                        Ok(()) => self.cpu.gpr.write(instr.rt(), 1),
                        Err(exn) => self.take_exception(exn, vaddr, false, false, 0),
                    }
                } else {
                    self.cpu.gpr.write(instr.rt(), 0);
                }
            }
            primary::SDC1 => self.eval_sdc1(instr),
            primary::SDC2 => {
                self.take_exception(Exception::CoprocessorUnusable, 0, false, false, 2);
            }
            primary::SD => self.eval_store(instr, 8),
            _ => self.take_exception(Exception::ReservedInstruction, 0, false, false, 0),
        }
    }

    /// Arms the delay-slot sequencer for a plain branch. Both outcomes run
    /// the delay slot; the target differs.
    fn branch(&mut self, cond: bool, imm: u64) {
        self.cpu.next_action = NextAction::Delay;
        self.cpu.next_pc = if cond {
            self.cpu.pc.wrapping_add(4).wrapping_add(imm << 2)
        } else {
            self.cpu.pc.wrapping_add(8)
        };
    }

    /// Branch-likely: the delay slot is nullified when not taken by
    /// skipping it outright.
    fn branch_likely(&mut self, cond: bool, imm: u64) {
        if cond {
            self.cpu.next_action = NextAction::Delay;
            self.cpu.next_pc = self.cpu.pc.wrapping_add(4).wrapping_add(imm << 2);
        } else {
            self.cpu.pc = self.cpu.pc.wrapping_add(4);
        }
    }

    fn eval_special(&mut self, instr: u32) {
        let rd = instr.rd();
        let rs = instr.rs();
        let rt = instr.rt();
        let sa = instr.shamt();
        match instr.funct() {
            special::SLL => {
                let r = (self.cpu.gpr.read(rt) as u32) << sa;
                self.cpu.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::SRL => {
                let r = (self.cpu.gpr.read(rt) as u32) >> sa;
                self.cpu.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::SRA => {
                let r = (self.cpu.gpr.read(rt) as u32 as i32) >> sa;
                self.cpu.gpr.write(rd, r as i64 as u64);
            }
            special::SLLV => {
                let sa = self.cpu.gpr.read(rs) & 0x1F;
                let r = (self.cpu.gpr.read(rt) as u32) << sa;
                self.cpu.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::SRLV => {
                let sa = self.cpu.gpr.read(rs) & 0x1F;
                let r = (self.cpu.gpr.read(rt) as u32) >> sa;
                self.cpu.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::SRAV => {
                let sa = self.cpu.gpr.read(rs) & 0x1F;
                let r = (self.cpu.gpr.read(rt) as u32 as i32) >> sa;
                self.cpu.gpr.write(rd, r as i64 as u64);
            }
            special::JR => {
                self.cpu.next_action = NextAction::Delay;
                self.cpu.next_pc = self.cpu.gpr.read(rs);
            }
            special::JALR => {
                let tg = self.cpu.gpr.read(rs);
                self.cpu.gpr.write(rd, self.cpu.pc.wrapping_add(8));
                self.cpu.next_action = NextAction::Delay;
                self.cpu.next_pc = tg;
            }
            special::MOVZ => {
                if self.cpu.gpr.read(rt) == 0 {
                    let v = self.cpu.gpr.read(rs);
                    self.cpu.gpr.write(rd, v);
                }
            }
            special::MOVN => {
                if self.cpu.gpr.read(rt) != 0 {
                    let v = self.cpu.gpr.read(rs);
                    self.cpu.gpr.write(rd, v);
                }
            }
            special::SYSCALL => {
                self.take_exception(Exception::SystemCall, 0, false, false, 0);
            }
            special::BREAK => {
                self.take_exception(Exception::Breakpoint, 0, false, false, 0);
            }
            special::SYNC => {}
            special::MFHI => {
                let v = self.cpu.mult_hi;
                self.cpu.gpr.write(rd, v);
            }
            special::MTHI => self.cpu.mult_hi = self.cpu.gpr.read(rs),
            special::MFLO => {
                let v = self.cpu.mult_lo;
                self.cpu.gpr.write(rd, v);
            }
            special::MTLO => self.cpu.mult_lo = self.cpu.gpr.read(rs),
            special::DSLLV => {
                let sa = self.cpu.gpr.read(rs) & 0x3F;
                let r = self.cpu.gpr.read(rt) << sa;
                self.cpu.gpr.write(rd, r);
            }
            special::DSRLV => {
                let sa = self.cpu.gpr.read(rs) & 0x3F;
                let r = self.cpu.gpr.read(rt) >> sa;
                self.cpu.gpr.write(rd, r);
            }
            special::DSRAV => {
                let sa = self.cpu.gpr.read(rs) & 0x3F;
                let r = (self.cpu.gpr.read(rt) as i64) >> sa;
                self.cpu.gpr.write(rd, r as u64);
            }
            special::MULT => {
                let a = self.cpu.gpr.read(rs) as u32 as i32 as i64;
                let b = self.cpu.gpr.read(rt) as u32 as i32 as i64;
                let m = (a * b) as u64;
                self.cpu.mult_lo = m as u32 as i32 as i64 as u64;
                self.cpu.mult_hi = (m >> 32) as u32 as i32 as i64 as u64;
            }
            special::MULTU => {
                let a = self.cpu.gpr.read(rs) as u32 as u64;
                let b = self.cpu.gpr.read(rt) as u32 as u64;
                let m = a * b;
                self.cpu.mult_lo = m as u32 as i32 as i64 as u64;
                self.cpu.mult_hi = (m >> 32) as u32 as i32 as i64 as u64;
            }
            special::DIV => {
                // 64-bit intermediates: INT32_MIN / -1 must not overflow.
                let num = self.cpu.gpr.read(rs) as u32 as i32 as i64;
                let denum = self.cpu.gpr.read(rt) as u32 as i32 as i64;
                if denum != 0 {
                    self.cpu.mult_lo = (num / denum) as u32 as i32 as i64 as u64;
                    self.cpu.mult_hi = (num % denum) as u32 as i32 as i64 as u64;
                } else {
                    // Undefined by the reference manual; the machine
                    // behaviour is as implemented.
                    self.cpu.mult_lo = if num < 0 { 1 } else { u64::MAX };
                    self.cpu.mult_hi = num as u32 as i32 as i64 as u64;
                }
            }
            special::DIVU => {
                let num = self.cpu.gpr.read(rs) as u32;
                let denum = self.cpu.gpr.read(rt) as u32;
                if denum != 0 {
                    self.cpu.mult_lo = (num / denum) as i32 as i64 as u64;
                    self.cpu.mult_hi = (num % denum) as i32 as i64 as u64;
                } else {
                    self.cpu.mult_lo = u64::MAX;
                    self.cpu.mult_hi = num as i32 as i64 as u64;
                }
            }
            special::DMULT => {
                let a = self.cpu.gpr.read(rs) as i64 as i128;
                let b = self.cpu.gpr.read(rt) as i64 as i128;
                let m = (a * b) as u128;
                self.cpu.mult_lo = m as u64;
                self.cpu.mult_hi = (m >> 64) as u64;
            }
            special::DMULTU => {
                let a = self.cpu.gpr.read(rs) as u128;
                let b = self.cpu.gpr.read(rt) as u128;
                let m = a * b;
                self.cpu.mult_lo = m as u64;
                self.cpu.mult_hi = (m >> 64) as u64;
            }
            special::DDIV => {
                let num = self.cpu.gpr.read(rs) as i64;
                let denum = self.cpu.gpr.read(rt) as i64;
                if denum != 0 {
                    self.cpu.mult_lo = num.wrapping_div(denum) as u64;
                    self.cpu.mult_hi = num.wrapping_rem(denum) as u64;
                } else {
                    self.cpu.mult_lo = if num < 0 { 1 } else { u64::MAX };
                    self.cpu.mult_hi = num as u64;
                }
            }
            special::DDIVU => {
                let num = self.cpu.gpr.read(rs);
                let denum = self.cpu.gpr.read(rt);
                if denum != 0 {
                    self.cpu.mult_lo = num / denum;
                    self.cpu.mult_hi = num % denum;
                } else {
                    self.cpu.mult_lo = u64::MAX;
                    self.cpu.mult_hi = num;
                }
            }
            special::ADD => {
                let a = self.cpu.gpr.read(rs) as u32 as i32;
                let b = self.cpu.gpr.read(rt) as u32 as i32;
                match a.checked_add(b) {
                    Some(r) => self.cpu.gpr.write(rd, r as i64 as u64),
                    None => self.take_exception(Exception::IntegerOverflow, 0, false, false, 0),
                }
            }
            special::ADDU => {
                let r = (self.cpu.gpr.read(rs).wrapping_add(self.cpu.gpr.read(rt))) as u32;
                self.cpu.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::SUB => {
                let a = self.cpu.gpr.read(rs) as u32 as i32;
                let b = self.cpu.gpr.read(rt) as u32 as i32;
                match a.checked_sub(b) {
                    Some(r) => self.cpu.gpr.write(rd, r as i64 as u64),
                    None => self.take_exception(Exception::IntegerOverflow, 0, false, false, 0),
                }
            }
            special::SUBU => {
                let r = (self.cpu.gpr.read(rs).wrapping_sub(self.cpu.gpr.read(rt))) as u32;
                self.cpu.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::AND => {
                let r = self.cpu.gpr.read(rs) & self.cpu.gpr.read(rt);
                self.cpu.gpr.write(rd, r);
            }
            special::OR => {
                let r = self.cpu.gpr.read(rs) | self.cpu.gpr.read(rt);
                self.cpu.gpr.write(rd, r);
            }
            special::XOR => {
                let r = self.cpu.gpr.read(rs) ^ self.cpu.gpr.read(rt);
                self.cpu.gpr.write(rd, r);
            }
            special::NOR => {
                let r = !(self.cpu.gpr.read(rs) | self.cpu.gpr.read(rt));
                self.cpu.gpr.write(rd, r);
            }
            special::SLT => {
                let r = (self.cpu.gpr.read(rs) as i64) < (self.cpu.gpr.read(rt) as i64);
                self.cpu.gpr.write(rd, r as u64);
            }
            special::SLTU => {
                let r = self.cpu.gpr.read(rs) < self.cpu.gpr.read(rt);
                self.cpu.gpr.write(rd, r as u64);
            }
            special::DADD => {
                let a = self.cpu.gpr.read(rs) as i64;
                let b = self.cpu.gpr.read(rt) as i64;
                match a.checked_add(b) {
                    Some(r) => self.cpu.gpr.write(rd, r as u64),
                    None => self.take_exception(Exception::IntegerOverflow, 0, false, false, 0),
                }
            }
            special::DADDU => {
                let r = self.cpu.gpr.read(rs).wrapping_add(self.cpu.gpr.read(rt));
                self.cpu.gpr.write(rd, r);
            }
            special::DSUB => {
                let a = self.cpu.gpr.read(rs) as i64;
                let b = self.cpu.gpr.read(rt) as i64;
                match a.checked_sub(b) {
                    Some(r) => self.cpu.gpr.write(rd, r as u64),
                    None => self.take_exception(Exception::IntegerOverflow, 0, false, false, 0),
                }
            }
            special::DSUBU => {
                let r = self.cpu.gpr.read(rs).wrapping_sub(self.cpu.gpr.read(rt));
                self.cpu.gpr.write(rd, r);
            }
            special::TGE => {
                if (self.cpu.gpr.read(rs) as i64) >= (self.cpu.gpr.read(rt) as i64) {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            special::TGEU => {
                if self.cpu.gpr.read(rs) >= self.cpu.gpr.read(rt) {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            special::TLT => {
                if (self.cpu.gpr.read(rs) as i64) < (self.cpu.gpr.read(rt) as i64) {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            special::TLTU => {
                if self.cpu.gpr.read(rs) < self.cpu.gpr.read(rt) {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            special::TEQ => {
                if self.cpu.gpr.read(rs) == self.cpu.gpr.read(rt) {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            special::TNE => {
                if self.cpu.gpr.read(rs) != self.cpu.gpr.read(rt) {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            special::DSLL => {
                let r = self.cpu.gpr.read(rt) << sa;
                self.cpu.gpr.write(rd, r);
            }
            special::DSRL => {
                let r = self.cpu.gpr.read(rt) >> sa;
                self.cpu.gpr.write(rd, r);
            }
            special::DSRA => {
                let r = (self.cpu.gpr.read(rt) as i64) >> sa;
                self.cpu.gpr.write(rd, r as u64);
            }
            special::DSLL32 => {
                let r = self.cpu.gpr.read(rt) << (sa + 32);
                self.cpu.gpr.write(rd, r);
            }
            special::DSRL32 => {
                let r = self.cpu.gpr.read(rt) >> (sa + 32);
                self.cpu.gpr.write(rd, r);
            }
            special::DSRA32 => {
                let r = (self.cpu.gpr.read(rt) as i64) >> (sa + 32);
                self.cpu.gpr.write(rd, r as u64);
            }
            _ => self.take_exception(Exception::ReservedInstruction, 0, false, false, 0),
        }
    }

    fn eval_regimm(&mut self, instr: u32) {
        let rs_val = self.cpu.gpr.read(instr.rs()) as i64;
        let imm = instr.imm_se();
        match (instr.rt() as u32) & 0x1F {
            regimm::BLTZ => self.branch(rs_val < 0, imm),
            regimm::BGEZ => self.branch(rs_val >= 0, imm),
            regimm::BLTZL => self.branch_likely(rs_val < 0, imm),
            regimm::BGEZL => self.branch_likely(rs_val >= 0, imm),
            regimm::TGEI => {
                if rs_val >= imm as i64 {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            regimm::TGEIU => {
                if self.cpu.gpr.read(instr.rs()) >= imm {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            regimm::TLTI => {
                if rs_val < imm as i64 {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            regimm::TLTIU => {
                if self.cpu.gpr.read(instr.rs()) < imm {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            regimm::TEQI => {
                if self.cpu.gpr.read(instr.rs()) == imm {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            regimm::TNEI => {
                if self.cpu.gpr.read(instr.rs()) != imm {
                    self.take_exception(Exception::Trap, 0, false, false, 0);
                }
            }
            regimm::BLTZAL => {
                self.cpu.gpr.write(31, self.cpu.pc.wrapping_add(8));
                self.branch(rs_val < 0, imm);
            }
            regimm::BGEZAL => {
                self.cpu.gpr.write(31, self.cpu.pc.wrapping_add(8));
                self.branch(rs_val >= 0, imm);
            }
            regimm::BLTZALL => {
                self.cpu.gpr.write(31, self.cpu.pc.wrapping_add(8));
                self.branch_likely(rs_val < 0, imm);
            }
            regimm::BGEZALL => {
                self.cpu.gpr.write(31, self.cpu.pc.wrapping_add(8));
                self.branch_likely(rs_val >= 0, imm);
            }
            _ => self.take_exception(Exception::ReservedInstruction, 0, false, false, 0),
        }
    }

    fn eval_cop0(&mut self, instr: u32) {
        if instr & (1 << 25) != 0 {
            match instr.funct() {
                tlbop::TLBR => {
                    let idx = (self.cpu.cp0.index as usize) & 0x1F;
                    let e = *self.cpu.tlb.entry(idx);
                    let g = if e.global { 1 } else { 0 };
                    self.cpu.cp0.page_mask = e.page_mask;
                    self.cpu.cp0.entry_hi = e.entry_hi & !0x1FFF_u64 | (e.asid as u64);
                    self.cpu.cp0.entry_lo0 = e.entry_lo0 & !1 | g;
                    self.cpu.cp0.entry_lo1 = e.entry_lo1 & !1 | g;
                }
                tlbop::TLBWI => {
                    let idx = (self.cpu.cp0.index as usize) & 0x1F;
                    self.tlb_write(idx);
                }
                tlbop::TLBWR => {
                    let idx = (self.cpu.cp0.random as usize) & 0x1F;
                    self.tlb_write(idx);
                }
                tlbop::TLBP => {
                    let hi = self.cpu.cp0.entry_hi;
                    match self.cpu.tlb.probe(hi, (hi & 0xFF) as u8) {
                        Some(idx) => self.cpu.cp0.index = idx as u32,
                        None => self.cpu.cp0.index = INDEX_P,
                    }
                }
                tlbop::ERET => self.eret(),
                _ => self.take_exception(Exception::ReservedInstruction, 0, false, false, 0),
            }
            return;
        }
        match instr.rs() as u32 {
            copz::MF => {
                let v = self.cpu.cp0.read(instr.rd()) as u32;
                self.cpu.gpr.write(instr.rt(), v as i32 as i64 as u64);
            }
            copz::DMF => {
                let v = self.cpu.cp0.read(instr.rd());
                self.cpu.gpr.write(instr.rt(), v);
            }
            copz::MT => {
                let v = self.cpu.gpr.read(instr.rt()) as u32 as i32 as i64 as u64;
                self.cp0_write(instr.rd(), v);
            }
            copz::DMT => {
                let v = self.cpu.gpr.read(instr.rt());
                self.cp0_write(instr.rd(), v);
            }
            _ => self.take_exception(Exception::ReservedInstruction, 0, false, false, 0),
        }
    }

    /// MTC0/DMTC0 with the side effects a register write carries.
    fn cp0_write(&mut self, rd: usize, val: u64) {
        self.cpu.cp0.write(rd, val);
        if rd == cp0::reg::SR {
            // A Status write can flip CU1 or the addressing mode out from
            // under installed blocks: their coprocessor guards are stale.
            self.invalidate_blocks_on_status_write();
        }
    }

    fn tlb_write(&mut self, idx: usize) {
        let cp0 = &self.cpu.cp0;
        self.cpu.tlb.write(
            idx,
            cp0.page_mask,
            cp0.entry_hi,
            cp0.entry_lo0,
            cp0.entry_lo1,
        );
    }

    /// Aligned loads: LB/LBU/LH/LHU/LW/LWU/LD.
    fn eval_load(&mut self, instr: u32, size: u64, sign: bool) {
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        match self.virt_load(vaddr, size) {
            Ok(v) => {
                let v = if sign {
                    match size {
                        1 => v as u8 as i8 as i64 as u64,
                        2 => v as u16 as i16 as i64 as u64,
                        _ => v as u32 as i32 as i64 as u64,
                    }
                } else {
                    v
                };
                self.cpu.gpr.write(instr.rt(), v);
            }
            Err(exn) => self.take_exception(exn, vaddr, false, true, 0),
        }
    }

    /// Aligned stores: SB/SH/SW/SD.
    fn eval_store(&mut self, instr: u32, size: u64) {
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let val = self.cpu.gpr.read(instr.rt());
        if let Err(exn) = self.virt_store(vaddr, size, val) {
            self.take_exception(exn, vaddr, false, false, 0);
        }
    }

    // The unaligned load/store family operates byte-by-byte from the
    // computed address to the neighbouring word boundary, merging against
    // the current register value, and specifically ignores the alignment
    // checks.

    fn eval_lwl(&mut self, instr: u32) {
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let paddr = match self.translate_address(vaddr, true) {
            Ok(p) => p,
            Err(exn) => return self.take_exception(exn, vaddr, false, false, 0),
        };
        let count = 4 - (paddr % 4);
        let mask = (1u64 << (32 - 8 * count)) - 1;
        let mut val: u64 = 0;
        let mut shift = 24;
        for nr in 0..count {
            let Some(byte) = self.bus_load_u8(paddr + nr) else {
                return self.take_exception(Exception::BusError, vaddr, false, false, 0);
            };
            val |= (byte as u64) << shift;
            shift -= 8;
        }
        val |= self.cpu.gpr.read(instr.rt()) & mask;
        self.cpu.gpr.write(instr.rt(), val as u32 as i32 as i64 as u64);
    }

    fn eval_lwr(&mut self, instr: u32) {
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let paddr = match self.translate_address(vaddr, true) {
            Ok(p) => p,
            Err(exn) => return self.take_exception(exn, vaddr, false, false, 0),
        };
        let count = 1 + (paddr % 4);
        let mask = if count == 4 {
            0
        } else {
            ((1u64 << (32 - 8 * count)) - 1) << (8 * count)
        };
        let mut val: u64 = 0;
        let mut shift = 0;
        for nr in 0..count {
            let Some(byte) = self.bus_load_u8(paddr - nr) else {
                return self.take_exception(Exception::BusError, vaddr, false, false, 0);
            };
            val |= (byte as u64) << shift;
            shift += 8;
        }
        val |= self.cpu.gpr.read(instr.rt()) & mask;
        self.cpu.gpr.write(instr.rt(), val as u32 as i32 as i64 as u64);
    }

    fn eval_ldl(&mut self, instr: u32) {
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let paddr = match self.translate_address(vaddr, true) {
            Ok(p) => p,
            Err(exn) => return self.take_exception(exn, vaddr, false, false, 0),
        };
        let count = 8 - (paddr % 8);
        let mask = if count == 8 {
            0
        } else {
            (1u64 << (64 - 8 * count)) - 1
        };
        let mut val: u64 = 0;
        let mut shift = 56;
        for nr in 0..count {
            let Some(byte) = self.bus_load_u8(paddr + nr) else {
                return self.take_exception(Exception::BusError, vaddr, false, false, 0);
            };
            val |= (byte as u64) << shift;
            shift -= 8;
        }
        val |= self.cpu.gpr.read(instr.rt()) & mask;
        self.cpu.gpr.write(instr.rt(), val);
    }

    fn eval_ldr(&mut self, instr: u32) {
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let paddr = match self.translate_address(vaddr, true) {
            Ok(p) => p,
            Err(exn) => return self.take_exception(exn, vaddr, false, false, 0),
        };
        let count = 1 + (paddr % 8);
        let mask = if count == 8 {
            0
        } else {
            ((1u64 << (64 - 8 * count)) - 1) << (8 * count)
        };
        let mut val: u64 = 0;
        let mut shift = 0;
        for nr in 0..count {
            let Some(byte) = self.bus_load_u8(paddr - nr) else {
                return self.take_exception(Exception::BusError, vaddr, false, false, 0);
            };
            val |= (byte as u64) << shift;
            shift += 8;
        }
        val |= self.cpu.gpr.read(instr.rt()) & mask;
        self.cpu.gpr.write(instr.rt(), val);
    }

    fn eval_swl(&mut self, instr: u32) {
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let paddr = match self.translate_address(vaddr, false) {
            Ok(p) => p,
            Err(exn) => return self.take_exception(exn, vaddr, false, false, 0),
        };
        let count = 4 - (paddr % 4);
        let val = self.cpu.gpr.read(instr.rt()) as u32;
        let mut shift = 24;
        for nr in 0..count {
            let byte = (val >> shift) as u8;
            if !self.bus_store_u8(paddr + nr, byte) {
                return self.take_exception(Exception::BusError, vaddr, false, false, 0);
            }
            shift -= 8;
        }
    }

    fn eval_swr(&mut self, instr: u32) {
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let paddr = match self.translate_address(vaddr, false) {
            Ok(p) => p,
            Err(exn) => return self.take_exception(exn, vaddr, false, false, 0),
        };
        let count = 1 + (paddr % 4);
        let val = self.cpu.gpr.read(instr.rt()) as u32;
        let mut shift = 0;
        for nr in 0..count {
            let byte = (val >> shift) as u8;
            if !self.bus_store_u8(paddr - nr, byte) {
                return self.take_exception(Exception::BusError, vaddr, false, false, 0);
            }
            shift += 8;
        }
    }

    fn eval_sdl(&mut self, instr: u32) {
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let paddr = match self.translate_address(vaddr, false) {
            Ok(p) => p,
            Err(exn) => return self.take_exception(exn, vaddr, false, false, 0),
        };
        let count = 8 - (paddr % 8);
        let val = self.cpu.gpr.read(instr.rt());
        let mut shift = 56;
        for nr in 0..count {
            let byte = (val >> shift) as u8;
            if !self.bus_store_u8(paddr + nr, byte) {
                return self.take_exception(Exception::BusError, vaddr, false, false, 0);
            }
            shift -= 8;
        }
    }

    fn eval_sdr(&mut self, instr: u32) {
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let paddr = match self.translate_address(vaddr, false) {
            Ok(p) => p,
            Err(exn) => return self.take_exception(exn, vaddr, false, false, 0),
        };
        let count = 1 + (paddr % 8);
        let val = self.cpu.gpr.read(instr.rt());
        let mut shift = 0;
        for nr in 0..count {
            let byte = (val >> shift) as u8;
            if !self.bus_store_u8(paddr - nr, byte) {
                return self.take_exception(Exception::BusError, vaddr, false, false, 0);
            }
            shift += 8;
        }
    }
}
