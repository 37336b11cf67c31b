//! RSP scalar interpreter.
//!
//! A MIPS subset: no TLB, no exceptions, 32-bit arithmetic held
//! sign-extended in 64-bit registers. The program counter lives in the
//! 4 KiB IMEM window. Unaligned halfword accesses that the hardware would
//! split are handled byte-wise where the original microcode relies on it;
//! the remaining misalignments log a warning and halt emulation, treated as
//! fatal.

use crate::core::arch::NextAction;
use crate::isa::InstructionBits;
use crate::isa::opcodes::{primary, regimm, special};
use crate::soc::devices::mi;
use crate::soc::devices::sp::{
    SP_STATUS_BROKE, SP_STATUS_HALT, SP_STATUS_INTR_BREAK, SP_STATUS_SSTEP,
};
use crate::state::{Machine, read_be16, read_be32, write_be16, write_be32};

impl Machine {
    /// Executes one RSP instruction if the SP is running.
    pub fn step_rsp(&mut self) {
        if self.halted || !self.sp_running() {
            return;
        }
        self.stats.rsp_instructions += 1;

        let pc = self.rsp.pc & 0xFFF;
        let instr = read_be32(&self.imem, pc as usize & !3);
        self.eval_rsp_instr(instr);

        match self.rsp.next_action {
            NextAction::Continue => self.rsp.pc = (self.rsp.pc + 4) & 0xFFF,
            NextAction::Delay => {
                self.rsp.next_action = NextAction::Jump;
                self.rsp.pc = (self.rsp.pc + 4) & 0xFFF;
            }
            NextAction::Jump => {
                self.rsp.next_action = NextAction::Continue;
                self.rsp.pc = self.rsp.next_pc & 0xFFF;
            }
        }
        self.hwreg.sp_pc = (self.rsp.pc & 0xFFC) as u32;

        if self.hwreg.sp_status & SP_STATUS_SSTEP != 0 {
            self.hwreg.sp_status |= SP_STATUS_HALT;
        }
    }

    /// Fatal-alignment check: the RSP has no exceptions, so a misaligned
    /// access the byte paths cannot express halts emulation.
    fn rsp_check_alignment(&mut self, addr: u64, bytes: u64) -> bool {
        if addr & (bytes - 1) != 0 {
            tracing::warn!(
                addr = format_args!("{:#x}", addr),
                bytes,
                pc = format_args!("{:#x}", self.rsp.pc),
                "unaligned DMEM access"
            );
            self.halt("RSP invalid address alignment");
            false
        } else {
            true
        }
    }

    /// Dispatches one RSP instruction.
    pub fn eval_rsp_instr(&mut self, instr: u32) {
        if instr == 0 {
            return;
        }
        match instr.opcode() {
            primary::SPECIAL => self.eval_rsp_special(instr),
            primary::REGIMM => self.eval_rsp_regimm(instr),
            primary::J => {
                self.rsp.next_action = NextAction::Delay;
                self.rsp.next_pc = instr.target() << 2;
            }
            primary::JAL => {
                self.rsp.gpr.write(31, (self.rsp.pc + 8) & 0xFFF);
                self.rsp.next_action = NextAction::Delay;
                self.rsp.next_pc = instr.target() << 2;
            }
            primary::BEQ => {
                let c = self.rsp.gpr.read(instr.rs()) == self.rsp.gpr.read(instr.rt());
                self.rsp_branch(c, instr.imm_se());
            }
            primary::BNE => {
                let c = self.rsp.gpr.read(instr.rs()) != self.rsp.gpr.read(instr.rt());
                self.rsp_branch(c, instr.imm_se());
            }
            primary::BLEZ => {
                let c = (self.rsp.gpr.read(instr.rs()) as i64) <= 0;
                self.rsp_branch(c, instr.imm_se());
            }
            primary::BGTZ => {
                let c = (self.rsp.gpr.read(instr.rs()) as i64) > 0;
                self.rsp_branch(c, instr.imm_se());
            }
            primary::ADDI | primary::ADDIU => {
                let r = (self.rsp.gpr.read(instr.rs()).wrapping_add(instr.imm_se())) as u32;
                self.rsp.gpr.write(instr.rt(), r as i32 as i64 as u64);
            }
            primary::SLTI => {
                let r = (self.rsp.gpr.read(instr.rs()) as i64) < (instr.imm_se() as i64);
                self.rsp.gpr.write(instr.rt(), r as u64);
            }
            primary::SLTIU => {
                let r = self.rsp.gpr.read(instr.rs()) < instr.imm_se();
                self.rsp.gpr.write(instr.rt(), r as u64);
            }
            primary::ANDI => {
                let r = self.rsp.gpr.read(instr.rs()) & instr.imm_ze();
                self.rsp.gpr.write(instr.rt(), r);
            }
            primary::ORI => {
                let r = self.rsp.gpr.read(instr.rs()) | instr.imm_ze();
                self.rsp.gpr.write(instr.rt(), r);
            }
            primary::XORI => {
                let r = self.rsp.gpr.read(instr.rs()) ^ instr.imm_ze();
                self.rsp.gpr.write(instr.rt(), r);
            }
            primary::LUI => self.rsp.gpr.write(instr.rt(), instr.imm_se() << 16),
            primary::COP0 => self.eval_rsp_cop0(instr),
            primary::COP2 => self.eval_rsp_cop2(instr),
            primary::LB => {
                let addr = self.rsp.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                let val = self.dmem[addr as usize & 0xFFF];
                self.rsp.gpr.write(instr.rt(), val as i8 as i64 as u64);
            }
            primary::LBU => {
                let addr = self.rsp.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                let val = self.dmem[addr as usize & 0xFFF];
                self.rsp.gpr.write(instr.rt(), val as u64);
            }
            primary::LH => {
                let addr = self.rsp.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                if self.rsp_check_alignment(addr, 2) {
                    let val = read_be16(&self.dmem, addr as usize & 0xFFF);
                    self.rsp.gpr.write(instr.rt(), val as i16 as i64 as u64);
                }
            }
            primary::LHU => {
                let addr = self.rsp.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                let val = if addr & 1 == 0 {
                    read_be16(&self.dmem, addr as usize & 0xFFF)
                } else {
                    let hi = self.dmem[addr as usize & 0xFFF] as u16;
                    let lo = self.dmem[(addr as usize + 1) & 0xFFF] as u16;
                    (hi << 8) | lo
                };
                self.rsp.gpr.write(instr.rt(), val as u64);
            }
            primary::LW => {
                let addr = self.rsp.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                let val = if addr & 3 == 0 {
                    read_be32(&self.dmem, addr as usize & 0xFFF)
                } else {
                    let mut v = 0u32;
                    for i in 0..4 {
                        v = (v << 8) | self.dmem[(addr as usize + i) & 0xFFF] as u32;
                    }
                    v
                };
                self.rsp.gpr.write(instr.rt(), val as i32 as i64 as u64);
            }
            primary::SB => {
                let addr = self.rsp.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                self.dmem[addr as usize & 0xFFF] = self.rsp.gpr.read(instr.rt()) as u8;
            }
            primary::SH => {
                let addr = self.rsp.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                if self.rsp_check_alignment(addr, 2) {
                    let val = self.rsp.gpr.read(instr.rt()) as u16;
                    write_be16(&mut self.dmem, addr as usize & 0xFFF, val);
                }
            }
            primary::SW => {
                let addr = self.rsp.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
                let val = self.rsp.gpr.read(instr.rt()) as u32;
                if addr & 3 == 0 {
                    write_be32(&mut self.dmem, addr as usize & 0xFFF, val);
                } else {
                    for i in 0..4 {
                        self.dmem[(addr as usize + i) & 0xFFF] = (val >> (24 - 8 * i)) as u8;
                    }
                }
            }
            primary::CACHE => {}
            primary::LWC2 => self.eval_rsp_lwc2(instr),
            primary::SWC2 => self.eval_rsp_swc2(instr),
            _ => self.halt(format!("RSP reserved instruction {instr:#010x}")),
        }
    }

    fn rsp_branch(&mut self, cond: bool, imm: u64) {
        self.rsp.next_action = NextAction::Delay;
        self.rsp.next_pc = if cond {
            self.rsp.pc.wrapping_add(4).wrapping_add(imm << 2)
        } else {
            self.rsp.pc.wrapping_add(8)
        };
    }

    fn eval_rsp_special(&mut self, instr: u32) {
        let rd = instr.rd();
        let rs = instr.rs();
        let rt = instr.rt();
        let sa = instr.shamt();
        match instr.funct() {
            special::SLL => {
                let r = (self.rsp.gpr.read(rt) as u32) << sa;
                self.rsp.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::SRL => {
                let r = (self.rsp.gpr.read(rt) as u32) >> sa;
                self.rsp.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::SRA => {
                let r = (self.rsp.gpr.read(rt) as u32 as i32) >> sa;
                self.rsp.gpr.write(rd, r as i64 as u64);
            }
            special::SLLV => {
                let sa = self.rsp.gpr.read(rs) & 0x1F;
                let r = (self.rsp.gpr.read(rt) as u32) << sa;
                self.rsp.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::SRLV => {
                let sa = self.rsp.gpr.read(rs) & 0x1F;
                let r = (self.rsp.gpr.read(rt) as u32) >> sa;
                self.rsp.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::SRAV => {
                let sa = self.rsp.gpr.read(rs) & 0x1F;
                let r = (self.rsp.gpr.read(rt) as u32 as i32) >> sa;
                self.rsp.gpr.write(rd, r as i64 as u64);
            }
            special::JR => {
                self.rsp.next_action = NextAction::Delay;
                self.rsp.next_pc = self.rsp.gpr.read(rs);
            }
            special::JALR => {
                let tg = self.rsp.gpr.read(rs);
                self.rsp.gpr.write(rd, (self.rsp.pc + 8) & 0xFFF);
                self.rsp.next_action = NextAction::Delay;
                self.rsp.next_pc = tg;
            }
            special::BREAK => {
                if self.hwreg.sp_status & SP_STATUS_INTR_BREAK != 0 {
                    mi::raise(self, mi::MI_INTR_SP);
                }
                self.hwreg.sp_status |= SP_STATUS_BROKE | SP_STATUS_HALT;
            }
            special::ADD | special::ADDU => {
                let r = (self.rsp.gpr.read(rs).wrapping_add(self.rsp.gpr.read(rt))) as u32;
                self.rsp.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::SUB | special::SUBU => {
                let r = (self.rsp.gpr.read(rs).wrapping_sub(self.rsp.gpr.read(rt))) as u32;
                self.rsp.gpr.write(rd, r as i32 as i64 as u64);
            }
            special::AND => {
                let r = self.rsp.gpr.read(rs) & self.rsp.gpr.read(rt);
                self.rsp.gpr.write(rd, r);
            }
            special::OR => {
                let r = self.rsp.gpr.read(rs) | self.rsp.gpr.read(rt);
                self.rsp.gpr.write(rd, r);
            }
            special::XOR => {
                let r = self.rsp.gpr.read(rs) ^ self.rsp.gpr.read(rt);
                self.rsp.gpr.write(rd, r);
            }
            special::NOR => {
                let r = !(self.rsp.gpr.read(rs) | self.rsp.gpr.read(rt));
                self.rsp.gpr.write(rd, r);
            }
            special::SLT => {
                let r = (self.rsp.gpr.read(rs) as i64) < (self.rsp.gpr.read(rt) as i64);
                self.rsp.gpr.write(rd, r as u64);
            }
            special::SLTU => {
                let r = self.rsp.gpr.read(rs) < self.rsp.gpr.read(rt);
                self.rsp.gpr.write(rd, r as u64);
            }
            special::MOVZ => {
                if self.rsp.gpr.read(rt) == 0 {
                    let v = self.rsp.gpr.read(rs);
                    self.rsp.gpr.write(rd, v);
                }
            }
            special::MOVN => {
                if self.rsp.gpr.read(rt) != 0 {
                    let v = self.rsp.gpr.read(rs);
                    self.rsp.gpr.write(rd, v);
                }
            }
            _ => self.halt(format!("RSP reserved SPECIAL {:#04x}", instr.funct())),
        }
    }

    fn eval_rsp_regimm(&mut self, instr: u32) {
        let rs_val = self.rsp.gpr.read(instr.rs()) as i64;
        let imm = instr.imm_se();
        match (instr.rt() as u32) & 0x1F {
            regimm::BLTZ => self.rsp_branch(rs_val < 0, imm),
            regimm::BGEZ => self.rsp_branch(rs_val >= 0, imm),
            regimm::BLTZAL => {
                self.rsp.gpr.write(31, (self.rsp.pc + 8) & 0xFFF);
                self.rsp_branch(rs_val < 0, imm);
            }
            regimm::BGEZAL => {
                self.rsp.gpr.write(31, (self.rsp.pc + 8) & 0xFFF);
                self.rsp_branch(rs_val >= 0, imm);
            }
            _ => self.halt("RSP reserved REGIMM"),
        }
    }
}
