//! MIPS to IR disassembler.
//!
//! Builds the IR graph for one block from a snapshot of the guest code
//! region. The block is straight-line: it ends at the first control
//! transfer (whose delay slot is inlined and whose continuations each
//! commit PC and exit), at the first instruction without a direct IR
//! lowering (PC is committed and the interpreter takes over), or at the
//! configured budget.
//!
//! Cycle increments are batched: a single `cycles += N` is emitted before
//! any operation that exits the block or can raise an exception, keeping
//! the counter consistent at every architecturally observable suspension
//! point without one increment per instruction.

use crate::common::EmuError;
use crate::config::RecompilerConfig;
use crate::core::arch::cp0::STATUS_CU1;
use crate::isa::InstructionBits;
use crate::isa::opcodes::{primary, regimm, special};
use crate::recompiler::ir::{
    BinOp, BlockId, CmpOp, Global, Graph, Instr, Operand, Terminator, Ty, ValueId, const_u8,
    const_u32, const_u64,
};
use crate::recompiler::thunks;
use crate::state::Machine;

/// Outcome of translating one instruction.
enum Flow {
    /// Fall through to the next instruction.
    Next,
    /// The block was terminated.
    End,
}

pub struct BlockBuilder<'a> {
    graph: Graph,
    cur: BlockId,
    code: &'a [u8],
    start_vaddr: u64,
    machine_ptr: u64,
    /// Cycles accumulated since the last commit.
    pending_cycles: u64,
    cop1_guard_emitted: bool,
    in_delay_slot: bool,
    ir_max: usize,
    /// Bytes of guest code consumed, for range invalidation.
    consumed: u64,
    /// Whether the block does anything beyond rewriting PC; vacuous
    /// blocks are abandoned rather than installed.
    progress: bool,
}

/// Disassembles one block.
///
/// # Arguments
///
/// * `code` - Snapshot of the guest code bytes, big-endian.
/// * `start_vaddr` - Virtual address of the first instruction (PC values
///   written by the block are virtual).
/// * `machine` - The machine whose thunks the block calls into.
///
/// # Returns
///
/// The graph and the number of guest bytes covered.
pub fn build_block(
    code: &[u8],
    start_vaddr: u64,
    machine: *mut Machine,
    cfg: &RecompilerConfig,
) -> Result<(Graph, u64), EmuError> {
    let mut b = BlockBuilder {
        graph: Graph::new(),
        cur: BlockId(0),
        code,
        start_vaddr,
        machine_ptr: machine as u64,
        pending_cycles: 0,
        cop1_guard_emitted: false,
        in_delay_slot: false,
        ir_max: cfg.block_ir_max,
        consumed: 0,
        progress: false,
    };

    // Exceptions raised from inside the block must not mistake a stale
    // interpreter flag for delay-slot context.
    b.push(Instr::WriteGlobal {
        global: Global::DelaySlot,
        val: const_u8(0),
    })?;

    let mut addr = start_vaddr;
    let mut translated = 0usize;
    loop {
        if translated >= cfg.block_instr_max {
            b.end_block(addr)?;
            break;
        }
        let Some(instr) = b.fetch(addr) else {
            b.end_block(addr)?;
            break;
        };

        if translated == 0 && !b.first_translatable(instr) {
            return Err(EmuError::UnsupportedIr(format!(
                "untranslatable block head {instr:#010x}"
            )));
        }

        match b.translate(instr, addr)? {
            Flow::Next => {
                addr += 4;
                translated += 1;
            }
            Flow::End => break,
        }
    }

    if !b.progress {
        return Err(EmuError::UnsupportedIr("vacuous block".into()));
    }
    let consumed = b.consumed.max(addr - start_vaddr);
    Ok((b.graph, consumed))
}

impl BlockBuilder<'_> {
    fn fetch(&self, vaddr: u64) -> Option<u32> {
        let offset = (vaddr - self.start_vaddr) as usize;
        if offset + 4 > self.code.len() {
            return None;
        }
        Some(u32::from_be_bytes([
            self.code[offset],
            self.code[offset + 1],
            self.code[offset + 2],
            self.code[offset + 3],
        ]))
    }

    fn note_consumed(&mut self, vaddr: u64) {
        self.consumed = self.consumed.max(vaddr + 4 - self.start_vaddr);
    }

    fn push(&mut self, instr: Instr) -> Result<(), EmuError> {
        if self.graph.instr_count() >= self.ir_max {
            return Err(EmuError::IrBudgetExceeded);
        }
        self.graph.push(self.cur, instr);
        Ok(())
    }

    fn value(&mut self, ty: Ty) -> ValueId {
        self.graph.new_value(ty)
    }

    fn binop(&mut self, op: BinOp, ty: Ty, a: Operand, b: Operand) -> Result<Operand, EmuError> {
        let dst = self.value(ty);
        self.push(Instr::Bin { op, dst, a, b })?;
        Ok(Operand::Value(dst))
    }

    fn cmp(&mut self, op: CmpOp, a: Operand, b: Operand) -> Result<Operand, EmuError> {
        let dst = self.value(Ty::I1);
        self.push(Instr::Cmp { op, dst, a, b })?;
        Ok(Operand::Value(dst))
    }

    fn trunc(&mut self, ty: Ty, a: Operand) -> Result<Operand, EmuError> {
        let dst = self.value(ty);
        self.push(Instr::Trunc { dst, a })?;
        Ok(Operand::Value(dst))
    }

    fn sext64(&mut self, a: Operand) -> Result<Operand, EmuError> {
        let dst = self.value(Ty::I64);
        self.push(Instr::Sext { dst, a })?;
        Ok(Operand::Value(dst))
    }

    fn zext64(&mut self, a: Operand) -> Result<Operand, EmuError> {
        let dst = self.value(Ty::I64);
        self.push(Instr::Zext { dst, a })?;
        Ok(Operand::Value(dst))
    }

    fn read_gpr(&mut self, r: usize) -> Result<Operand, EmuError> {
        if r == 0 {
            return Ok(const_u64(0));
        }
        let dst = self.value(Ty::I64);
        self.push(Instr::ReadGlobal {
            dst,
            global: Global::Gpr(r as u8),
        })?;
        Ok(Operand::Value(dst))
    }

    fn write_gpr(&mut self, r: usize, val: Operand) -> Result<(), EmuError> {
        if r == 0 {
            return Ok(());
        }
        self.push(Instr::WriteGlobal {
            global: Global::Gpr(r as u8),
            val,
        })
    }

    fn read_global(&mut self, global: Global) -> Result<Operand, EmuError> {
        let dst = self.value(global.ty());
        self.push(Instr::ReadGlobal { dst, global })?;
        Ok(Operand::Value(dst))
    }

    /// Emits the batched `cycles += N` without clearing the counter; used
    /// on side paths (the coprocessor guard) that exit while the main path
    /// continues.
    fn emit_cycles(&mut self, count: u64) -> Result<(), EmuError> {
        if count == 0 {
            return Ok(());
        }
        let cur = self.read_global(Global::Cycles)?;
        let sum = self.binop(BinOp::Add, Ty::I64, cur, const_u64(count))?;
        self.push(Instr::WriteGlobal {
            global: Global::Cycles,
            val: sum,
        })
    }

    /// Commits and clears the pending cycle count.
    fn commit_cycles(&mut self) -> Result<(), EmuError> {
        let pending = self.pending_cycles;
        self.pending_cycles = 0;
        self.emit_cycles(pending)
    }

    /// Terminates the current block: commit PC and cycles, exit.
    fn end_block(&mut self, next_pc: u64) -> Result<(), EmuError> {
        self.push(Instr::WriteGlobal {
            global: Global::Pc,
            val: const_u64(next_pc),
        })?;
        self.commit_cycles()?;
        self.graph.seal(self.cur, Terminator::Exit);
        Ok(())
    }

    /// Whether an instruction is worth starting a block with. A block
    /// whose head immediately hands back to the interpreter would spin:
    /// its only effect is rewriting PC to its own address.
    fn first_translatable(&self, instr: u32) -> bool {
        matches!(self.classify(instr), Class::Simple | Class::Branch)
    }

    /// Whether an instruction may be inlined into a delay slot.
    fn delay_translatable(&self, instr: u32) -> bool {
        matches!(self.classify(instr), Class::Simple)
    }

    fn classify(&self, instr: u32) -> Class {
        if instr == 0 {
            return Class::Simple;
        }
        match instr.opcode() {
            primary::SPECIAL => match instr.funct() {
                special::JR | special::JALR => Class::Branch,
                special::SYSCALL
                | special::BREAK
                | special::TGE
                | special::TGEU
                | special::TLT
                | special::TLTU
                | special::TEQ
                | special::TNE => Class::BlockEnd,
                special::MOVZ | special::MOVN => Class::BlockEnd,
                _ => Class::Simple,
            },
            primary::REGIMM => match (instr.rt() as u32) & 0x1F {
                regimm::BLTZ | regimm::BGEZ | regimm::BLTZL | regimm::BGEZL | regimm::BLTZAL
                | regimm::BGEZAL | regimm::BLTZALL | regimm::BGEZALL => Class::Branch,
                _ => Class::BlockEnd,
            },
            primary::J
            | primary::JAL
            | primary::BEQ
            | primary::BNE
            | primary::BLEZ
            | primary::BGTZ
            | primary::BEQL
            | primary::BNEL
            | primary::BLEZL
            | primary::BGTZL => Class::Branch,
            primary::ADDI | primary::ADDIU | primary::SLTI | primary::SLTIU | primary::ANDI
            | primary::ORI | primary::XORI | primary::LUI | primary::DADDI | primary::DADDIU
            | primary::CACHE => Class::Simple,
            primary::LB | primary::LBU | primary::LH | primary::LHU | primary::LW
            | primary::LWU | primary::LD | primary::SB | primary::SH | primary::SW
            | primary::SD => Class::Simple,
            primary::COP1 | primary::LWC1 | primary::LDC1 | primary::SWC1 | primary::SDC1 => {
                Class::Cop1
            }
            _ => Class::BlockEnd,
        }
    }

    /// Translates one instruction at `addr`.
    fn translate(&mut self, instr: u32, addr: u64) -> Result<Flow, EmuError> {
        self.note_consumed(addr);
        match self.classify(instr) {
            Class::Simple => {
                self.pending_cycles += 1;
                self.translate_simple(instr)?;
                self.progress = true;
                Ok(Flow::Next)
            }
            Class::Branch => {
                self.pending_cycles += 1;
                self.translate_branch(instr, addr)?;
                Ok(Flow::End)
            }
            Class::Cop1 => {
                self.emit_cop1_guard(addr)?;
                self.end_block(addr)?;
                Ok(Flow::End)
            }
            Class::BlockEnd => {
                self.end_block(addr)?;
                Ok(Flow::End)
            }
        }
    }

    /// Emits the CU1 check once per block. The exception arm commits the
    /// cycles accumulated so far without disturbing the main path's count.
    fn emit_cop1_guard(&mut self, addr: u64) -> Result<(), EmuError> {
        if self.cop1_guard_emitted {
            return Ok(());
        }
        self.cop1_guard_emitted = true;

        let sr = self.read_global(Global::Sr)?;
        let cu1 = self.binop(BinOp::And, Ty::I32, sr, const_u32(STATUS_CU1))?;
        let clear = self.cmp(CmpOp::Eq, cu1, const_u32(0))?;

        let guard_blk = self.graph.new_block();
        let cont_blk = self.graph.new_block();
        self.graph.seal(
            self.cur,
            Terminator::Br {
                cond: clear,
                if_true: guard_blk,
                if_false: cont_blk,
            },
        );

        // Exception arm.
        let pending = self.pending_cycles;
        self.cur = guard_blk;
        self.push(Instr::WriteGlobal {
            global: Global::Pc,
            val: const_u64(addr),
        })?;
        if self.in_delay_slot {
            self.push(Instr::WriteGlobal {
                global: Global::DelaySlot,
                val: const_u8(1),
            })?;
        }
        self.emit_cycles(pending)?;
        self.push(Instr::Call {
            func: thunks::take_cop1_unusable_exception as usize,
            args: vec![const_u64(self.machine_ptr)],
            dst: None,
        })?;
        self.graph.seal(guard_blk, Terminator::Exit);

        self.cur = cont_blk;
        Ok(())
    }

    /// Translates a branch or jump, inlining the delay slot. Both
    /// continuations write PC and exit.
    fn translate_branch(&mut self, instr: u32, addr: u64) -> Result<(), EmuError> {
        let Some(delay_instr) = self.fetch(addr + 4) else {
            // The delay slot falls outside the region; leave both to the
            // interpreter.
            self.pending_cycles -= 1;
            return self.end_block(addr);
        };
        if !self.delay_translatable(delay_instr) {
            self.pending_cycles -= 1;
            return self.end_block(addr);
        }
        self.note_consumed(addr + 4);

        let taken_target = addr.wrapping_add(4).wrapping_add(instr.imm_se() << 2);
        let not_taken = addr.wrapping_add(8);

        // Unconditional jumps: link, delay slot, PC, exit.
        let opcode = instr.opcode();
        if opcode == primary::J || opcode == primary::JAL {
            let target =
                (addr & 0xFFFF_FFFF_F000_0000) | (instr.target() << 2);
            if opcode == primary::JAL {
                self.write_gpr(31, const_u64(addr.wrapping_add(8)))?;
            }
            self.pending_cycles += 1;
            self.translate_delay_slot(delay_instr)?;
            self.progress = true;
            return self.end_jump(const_u64(target));
        }
        if opcode == primary::SPECIAL {
            // JR / JALR: the target register is read before the delay slot
            // can clobber it.
            let target = self.read_gpr(instr.rs())?;
            if instr.funct() == special::JALR {
                self.write_gpr(instr.rd(), const_u64(addr.wrapping_add(8)))?;
            }
            self.pending_cycles += 1;
            self.translate_delay_slot(delay_instr)?;
            self.progress = true;
            return self.end_jump(target);
        }

        // Conditional branches.
        let (cond, likely) = self.branch_condition(instr, addr)?;
        self.progress = true;

        if likely {
            // The delay slot only executes on the taken path.
            self.commit_cycles()?;
            let t_blk = self.graph.new_block();
            let f_blk = self.graph.new_block();
            self.graph.seal(
                self.cur,
                Terminator::Br {
                    cond,
                    if_true: t_blk,
                    if_false: f_blk,
                },
            );

            self.cur = t_blk;
            self.pending_cycles = 1;
            self.translate_delay_slot(delay_instr)?;
            self.push(Instr::WriteGlobal {
                global: Global::Pc,
                val: const_u64(taken_target),
            })?;
            self.commit_cycles()?;
            self.graph.seal(t_blk, Terminator::Exit);

            self.cur = f_blk;
            self.push(Instr::WriteGlobal {
                global: Global::Pc,
                val: const_u64(not_taken),
            })?;
            self.graph.seal(f_blk, Terminator::Exit);
            return Ok(());
        }

        // Plain branch: the delay slot runs on both paths.
        self.pending_cycles += 1;
        self.translate_delay_slot(delay_instr)?;
        self.commit_cycles()?;

        let t_blk = self.graph.new_block();
        let f_blk = self.graph.new_block();
        self.graph.seal(
            self.cur,
            Terminator::Br {
                cond,
                if_true: t_blk,
                if_false: f_blk,
            },
        );
        self.cur = t_blk;
        self.push(Instr::WriteGlobal {
            global: Global::Pc,
            val: const_u64(taken_target),
        })?;
        self.graph.seal(t_blk, Terminator::Exit);

        self.cur = f_blk;
        self.push(Instr::WriteGlobal {
            global: Global::Pc,
            val: const_u64(not_taken),
        })?;
        self.graph.seal(f_blk, Terminator::Exit);
        Ok(())
    }

    /// Commits an indirect or far jump after its delay slot.
    fn end_jump(&mut self, target: Operand) -> Result<(), EmuError> {
        self.push(Instr::WriteGlobal {
            global: Global::Pc,
            val: target,
        })?;
        self.commit_cycles()?;
        self.graph.seal(self.cur, Terminator::Exit);
        Ok(())
    }

    /// Computes a branch condition value and whether it is a likely form.
    fn branch_condition(&mut self, instr: u32, _addr: u64) -> Result<(Operand, bool), EmuError> {
        let rs = self.read_gpr(instr.rs())?;
        match instr.opcode() {
            primary::BEQ | primary::BEQL => {
                let rt = self.read_gpr(instr.rt())?;
                let c = self.cmp(CmpOp::Eq, rs, rt)?;
                Ok((c, instr.opcode() == primary::BEQL))
            }
            primary::BNE | primary::BNEL => {
                let rt = self.read_gpr(instr.rt())?;
                let c = self.cmp(CmpOp::Ne, rs, rt)?;
                Ok((c, instr.opcode() == primary::BNEL))
            }
            primary::BLEZ | primary::BLEZL => {
                let c = self.cmp(CmpOp::Sle, rs, const_u64(0))?;
                Ok((c, instr.opcode() == primary::BLEZL))
            }
            primary::BGTZ | primary::BGTZL => {
                let c = self.cmp(CmpOp::Sgt, rs, const_u64(0))?;
                Ok((c, instr.opcode() == primary::BGTZL))
            }
            primary::REGIMM => {
                let rt = (instr.rt() as u32) & 0x1F;
                let (op, likely, link) = match rt {
                    regimm::BLTZ => (CmpOp::Slt, false, false),
                    regimm::BGEZ => (CmpOp::Sge, false, false),
                    regimm::BLTZL => (CmpOp::Slt, true, false),
                    regimm::BGEZL => (CmpOp::Sge, true, false),
                    regimm::BLTZAL => (CmpOp::Slt, false, true),
                    regimm::BGEZAL => (CmpOp::Sge, false, true),
                    regimm::BLTZALL => (CmpOp::Slt, true, true),
                    _ => (CmpOp::Sge, true, true), // BGEZALL
                };
                if link {
                    self.write_gpr(31, const_u64(_addr.wrapping_add(8)))?;
                }
                let c = self.cmp(op, rs, const_u64(0))?;
                Ok((c, likely))
            }
            _ => Err(EmuError::UnsupportedIr("not a branch".into())),
        }
    }

    /// Inlines the delay-slot instruction into the current block.
    fn translate_delay_slot(&mut self, instr: u32) -> Result<(), EmuError> {
        self.in_delay_slot = true;
        let res = self.translate_simple(instr);
        self.in_delay_slot = false;
        res
    }

    /// Translates one straight-line instruction.
    fn translate_simple(&mut self, instr: u32) -> Result<(), EmuError> {
        if instr == 0 {
            return Ok(());
        }
        match instr.opcode() {
            primary::SPECIAL => self.translate_special(instr),
            primary::ADDI | primary::ADDIU => {
                let rs = self.read_gpr(instr.rs())?;
                let a = self.trunc(Ty::I32, rs)?;
                let sum = self.binop(BinOp::Add, Ty::I32, a, const_u32(instr.imm_se() as u32))?;
                let r = self.sext64(sum)?;
                self.write_gpr(instr.rt(), r)
            }
            primary::DADDI | primary::DADDIU => {
                let rs = self.read_gpr(instr.rs())?;
                let r = self.binop(BinOp::Add, Ty::I64, rs, const_u64(instr.imm_se()))?;
                self.write_gpr(instr.rt(), r)
            }
            primary::SLTI => {
                let rs = self.read_gpr(instr.rs())?;
                let c = self.cmp(CmpOp::Slt, rs, const_u64(instr.imm_se()))?;
                let r = self.zext64(c)?;
                self.write_gpr(instr.rt(), r)
            }
            primary::SLTIU => {
                let rs = self.read_gpr(instr.rs())?;
                let c = self.cmp(CmpOp::Ult, rs, const_u64(instr.imm_se()))?;
                let r = self.zext64(c)?;
                self.write_gpr(instr.rt(), r)
            }
            primary::ANDI => {
                let rs = self.read_gpr(instr.rs())?;
                let r = self.binop(BinOp::And, Ty::I64, rs, const_u64(instr.imm_ze()))?;
                self.write_gpr(instr.rt(), r)
            }
            primary::ORI => {
                let rs = self.read_gpr(instr.rs())?;
                let r = self.binop(BinOp::Or, Ty::I64, rs, const_u64(instr.imm_ze()))?;
                self.write_gpr(instr.rt(), r)
            }
            primary::XORI => {
                let rs = self.read_gpr(instr.rs())?;
                let r = self.binop(BinOp::Xor, Ty::I64, rs, const_u64(instr.imm_ze()))?;
                self.write_gpr(instr.rt(), r)
            }
            primary::LUI => self.write_gpr(instr.rt(), const_u64(instr.imm_se() << 16)),
            primary::CACHE => Ok(()),
            primary::LB => self.translate_load(instr, 1, true),
            primary::LBU => self.translate_load(instr, 1, false),
            primary::LH => self.translate_load(instr, 2, true),
            primary::LHU => self.translate_load(instr, 2, false),
            primary::LW => self.translate_load(instr, 4, true),
            primary::LWU => self.translate_load(instr, 4, false),
            primary::LD => self.translate_load(instr, 8, false),
            primary::SB => self.translate_store(instr, 1),
            primary::SH => self.translate_store(instr, 2),
            primary::SW => self.translate_store(instr, 4),
            primary::SD => self.translate_store(instr, 8),
            _ => Err(EmuError::UnsupportedIr(format!(
                "no IR lowering for {instr:#010x}"
            ))),
        }
    }

    fn translate_special(&mut self, instr: u32) -> Result<(), EmuError> {
        let rd = instr.rd();
        let rs = instr.rs();
        let rt = instr.rt();
        let sa = instr.shamt() as u64;
        match instr.funct() {
            special::SLL => {
                let vt = self.read_gpr(rt)?;
                let t = self.trunc(Ty::I32, vt)?;
                let sh = self.binop(BinOp::Sll, Ty::I32, t, const_u64(sa))?;
                let r = self.sext64(sh)?;
                self.write_gpr(rd, r)
            }
            special::SRL => {
                let vt = self.read_gpr(rt)?;
                let t = self.trunc(Ty::I32, vt)?;
                let sh = self.binop(BinOp::Srl, Ty::I32, t, const_u64(sa))?;
                let r = self.sext64(sh)?;
                self.write_gpr(rd, r)
            }
            special::SRA => {
                let vt = self.read_gpr(rt)?;
                let sh = self.binop(BinOp::Sra, Ty::I64, vt, const_u64(sa))?;
                let t = self.trunc(Ty::I32, sh)?;
                let r = self.sext64(t)?;
                self.write_gpr(rd, r)
            }
            special::SLLV | special::SRLV | special::SRAV => {
                let vs = self.read_gpr(rs)?;
                let amount = self.binop(BinOp::And, Ty::I64, vs, const_u64(0x1F))?;
                let vt = self.read_gpr(rt)?;
                let (op, input) = match instr.funct() {
                    special::SLLV => (BinOp::Sll, self.trunc(Ty::I32, vt)?),
                    special::SRLV => (BinOp::Srl, self.trunc(Ty::I32, vt)?),
                    _ => (BinOp::Sra, vt),
                };
                let sh = self.binop(op, Ty::I32, input, amount)?;
                let t = if instr.funct() == special::SRAV {
                    self.trunc(Ty::I32, sh)?
                } else {
                    sh
                };
                let r = self.sext64(t)?;
                self.write_gpr(rd, r)
            }
            special::DSLL | special::DSRL | special::DSRA => {
                let vt = self.read_gpr(rt)?;
                let op = match instr.funct() {
                    special::DSLL => BinOp::Sll,
                    special::DSRL => BinOp::Srl,
                    _ => BinOp::Sra,
                };
                let r = self.binop(op, Ty::I64, vt, const_u64(sa))?;
                self.write_gpr(rd, r)
            }
            special::DSLL32 | special::DSRL32 | special::DSRA32 => {
                let vt = self.read_gpr(rt)?;
                let op = match instr.funct() {
                    special::DSLL32 => BinOp::Sll,
                    special::DSRL32 => BinOp::Srl,
                    _ => BinOp::Sra,
                };
                let r = self.binop(op, Ty::I64, vt, const_u64(sa + 32))?;
                self.write_gpr(rd, r)
            }
            special::DSLLV | special::DSRLV | special::DSRAV => {
                let vs = self.read_gpr(rs)?;
                let amount = self.binop(BinOp::And, Ty::I64, vs, const_u64(0x3F))?;
                let vt = self.read_gpr(rt)?;
                let op = match instr.funct() {
                    special::DSLLV => BinOp::Sll,
                    special::DSRLV => BinOp::Srl,
                    _ => BinOp::Sra,
                };
                let r = self.binop(op, Ty::I64, vt, amount)?;
                self.write_gpr(rd, r)
            }
            special::ADD | special::ADDU => {
                let vs = self.read_gpr(rs)?;
                let vt = self.read_gpr(rt)?;
                let a = self.trunc(Ty::I32, vs)?;
                let b = self.trunc(Ty::I32, vt)?;
                let sum = self.binop(BinOp::Add, Ty::I32, a, b)?;
                let r = self.sext64(sum)?;
                self.write_gpr(rd, r)
            }
            special::SUB | special::SUBU => {
                let vs = self.read_gpr(rs)?;
                let vt = self.read_gpr(rt)?;
                let a = self.trunc(Ty::I32, vs)?;
                let b = self.trunc(Ty::I32, vt)?;
                let diff = self.binop(BinOp::Sub, Ty::I32, a, b)?;
                let r = self.sext64(diff)?;
                self.write_gpr(rd, r)
            }
            special::DADD | special::DADDU => {
                let vs = self.read_gpr(rs)?;
                let vt = self.read_gpr(rt)?;
                let r = self.binop(BinOp::Add, Ty::I64, vs, vt)?;
                self.write_gpr(rd, r)
            }
            special::DSUB | special::DSUBU => {
                let vs = self.read_gpr(rs)?;
                let vt = self.read_gpr(rt)?;
                let r = self.binop(BinOp::Sub, Ty::I64, vs, vt)?;
                self.write_gpr(rd, r)
            }
            special::AND | special::OR | special::XOR => {
                let vs = self.read_gpr(rs)?;
                let vt = self.read_gpr(rt)?;
                let op = match instr.funct() {
                    special::AND => BinOp::And,
                    special::OR => BinOp::Or,
                    _ => BinOp::Xor,
                };
                let r = self.binop(op, Ty::I64, vs, vt)?;
                self.write_gpr(rd, r)
            }
            special::NOR => {
                let vs = self.read_gpr(rs)?;
                let vt = self.read_gpr(rt)?;
                let or = self.binop(BinOp::Or, Ty::I64, vs, vt)?;
                let dst = self.value(Ty::I64);
                self.push(Instr::Not { dst, a: or })?;
                self.write_gpr(rd, Operand::Value(dst))
            }
            special::SLT => {
                let vs = self.read_gpr(rs)?;
                let vt = self.read_gpr(rt)?;
                let c = self.cmp(CmpOp::Slt, vs, vt)?;
                let r = self.zext64(c)?;
                self.write_gpr(rd, r)
            }
            special::SLTU => {
                let vs = self.read_gpr(rs)?;
                let vt = self.read_gpr(rt)?;
                let c = self.cmp(CmpOp::Ult, vs, vt)?;
                let r = self.zext64(c)?;
                self.write_gpr(rd, r)
            }
            special::MFHI => {
                let v = self.read_global(Global::MultHi)?;
                self.write_gpr(rd, v)
            }
            special::MFLO => {
                let v = self.read_global(Global::MultLo)?;
                self.write_gpr(rd, v)
            }
            special::MTHI => {
                let v = self.read_gpr(rs)?;
                self.push(Instr::WriteGlobal {
                    global: Global::MultHi,
                    val: v,
                })
            }
            special::MTLO => {
                let v = self.read_gpr(rs)?;
                self.push(Instr::WriteGlobal {
                    global: Global::MultLo,
                    val: v,
                })
            }
            special::MULT | special::MULTU | special::DIV | special::DIVU | special::DMULT
            | special::DMULTU | special::DDIV | special::DDIVU => {
                // The multiply/divide family neither raises nor redirects:
                // the stand-in interpreter handles the hi/lo bookkeeping.
                self.push(Instr::Call {
                    func: thunks::interpret as usize,
                    args: vec![const_u64(self.machine_ptr), const_u32(instr)],
                    dst: None,
                })
            }
            special::SYNC => Ok(()),
            _ => Err(EmuError::UnsupportedIr(format!(
                "no IR lowering for SPECIAL {:#04x}",
                instr.funct()
            ))),
        }
    }

    /// Lowers an aligned load through the virtual-load thunk.
    fn translate_load(&mut self, instr: u32, size: u64, sign: bool) -> Result<(), EmuError> {
        self.commit_cycles()?;
        if self.in_delay_slot {
            self.push(Instr::WriteGlobal {
                global: Global::DelaySlot,
                val: const_u8(1),
            })?;
        }

        let base = self.read_gpr(instr.rs())?;
        let vaddr = self.binop(BinOp::Add, Ty::I64, base, const_u64(instr.imm_se()))?;

        let ty = match size {
            1 => Ty::I8,
            2 => Ty::I16,
            4 => Ty::I32,
            _ => Ty::I64,
        };
        let func = match size {
            1 => thunks::virt_load_u8 as usize,
            2 => thunks::virt_load_u16 as usize,
            4 => thunks::virt_load_u32 as usize,
            _ => thunks::virt_load_u64 as usize,
        };

        let slot = self.value(Ty::I64);
        self.push(Instr::Alloc { dst: slot })?;
        let ok = self.value(Ty::I1);
        self.push(Instr::Call {
            func,
            args: vec![const_u64(self.machine_ptr), vaddr, Operand::Value(slot)],
            dst: Some(ok),
        })?;
        self.push(Instr::Assert {
            cond: Operand::Value(ok),
        })?;

        let raw = self.value(ty);
        self.push(Instr::LoadSlot {
            dst: raw,
            ptr: Operand::Value(slot),
        })?;
        let widened = if sign {
            self.sext64(Operand::Value(raw))?
        } else {
            self.zext64(Operand::Value(raw))?
        };
        self.write_gpr(instr.rt(), widened)
    }

    /// Lowers an aligned store through the virtual-store thunk.
    fn translate_store(&mut self, instr: u32, size: u64) -> Result<(), EmuError> {
        self.commit_cycles()?;
        if self.in_delay_slot {
            self.push(Instr::WriteGlobal {
                global: Global::DelaySlot,
                val: const_u8(1),
            })?;
        }

        let base = self.read_gpr(instr.rs())?;
        let vaddr = self.binop(BinOp::Add, Ty::I64, base, const_u64(instr.imm_se()))?;
        let val = self.read_gpr(instr.rt())?;

        let func = match size {
            1 => thunks::virt_store_u8 as usize,
            2 => thunks::virt_store_u16 as usize,
            4 => thunks::virt_store_u32 as usize,
            _ => thunks::virt_store_u64 as usize,
        };
        let ok = self.value(Ty::I1);
        self.push(Instr::Call {
            func,
            args: vec![const_u64(self.machine_ptr), vaddr, val],
            dst: Some(ok),
        })?;
        self.push(Instr::Assert {
            cond: Operand::Value(ok),
        })
    }
}

/// Instruction classes for block construction.
enum Class {
    /// Straight-line, directly lowered.
    Simple,
    /// Control transfer with a delay slot.
    Branch,
    /// Touches COP1: guard then hand to the interpreter.
    Cop1,
    /// No lowering: the block ends here.
    BlockEnd,
}
