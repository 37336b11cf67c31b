//! IR lowering and code generation.
//!
//! The backend walks the graph's blocks in order, lowering each IR
//! instruction to x86-64 through the emitter. Value allocation is a simple
//! scan: values are assigned callee-saved host registers in definition
//! order until the pool is exhausted, then stack slots in the frame. The
//! callee-saved pool survives native calls, so call sites only marshal
//! arguments into the System V registers and collect the return value.
//!
//! Generated blocks are plain `extern "C" fn()` bodies: the machine
//! pointer and every global's host address are baked in as 64-bit
//! immediates captured at bind time.

use crate::common::EmuError;
use crate::recompiler::cache::{CodeBuffer, GlobalSlot};
use crate::recompiler::emitter::{
    Asm, Cond, Mem, R8, R9, R12, R13, R14, R15, RAX, RBP, RBX, RCX, RDI, RDX, RSI, RSP,
};
use crate::recompiler::ir::{BinOp, CmpOp, Global, Graph, Instr, Operand, Terminator, Ty, ValueId};

/// Callee-saved registers handed to values before spilling to the stack.
const REG_POOL: [u8; 5] = [RBX, R12, R13, R14, R15];

/// System V argument registers, in order.
const ARG_REGS: [u8; 6] = [RDI, RSI, RDX, RCX, R8, R9];

/// Where a value lives for its whole lifetime.
#[derive(Clone, Copy, Debug)]
enum Home {
    Reg(u8),
    Slot(usize),
}

/// A pending rel32 patch.
enum PatchTarget {
    Block(u32),
    Epilogue,
}

struct Lowering<'a> {
    graph: &'a Graph,
    globals: &'a [GlobalSlot],
    homes: Vec<Home>,
    /// Frame slot index of each Alloc instruction's storage, keyed by the
    /// destination value.
    alloc_slots: Vec<(ValueId, usize)>,
    patches: Vec<(usize, PatchTarget)>,
    block_offsets: Vec<usize>,
}

/// Compiles one graph into the code buffer.
///
/// # Returns
///
/// The buffer offset of the entry point, or the failure that abandoned the
/// block (the buffer cursor is rewound by the caller).
pub fn compile_graph(
    graph: &Graph,
    globals: &[GlobalSlot],
    buf: &mut CodeBuffer,
) -> Result<usize, EmuError> {
    let entry = buf.len();

    // Allocation scan: registers in definition order, then frame slots.
    let n_values = graph.value_count();
    let mut homes = Vec::with_capacity(n_values);
    let mut next_slot = 0usize;
    for i in 0..n_values {
        if i < REG_POOL.len() {
            homes.push(Home::Reg(REG_POOL[i]));
        } else {
            homes.push(Home::Slot(next_slot));
            next_slot += 1;
        }
    }

    // Dedicated frame slots for Alloc storage.
    let mut alloc_slots = Vec::new();
    for block in graph.blocks() {
        for instr in &block.instrs {
            if let Instr::Alloc { dst } = instr {
                alloc_slots.push((*dst, next_slot));
                next_slot += 1;
            }
        }
    }

    // Frame size: slots below the five saved registers, keeping the stack
    // 16-byte aligned at call sites.
    let mut frame_extra = 8 * next_slot as i32 + 8;
    if frame_extra % 16 != 8 {
        frame_extra += 8;
    }

    let mut lower = Lowering {
        graph,
        globals,
        homes,
        alloc_slots,
        patches: Vec::new(),
        block_offsets: vec![0; graph.blocks().len()],
    };

    {
        let mut asm = Asm::new(buf);

        // Prologue.
        asm.push_r64(RBP);
        asm.mov_r64_r64(RBP, RSP);
        for r in REG_POOL {
            asm.push_r64(r);
        }
        asm.sub_r64_imm32(RSP, frame_extra);

        // Blocks in order; the entry block is index 0.
        for (idx, block) in graph.blocks().iter().enumerate() {
            lower.block_offsets[idx] = asm.buf.len();
            for instr in &block.instrs {
                lower.lower_instr(&mut asm, instr)?;
            }
            match block.term.as_ref() {
                Some(Terminator::Exit) | None => {
                    let at = asm.jmp_rel32();
                    lower.patches.push((at, PatchTarget::Epilogue));
                }
                Some(Terminator::Br {
                    cond,
                    if_true,
                    if_false,
                }) => {
                    lower.load(&mut asm, *cond, RAX);
                    asm.test_r8_r8(RAX, RAX);
                    let t = asm.jcc_rel32(Cond::Ne);
                    lower.patches.push((t, PatchTarget::Block(if_true.0)));
                    let f = asm.jmp_rel32();
                    lower.patches.push((f, PatchTarget::Block(if_false.0)));
                }
            }
        }

        // Epilogue.
        let epilogue = asm.buf.len();
        asm.add_r64_imm32(RSP, frame_extra);
        for r in REG_POOL.iter().rev() {
            asm.pop_r64(*r);
        }
        asm.pop_r64(RBP);
        asm.ret();

        // Patch the control-flow edges.
        for (at, target) in &lower.patches {
            let offset = match target {
                PatchTarget::Block(b) => lower.block_offsets[*b as usize],
                PatchTarget::Epilogue => epilogue,
            };
            asm.buf.patch_rel32(*at, offset);
        }
    }

    if buf.has_failed() {
        buf.rewind(entry);
        return Err(EmuError::CodeBufferFull);
    }
    Ok(entry)
}

impl Lowering<'_> {
    /// Frame displacement of slot `i`.
    fn slot_disp(&self, i: usize) -> i32 {
        -(48 + 8 * i as i32)
    }

    /// Loads an operand into a scratch register.
    fn load(&self, asm: &mut Asm<'_>, op: Operand, dst: u8) {
        match op {
            Operand::Const(v, _) => asm.mov_r64_imm64(dst, v),
            Operand::Value(v) => match self.homes[v.0 as usize] {
                Home::Reg(r) => asm.mov_r64_r64(dst, r),
                Home::Slot(i) => asm.mov_r64_mem(dst, Mem::base_disp(RBP, self.slot_disp(i))),
            },
        }
    }

    /// Stores a scratch register into a value's home.
    fn store(&self, asm: &mut Asm<'_>, v: ValueId, src: u8) {
        match self.homes[v.0 as usize] {
            Home::Reg(r) => asm.mov_r64_r64(r, src),
            Home::Slot(i) => asm.mov_mem_r64(Mem::base_disp(RBP, self.slot_disp(i)), src),
        }
    }

    fn lower_instr(&mut self, asm: &mut Asm<'_>, instr: &Instr) -> Result<(), EmuError> {
        match instr {
            Instr::Bin { op, dst, a, b } => {
                self.load(asm, *a, RAX);
                self.load(asm, *b, RCX);
                match op {
                    BinOp::Add => asm.add_r64_r64(RAX, RCX),
                    BinOp::Sub => asm.sub_r64_r64(RAX, RCX),
                    BinOp::And => asm.and_r64_r64(RAX, RCX),
                    BinOp::Or => asm.or_r64_r64(RAX, RCX),
                    BinOp::Xor => asm.xor_r64_r64(RAX, RCX),
                    BinOp::Mul => asm.imul_r64_r64(RAX, RCX),
                    BinOp::Sdiv => {
                        asm.cqo();
                        asm.idiv_r64(RCX);
                    }
                    BinOp::Udiv => {
                        asm.xor_rdx_rdx();
                        asm.div_r64(RCX);
                    }
                    BinOp::Smul => {
                        asm.imul_r64(RCX);
                        asm.mov_r64_r64(RAX, RDX);
                    }
                    BinOp::Umul => {
                        asm.mul_r64(RCX);
                        asm.mov_r64_r64(RAX, RDX);
                    }
                    BinOp::Sll => asm.shl_r64_cl(RAX),
                    BinOp::Srl => asm.shr_r64_cl(RAX),
                    BinOp::Sra => asm.sar_r64_cl(RAX),
                }
                self.store(asm, *dst, RAX);
            }
            Instr::Not { dst, a } => {
                self.load(asm, *a, RAX);
                asm.not_r64(RAX);
                self.store(asm, *dst, RAX);
            }
            Instr::Cmp { op, dst, a, b } => {
                self.load(asm, *a, RAX);
                self.load(asm, *b, RCX);
                if a.ty(self.graph).bits() <= 32 {
                    asm.cmp_r32_r32(RAX, RCX);
                } else {
                    asm.cmp_r64_r64(RAX, RCX);
                }
                let cond = match op {
                    CmpOp::Eq => Cond::E,
                    CmpOp::Ne => Cond::Ne,
                    CmpOp::Slt => Cond::L,
                    CmpOp::Sle => Cond::Le,
                    CmpOp::Sgt => Cond::G,
                    CmpOp::Sge => Cond::Ge,
                    CmpOp::Ult => Cond::B,
                    CmpOp::Ule => Cond::Be,
                    CmpOp::Ugt => Cond::A,
                    CmpOp::Uge => Cond::Ae,
                };
                asm.setcc_r8(cond, RAX);
                asm.movzx_r64_r8(RAX, RAX);
                self.store(asm, *dst, RAX);
            }
            Instr::Trunc { dst, a } | Instr::Zext { dst, a } => {
                // Both leave zero upper bits in the 64-bit home: truncation
                // masks to the destination width, zero-extension masks to
                // the source width.
                self.load(asm, *a, RAX);
                let narrow = match instr {
                    Instr::Trunc { .. } => self.graph.value_ty(*dst),
                    _ => a.ty(self.graph),
                };
                match narrow {
                    Ty::I64 => {}
                    Ty::I32 => asm.mov_r32_r32(RAX, RAX),
                    Ty::I16 => asm.movzx_r64_r16(RAX, RAX),
                    Ty::I8 | Ty::I1 => asm.movzx_r64_r8(RAX, RAX),
                }
                self.store(asm, *dst, RAX);
            }
            Instr::Sext { dst, a } => {
                self.load(asm, *a, RAX);
                match a.ty(self.graph) {
                    Ty::I64 => {}
                    Ty::I32 => asm.movsxd_r64_r32(RAX, RAX),
                    Ty::I16 => asm.movsx_r64_r16(RAX, RAX),
                    Ty::I8 | Ty::I1 => asm.movsx_r64_r8(RAX, RAX),
                }
                self.store(asm, *dst, RAX);
            }
            Instr::ReadGlobal { dst, global } => {
                let slot = self.global_slot(*global)?;
                asm.mov_r64_imm64(RCX, slot.addr as u64);
                match slot.ty {
                    Ty::I64 => asm.mov_r64_mem(RAX, Mem::indirect(RCX)),
                    Ty::I32 => asm.mov_r32_mem(RAX, Mem::indirect(RCX)),
                    Ty::I16 => asm.movzx_r64_mem16(RAX, Mem::indirect(RCX)),
                    Ty::I8 | Ty::I1 => asm.movzx_r64_mem8(RAX, Mem::indirect(RCX)),
                }
                self.store(asm, *dst, RAX);
            }
            Instr::WriteGlobal { global, val } => {
                let slot = self.global_slot(*global)?;
                self.load(asm, *val, RAX);
                asm.mov_r64_imm64(RCX, slot.addr as u64);
                match slot.ty {
                    Ty::I64 => asm.mov_mem_r64(Mem::indirect(RCX), RAX),
                    Ty::I32 => asm.mov_mem_r32(Mem::indirect(RCX), RAX),
                    Ty::I16 => asm.mov_mem_r16(Mem::indirect(RCX), RAX),
                    Ty::I8 | Ty::I1 => asm.mov_mem_r8(Mem::indirect(RCX), RAX),
                }
            }
            Instr::Alloc { dst } => {
                let slot = self
                    .alloc_slots
                    .iter()
                    .find(|(v, _)| v == dst)
                    .map(|(_, s)| *s)
                    .expect("alloc slot assigned in scan");
                asm.lea_r64_mem(RAX, Mem::base_disp(RBP, self.slot_disp(slot)));
                self.store(asm, *dst, RAX);
            }
            Instr::LoadSlot { dst, ptr } => {
                self.load(asm, *ptr, RCX);
                match self.graph.value_ty(*dst) {
                    Ty::I64 => asm.mov_r64_mem(RAX, Mem::indirect(RCX)),
                    Ty::I32 => asm.mov_r32_mem(RAX, Mem::indirect(RCX)),
                    Ty::I16 => asm.movzx_r64_mem16(RAX, Mem::indirect(RCX)),
                    Ty::I8 | Ty::I1 => asm.movzx_r64_mem8(RAX, Mem::indirect(RCX)),
                }
                self.store(asm, *dst, RAX);
            }
            Instr::Call { func, args, dst } => {
                if args.len() > ARG_REGS.len() {
                    return Err(EmuError::UnsupportedIr("call with too many arguments".into()));
                }
                for (arg, reg) in args.iter().zip(ARG_REGS) {
                    self.load(asm, *arg, reg);
                }
                asm.mov_r64_imm64(RAX, *func as u64);
                asm.call_r64(RAX);
                if let Some(dst) = dst {
                    match self.graph.value_ty(*dst) {
                        Ty::I1 | Ty::I8 => asm.movzx_r64_r8(RAX, RAX),
                        Ty::I16 => asm.movzx_r64_r16(RAX, RAX),
                        Ty::I32 => asm.mov_r32_r32(RAX, RAX),
                        Ty::I64 => {}
                    }
                    self.store(asm, *dst, RAX);
                }
            }
            Instr::Assert { cond } => {
                self.load(asm, *cond, RAX);
                asm.test_r8_r8(RAX, RAX);
                let at = asm.jcc_rel32(Cond::E);
                self.patches.push((at, PatchTarget::Epilogue));
            }
        }
        Ok(())
    }

    fn global_slot(&self, g: Global) -> Result<GlobalSlot, EmuError> {
        let idx = match g {
            Global::Gpr(i) => i as usize,
            Global::Pc => 32,
            Global::MultHi => 33,
            Global::MultLo => 34,
            Global::Sr => 35,
            Global::Cycles => 36,
            Global::DelaySlot => 37,
        };
        let slot = self.globals[idx];
        if slot.addr.is_null() {
            return Err(EmuError::UnsupportedIr("unbound global".into()));
        }
        Ok(slot)
    }
}
