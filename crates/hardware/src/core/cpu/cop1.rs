//! COP1 floating-point unit.
//!
//! Single/double arithmetic, fixed-point conversions, compares and the BC1
//! branches, all gated on `Status.CU1`. Host floating point carries the
//! arithmetic; the W/L fixed formats are explicit casts with the MIPS
//! round-to-nearest default for the CVT family.

use crate::common::Exception;
use crate::isa::InstructionBits;
use crate::isa::opcodes::{copz, cop1};
use crate::state::Machine;

/// COP1 function codes for the arithmetic formats.
mod funct {
    pub const ADD: u32 = 0x00;
    pub const SUB: u32 = 0x01;
    pub const MUL: u32 = 0x02;
    pub const DIV: u32 = 0x03;
    pub const SQRT: u32 = 0x04;
    pub const ABS: u32 = 0x05;
    pub const MOV: u32 = 0x06;
    pub const NEG: u32 = 0x07;
    pub const ROUND_L: u32 = 0x08;
    pub const TRUNC_L: u32 = 0x09;
    pub const CEIL_L: u32 = 0x0A;
    pub const FLOOR_L: u32 = 0x0B;
    pub const ROUND_W: u32 = 0x0C;
    pub const TRUNC_W: u32 = 0x0D;
    pub const CEIL_W: u32 = 0x0E;
    pub const FLOOR_W: u32 = 0x0F;
    pub const CVT_S: u32 = 0x20;
    pub const CVT_D: u32 = 0x21;
    pub const CVT_W: u32 = 0x24;
    pub const CVT_L: u32 = 0x25;
    /// First of the sixteen compare codes.
    pub const C_BASE: u32 = 0x30;
}

/// Rounds to nearest, ties to even (the FPU default mode).
fn round_even_f64(v: f64) -> f64 {
    let r = v.round();
    if (v - v.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        r - v.signum()
    } else {
        r
    }
}

impl Machine {
    /// Raises CoprocessorUnusable(1) unless CU1 is set.
    fn check_cop1_usable(&mut self) -> bool {
        if self.cpu.cp0.cu1() {
            true
        } else {
            self.take_exception(Exception::CoprocessorUnusable, 0, false, false, 1);
            false
        }
    }

    /// Dispatches a COP1-class instruction.
    pub(crate) fn eval_cop1(&mut self, instr: u32) {
        if !self.check_cop1_usable() {
            return;
        }
        let fr = self.cpu.cp0.fr();
        match instr.rs() as u32 {
            copz::MF => {
                let v = self.cpu.fpu.read_w(instr.rd(), fr);
                self.cpu.gpr.write(instr.rt(), v as i32 as i64 as u64);
            }
            copz::DMF => {
                let v = self.cpu.fpu.read_d(instr.rd(), fr);
                self.cpu.gpr.write(instr.rt(), v);
            }
            copz::CF => {
                let v = match instr.rd() {
                    0 => self.cpu.fpu.fcr0,
                    _ => self.cpu.fpu.fcr31,
                };
                self.cpu.gpr.write(instr.rt(), v as i32 as i64 as u64);
            }
            copz::MT => {
                let v = self.cpu.gpr.read(instr.rt()) as u32;
                self.cpu.fpu.write_w(instr.rd(), fr, v);
            }
            copz::DMT => {
                let v = self.cpu.gpr.read(instr.rt());
                self.cpu.fpu.write_d(instr.rd(), fr, v);
            }
            copz::CT => {
                if instr.rd() == 31 {
                    self.cpu.fpu.fcr31 = self.cpu.gpr.read(instr.rt()) as u32 & 0x0183_FFFF;
                }
            }
            copz::BC => {
                let cond = self.cpu.fpu.condition();
                match (instr.rt() as u32) & 0x3 {
                    copz::BCF => self.fp_branch(!cond, instr.imm_se(), false),
                    copz::BCT => self.fp_branch(cond, instr.imm_se(), false),
                    copz::BCFL => self.fp_branch(!cond, instr.imm_se(), true),
                    _ => self.fp_branch(cond, instr.imm_se(), true),
                }
            }
            cop1::FMT_S => self.eval_fmt_s(instr),
            cop1::FMT_D => self.eval_fmt_d(instr),
            cop1::FMT_W => self.eval_fmt_w(instr),
            cop1::FMT_L => self.eval_fmt_l(instr),
            _ => self.take_exception(Exception::ReservedInstruction, 0, false, false, 0),
        }
    }

    fn fp_branch(&mut self, cond: bool, imm: u64, likely: bool) {
        use crate::core::arch::NextAction;
        if likely {
            if cond {
                self.cpu.next_action = NextAction::Delay;
                self.cpu.next_pc = self.cpu.pc.wrapping_add(4).wrapping_add(imm << 2);
            } else {
                self.cpu.pc = self.cpu.pc.wrapping_add(4);
            }
        } else {
            self.cpu.next_action = NextAction::Delay;
            self.cpu.next_pc = if cond {
                self.cpu.pc.wrapping_add(4).wrapping_add(imm << 2)
            } else {
                self.cpu.pc.wrapping_add(8)
            };
        }
    }

    /// MIPS compare condition: bits [unordered, equal, less] of the funct.
    fn fp_compare(&mut self, funct: u32, a: f64, b: f64) {
        let unordered = a.is_nan() || b.is_nan();
        let less = !unordered && a < b;
        let equal = !unordered && a == b;
        let c = (funct & 0x4 != 0 && less)
            || (funct & 0x2 != 0 && equal)
            || (funct & 0x1 != 0 && unordered);
        self.cpu.fpu.set_condition(c);
    }

    fn eval_fmt_s(&mut self, instr: u32) {
        let fr = self.cpu.cp0.fr();
        let fs = instr.rd();
        let ft = instr.rt();
        let fd = instr.shamt() as usize;
        let a = self.cpu.fpu.read_s(fs, fr);
        let b = self.cpu.fpu.read_s(ft, fr);
        let funct = instr.funct();
        match funct {
            funct::ADD => self.cpu.fpu.write_s(fd, fr, a + b),
            funct::SUB => self.cpu.fpu.write_s(fd, fr, a - b),
            funct::MUL => self.cpu.fpu.write_s(fd, fr, a * b),
            funct::DIV => self.cpu.fpu.write_s(fd, fr, a / b),
            funct::SQRT => self.cpu.fpu.write_s(fd, fr, a.sqrt()),
            funct::ABS => self.cpu.fpu.write_s(fd, fr, a.abs()),
            funct::MOV => self.cpu.fpu.write_s(fd, fr, a),
            funct::NEG => self.cpu.fpu.write_s(fd, fr, -a),
            funct::ROUND_L => self.cpu.fpu.write_d(fd, fr, round_even_f64(a as f64) as i64 as u64),
            funct::TRUNC_L => self.cpu.fpu.write_d(fd, fr, a.trunc() as i64 as u64),
            funct::CEIL_L => self.cpu.fpu.write_d(fd, fr, a.ceil() as i64 as u64),
            funct::FLOOR_L => self.cpu.fpu.write_d(fd, fr, a.floor() as i64 as u64),
            funct::ROUND_W => {
                self.cpu.fpu.write_w(fd, fr, round_even_f64(a as f64) as i32 as u32);
            }
            funct::TRUNC_W => self.cpu.fpu.write_w(fd, fr, a.trunc() as i32 as u32),
            funct::CEIL_W => self.cpu.fpu.write_w(fd, fr, a.ceil() as i32 as u32),
            funct::FLOOR_W => self.cpu.fpu.write_w(fd, fr, a.floor() as i32 as u32),
            funct::CVT_D => self.cpu.fpu.write_f64(fd, fr, a as f64),
            funct::CVT_W => {
                self.cpu.fpu.write_w(fd, fr, round_even_f64(a as f64) as i32 as u32);
            }
            funct::CVT_L => self.cpu.fpu.write_d(fd, fr, round_even_f64(a as f64) as i64 as u64),
            f if f >= funct::C_BASE => self.fp_compare(f, a as f64, b as f64),
            _ => self.take_exception(Exception::ReservedInstruction, 0, false, false, 0),
        }
    }

    fn eval_fmt_d(&mut self, instr: u32) {
        let fr = self.cpu.cp0.fr();
        let fs = instr.rd();
        let ft = instr.rt();
        let fd = instr.shamt() as usize;
        let a = self.cpu.fpu.read_f64(fs, fr);
        let b = self.cpu.fpu.read_f64(ft, fr);
        let funct = instr.funct();
        match funct {
            funct::ADD => self.cpu.fpu.write_f64(fd, fr, a + b),
            funct::SUB => self.cpu.fpu.write_f64(fd, fr, a - b),
            funct::MUL => self.cpu.fpu.write_f64(fd, fr, a * b),
            funct::DIV => self.cpu.fpu.write_f64(fd, fr, a / b),
            funct::SQRT => self.cpu.fpu.write_f64(fd, fr, a.sqrt()),
            funct::ABS => self.cpu.fpu.write_f64(fd, fr, a.abs()),
            funct::MOV => self.cpu.fpu.write_f64(fd, fr, a),
            funct::NEG => self.cpu.fpu.write_f64(fd, fr, -a),
            funct::ROUND_L => self.cpu.fpu.write_d(fd, fr, round_even_f64(a) as i64 as u64),
            funct::TRUNC_L => self.cpu.fpu.write_d(fd, fr, a.trunc() as i64 as u64),
            funct::CEIL_L => self.cpu.fpu.write_d(fd, fr, a.ceil() as i64 as u64),
            funct::FLOOR_L => self.cpu.fpu.write_d(fd, fr, a.floor() as i64 as u64),
            funct::ROUND_W => self.cpu.fpu.write_w(fd, fr, round_even_f64(a) as i32 as u32),
            funct::TRUNC_W => self.cpu.fpu.write_w(fd, fr, a.trunc() as i32 as u32),
            funct::CEIL_W => self.cpu.fpu.write_w(fd, fr, a.ceil() as i32 as u32),
            funct::FLOOR_W => self.cpu.fpu.write_w(fd, fr, a.floor() as i32 as u32),
            funct::CVT_S => self.cpu.fpu.write_s(fd, fr, a as f32),
            funct::CVT_W => self.cpu.fpu.write_w(fd, fr, round_even_f64(a) as i32 as u32),
            funct::CVT_L => self.cpu.fpu.write_d(fd, fr, round_even_f64(a) as i64 as u64),
            f if f >= funct::C_BASE => self.fp_compare(f, a, b),
            _ => self.take_exception(Exception::ReservedInstruction, 0, false, false, 0),
        }
    }

    fn eval_fmt_w(&mut self, instr: u32) {
        let fr = self.cpu.cp0.fr();
        let fs = instr.rd();
        let fd = instr.shamt() as usize;
        let a = self.cpu.fpu.read_w(fs, fr) as i32;
        match instr.funct() {
            funct::CVT_S => self.cpu.fpu.write_s(fd, fr, a as f32),
            funct::CVT_D => self.cpu.fpu.write_f64(fd, fr, a as f64),
            _ => self.take_exception(Exception::ReservedInstruction, 0, false, false, 0),
        }
    }

    fn eval_fmt_l(&mut self, instr: u32) {
        let fr = self.cpu.cp0.fr();
        let fs = instr.rd();
        let fd = instr.shamt() as usize;
        let a = self.cpu.fpu.read_d(fs, fr) as i64;
        match instr.funct() {
            funct::CVT_S => self.cpu.fpu.write_s(fd, fr, a as f32),
            funct::CVT_D => self.cpu.fpu.write_f64(fd, fr, a as f64),
            _ => self.take_exception(Exception::ReservedInstruction, 0, false, false, 0),
        }
    }

    pub(crate) fn eval_lwc1(&mut self, instr: u32) {
        if !self.check_cop1_usable() {
            return;
        }
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        match self.virt_load(vaddr, 4) {
            Ok(v) => {
                let fr = self.cpu.cp0.fr();
                self.cpu.fpu.write_w(instr.rt(), fr, v as u32);
            }
            Err(exn) => self.take_exception(exn, vaddr, false, true, 0),
        }
    }

    pub(crate) fn eval_ldc1(&mut self, instr: u32) {
        if !self.check_cop1_usable() {
            return;
        }
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        match self.virt_load(vaddr, 8) {
            Ok(v) => {
                let fr = self.cpu.cp0.fr();
                self.cpu.fpu.write_d(instr.rt(), fr, v);
            }
            Err(exn) => self.take_exception(exn, vaddr, false, true, 0),
        }
    }

    pub(crate) fn eval_swc1(&mut self, instr: u32) {
        if !self.check_cop1_usable() {
            return;
        }
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let fr = self.cpu.cp0.fr();
        let val = self.cpu.fpu.read_w(instr.rt(), fr);
        if let Err(exn) = self.virt_store(vaddr, 4, val as u64) {
            self.take_exception(exn, vaddr, false, false, 0);
        }
    }

    pub(crate) fn eval_sdc1(&mut self, instr: u32) {
        if !self.check_cop1_usable() {
            return;
        }
        let vaddr = self.cpu.gpr.read(instr.rs()).wrapping_add(instr.imm_se());
        let fr = self.cpu.cp0.fr();
        let val = self.cpu.fpu.read_d(instr.rt(), fr);
        if let Err(exn) = self.virt_store(vaddr, 8, val) {
            self.take_exception(exn, vaddr, false, false, 0);
        }
    }
}
