//! Test harness.
//!
//! `TestContext` owns a simulator with the default memory map and exposes
//! program loading through kseg0, register accessors and stepping. The
//! encoding helpers build the MIPS instructions tests use, by field.

use n64_core::config::Config;
use n64_core::sim::simulator::Simulator;
use n64_core::state::Machine;

/// Base virtual address programs are loaded at (kseg0, physical 0x1000).
pub const CODE_VADDR: u64 = 0xFFFF_FFFF_8000_1000;

/// Physical address behind [`CODE_VADDR`].
pub const CODE_PADDR: u64 = 0x1000;

pub struct TestContext {
    pub sim: Simulator,
}

impl TestContext {
    /// A context with the recompiler disabled (pure interpreter).
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut config = Config::default();
        config.recompiler.enabled = false;
        Self {
            sim: Simulator::new(&config),
        }
    }

    /// A context with the recompiler enabled.
    pub fn new_with_jit() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = Config::default();
        Self {
            sim: Simulator::new(&config),
        }
    }

    /// The machine under test.
    pub fn m(&mut self) -> &mut Machine {
        &mut self.sim.machine
    }

    /// Loads instructions at `CODE_VADDR` and points the PC there.
    pub fn load_program(&mut self, instructions: &[u32]) {
        for (i, instr) in instructions.iter().enumerate() {
            assert!(
                self.m().bus_store_u32(CODE_PADDR + 4 * i as u64, *instr),
                "program store failed"
            );
        }
        self.m().cpu.pc = CODE_VADDR;
    }

    /// Runs `n` interpreter steps.
    pub fn step(&mut self, n: usize) {
        for _ in 0..n {
            self.sim.machine.step_cpu();
        }
    }

    /// Reads a general-purpose register.
    pub fn gpr(&mut self, idx: usize) -> u64 {
        self.m().cpu.gpr.read(idx)
    }

    /// Writes a general-purpose register.
    pub fn set_gpr(&mut self, idx: usize, val: u64) {
        self.m().cpu.gpr.write(idx, val);
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

// ── MIPS instruction encoders ─────────────────────────────────────────

fn r_type(funct: u32, rd: u32, rs: u32, rt: u32, sa: u32) -> u32 {
    (rs << 21) | (rt << 16) | (rd << 11) | (sa << 6) | funct
}

fn i_type(op: u32, rt: u32, rs: u32, imm: u16) -> u32 {
    (op << 26) | (rs << 21) | (rt << 16) | imm as u32
}

pub fn nop() -> u32 {
    0
}

pub fn sll(rd: u32, rt: u32, sa: u32) -> u32 {
    r_type(0x00, rd, 0, rt, sa)
}

pub fn srl(rd: u32, rt: u32, sa: u32) -> u32 {
    r_type(0x02, rd, 0, rt, sa)
}

pub fn sra(rd: u32, rt: u32, sa: u32) -> u32 {
    r_type(0x03, rd, 0, rt, sa)
}

pub fn addu(rd: u32, rs: u32, rt: u32) -> u32 {
    r_type(0x21, rd, rs, rt, 0)
}

pub fn subu(rd: u32, rs: u32, rt: u32) -> u32 {
    r_type(0x23, rd, rs, rt, 0)
}

pub fn and(rd: u32, rs: u32, rt: u32) -> u32 {
    r_type(0x24, rd, rs, rt, 0)
}

pub fn or(rd: u32, rs: u32, rt: u32) -> u32 {
    r_type(0x25, rd, rs, rt, 0)
}

pub fn slt(rd: u32, rs: u32, rt: u32) -> u32 {
    r_type(0x2A, rd, rs, rt, 0)
}

pub fn sltu(rd: u32, rs: u32, rt: u32) -> u32 {
    r_type(0x2B, rd, rs, rt, 0)
}

pub fn mult(rs: u32, rt: u32) -> u32 {
    r_type(0x18, 0, rs, rt, 0)
}

pub fn mflo(rd: u32) -> u32 {
    r_type(0x12, rd, 0, 0, 0)
}

pub fn mfhi(rd: u32) -> u32 {
    r_type(0x10, rd, 0, 0, 0)
}

pub fn div(rs: u32, rt: u32) -> u32 {
    r_type(0x1A, 0, rs, rt, 0)
}

pub fn jr(rs: u32) -> u32 {
    r_type(0x08, 0, rs, 0, 0)
}

pub fn jalr(rd: u32, rs: u32) -> u32 {
    r_type(0x09, rd, rs, 0, 0)
}

pub fn syscall() -> u32 {
    0x0000_000C
}

pub fn teq(rs: u32, rt: u32) -> u32 {
    r_type(0x34, 0, rs, rt, 0)
}

pub fn addi(rt: u32, rs: u32, imm: i16) -> u32 {
    i_type(0x08, rt, rs, imm as u16)
}

pub fn addiu(rt: u32, rs: u32, imm: i16) -> u32 {
    i_type(0x09, rt, rs, imm as u16)
}

pub fn daddiu(rt: u32, rs: u32, imm: i16) -> u32 {
    i_type(0x19, rt, rs, imm as u16)
}

pub fn slti(rt: u32, rs: u32, imm: i16) -> u32 {
    i_type(0x0A, rt, rs, imm as u16)
}

pub fn andi(rt: u32, rs: u32, imm: u16) -> u32 {
    i_type(0x0C, rt, rs, imm)
}

pub fn ori(rt: u32, rs: u32, imm: u16) -> u32 {
    i_type(0x0D, rt, rs, imm)
}

pub fn lui(rt: u32, imm: u16) -> u32 {
    i_type(0x0F, rt, 0, imm)
}

pub fn beq(rs: u32, rt: u32, off: i16) -> u32 {
    i_type(0x04, rt, rs, off as u16)
}

pub fn bne(rs: u32, rt: u32, off: i16) -> u32 {
    i_type(0x05, rt, rs, off as u16)
}

pub fn beql(rs: u32, rt: u32, off: i16) -> u32 {
    i_type(0x14, rt, rs, off as u16)
}

pub fn j(target: u64) -> u32 {
    (0x02 << 26) | (((target >> 2) as u32) & 0x03FF_FFFF)
}

pub fn jal(target: u64) -> u32 {
    (0x03 << 26) | (((target >> 2) as u32) & 0x03FF_FFFF)
}

pub fn lb(rt: u32, rs: u32, off: i16) -> u32 {
    i_type(0x20, rt, rs, off as u16)
}

pub fn lw(rt: u32, rs: u32, off: i16) -> u32 {
    i_type(0x23, rt, rs, off as u16)
}

pub fn lwl(rt: u32, rs: u32, off: i16) -> u32 {
    i_type(0x22, rt, rs, off as u16)
}

pub fn lwr(rt: u32, rs: u32, off: i16) -> u32 {
    i_type(0x26, rt, rs, off as u16)
}

pub fn ld(rt: u32, rs: u32, off: i16) -> u32 {
    i_type(0x37, rt, rs, off as u16)
}

pub fn sb(rt: u32, rs: u32, off: i16) -> u32 {
    i_type(0x28, rt, rs, off as u16)
}

pub fn sw(rt: u32, rs: u32, off: i16) -> u32 {
    i_type(0x2B, rt, rs, off as u16)
}

pub fn sd(rt: u32, rs: u32, off: i16) -> u32 {
    i_type(0x3F, rt, rs, off as u16)
}

pub fn mtc0(rt: u32, rd: u32) -> u32 {
    (0x10 << 26) | (0x04 << 21) | (rt << 16) | (rd << 11)
}

pub fn mfc0(rt: u32, rd: u32) -> u32 {
    (0x10 << 26) | (rt << 16) | (rd << 11)
}

pub fn tlbwi() -> u32 {
    (0x10 << 26) | (1 << 25) | 0x02
}

pub fn tlbp() -> u32 {
    (0x10 << 26) | (1 << 25) | 0x08
}

pub fn eret() -> u32 {
    (0x10 << 26) | (1 << 25) | 0x18
}

// ── RSP instruction encoders ──────────────────────────────────────────

/// COP2 vector operation.
pub fn vop(funct: u32, vd: u32, vs: u32, vt: u32, e: u32) -> u32 {
    (0x12 << 26) | (1 << 25) | (e << 21) | (vt << 16) | (vs << 11) | (vd << 6) | funct
}

/// LWC2 vector load.
pub fn vload(funct: u32, vt: u32, base: u32, element: u32, offset: u32) -> u32 {
    (0x32 << 26) | (base << 21) | (vt << 16) | (funct << 11) | (element << 7) | (offset & 0x7F)
}

/// SWC2 vector store.
pub fn vstore(funct: u32, vt: u32, base: u32, element: u32, offset: u32) -> u32 {
    (0x3A << 26) | (base << 21) | (vt << 16) | (funct << 11) | (element << 7) | (offset & 0x7F)
}
