//! VR architectural state.
//!
//! Register files and translation state owned by the machine:
//! 1. **GPR:** 32 × 64-bit general registers with the hardwired zero.
//! 2. **FPR:** 32 × 64-bit floating-point registers with the FR aliasing rule.
//! 3. **COP0:** the system coprocessor register block.
//! 4. **TLB:** 32 entries with variable page sizes.

/// COP0 system coprocessor registers.
pub mod cp0;

/// Floating-point register file.
pub mod fpr;

/// General-purpose register file.
pub mod gpr;

/// Translation lookaside buffer.
pub mod tlb;

pub use cp0::Cp0;
pub use fpr::Fpr;
pub use gpr::Gpr;
pub use tlb::{Tlb, TlbEntry};

use serde::{Deserialize, Serialize};

/// The two-stage delay-slot sequencer state.
///
/// Branches never mutate `pc` directly; they arm `Delay` with the target in
/// `next_pc`. The following step executes the delay-slot instruction under
/// `Jump`, after which the sequencer commits `pc = next_pc`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextAction {
    /// Sequential execution; `pc` advances by 4.
    #[default]
    Continue,
    /// A branch was just executed; the next instruction is its delay slot.
    Delay,
    /// The delay slot is executing; `pc` commits to `next_pc` afterwards.
    Jump,
}

/// Architectural state of the VR processor.
#[derive(Clone, Serialize, Deserialize)]
pub struct CpuState {
    /// General-purpose registers.
    pub gpr: Gpr,
    /// Virtual program counter of the next instruction to fetch.
    pub pc: u64,
    /// Multiply/divide result registers.
    pub mult_hi: u64,
    /// Multiply/divide result registers.
    pub mult_lo: u64,
    /// Load-linked bit (LL/SC).
    pub ll_bit: bool,
    /// Delay-slot sequencer stage.
    pub next_action: NextAction,
    /// Pending branch target.
    pub next_pc: u64,
    /// Whether the instruction currently executing sits in a delay slot.
    ///
    /// Maintained by the interpreter each step and written as a global by
    /// recompiled delay-slot bodies, so `take_exception` has a single
    /// source of truth for `Cause.BD`.
    pub in_delay_slot: bool,
    /// COP0 system coprocessor.
    pub cp0: Cp0,
    /// COP1 floating-point registers.
    pub fpu: Fpr,
    /// Translation lookaside buffer.
    pub tlb: Tlb,
}

impl CpuState {
    /// Creates the power-on CPU state (all registers zero; the boot stub
    /// fills in the PIF-provided values).
    pub fn new() -> Self {
        Self {
            gpr: Gpr::new(),
            pc: 0,
            mult_hi: 0,
            mult_lo: 0,
            ll_bit: false,
            next_action: NextAction::Continue,
            next_pc: 0,
            in_delay_slot: false,
            cp0: Cp0::new(),
            fpu: Fpr::new(),
            tlb: Tlb::new(),
        }
    }
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new()
    }
}
