//! General-purpose register file.
//!
//! 32 × 64-bit registers. Register 0 is a constant zero; the invariant is
//! enforced here in the accessors, never by callers.

use serde::{Deserialize, Serialize};

/// The 64-bit general-purpose register file.
///
/// Shared between the VR core and the RSP scalar core (the RSP only ever
/// holds sign-extended 32-bit values, which this representation preserves).
#[derive(Clone, Serialize, Deserialize)]
pub struct Gpr {
    regs: [u64; 32],
}

impl Gpr {
    /// Creates a register file with all registers zero.
    pub fn new() -> Self {
        Self { regs: [0; 32] }
    }

    /// Reads a register. Register 0 always returns 0.
    #[inline(always)]
    pub fn read(&self, idx: usize) -> u64 {
        self.regs[idx]
    }

    /// Writes a register. Writes to register 0 are silently discarded.
    #[inline(always)]
    pub fn write(&mut self, idx: usize, val: u64) {
        if idx != 0 {
            self.regs[idx] = val;
        }
    }

    /// Clears every register, including the stale r0 slot.
    pub fn reset(&mut self) {
        self.regs = [0; 32];
    }

    /// Raw pointer to a register slot, for the recompiler's global binding.
    ///
    /// The recompiler never emits writes to slot 0, preserving the hardwired
    /// zero without a runtime check in generated code.
    pub(crate) fn slot_ptr(&mut self, idx: usize) -> *mut u64 {
        &mut self.regs[idx]
    }
}

impl Default for Gpr {
    fn default() -> Self {
        Self::new()
    }
}
