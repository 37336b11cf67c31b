//! VR CPU behaviour.
//!
//! Implementation blocks on [`crate::state::Machine`]:
//! 1. **`memory`:** segment rules, TLB translation, virtual load/store.
//! 2. **`trap`:** exception entry, ERET, interrupt delivery.
//! 3. **`execution`:** the interpreter step and instruction dispatch.
//! 4. **`cop1`:** the floating-point unit.

/// COP1 floating-point instruction evaluation.
pub mod cop1;

/// Interpreter step and instruction dispatch.
pub mod execution;

/// Address translation and virtual memory access.
pub mod memory;

/// Exception entry and return.
pub mod trap;
