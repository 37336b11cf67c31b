//! VR CPU core.
//!
//! The main 64-bit MIPS III processor: architectural register files, the
//! 32-entry TLB, the interpreter, and the exception entry machinery. All
//! behaviour is implemented as methods on [`crate::state::Machine`] so the
//! interpreter, the device handlers and the recompiler thunks share one
//! mutable view of the console.

/// Architectural state: GPR/FPR files, COP0 block, TLB.
pub mod arch;

/// Interpreter, memory access and exception entry (impl blocks on `Machine`).
pub mod cpu;
