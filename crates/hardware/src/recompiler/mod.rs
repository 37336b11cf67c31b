//! Dynamic recompiler.
//!
//! Guest MIPS instruction streams are lowered to a typed SSA intermediate
//! representation and then to x86-64 machine code:
//! 1. **`ir`:** the IR itself: typed values, operations, blocks, graph.
//! 2. **`builder`:** the MIPS disassembler producing IR for one block.
//! 3. **`emitter`:** the x86-64 instruction encoder.
//! 4. **`backend`:** IR lowering, register allocation and code generation.
//! 5. **`cache`:** the executable code buffer and the physically-keyed
//!    block cache.
//! 6. **`thunks`:** the native callbacks recompiled code re-enters the
//!    emulator through (virtual memory access, exception entry, the
//!    stand-in interpreter).
//!
//! A *block* is a straight-line run of guest instructions ending at the
//! first unconditional control transfer or at the configured budget.
//! Recompiler failures are never fatal: the block is abandoned and the
//! interpreter serves that range.

/// IR lowering and code generation.
pub mod backend;

/// MIPS to IR disassembler.
pub mod builder;

/// Executable code buffer and block cache.
pub mod cache;

/// x86-64 instruction encoder.
pub mod emitter;

/// The SSA intermediate representation.
pub mod ir;

/// Native callbacks for recompiled code.
pub mod thunks;

pub use cache::JitState;
