//! MIPS instruction set support.
//!
//! Decoding here is deliberately thin: a field-extraction trait over the raw
//! 32-bit encoding plus named opcode constants. The interpreters and the
//! recompiler dispatch with exhaustive matches over these fields; the
//! compiler turns them into the jump tables the original used function
//! pointer arrays for.

/// Instruction field extraction.
pub mod instruction;

/// Primary, SPECIAL, REGIMM and coprocessor opcode tables.
pub mod opcodes;

pub use instruction::InstructionBits;
