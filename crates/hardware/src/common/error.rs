//! Exception and error definitions.
//!
//! Two distinct failure families live here:
//! 1. **Architectural exceptions** (`Exception`): normal guest control flow.
//!    Taking one mutates COP0 state and redirects the program counter; it
//!    never unwinds the host stack.
//! 2. **Emulation errors** (`EmuError`): host-visible fatal conditions such
//!    as an unimplemented device register or a recompiler failure. These set
//!    the halt flag and stop the outer loop.

use std::fmt;

use thiserror::Error;

/// Architectural exceptions of the VR processor.
///
/// The discriminants are internal; the architectural `Cause.ExcCode` value
/// is derived in the exception entry path, where the load/store direction of
/// the faulting access is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exception {
    /// Unaligned or otherwise malformed reference address.
    AddressError,
    /// TLB miss in 32-bit addressing mode.
    TLBRefill,
    /// TLB miss in 64-bit addressing mode.
    XTLBRefill,
    /// TLB hit on an entry with the valid bit clear.
    TLBInvalid,
    /// Write through a TLB entry with the dirty bit clear.
    TLBModified,
    /// Reference to an unmapped physical address, or store to ROM.
    BusError,
    /// Two's-complement overflow in ADD/SUB/ADDI/DADD/DSUB/DADDI.
    IntegerOverflow,
    /// Trap instruction condition met.
    Trap,
    /// SYSCALL instruction.
    SystemCall,
    /// BREAK instruction.
    Breakpoint,
    /// Reserved or undecodable instruction.
    ReservedInstruction,
    /// Access to a disabled coprocessor.
    CoprocessorUnusable,
    /// Floating-point exception (FCR31 enable bits).
    FloatingPoint,
    /// Watchpoint hit (WatchLo/WatchHi).
    Watch,
    /// External or timer interrupt.
    Interrupt,
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Exception::AddressError => "AddressError",
            Exception::TLBRefill => "TLBRefill",
            Exception::XTLBRefill => "XTLBRefill",
            Exception::TLBInvalid => "TLBInvalid",
            Exception::TLBModified => "TLBModified",
            Exception::BusError => "BusError",
            Exception::IntegerOverflow => "IntegerOverflow",
            Exception::Trap => "Trap",
            Exception::SystemCall => "SystemCall",
            Exception::Breakpoint => "Breakpoint",
            Exception::ReservedInstruction => "ReservedInstruction",
            Exception::CoprocessorUnusable => "CoprocessorUnusable",
            Exception::FloatingPoint => "FloatingPoint",
            Exception::Watch => "Watch",
            Exception::Interrupt => "Interrupt",
        };
        write!(f, "{}", name)
    }
}

impl Exception {
    /// Architectural `Cause.ExcCode` for this exception.
    ///
    /// # Arguments
    ///
    /// * `is_load` - Whether the faulting access was a load or fetch; load
    ///   and store variants of the memory exceptions carry distinct codes.
    pub fn exc_code(self, is_load: bool) -> u32 {
        match self {
            Exception::Interrupt => 0,
            Exception::TLBModified => 1,
            Exception::TLBRefill | Exception::XTLBRefill | Exception::TLBInvalid => {
                if is_load { 2 } else { 3 }
            }
            Exception::AddressError => {
                if is_load { 4 } else { 5 }
            }
            Exception::BusError => {
                if is_load { 6 } else { 7 }
            }
            Exception::SystemCall => 8,
            Exception::Breakpoint => 9,
            Exception::ReservedInstruction => 10,
            Exception::CoprocessorUnusable => 11,
            Exception::IntegerOverflow => 12,
            Exception::Trap => 13,
            Exception::FloatingPoint => 15,
            Exception::Watch => 23,
        }
    }
}

/// Host-visible emulation errors.
///
/// These surface through the halt flag with a reason string; the outer loop
/// stops at the next safe point and the CLI maps them to exit code 1 (or 2
/// for a replay mismatch).
#[derive(Debug, Error)]
pub enum EmuError {
    /// An instruction the emulator does not implement was executed.
    #[error("unimplemented instruction: {0}")]
    UnimplementedInstruction(String),

    /// A device register without emulated behaviour was accessed.
    #[error("unimplemented device register: {0}")]
    UnimplementedRegister(String),

    /// A detected bad invariant (e.g. `wired >= 32`).
    #[error("bad invariant: {0}")]
    BadInvariant(String),

    /// The executable code buffer is full; the block is abandoned.
    #[error("recompiler code buffer exhausted")]
    CodeBufferFull,

    /// The IR instruction budget for one block was exceeded.
    #[error("recompiler IR budget exceeded")]
    IrBudgetExceeded,

    /// An IR construct the backend does not lower.
    #[error("unsupported IR construct: {0}")]
    UnsupportedIr(String),

    /// A replayed memory trace diverged from the live run.
    #[error("memory trace mismatch: {0}")]
    TraceMismatch(String),

    /// An I/O failure on a ROM image or trace file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
