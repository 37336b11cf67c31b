//! Native callbacks for recompiled code.
//!
//! Generated blocks re-enter the emulator through these `extern "C"`
//! functions. Each takes the machine pointer captured at backend
//! initialisation as its first argument (the process-global state of a
//! classical recompiler, made explicit). Memory thunks return `false` when
//! the access took an exception or halted the machine, so the emitted
//! assert exits the block at the suspension point.

use crate::common::Exception;
use crate::state::Machine;

macro_rules! define_virt_load {
    ($name:ident, $ty:ty, $size:expr) => {
        /// Virtual load thunk.
        ///
        /// # Safety
        ///
        /// `m` must be the machine pointer captured at bind time and `out`
        /// a live pointer to an IR stack slot.
        pub unsafe extern "C" fn $name(m: *mut Machine, vaddr: u64, out: *mut $ty) -> bool {
            // SAFETY: caller contract; the machine outlives all blocks.
            let m = unsafe { &mut *m };
            match m.virt_load(vaddr, $size) {
                Ok(val) => {
                    // SAFETY: out points at a slot in the running block's
                    // frame.
                    unsafe { out.write(val as $ty) };
                    !m.halted
                }
                Err(exn) => {
                    m.take_exception(exn, vaddr, false, true, 0);
                    false
                }
            }
        }
    };
}

macro_rules! define_virt_store {
    ($name:ident, $ty:ty, $size:expr) => {
        /// Virtual store thunk.
        ///
        /// # Safety
        ///
        /// `m` must be the machine pointer captured at bind time.
        pub unsafe extern "C" fn $name(m: *mut Machine, vaddr: u64, value: $ty) -> bool {
            // SAFETY: caller contract; the machine outlives all blocks.
            let m = unsafe { &mut *m };
            match m.virt_store(vaddr, $size, value as u64) {
                Ok(()) => !m.halted,
                Err(exn) => {
                    m.take_exception(exn, vaddr, false, false, 0);
                    false
                }
            }
        }
    };
}

define_virt_load!(virt_load_u8, u8, 1);
define_virt_load!(virt_load_u16, u16, 2);
define_virt_load!(virt_load_u32, u32, 4);
define_virt_load!(virt_load_u64, u64, 8);

define_virt_store!(virt_store_u8, u8, 1);
define_virt_store!(virt_store_u16, u16, 2);
define_virt_store!(virt_store_u32, u32, 4);
define_virt_store!(virt_store_u64, u64, 8);

/// Stand-in interpreter for instructions without a direct IR lowering.
///
/// Only instructions that neither redirect control nor raise exceptions are
/// routed here by the builder (the multiply/divide family); everything else
/// terminates its block instead.
///
/// # Safety
///
/// `m` must be the machine pointer captured at bind time.
pub unsafe extern "C" fn interpret(m: *mut Machine, instr: u32) {
    // SAFETY: caller contract.
    let m = unsafe { &mut *m };
    m.eval_instr(instr);
}

/// Raises CoprocessorUnusable(1); the emitted guard exits the block after
/// this returns.
///
/// # Safety
///
/// `m` must be the machine pointer captured at bind time.
pub unsafe extern "C" fn take_cop1_unusable_exception(m: *mut Machine) {
    // SAFETY: caller contract.
    let m = unsafe { &mut *m };
    m.take_exception(Exception::CoprocessorUnusable, 0, false, false, 1);
}
