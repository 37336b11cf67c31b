//! Memory-mapped device register banks.
//!
//! Each module implements one interface's register file: the read view, the
//! paired set/clear write encodings, and the side-effects (DMA kicks,
//! interrupt raising) a write triggers. Handlers receive the whole
//! [`crate::state::Machine`] because register writes routinely move bytes
//! between DRAM and the scratch memories and raise MI interrupts.

/// Audio interface.
pub mod ai;

/// DP command interface.
pub mod dp;

/// MIPS interface (interrupt aggregation).
pub mod mi;

/// Peripheral (cartridge) interface.
pub mod pi;

/// PIF boot/joybus handshake.
pub mod pif;

/// RAM interface.
pub mod ri;

/// Serial interface.
pub mod si;

/// SP control interface.
pub mod sp;

/// Video interface.
pub mod vi;
