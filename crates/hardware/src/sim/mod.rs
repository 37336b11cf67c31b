//! Simulation layer.
//!
//! The cooperative top loop, the ROM loader and boot stub, the scheduled
//! event queue, the memory-trace record/replay machinery and the explicit
//! state snapshot.

/// Scheduled side-effects (DMA completions, VI lines).
pub mod events;

/// ROM image loading and the PIF boot stub.
pub mod loader;

/// Top-level simulator.
pub mod simulator;

/// Memory-trace record and replay.
pub mod trace;

pub use simulator::Simulator;
