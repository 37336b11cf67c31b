//! Console emulator core library.
//!
//! This crate implements a cycle-approximate emulator core for the 64-bit
//! MIPS III home console with the following:
//! 1. **Core:** VR interpreter (full MIPS III), COP0 address translation and
//!    exception machinery, COP1 floating-point unit, 32-entry TLB.
//! 2. **RSP:** the signal processor: scalar MIPS subset plus the 8-lane
//!    16-bit vector unit (multiply-accumulate, clip, reciprocal pipeline,
//!    windowed quad-word load/store family).
//! 3. **RDP:** the display processor: command-list parser, triangle and
//!    rectangle rasterisation, texture/combiner/blender pixel pipeline.
//! 4. **Recompiler:** MIPS → SSA IR → x86-64 dynamic recompiler with an
//!    executable code buffer and a physically-keyed block cache.
//! 5. **SoC:** physical bus, DRAM, cartridge ROM, and the SP/DP/MI/VI/AI/
//!    PI/SI/RI/PIF register banks with their DMA engines.
//! 6. **Simulation:** `Simulator` top loop, ROM loader and boot stub,
//!    memory-trace record/replay, and state snapshots.

/// Common types and constants (addresses, access types, exceptions).
pub mod common;
/// Emulator configuration (defaults and hierarchical config structures).
pub mod config;
/// VR CPU: architectural state, TLB, interpreter, exception entry.
pub mod core;
/// MIPS instruction field extraction and opcode tables.
pub mod isa;
/// Dynamic recompiler: IR, MIPS disassembler, x86-64 backend, block cache.
pub mod recompiler;
/// RDP display processor: command list, rasteriser, pixel pipeline.
pub mod rdp;
/// RSP signal processor: scalar and vector interpreters, SP DMA.
pub mod rsp;
/// Simulation: top loop, loader, memory traces, snapshots.
pub mod sim;
/// Physical bus and memory-mapped devices.
pub mod soc;
/// Machine state: the owning container for every register file and memory.
pub mod state;
/// Emulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Top-level simulator; owns the machine and the recompiler side-by-side.
pub use crate::sim::simulator::Simulator;
/// The machine state: registers, scratch memories, DRAM, MMIO block.
pub use crate::state::Machine;
