//! System-on-chip: physical bus and memory-mapped devices.
//!
//! This module provides:
//! 1. **Interconnect:** the region table routing physical addresses to
//!    DRAM, ROMs, scratch memories and device register banks.
//! 2. **Memory:** the mmap-backed DRAM buffer.
//! 3. **Devices:** register semantics and DMA engines for the SP, DP, MI,
//!    VI, AI, PI, SI, RI and PIF interfaces.

/// Device register banks.
pub mod devices;

/// Physical bus region table and access routing.
pub mod interconnect;

/// DRAM buffer.
pub mod memory;

pub use interconnect::{Bus, Region, RegionKind};
pub use memory::DramBuffer;
