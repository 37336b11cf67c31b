//! Emulation statistics collection and reporting.
//!
//! Counters are incremented on the hot paths and reported once at exit; they
//! have no architectural effect.

use std::fmt;

/// Aggregated counters for one emulation run.
#[derive(Debug, Default, Clone)]
pub struct SimStats {
    /// VR instructions retired by the interpreter.
    pub cpu_instructions: u64,
    /// RSP instructions retired.
    pub rsp_instructions: u64,
    /// Architectural exceptions taken.
    pub exceptions: u64,
    /// Interrupts taken.
    pub interrupts: u64,
    /// Blocks compiled by the recompiler.
    pub blocks_compiled: u64,
    /// Block-cache hits (entries into native code).
    pub block_hits: u64,
    /// Blocks abandoned due to recompiler failures.
    pub blocks_abandoned: u64,
    /// Block-cache invalidations (flushes and range invalidations).
    pub cache_invalidations: u64,
    /// Pixels written by the DP rasteriser.
    pub dp_pixels: u64,
    /// DP command lists drained.
    pub dp_lists: u64,
    /// Bytes moved by all DMA engines.
    pub dma_bytes: u64,
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cpu instructions:    {}", self.cpu_instructions)?;
        writeln!(f, "rsp instructions:    {}", self.rsp_instructions)?;
        writeln!(f, "exceptions:          {}", self.exceptions)?;
        writeln!(f, "interrupts:          {}", self.interrupts)?;
        writeln!(f, "blocks compiled:     {}", self.blocks_compiled)?;
        writeln!(f, "block hits:          {}", self.block_hits)?;
        writeln!(f, "blocks abandoned:    {}", self.blocks_abandoned)?;
        writeln!(f, "cache invalidations: {}", self.cache_invalidations)?;
        writeln!(f, "dp pixels:           {}", self.dp_pixels)?;
        writeln!(f, "dp command lists:    {}", self.dp_lists)?;
        write!(f, "dma bytes:           {}", self.dma_bytes)
    }
}
