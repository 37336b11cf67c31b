//! Configuration system for the emulator.
//!
//! This module defines all configuration structures used to parameterize the
//! emulator. It provides:
//! 1. **Defaults:** Baseline hardware constants (DRAM size, recompiler
//!    budgets, code buffer size).
//! 2. **Structures:** Hierarchical config for general, memory and recompiler
//!    settings.
//!
//! Configuration is supplied via JSON (`serde` deserialization) or use
//! `Config::default()` for the CLI.

use serde::Deserialize;

/// Default configuration constants for the emulator.
mod defaults {
    /// Default DRAM size (8 MiB, expansion pak installed).
    pub const DRAM_SIZE: usize = 8 * 1024 * 1024;

    /// Recompiler enabled by default; the interpreter remains the fallback
    /// for untranslatable instructions and abandoned blocks.
    pub const RECOMPILER_ENABLED: bool = true;

    /// Hard limit on guest instructions disassembled into one block.
    pub const BLOCK_INSTR_MAX: usize = 256;

    /// Hard limit on IR instructions produced for one block.
    pub const BLOCK_IR_MAX: usize = 2048;

    /// Size of the executable code buffer, allocated once at startup.
    pub const CODE_BUFFER_SIZE: usize = 16 * 1024 * 1024;

    /// Maximum VR instructions executed when no explicit limit is given.
    pub const STEP_LIMIT: u64 = u64::MAX;
}

/// General simulation options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Stop after this many retired VR instructions (u64::MAX = unlimited).
    pub step_limit: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            step_limit: defaults::STEP_LIMIT,
        }
    }
}

/// Memory sizing options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Size of the DRAM buffer in bytes.
    pub dram_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dram_size: defaults::DRAM_SIZE,
        }
    }
}

/// Recompiler options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecompilerConfig {
    /// Whether the dynamic recompiler is used at all.
    pub enabled: bool,
    /// Hard limit on guest instructions per block.
    pub block_instr_max: usize,
    /// Hard limit on IR instructions per block.
    pub block_ir_max: usize,
    /// Size of the executable code buffer in bytes.
    pub code_buffer_size: usize,
}

impl Default for RecompilerConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::RECOMPILER_ENABLED,
            block_instr_max: defaults::BLOCK_INSTR_MAX,
            block_ir_max: defaults::BLOCK_IR_MAX,
            code_buffer_size: defaults::CODE_BUFFER_SIZE,
        }
    }
}

/// Root configuration type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General simulation options.
    pub general: GeneralConfig,
    /// Memory sizing options.
    pub memory: MemoryConfig,
    /// Recompiler options.
    pub recompiler: RecompilerConfig,
}
