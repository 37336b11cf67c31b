//! Memory access types.
//!
//! Classification of memory accesses used by the MMU and the trace layer:
//! 1. **Fault shaping:** load and store faults map to different exception
//!    codes (`TLBL` vs `TLBS`, `AdEL` vs `AdES`).
//! 2. **Dirty-bit enforcement:** writes through the TLB check the entry's
//!    dirty bit and raise `TLBModified` when clear.
//! 3. **Trace records:** record/replay tags each transaction with its kind.

/// Type of memory access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    /// Instruction fetch access.
    Fetch,

    /// Data read access (load instructions).
    Read,

    /// Data write access (store instructions).
    Write,
}

impl AccessType {
    /// Whether the access is a load as far as exception codes are concerned.
    ///
    /// Instruction fetches report load-class exception codes (`AdEL`,
    /// `TLBL`, `IBE`).
    #[inline]
    pub fn is_load(self) -> bool {
        !matches!(self, AccessType::Write)
    }
}
