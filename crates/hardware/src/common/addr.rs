//! Physical and Virtual Address types.
//!
//! Strong types for the two address spaces, preventing accidental mixing.
//! Virtual addresses are produced by the guest and must pass through the
//! TLB/segment machinery before touching the bus; physical addresses key the
//! bus region table directly.

/// A virtual address in the VR's 64-bit address space.
///
/// Virtual addresses are used by guest software and must be translated to
/// physical addresses through the segment rules and TLB before accessing
/// memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct VirtAddr(pub u64);

/// A physical address in the console's address space.
///
/// Physical addresses select a bus region (DRAM, ROM, scratch memory or a
/// device register bank) after translation has completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    #[inline(always)]
    pub fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub fn val(&self) -> u64 {
        self.0
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub fn val(&self) -> u64 {
        self.0
    }
}
