//! Translation lookaside buffer.
//!
//! 32 fully-associative entries with variable page sizes. Each entry caches
//! the ASID and global bits derived from the writable halves when the entry
//! is written, so the probe loop avoids re-deriving them per lookup.

use serde::{Deserialize, Serialize};

use crate::common::constants::TLB_ENTRY_COUNT;

/// EntryLo: global bit (ANDed across both halves on write).
pub const ENTRY_LO_G: u64 = 1 << 0;
/// EntryLo: valid bit.
pub const ENTRY_LO_V: u64 = 1 << 1;
/// EntryLo: dirty (write-enable) bit.
pub const ENTRY_LO_D: u64 = 1 << 2;

/// A single TLB entry.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TlbEntry {
    /// Page mask; set bits widen the page beyond 4 KiB.
    pub page_mask: u32,
    /// VPN2 and ASID of the mapped virtual region.
    pub entry_hi: u64,
    /// PFN and flags for the even subpage.
    pub entry_lo0: u64,
    /// PFN and flags for the odd subpage.
    pub entry_lo1: u64,
    /// ASID extracted from `entry_hi` at write time.
    pub asid: u8,
    /// Global bit, the AND of both EntryLo G bits at write time.
    pub global: bool,
}

impl TlbEntry {
    /// Virtual-address bits compared by the probe, under this entry's mask.
    #[inline]
    fn vpn_mask(&self) -> u64 {
        // Bits 13 and up participate, minus the bits the page mask hides.
        0x0000_00FF_FFFF_E000 & !(self.page_mask as u64)
    }

    /// Whether this entry matches the given address and address space.
    #[inline]
    pub fn matches(&self, vaddr: u64, asid: u8) -> bool {
        let mask = self.vpn_mask();
        (vaddr & mask) == (self.entry_hi & mask) && (self.global || self.asid == asid)
    }

    /// Byte offset mask within one subpage of this entry.
    #[inline]
    pub fn offset_mask(&self) -> u64 {
        ((self.page_mask as u64) >> 1) | 0xFFF
    }

    /// Selects the EntryLo half for the subpage containing `vaddr`.
    ///
    /// The select bit is the one just above the subpage offset field, i.e.
    /// bit `log2(page_size / 2)` of the doubled mapping.
    #[inline]
    pub fn entry_lo(&self, vaddr: u64) -> u64 {
        if vaddr & (self.offset_mask() + 1) != 0 {
            self.entry_lo1
        } else {
            self.entry_lo0
        }
    }
}

/// The translation lookaside buffer.
#[derive(Clone, Serialize, Deserialize)]
pub struct Tlb {
    entries: Vec<TlbEntry>,
}

impl Tlb {
    /// EntryHi value parked in unwritten entries. A zeroed EntryHi would
    /// match virtual page 0 in address space 0 and turn power-on misses
    /// into TLBInvalid; parking the VPN outside the mapped segments keeps
    /// unwritten entries inert.
    const PARKED_ENTRY_HI: u64 = 0x0000_0040_0000_0000;

    /// Creates an empty TLB; every entry is parked and matches nothing.
    pub fn new() -> Self {
        let mut tlb = Self {
            entries: vec![TlbEntry::default(); TLB_ENTRY_COUNT],
        };
        tlb.reset();
        tlb
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the TLB holds no entries (never true on this machine).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns entry `idx`.
    #[inline]
    pub fn entry(&self, idx: usize) -> &TlbEntry {
        &self.entries[idx]
    }

    /// Writes entry `idx` from the COP0 staging registers, deriving the
    /// cached ASID and global bits.
    pub fn write(&mut self, idx: usize, page_mask: u32, entry_hi: u64, entry_lo0: u64, entry_lo1: u64) {
        self.entries[idx] = TlbEntry {
            page_mask,
            entry_hi,
            entry_lo0,
            entry_lo1,
            asid: (entry_hi & 0xFF) as u8,
            global: (entry_lo0 & entry_lo1 & ENTRY_LO_G) != 0,
        };
    }

    /// Walks all entries for a match on `(vpn2, asid)` under each entry's
    /// page mask, honouring the global bit.
    ///
    /// # Returns
    ///
    /// The index of the first matching entry, or `None` on a TLB miss.
    pub fn probe(&self, vaddr: u64, asid: u8) -> Option<usize> {
        self.entries.iter().position(|e| e.matches(vaddr, asid))
    }

    /// Invalidates every entry (machine reset).
    pub fn reset(&mut self) {
        for e in &mut self.entries {
            *e = TlbEntry {
                entry_hi: Self::PARKED_ENTRY_HI,
                ..TlbEntry::default()
            };
        }
    }
}

impl Default for Tlb {
    fn default() -> Self {
        Self::new()
    }
}
