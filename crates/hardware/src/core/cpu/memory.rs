//! Address translation and virtual memory access.
//!
//! The top bits of a virtual address select one of the MIPS segments. The
//! unmapped segments (kseg0, kseg1 and the 64-bit xkphys windows) strip
//! their tag bits and go straight to the bus; the mapped segments (kuseg,
//! ksseg/kseg3 and their 64-bit analogues) probe the TLB.

use crate::common::Exception;
use crate::core::arch::tlb::{ENTRY_LO_D, ENTRY_LO_V};
use crate::state::Machine;

impl Machine {
    /// Translates a virtual address to a physical address.
    ///
    /// # Arguments
    ///
    /// * `vaddr` - The 64-bit virtual address.
    /// * `write` - Whether the access is a store (checks the dirty bit).
    ///
    /// # Returns
    ///
    /// The physical address, or the architectural exception to take.
    pub fn translate_address(&self, vaddr: u64, write: bool) -> Result<u64, Exception> {
        match vaddr {
            // kseg0: unmapped, cached.
            0xFFFF_FFFF_8000_0000..=0xFFFF_FFFF_9FFF_FFFF => Ok(vaddr & 0x1FFF_FFFF),
            // kseg1: unmapped, uncached.
            0xFFFF_FFFF_A000_0000..=0xFFFF_FFFF_BFFF_FFFF => Ok(vaddr & 0x1FFF_FFFF),
            // xkphys: the 64-bit unmapped windows.
            0x8000_0000_0000_0000..=0xBFFF_FFFF_FFFF_FFFF => Ok(vaddr & 0xFFFF_FFFF),
            // Everything else is mapped through the TLB.
            _ => self.tlb_translate(vaddr, write),
        }
    }

    /// TLB probe for the mapped segments.
    fn tlb_translate(&self, vaddr: u64, write: bool) -> Result<u64, Exception> {
        let asid = self.cpu.cp0.asid();
        let Some(idx) = self.cpu.tlb.probe(vaddr, asid) else {
            // 64-bit addressing raises the extended refill; an address that
            // fits sign-extended 32-bit space takes the 32-bit vector.
            let compat32 = (vaddr as i64) == (vaddr as i32 as i64);
            return Err(if compat32 {
                Exception::TLBRefill
            } else {
                Exception::XTLBRefill
            });
        };

        let entry = self.cpu.tlb.entry(idx);
        let lo = entry.entry_lo(vaddr);
        if lo & ENTRY_LO_V == 0 {
            return Err(Exception::TLBInvalid);
        }
        if write && lo & ENTRY_LO_D == 0 {
            return Err(Exception::TLBModified);
        }

        let pfn = (lo >> 6) & 0x00FF_FFFF;
        Ok((pfn << 12) | (vaddr & entry.offset_mask()))
    }

    /// Virtual load of `SIZE` bytes with alignment check.
    ///
    /// Shared by the interpreter and the recompiler's native thunks; the
    /// caller turns the error into `take_exception`.
    pub fn virt_load(&mut self, vaddr: u64, size: u64) -> Result<u64, Exception> {
        if vaddr & (size - 1) != 0 {
            return Err(Exception::AddressError);
        }
        let paddr = self.translate_address(vaddr, false)?;
        match size {
            1 => self.bus_load_u8(paddr).map(u64::from),
            2 => self.bus_load_u16(paddr).map(u64::from),
            4 => self.bus_load_u32(paddr).map(u64::from),
            _ => self.bus_load_u64(paddr),
        }
        .ok_or(Exception::BusError)
    }

    /// Virtual store of `SIZE` bytes with alignment check.
    pub fn virt_store(&mut self, vaddr: u64, size: u64, val: u64) -> Result<(), Exception> {
        if vaddr & (size - 1) != 0 {
            return Err(Exception::AddressError);
        }
        let paddr = self.translate_address(vaddr, true)?;
        let ok = match size {
            1 => self.bus_store_u8(paddr, val as u8),
            2 => self.bus_store_u16(paddr, val as u16),
            4 => self.bus_store_u32(paddr, val as u32),
            _ => self.bus_store_u64(paddr, val),
        };
        if ok { Ok(()) } else { Err(Exception::BusError) }
    }
}
