//! Physical bus: region table and access routing.
//!
//! The bus resolves physical addresses through an ordered set of regions.
//! A region has a base, a size and a kind tag; lookup is a binary search by
//! base address over the sorted, non-overlapping table. RAM-like regions
//! are served directly from the backing byte memories; device regions
//! dispatch to the per-device register handlers, which receive the whole
//! machine (a register write may DMA across other regions).
//!
//! All multi-byte accesses are big-endian on the wire regardless of host.
//! Every operation returns success: an unmapped address or a store to
//! read-only memory fails, surfacing to the guest as a bus error.

use crate::common::constants::*;
use crate::sim::trace::TraceAccess;
use crate::soc::devices;
use crate::state::Machine;

/// Access dispatch tag of a bus region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    /// Main DRAM: raw read/write bytes.
    Dram,
    /// Cartridge ROM: raw bytes, stores fail.
    CartRom,
    /// PIF ROM + RAM: boot ROM (read-only) followed by 64 bytes of RAM.
    Pif,
    /// SP data scratch memory.
    Dmem,
    /// SP instruction scratch memory.
    Imem,
    /// SP control registers.
    SpRegs,
    /// SP program counter register.
    SpPc,
    /// DP command registers.
    DpRegs,
    /// MIPS interface registers.
    MiRegs,
    /// Video interface registers.
    ViRegs,
    /// Audio interface registers.
    AiRegs,
    /// Peripheral interface registers.
    PiRegs,
    /// Serial interface registers.
    SiRegs,
    /// RAM interface registers.
    RiRegs,
}

impl RegionKind {
    /// Whether the region is served from raw bytes rather than a register
    /// handler.
    fn is_memory(self) -> bool {
        matches!(
            self,
            RegionKind::Dram
                | RegionKind::CartRom
                | RegionKind::Pif
                | RegionKind::Dmem
                | RegionKind::Imem
        )
    }
}

/// One entry of the physical memory map.
#[derive(Clone, Copy, Debug)]
pub struct Region {
    /// Base physical address.
    pub base: u64,
    /// Size of the region in bytes.
    pub size: u64,
    /// Access dispatch tag.
    pub kind: RegionKind,
}

/// The bus region table.
pub struct Bus {
    regions: Vec<Region>,
}

impl Bus {
    /// Builds the console's physical memory map.
    pub fn new_console_map(dram_size: usize) -> Self {
        let mut regions = vec![
            Region { base: DRAM_BASE, size: dram_size as u64, kind: RegionKind::Dram },
            Region { base: SP_DMEM_BASE, size: SP_MEM_SIZE as u64, kind: RegionKind::Dmem },
            Region { base: SP_IMEM_BASE, size: SP_MEM_SIZE as u64, kind: RegionKind::Imem },
            Region { base: SP_REGS_BASE, size: SP_REGS_SIZE, kind: RegionKind::SpRegs },
            Region { base: SP_PC_BASE, size: SP_PC_SIZE, kind: RegionKind::SpPc },
            Region { base: DP_REGS_BASE, size: DP_REGS_SIZE, kind: RegionKind::DpRegs },
            Region { base: MI_REGS_BASE, size: MI_REGS_SIZE, kind: RegionKind::MiRegs },
            Region { base: VI_REGS_BASE, size: VI_REGS_SIZE, kind: RegionKind::ViRegs },
            Region { base: AI_REGS_BASE, size: AI_REGS_SIZE, kind: RegionKind::AiRegs },
            Region { base: PI_REGS_BASE, size: PI_REGS_SIZE, kind: RegionKind::PiRegs },
            Region { base: SI_REGS_BASE, size: SI_REGS_SIZE, kind: RegionKind::SiRegs },
            Region { base: RI_BASE, size: RI_SIZE, kind: RegionKind::RiRegs },
            Region { base: CART_ROM_BASE, size: CART_ROM_SIZE_MAX as u64, kind: RegionKind::CartRom },
            Region {
                base: PIF_BASE,
                size: (PIF_ROM_SIZE + PIF_RAM_SIZE) as u64,
                kind: RegionKind::Pif,
            },
        ];
        regions.sort_by_key(|r| r.base);
        Self { regions }
    }

    /// Finds the region containing `paddr`.
    ///
    /// # Returns
    ///
    /// The region kind and the offset of `paddr` within it, or `None` when
    /// the address is unmapped.
    pub fn lookup(&self, paddr: u64) -> Option<(RegionKind, u64)> {
        let idx = match self.regions.binary_search_by_key(&paddr, |r| r.base) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };
        let r = &self.regions[idx];
        if paddr < r.base + r.size {
            Some((r.kind, paddr - r.base))
        } else {
            None
        }
    }

    /// The region table, sorted by base address.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

impl Machine {
    /// Byte view of a raw memory region. ROM reads beyond the loaded image
    /// return `None` and fail the access.
    fn memory_bytes(&self, kind: RegionKind) -> &[u8] {
        match kind {
            RegionKind::Dram => &self.dram,
            RegionKind::CartRom => &self.rom,
            RegionKind::Dmem => &self.dmem,
            RegionKind::Imem => &self.imem,
            RegionKind::Pif => &[],
            _ => unreachable!("register region served as memory"),
        }
    }

    fn memory_load(&self, kind: RegionKind, offset: u64, size: u64) -> Option<u64> {
        // The PIF region is split: boot ROM then RAM.
        if kind == RegionKind::Pif {
            if (offset + size) as usize > PIF_ROM_SIZE + PIF_RAM_SIZE {
                return None;
            }
            let mut val = 0u64;
            for i in 0..size {
                let off = (offset + i) as usize;
                let byte = if off < PIF_ROM_SIZE {
                    self.pif_rom.get(off).copied().unwrap_or(0)
                } else {
                    self.pif_ram[off - PIF_ROM_SIZE]
                };
                val = (val << 8) | byte as u64;
            }
            return Some(val);
        }

        let mem = self.memory_bytes(kind);
        let offset = offset as usize;
        if offset + size as usize > mem.len() {
            return None;
        }
        let mut val = 0u64;
        for i in 0..size as usize {
            val = (val << 8) | mem[offset + i] as u64;
        }
        Some(val)
    }

    fn memory_store(&mut self, kind: RegionKind, offset: u64, size: u64, val: u64) -> bool {
        if kind == RegionKind::CartRom {
            return false;
        }
        if kind == RegionKind::Pif {
            if (offset + size) as usize > PIF_ROM_SIZE + PIF_RAM_SIZE {
                return false;
            }
            for i in 0..size {
                let off = (offset + i) as usize;
                if off < PIF_ROM_SIZE {
                    return false;
                }
                let shift = 8 * (size - 1 - i);
                self.pif_ram[off - PIF_ROM_SIZE] = (val >> shift) as u8;
            }
            self.pif_command_write();
            return true;
        }

        let mem: &mut [u8] = match kind {
            RegionKind::Dram => &mut self.dram,
            RegionKind::Dmem => &mut self.dmem,
            RegionKind::Imem => &mut self.imem,
            _ => unreachable!("register region served as memory"),
        };
        let offset = offset as usize;
        if offset + size as usize > mem.len() {
            return false;
        }
        for i in 0..size as usize {
            let shift = 8 * (size as usize - 1 - i);
            mem[offset + i] = (val >> shift) as u8;
        }
        true
    }

    /// Reads a 32-bit device register.
    fn device_read(&mut self, kind: RegionKind, offset: u64) -> Option<u32> {
        match kind {
            RegionKind::SpRegs | RegionKind::SpPc => devices::sp::read(self, kind, offset),
            RegionKind::DpRegs => devices::dp::read(self, offset),
            RegionKind::MiRegs => devices::mi::read(self, offset),
            RegionKind::ViRegs => devices::vi::read(self, offset),
            RegionKind::AiRegs => devices::ai::read(self, offset),
            RegionKind::PiRegs => devices::pi::read(self, offset),
            RegionKind::SiRegs => devices::si::read(self, offset),
            RegionKind::RiRegs => devices::ri::read(self, offset),
            _ => unreachable!("memory region served as device"),
        }
    }

    /// Writes a 32-bit device register.
    fn device_write(&mut self, kind: RegionKind, offset: u64, val: u32) -> bool {
        match kind {
            RegionKind::SpRegs | RegionKind::SpPc => devices::sp::write(self, kind, offset, val),
            RegionKind::DpRegs => devices::dp::write(self, offset, val),
            RegionKind::MiRegs => devices::mi::write(self, offset, val),
            RegionKind::ViRegs => devices::vi::write(self, offset, val),
            RegionKind::AiRegs => devices::ai::write(self, offset, val),
            RegionKind::PiRegs => devices::pi::write(self, offset, val),
            RegionKind::SiRegs => devices::si::write(self, offset, val),
            RegionKind::RiRegs => devices::ri::write(self, offset, val),
            _ => unreachable!("memory region served as device"),
        }
    }

    /// Sized physical load. Device registers are 32-bit; narrower loads
    /// extract from the containing word, and 64-bit loads read two words.
    fn bus_load(&mut self, paddr: u64, size: u64) -> Option<u64> {
        let (kind, offset) = self.bus.lookup(paddr)?;
        let value = if kind.is_memory() {
            self.memory_load(kind, offset, size)?
        } else {
            match size {
                4 => self.device_read(kind, offset)? as u64,
                8 => {
                    let hi = self.device_read(kind, offset)?;
                    let lo = self.device_read(kind, offset + 4)?;
                    ((hi as u64) << 32) | lo as u64
                }
                _ => {
                    let word = self.device_read(kind, offset & !3)?;
                    let shift = 8 * (4 - size - (offset & 3).min(4 - size));
                    (word as u64 >> shift) & ((1 << (8 * size)) - 1)
                }
            }
        };
        self.trace_access(TraceAccess::load(paddr, size as u8, value));
        Some(value)
    }

    /// Sized physical store, mirroring [`Machine::bus_load`].
    fn bus_store(&mut self, paddr: u64, size: u64, val: u64) -> bool {
        let Some((kind, offset)) = self.bus.lookup(paddr) else {
            return false;
        };
        let ok = if kind.is_memory() {
            let ok = self.memory_store(kind, offset, size, val);
            if ok && kind == RegionKind::Dram {
                self.invalidate_blocks(paddr, size);
            }
            ok
        } else {
            match size {
                4 => self.device_write(kind, offset, val as u32),
                8 => {
                    self.device_write(kind, offset, (val >> 32) as u32)
                        && self.device_write(kind, offset + 4, val as u32)
                }
                _ => {
                    // Sub-word device stores replicate the value across the
                    // register write, which matches the console's unclocked
                    // byte lanes closely enough for the ROMs that do this.
                    self.device_write(kind, offset & !3, val as u32)
                }
            }
        };
        if ok {
            self.trace_access(TraceAccess::store(paddr, size as u8, val));
        }
        ok
    }

    /// Loads one byte from the physical address space.
    pub fn bus_load_u8(&mut self, paddr: u64) -> Option<u8> {
        self.bus_load(paddr, 1).map(|v| v as u8)
    }

    /// Loads a big-endian u16 from the physical address space.
    pub fn bus_load_u16(&mut self, paddr: u64) -> Option<u16> {
        self.bus_load(paddr, 2).map(|v| v as u16)
    }

    /// Loads a big-endian u32 from the physical address space.
    pub fn bus_load_u32(&mut self, paddr: u64) -> Option<u32> {
        self.bus_load(paddr, 4).map(|v| v as u32)
    }

    /// Loads a big-endian u64 from the physical address space.
    pub fn bus_load_u64(&mut self, paddr: u64) -> Option<u64> {
        self.bus_load(paddr, 8)
    }

    /// Stores one byte to the physical address space.
    pub fn bus_store_u8(&mut self, paddr: u64, val: u8) -> bool {
        self.bus_store(paddr, 1, val as u64)
    }

    /// Stores a big-endian u16 to the physical address space.
    pub fn bus_store_u16(&mut self, paddr: u64, val: u16) -> bool {
        self.bus_store(paddr, 2, val as u64)
    }

    /// Stores a big-endian u32 to the physical address space.
    pub fn bus_store_u32(&mut self, paddr: u64, val: u32) -> bool {
        self.bus_store(paddr, 4, val as u64)
    }

    /// Stores a big-endian u64 to the physical address space.
    pub fn bus_store_u64(&mut self, paddr: u64, val: u64) -> bool {
        self.bus_store(paddr, 8, val)
    }
}
