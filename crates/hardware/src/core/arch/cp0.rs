//! COP0 system coprocessor registers.
//!
//! The register block backing address translation, exception handling and
//! the Count/Compare timer. Only the architecturally writable bits respond
//! to `MTC0`; the write path below applies the per-register masks.

use serde::{Deserialize, Serialize};

/// Status register: coprocessor 1 usable.
pub const STATUS_CU1: u32 = 1 << 29;
/// Status register: coprocessor 0 usable.
pub const STATUS_CU0: u32 = 1 << 28;
/// Status register: additional floating-point registers enabled.
pub const STATUS_FR: u32 = 1 << 26;
/// Status register: reverse endian in user mode.
pub const STATUS_RE: u32 = 1 << 25;
/// Status register: bootstrap exception vectors.
pub const STATUS_BEV: u32 = 1 << 22;
/// Status register: interrupt mask field.
pub const STATUS_IM_MASK: u32 = 0xFF << 8;
/// Status register: error level.
pub const STATUS_ERL: u32 = 1 << 2;
/// Status register: exception level.
pub const STATUS_EXL: u32 = 1 << 1;
/// Status register: global interrupt enable.
pub const STATUS_IE: u32 = 1 << 0;

/// Cause register: exception in branch delay slot.
pub const CAUSE_BD: u32 = 1 << 31;
/// Cause register: coprocessor unit field mask.
pub const CAUSE_CE_MASK: u32 = 0x3 << 28;
/// Cause register: interrupt pending field mask.
pub const CAUSE_IP_MASK: u32 = 0xFF << 8;
/// Cause register: timer interrupt pending bit.
pub const CAUSE_IP7: u32 = 1 << 15;
/// Cause register: external (MI) interrupt pending bit.
pub const CAUSE_IP2: u32 = 1 << 10;
/// Cause register: exception code field mask.
pub const CAUSE_EXCCODE_MASK: u32 = 0x1F << 2;

/// Shifts a coprocessor index into the Cause.CE field.
#[inline]
pub fn cause_ce(ce: u32) -> u32 {
    (ce & 0x3) << 28
}

/// Index register: probe-failure bit.
pub const INDEX_P: u32 = 0x8000_0000;

/// Register indices of the COP0 block.
pub mod reg {
    pub const INDEX: usize = 0;
    pub const RANDOM: usize = 1;
    pub const ENTRY_LO0: usize = 2;
    pub const ENTRY_LO1: usize = 3;
    pub const CONTEXT: usize = 4;
    pub const PAGE_MASK: usize = 5;
    pub const WIRED: usize = 6;
    pub const BAD_VADDR: usize = 8;
    pub const COUNT: usize = 9;
    pub const ENTRY_HI: usize = 10;
    pub const COMPARE: usize = 11;
    pub const SR: usize = 12;
    pub const CAUSE: usize = 13;
    pub const EPC: usize = 14;
    pub const PRID: usize = 15;
    pub const CONFIG: usize = 16;
    pub const LL_ADDR: usize = 17;
    pub const WATCH_LO: usize = 18;
    pub const WATCH_HI: usize = 19;
    pub const XCONTEXT: usize = 20;
    pub const PERR: usize = 26;
    pub const CACHE_ERR: usize = 27;
    pub const TAG_LO: usize = 28;
    pub const TAG_HI: usize = 29;
    pub const ERROR_EPC: usize = 30;
}

/// The COP0 register block.
///
/// Widths are 32 or 64 bits as dictated by the architecture.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cp0 {
    /// Programmable pointer into the TLB array.
    pub index: u32,
    /// Random pointer into the TLB array, decremented per instruction.
    pub random: u32,
    /// Low half of the TLB entry for even virtual pages.
    pub entry_lo0: u64,
    /// Low half of the TLB entry for odd virtual pages.
    pub entry_lo1: u64,
    /// Pointer to the kernel PTE table, with BadVPN2 inserted on faults.
    pub context: u64,
    /// TLB page mask staging register.
    pub page_mask: u32,
    /// Number of wired (never randomly replaced) TLB entries.
    pub wired: u32,
    /// Faulting virtual address of the most recent address exception.
    pub bad_vaddr: u64,
    /// Timer count.
    pub count: u32,
    /// High half of the TLB entry (VPN2 + ASID).
    pub entry_hi: u64,
    /// Timer compare; equality with Count raises IP7.
    pub compare: u32,
    /// Status register.
    pub sr: u32,
    /// Cause of the most recent exception.
    pub cause: u32,
    /// Exception program counter.
    pub epc: u64,
    /// Processor revision identifier.
    pub prid: u32,
    /// Configuration register.
    pub config: u32,
    /// Load-linked physical address.
    pub ll_addr: u32,
    /// Watchpoint address, low bits.
    pub watch_lo: u32,
    /// Watchpoint address, high bits.
    pub watch_hi: u32,
    /// 64-bit-mode context register.
    pub xcontext: u64,
    /// Parity error register (unused by software, kept for completeness).
    pub perr: u32,
    /// Cache error register.
    pub cache_err: u32,
    /// Cache tag register.
    pub tag_lo: u32,
    /// Cache tag register (reserved half).
    pub tag_hi: u32,
    /// Error exception program counter.
    pub error_epc: u64,
}

impl Cp0 {
    /// Creates the power-on COP0 state.
    pub fn new() -> Self {
        Self {
            index: 0,
            random: 31,
            entry_lo0: 0,
            entry_lo1: 0,
            context: 0,
            page_mask: 0,
            wired: 0,
            bad_vaddr: 0,
            count: 0,
            entry_hi: 0,
            compare: 0,
            sr: 0,
            cause: 0,
            epc: 0,
            prid: 0x0000_0B22,
            config: 0x7006_E463,
            ll_addr: 0,
            watch_lo: 0,
            watch_hi: 0,
            xcontext: 0,
            perr: 0,
            cache_err: 0,
            tag_lo: 0,
            tag_hi: 0,
            error_epc: 0,
        }
    }

    /// Whether coprocessor 1 is usable.
    #[inline]
    pub fn cu1(&self) -> bool {
        self.sr & STATUS_CU1 != 0
    }

    /// Whether the FR floating-point aliasing mode is enabled.
    #[inline]
    pub fn fr(&self) -> bool {
        self.sr & STATUS_FR != 0
    }

    /// Whether the processor is at exception level.
    #[inline]
    pub fn exl(&self) -> bool {
        self.sr & STATUS_EXL != 0
    }

    /// Whether the processor is at error level.
    #[inline]
    pub fn erl(&self) -> bool {
        self.sr & STATUS_ERL != 0
    }

    /// Whether interrupts are globally enabled and deliverable.
    #[inline]
    pub fn interrupts_enabled(&self) -> bool {
        self.sr & (STATUS_IE | STATUS_EXL | STATUS_ERL) == STATUS_IE
    }

    /// Whether the bootstrap exception vectors are selected.
    #[inline]
    pub fn bev(&self) -> bool {
        self.sr & STATUS_BEV != 0
    }

    /// Current address space identifier (EntryHi ASID field).
    #[inline]
    pub fn asid(&self) -> u8 {
        (self.entry_hi & 0xFF) as u8
    }

    /// Raises an interrupt-pending bit in Cause.IP.
    #[inline]
    pub fn set_ip(&mut self, bit: u32) {
        self.cause |= bit;
    }

    /// Clears an interrupt-pending bit in Cause.IP.
    #[inline]
    pub fn clear_ip(&mut self, bit: u32) {
        self.cause &= !bit;
    }

    /// Reads a COP0 register by index (`MFC0`/`DMFC0`).
    pub fn read(&self, idx: usize) -> u64 {
        match idx {
            reg::INDEX => self.index as u64,
            reg::RANDOM => self.random as u64,
            reg::ENTRY_LO0 => self.entry_lo0,
            reg::ENTRY_LO1 => self.entry_lo1,
            reg::CONTEXT => self.context,
            reg::PAGE_MASK => self.page_mask as u64,
            reg::WIRED => self.wired as u64,
            reg::BAD_VADDR => self.bad_vaddr,
            reg::COUNT => self.count as u64,
            reg::ENTRY_HI => self.entry_hi,
            reg::COMPARE => self.compare as u64,
            reg::SR => self.sr as u64,
            reg::CAUSE => self.cause as u64,
            reg::EPC => self.epc,
            reg::PRID => self.prid as u64,
            reg::CONFIG => self.config as u64,
            reg::LL_ADDR => self.ll_addr as u64,
            reg::WATCH_LO => self.watch_lo as u64,
            reg::WATCH_HI => self.watch_hi as u64,
            reg::XCONTEXT => self.xcontext,
            reg::PERR => self.perr as u64,
            reg::CACHE_ERR => self.cache_err as u64,
            reg::TAG_LO => self.tag_lo as u64,
            reg::TAG_HI => self.tag_hi as u64,
            reg::ERROR_EPC => self.error_epc,
            _ => 0,
        }
    }

    /// Writes a COP0 register by index (`MTC0`/`DMTC0`), honouring the
    /// architecturally writable bits. Random is read-only; writing Wired
    /// resets Random to 31; writing Compare acknowledges the timer
    /// interrupt.
    pub fn write(&mut self, idx: usize, val: u64) {
        match idx {
            reg::INDEX => self.index = (val as u32) & 0x8000_003F,
            reg::RANDOM => {} // read-only
            reg::ENTRY_LO0 => self.entry_lo0 = val & 0x3FFF_FFFF,
            reg::ENTRY_LO1 => self.entry_lo1 = val & 0x3FFF_FFFF,
            reg::CONTEXT => {
                // BadVPN2 (bits 4-22) is hardware-written only.
                self.context = (val & !0x7F_FFFF) | (self.context & 0x7F_FFF0);
            }
            reg::PAGE_MASK => self.page_mask = (val as u32) & 0x01FF_E000,
            reg::WIRED => {
                self.wired = (val as u32) & 0x3F;
                self.random = 31;
            }
            reg::BAD_VADDR => {} // read-only
            reg::COUNT => self.count = val as u32,
            reg::ENTRY_HI => self.entry_hi = val & 0xC000_00FF_FFFF_E0FF,
            reg::COMPARE => {
                self.compare = val as u32;
                self.cause &= !super::cp0::CAUSE_IP7;
            }
            reg::SR => self.sr = val as u32,
            reg::CAUSE => {
                // Only the two software interrupt-pending bits are writable.
                self.cause = (self.cause & !0x300) | ((val as u32) & 0x300);
            }
            reg::EPC => self.epc = val,
            reg::PRID => {} // read-only
            reg::CONFIG => self.config = (self.config & !0x0F00_800F) | ((val as u32) & 0x0F00_800F),
            reg::LL_ADDR => self.ll_addr = val as u32,
            reg::WATCH_LO => self.watch_lo = val as u32,
            reg::WATCH_HI => self.watch_hi = val as u32,
            reg::XCONTEXT => {
                self.xcontext = (val & !0xFFFF_FFFF) | (self.xcontext & 0xFFFF_FFF0);
            }
            reg::PERR => self.perr = val as u32,
            reg::CACHE_ERR => {} // read-only
            reg::TAG_LO => self.tag_lo = val as u32,
            reg::TAG_HI => self.tag_hi = val as u32,
            reg::ERROR_EPC => self.error_epc = val,
            _ => {}
        }
    }

    /// Decrements Random by one, wrapping from Wired to 31.
    ///
    /// Called once per retired VR instruction.
    #[inline]
    pub fn step_random(&mut self) {
        if self.random <= self.wired || self.random > 31 {
            self.random = 31;
        } else {
            self.random -= 1;
        }
    }
}

impl Default for Cp0 {
    fn default() -> Self {
        Self::new()
    }
}
