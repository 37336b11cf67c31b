//! Global system constants.
//!
//! The console's physical memory map, scratch memory sizes and the
//! architectural exception vector bases. Region sizes follow the hardware
//! register bank footprints; DRAM defaults to the expansion-pak size.

/// Base physical address of main DRAM.
pub const DRAM_BASE: u64 = 0x0000_0000;

/// Default DRAM size (8 MiB, expansion pak installed).
pub const DRAM_SIZE: usize = 8 * 1024 * 1024;

/// Base address of the RI (RAM interface) register bank.
pub const RI_BASE: u64 = 0x03F0_0000;

/// Size of the RI register region (1 MiB window).
pub const RI_SIZE: u64 = 0x0010_0000;

/// Base address of the SP data scratch memory (DMEM).
pub const SP_DMEM_BASE: u64 = 0x0400_0000;

/// Base address of the SP instruction scratch memory (IMEM).
pub const SP_IMEM_BASE: u64 = 0x0400_1000;

/// Size of each SP scratch memory, and of the DP texture memory.
pub const SP_MEM_SIZE: usize = 4096;

/// Base address of the SP control register bank.
pub const SP_REGS_BASE: u64 = 0x0404_0000;

/// Size of the SP control register bank.
pub const SP_REGS_SIZE: u64 = 0x20;

/// Base address of the SP program counter register.
pub const SP_PC_BASE: u64 = 0x0408_0000;

/// Size of the SP program counter register window.
pub const SP_PC_SIZE: u64 = 0x8;

/// Base address of the DP command register bank.
pub const DP_REGS_BASE: u64 = 0x0410_0000;

/// Size of the DP command register bank.
pub const DP_REGS_SIZE: u64 = 0x20;

/// Base address of the MI (MIPS interface) register bank.
pub const MI_REGS_BASE: u64 = 0x0430_0000;

/// Size of the MI register bank.
pub const MI_REGS_SIZE: u64 = 0x10;

/// Base address of the VI (video interface) register bank.
pub const VI_REGS_BASE: u64 = 0x0440_0000;

/// Size of the VI register bank.
pub const VI_REGS_SIZE: u64 = 0x40;

/// Base address of the AI (audio interface) register bank.
pub const AI_REGS_BASE: u64 = 0x0450_0000;

/// Size of the AI register bank.
pub const AI_REGS_SIZE: u64 = 0x18;

/// Base address of the PI (peripheral interface) register bank.
pub const PI_REGS_BASE: u64 = 0x0460_0000;

/// Size of the PI register bank.
pub const PI_REGS_SIZE: u64 = 0x34;

/// Base address of the SI (serial interface) register bank.
pub const SI_REGS_BASE: u64 = 0x0480_0000;

/// Size of the SI register bank.
pub const SI_REGS_SIZE: u64 = 0x1C;

/// Base address of the cartridge ROM window.
pub const CART_ROM_BASE: u64 = 0x1000_0000;

/// Maximum cartridge ROM size (64 MiB).
pub const CART_ROM_SIZE_MAX: usize = 64 * 1024 * 1024;

/// Base address of the PIF ROM + RAM region (2 KiB total).
pub const PIF_BASE: u64 = 0x1FC0_0000;

/// Size of the PIF boot ROM portion.
pub const PIF_ROM_SIZE: usize = 0x7C0;

/// Size of the PIF RAM portion, following the boot ROM.
pub const PIF_RAM_SIZE: usize = 0x40;

/// DP texture memory size.
pub const TMEM_SIZE: usize = 4096;

/// Offset of the palette banks inside TMEM.
pub const TMEM_PALETTE_BASE: usize = 0x800;

/// Exception vector base with `Status.BEV` clear.
pub const EXC_VECTOR_BASE: u64 = 0xFFFF_FFFF_8000_0000;

/// Exception vector base with `Status.BEV` set (boot-time vectors).
pub const EXC_VECTOR_BASE_BEV: u64 = 0xFFFF_FFFF_BFC0_0200;

/// Vector offset for TLB refills taken with `Status.EXL` clear.
pub const EXC_VECTOR_OFFSET_TLB_REFILL: u64 = 0x000;

/// Vector offset for 64-bit (XTLB) refills taken with `Status.EXL` clear.
pub const EXC_VECTOR_OFFSET_XTLB_REFILL: u64 = 0x080;

/// Vector offset for every other exception.
pub const EXC_VECTOR_OFFSET_GENERAL: u64 = 0x180;

/// Program counter at the end of the boot stub (start of the IPL3 image
/// copied into DMEM).
pub const BOOT_PC: u64 = 0xFFFF_FFFF_A400_0040;

/// Number of TLB entries.
pub const TLB_ENTRY_COUNT: usize = 32;

/// Cycles per VI scan line used to derive `VI_CURRENT` and schedule the
/// vertical interrupt.
pub const VI_CYCLES_PER_LINE: u64 = 6150;

/// Total VI scan lines per frame (NTSC).
pub const VI_LINES_PER_FRAME: u32 = 525;
