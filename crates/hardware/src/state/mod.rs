//! Machine state.
//!
//! [`Machine`] is the owning container for all register files, the TLB, the
//! scratch memories, the DRAM buffer, the MMIO register block, the cycle
//! counter and the bus region table. It is created once at startup,
//! heap-allocated so the recompiler can capture stable field addresses, and
//! reset in place on user request, never reallocated.
//!
//! The bus and the device registers mutually reference each other (a device
//! register write can DMA into DRAM, which the bus also serves). The cycle
//! is broken by owning all device state here and dispatching bus accesses
//! through region tags: device handlers receive `&mut Machine` and the bus
//! never outlives it.

/// The MMIO register block.
pub mod hwreg;

/// Register-by-register state snapshot.
pub mod snapshot;

pub use hwreg::HwRegs;
pub use snapshot::Snapshot;

use crate::common::constants::{PIF_RAM_SIZE, SP_MEM_SIZE, TMEM_SIZE};
use crate::config::Config;
use crate::core::arch::CpuState;
use crate::rdp::RdpState;
use crate::recompiler::JitState;
use crate::rsp::RspState;
use crate::sim::events::EventQueue;
use crate::sim::trace::Tracer;
use crate::soc::interconnect::Bus;
use crate::soc::memory::DramBuffer;
use crate::stats::SimStats;

/// The complete console state.
pub struct Machine {
    /// Active configuration.
    pub config: Config,
    /// VR CPU architectural state.
    pub cpu: CpuState,
    /// RSP architectural state.
    pub rsp: RspState,
    /// RDP pipeline configuration.
    pub rdp: RdpState,
    /// Physical bus region table.
    pub bus: Bus,
    /// Main DRAM.
    pub dram: DramBuffer,
    /// Cartridge ROM image (big-endian byte order).
    pub rom: Vec<u8>,
    /// PIF boot ROM contents.
    pub pif_rom: Vec<u8>,
    /// PIF RAM (boot handshake and joybus command buffer).
    pub pif_ram: [u8; PIF_RAM_SIZE],
    /// SP data scratch memory.
    pub dmem: [u8; SP_MEM_SIZE],
    /// SP instruction scratch memory.
    pub imem: [u8; SP_MEM_SIZE],
    /// DP texture memory.
    pub tmem: [u8; TMEM_SIZE],
    /// MMIO register block.
    pub hwreg: HwRegs,
    /// Monotonic cycle counter: one per VR instruction, one per DP pixel,
    /// plus DMA byte estimates.
    pub cycles: u64,
    /// Emulation halt flag; checked between instructions.
    pub halted: bool,
    /// Reason string reported when the halt flag is set.
    pub halt_reason: String,
    /// Whether the halt is a memory-trace replay mismatch (exit code 2).
    pub trace_mismatch: bool,
    /// Scheduled side-effects ordered by target cycle.
    pub events: EventQueue,
    /// Optional memory-trace recorder/replayer.
    pub tracer: Option<Tracer>,
    /// Recompiler state: code buffer, block cache, global bindings.
    pub jit: JitState,
    /// Run statistics.
    pub stats: SimStats,
}

impl Machine {
    /// Creates a machine with empty memories and power-on register values.
    ///
    /// The result is boxed: the recompiler backend captures raw addresses
    /// of register fields and requires them to be stable for the lifetime
    /// of the machine.
    pub fn new(config: &Config) -> Box<Self> {
        Box::new(Self {
            config: config.clone(),
            cpu: CpuState::new(),
            rsp: RspState::new(),
            rdp: RdpState::default(),
            bus: Bus::new_console_map(config.memory.dram_size),
            dram: DramBuffer::new(config.memory.dram_size),
            rom: Vec::new(),
            pif_rom: Vec::new(),
            pif_ram: [0; PIF_RAM_SIZE],
            dmem: [0; SP_MEM_SIZE],
            imem: [0; SP_MEM_SIZE],
            tmem: [0; TMEM_SIZE],
            hwreg: HwRegs::new(),
            cycles: 0,
            halted: false,
            halt_reason: String::new(),
            trace_mismatch: false,
            events: EventQueue::new(),
            tracer: None,
            jit: JitState::new(),
            stats: SimStats::default(),
        })
    }

    /// Resets the machine in place: registers, scratch memories, DRAM and
    /// MMIO block return to power-on state. The ROM image and the bus map
    /// are kept.
    pub fn reset(&mut self) {
        self.cpu = CpuState::new();
        self.rsp = RspState::new();
        self.rdp = RdpState::default();
        self.dram.clear();
        self.pif_ram = [0; PIF_RAM_SIZE];
        self.dmem = [0; SP_MEM_SIZE];
        self.imem = [0; SP_MEM_SIZE];
        self.tmem = [0; TMEM_SIZE];
        self.hwreg = HwRegs::new();
        self.cycles = 0;
        self.halted = false;
        self.halt_reason.clear();
        self.trace_mismatch = false;
        self.events = EventQueue::new();
        self.stats = SimStats::default();
        self.jit.cache.clear();
        if let Some(buf) = &mut self.jit.buffer {
            buf.reset();
        }
    }

    /// Sets the halt flag with a reason. The outer loop drops out at the
    /// next safe point; nothing unwinds.
    pub fn halt(&mut self, reason: impl Into<String>) {
        if !self.halted {
            self.halted = true;
            self.halt_reason = reason.into();
            tracing::error!(reason = %self.halt_reason, "emulation halted");
        }
    }
}

/// Reads a big-endian u16 from a byte memory.
#[inline]
pub(crate) fn read_be16(mem: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([mem[offset], mem[offset + 1]])
}

/// Reads a big-endian u32 from a byte memory.
#[inline]
pub(crate) fn read_be32(mem: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([mem[offset], mem[offset + 1], mem[offset + 2], mem[offset + 3]])
}

/// Reads a big-endian u64 from a byte memory.
#[inline]
pub(crate) fn read_be64(mem: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&mem[offset..offset + 8]);
    u64::from_be_bytes(bytes)
}

/// Writes a big-endian u16 into a byte memory.
#[inline]
pub(crate) fn write_be16(mem: &mut [u8], offset: usize, val: u16) {
    mem[offset..offset + 2].copy_from_slice(&val.to_be_bytes());
}

/// Writes a big-endian u32 into a byte memory.
#[inline]
pub(crate) fn write_be32(mem: &mut [u8], offset: usize, val: u32) {
    mem[offset..offset + 4].copy_from_slice(&val.to_be_bytes());
}
