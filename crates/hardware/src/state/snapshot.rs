//! State snapshots.
//!
//! A register-by-register serialization of the machine's architectural
//! state. Restoring a snapshot taken from a machine reproduces that
//! machine's registers exactly; memories are deliberately excluded (the
//! DRAM image is gigabytes of mostly-zero bytes better captured by the
//! memory trace).

use serde::{Deserialize, Serialize};

use crate::core::arch::CpuState;
use crate::rdp::RdpState;
use crate::rsp::RspState;
use crate::state::{HwRegs, Machine};

/// The explicit register-by-register machine state.
#[derive(Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// VR architectural state, including COP0, COP1 and the TLB.
    pub cpu: CpuState,
    /// RSP architectural state, including the vector file and accumulator.
    pub rsp: RspState,
    /// RDP pipeline configuration.
    pub rdp: RdpState,
    /// Every MMIO register value.
    pub hwreg: HwRegs,
    /// The cycle counter.
    pub cycles: u64,
}

impl Machine {
    /// Captures the architectural state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cpu: self.cpu.clone(),
            rsp: self.rsp.clone(),
            rdp: self.rdp.clone(),
            hwreg: self.hwreg.clone(),
            cycles: self.cycles,
        }
    }

    /// Restores a previously captured state.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.cpu = snapshot.cpu.clone();
        self.rsp = snapshot.rsp.clone();
        self.rdp = snapshot.rdp.clone();
        self.hwreg = snapshot.hwreg.clone();
        self.cycles = snapshot.cycles;
        // Installed blocks bake in nothing from the snapshot, but their
        // cycle commits assume the counter they were entered with; a
        // restore is a fence.
        self.invalidate_blocks_on_status_write();
    }
}
