//! Top-level simulator.
//!
//! Single-threaded cooperative scheduling: each step dispatches due
//! events, advances the VR by one instruction (or one recompiled block),
//! then advances the RSP. Order is deterministic and driven by the cycle
//! counter; no guest component executes in parallel with another.

use crate::common::constants::VI_CYCLES_PER_LINE;
use crate::config::Config;
use crate::sim::events::EventKind;
use crate::soc::devices::{ai, pi, si, vi};
use crate::state::Machine;

/// Why the run loop stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The configured step limit was reached.
    StepLimit,
    /// The machine halted with a reason string.
    Halted(String),
    /// A replayed memory trace diverged.
    TraceMismatch(String),
}

impl StopReason {
    /// The process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            StopReason::StepLimit => 0,
            StopReason::Halted(_) => 1,
            StopReason::TraceMismatch(_) => 2,
        }
    }
}

/// The simulator: owns the machine and drives the step loop.
pub struct Simulator {
    /// The machine state. Boxed so the recompiler's captured addresses
    /// stay valid for the whole run.
    pub machine: Box<Machine>,
}

impl Simulator {
    /// Creates a simulator, binds the recompiler and arms the VI beam.
    pub fn new(config: &Config) -> Self {
        let mut machine = Machine::new(config);
        machine.jit_bind();
        machine
            .events
            .schedule(VI_CYCLES_PER_LINE, EventKind::ViLine);
        Self { machine }
    }

    /// Advances the whole console by one VR step.
    pub fn step(&mut self) {
        let m = &mut self.machine;

        while let Some(event) = m.events.pop_due(m.cycles) {
            match event.kind {
                EventKind::PiDmaFinish => pi::dma_finish(m),
                EventKind::SiDmaFinish => si::dma_finish(m),
                EventKind::AiDmaFinish => ai::dma_finish(m),
                EventKind::SpDmaFinish => m.sp_dma_finish(),
                EventKind::ViLine => {
                    vi::line_tick(m);
                    let next = m.cycles + VI_CYCLES_PER_LINE;
                    m.events.schedule(next, EventKind::ViLine);
                }
            }
        }
        if m.halted {
            return;
        }

        if !m.jit_step() {
            m.step_cpu();
        }
        m.step_rsp();
    }

    /// Runs until the halt flag or the configured step limit.
    pub fn run(&mut self) -> StopReason {
        let limit = self.machine.config.general.step_limit;
        let mut steps = 0u64;
        while !self.machine.halted && steps < limit {
            self.step();
            steps += 1;
        }
        if let Some(tracer) = self.machine.tracer.as_mut() {
            tracer.finish();
        }

        let reason = if self.machine.trace_mismatch {
            StopReason::TraceMismatch(self.machine.halt_reason.clone())
        } else if self.machine.halted {
            StopReason::Halted(self.machine.halt_reason.clone())
        } else {
            StopReason::StepLimit
        };
        tracing::info!(?reason, cycles = self.machine.cycles, "run stopped");
        reason
    }
}
