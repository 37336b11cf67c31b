//! Scheduled side-effects.
//!
//! DMA engines complete their byte moves synchronously but deliver the
//! completion interrupt after an estimated number of cycles; the VI raises
//! its vertical interrupt when the beam reaches the programmed line. Both
//! are modelled as events ordered by target cycle and dispatched by the
//! simulator between instructions.

use serde::{Deserialize, Serialize};

/// What happens when an event fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// PI cartridge DMA completion interrupt.
    PiDmaFinish,
    /// SI PIF-RAM DMA completion interrupt.
    SiDmaFinish,
    /// AI audio DMA completion interrupt.
    AiDmaFinish,
    /// SP scratch DMA completion: clears the DMA busy status bit.
    SpDmaFinish,
    /// VI scan-line advance; re-arms itself every line.
    ViLine,
}

/// One scheduled event.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Event {
    /// Cycle at which the event fires.
    pub at: u64,
    /// Effect to apply.
    pub kind: EventKind,
}

/// Pending events ordered by target cycle.
///
/// The queue is small (a handful of DMA engines plus the VI line tick), so
/// a sorted vector beats a heap on every real workload.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct EventQueue {
    events: Vec<Event>,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Schedules `kind` to fire at cycle `at`.
    pub fn schedule(&mut self, at: u64, kind: EventKind) {
        let idx = self.events.partition_point(|e| e.at <= at);
        self.events.insert(idx, Event { at, kind });
    }

    /// Removes and returns the next event due at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<Event> {
        if self.events.first().is_some_and(|e| e.at <= now) {
            Some(self.events.remove(0))
        } else {
            None
        }
    }

    /// Drops every pending event of the given kind.
    pub fn cancel(&mut self, kind: EventKind) {
        self.events.retain(|e| e.kind != kind);
    }

    /// Whether an event of the given kind is pending.
    pub fn pending(&self, kind: EventKind) -> bool {
        self.events.iter().any(|e| e.kind == kind)
    }
}
