//! Memory-trace record and replay.
//!
//! Recording captures every bus transaction (kind, size, address, value)
//! and a trace point (pc, cycles) per executed VR instruction as
//! line-delimited JSON. Replay runs the same ROM against the recorded
//! stream and verifies each record in order; the first divergence sets the
//! mismatch flag and halts, which the CLI reports with exit code 2.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use serde::{Deserialize, Serialize};

use crate::state::Machine;

/// One recorded bus transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceAccess {
    /// `true` for stores, `false` for loads.
    pub store: bool,
    /// Access size in bytes.
    pub size: u8,
    /// Physical address.
    pub addr: u64,
    /// Value read or written.
    pub value: u64,
}

impl TraceAccess {
    pub fn load(addr: u64, size: u8, value: u64) -> Self {
        Self {
            store: false,
            size,
            addr,
            value,
        }
    }

    pub fn store(addr: u64, size: u8, value: u64) -> Self {
        Self {
            store: true,
            size,
            addr,
            value,
        }
    }
}

/// One line of the trace stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceRecord {
    /// A bus transaction.
    Access(TraceAccess),
    /// Program counter and cycle count at an instruction boundary.
    Point { pc: u64, cycles: u64 },
}

/// The active trace mode.
pub enum Tracer {
    /// Serialize every record to the writer.
    Record(BufWriter<Box<dyn Write + Send>>),
    /// Verify every record against the recorded stream.
    Replay(VecDeque<TraceRecord>),
}

impl Tracer {
    /// Creates a recording tracer over any writer.
    pub fn record(writer: Box<dyn Write + Send>) -> Self {
        Tracer::Record(BufWriter::new(writer))
    }

    /// Loads a recorded stream for replay.
    ///
    /// # Errors
    ///
    /// Fails on unreadable input or malformed records.
    pub fn replay(reader: Box<dyn Read + Send>) -> Result<Self, crate::common::EmuError> {
        let mut records = VecDeque::new();
        for line in BufReader::new(reader).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let record: TraceRecord = serde_json::from_str(&line)
                .map_err(|e| crate::common::EmuError::TraceMismatch(e.to_string()))?;
            records.push_back(record);
        }
        Ok(Tracer::Replay(records))
    }

    /// Handles one record: written in record mode, verified in replay.
    fn on_record(&mut self, record: TraceRecord) -> Result<(), String> {
        match self {
            Tracer::Record(w) => {
                let line = serde_json::to_string(&record).expect("trace records serialize");
                writeln!(w, "{line}").map_err(|e| e.to_string())
            }
            Tracer::Replay(records) => match records.pop_front() {
                Some(expected) if expected == record => Ok(()),
                Some(expected) => Err(format!("expected {expected:?}, got {record:?}")),
                None => Err(format!("trace exhausted at {record:?}")),
            },
        }
    }

    /// Flushes a recording tracer at shutdown.
    pub fn finish(&mut self) {
        if let Tracer::Record(w) = self {
            let _ = w.flush();
        }
    }
}

impl Machine {
    /// Feeds one bus transaction to the active tracer, if any.
    pub(crate) fn trace_access(&mut self, access: TraceAccess) {
        let Some(tracer) = self.tracer.as_mut() else {
            return;
        };
        if let Err(reason) = tracer.on_record(TraceRecord::Access(access)) {
            self.trace_mismatch = true;
            self.halt(format!("memory trace mismatch: {reason}"));
        }
    }

    /// Feeds an instruction-boundary trace point to the active tracer.
    pub(crate) fn trace_point(&mut self, pc: u64) {
        let cycles = self.cycles;
        let Some(tracer) = self.tracer.as_mut() else {
            return;
        };
        if let Err(reason) = tracer.on_record(TraceRecord::Point { pc, cycles }) {
            self.trace_mismatch = true;
            self.halt(format!("memory trace mismatch: {reason}"));
        }
    }
}
