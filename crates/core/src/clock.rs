//! Evaluation clock for edge liveness.
//!
//! Liveness is always judged against this clock, never against wall time read
//! ad hoc, so every algorithm in one call observes the same "live" view.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Which time source the context evaluates expiration against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// High-water mark of ingested edge timestamps, advanced explicitly
    #[default]
    Logical,
    /// Wall-clock nanoseconds since the Unix epoch
    System,
}

/// Evaluation clock owned by a context
#[derive(Debug, Clone)]
pub struct EvaluationClock {
    mode: ClockMode,
    logical_now_ns: u64,
}

impl EvaluationClock {
    pub fn new(mode: ClockMode) -> Self {
        Self {
            mode,
            logical_now_ns: 0,
        }
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Current evaluation time in nanoseconds.
    pub fn now_ns(&self) -> u64 {
        match self.mode {
            ClockMode::Logical => self.logical_now_ns,
            ClockMode::System => system_time_ns(),
        }
    }

    /// Record a timestamp seen on ingestion. The logical clock never moves backwards.
    pub fn observe(&mut self, timestamp_ns: u64) {
        self.logical_now_ns = self.logical_now_ns.max(timestamp_ns);
    }

    /// Move the logical clock forward. Returns the resulting time.
    ///
    /// Ignored in system mode; earlier values leave the clock unchanged.
    pub fn advance_to(&mut self, now_ns: u64) -> u64 {
        if self.mode == ClockMode::Logical {
            self.observe(now_ns);
        }
        self.now_ns()
    }
}

impl Default for EvaluationClock {
    fn default() -> Self {
        Self::new(ClockMode::default())
    }
}

fn system_time_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
