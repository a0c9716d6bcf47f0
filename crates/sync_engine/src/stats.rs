//! Reconciliation counters and bounded drift history.

use std::fmt;

use ringbuf::{traits::*, HeapRb};
use serde::Serialize;

/// Snapshot of engine diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStats {
    /// Reconciliation passes evaluated
    pub reconciliations: u64,
    /// Hard corrections issued
    pub seeks: u64,
    /// Error events emitted
    pub errors: u64,
    /// SyncNowAchievable events emitted
    pub recoveries: u64,
    /// Most recent signed drift samples (target - current), oldest first
    pub recent_drift: Vec<f64>,
}

impl SyncStats {
    /// Largest absolute drift among the recent samples
    pub fn max_abs_drift(&self) -> Option<f64> {
        self.recent_drift
            .iter()
            .map(|d| d.abs())
            .fold(None, |acc, d| Some(acc.map_or(d, |a: f64| a.max(d))))
    }

    pub fn last_drift(&self) -> Option<f64> {
        self.recent_drift.last().copied()
    }
}

/// Running statistics owned by the engine worker
pub(crate) struct StatsRecorder {
    reconciliations: u64,
    seeks: u64,
    errors: u64,
    recoveries: u64,
    drift: HeapRb<f64>,
}

impl fmt::Debug for StatsRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsRecorder")
            .field("reconciliations", &self.reconciliations)
            .field("seeks", &self.seeks)
            .field("drift_samples", &self.drift.occupied_len())
            .finish()
    }
}

impl StatsRecorder {
    pub fn new(history: usize) -> Self {
        Self {
            reconciliations: 0,
            seeks: 0,
            errors: 0,
            recoveries: 0,
            drift: HeapRb::new(history.max(1)),
        }
    }

    pub fn record_reconciliation(&mut self) {
        self.reconciliations += 1;
    }

    /// Oldest sample is overwritten once the history is full
    pub fn record_drift(&mut self, drift: f64, seeked: bool) {
        self.drift.push_overwrite(drift);
        if seeked {
            self.seeks += 1;
        }
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn record_recovery(&mut self) {
        self.recoveries += 1;
    }

    pub fn snapshot(&self) -> SyncStats {
        SyncStats {
            reconciliations: self.reconciliations,
            seeks: self.seeks,
            errors: self.errors,
            recoveries: self.recoveries,
            recent_drift: self.drift.iter().copied().collect(),
        }
    }
}
