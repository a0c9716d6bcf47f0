//! Sync engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ReadyState, Tolerance};

/// Default watchdog interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Sync engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEngineConfig {
    /// Maximum drift (milliseconds) tolerated before a hard correction
    #[serde(default = "default_tolerance_ms")]
    pub tolerance_ms: f64,

    /// Watchdog re-evaluation interval (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Readiness level at or above which the follower has enough buffered data
    #[serde(default = "default_min_ready_state")]
    pub min_ready_state: ReadyState,

    /// Number of recent drift samples kept for diagnostics
    #[serde(default = "default_drift_history")]
    pub drift_history: usize,
}

fn default_tolerance_ms() -> f64 {
    50.0
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_min_ready_state() -> ReadyState {
    ReadyState::HaveFutureData
}

fn default_drift_history() -> usize {
    32
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: default_tolerance_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            min_ready_state: default_min_ready_state(),
            drift_history: default_drift_history(),
        }
    }
}

impl SyncEngineConfig {
    /// Configuration with the given tolerance and defaults elsewhere
    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Self {
            tolerance_ms: tolerance.as_millis(),
            ..Default::default()
        }
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance::from_millis(self.tolerance_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
