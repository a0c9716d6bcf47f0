//! Sync-state transitions and the events they emit.

use contracts::{SyncErrorKind, SyncEvent};
use tracing::{info, warn};

/// Tracks `can_sync_with_master` and emits exactly one event per transition
#[derive(Debug, Clone)]
pub struct FailureReporter {
    synchronised: bool,
}

impl Default for FailureReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureReporter {
    /// Starts synchronised
    pub fn new() -> Self {
        Self { synchronised: true }
    }

    pub fn can_sync_with_master(&self) -> bool {
        self.synchronised
    }

    /// Flip to not-synchronised; re-reporting while already failed is silent
    pub fn report_failure(&mut self, kind: SyncErrorKind) -> Option<SyncEvent> {
        if !self.synchronised {
            return None;
        }
        self.synchronised = false;

        warn!(kind = %kind, code = kind.code(), "synchronisation with master lost");
        metrics::counter!("media_sync_errors_total", "kind" => kind.as_str()).increment(1);

        Some(SyncEvent::Error(kind))
    }

    /// Flip back to synchronised
    pub fn report_achievable(&mut self) -> Option<SyncEvent> {
        if self.synchronised {
            return None;
        }
        self.synchronised = true;

        info!("synchronisation with master achievable again");
        metrics::counter!("media_sync_recovered_total").increment(1);

        Some(SyncEvent::SyncNowAchievable)
    }
}
