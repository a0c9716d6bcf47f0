//! Dual-trigger re-evaluation.
//!
//! Discrete triggers arrive over a single-consumer channel; a fixed-interval
//! ticker fires independently of them so a silent master is still noticed.

use std::time::Duration;

use contracts::CorrelationTimestamp;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Reason for a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// Master published a position reading
    MasterUpdated { content_time: Option<f64> },
    /// Master reported its own sync loss
    MasterFailure,
    /// Follower reached end of stream
    FollowerEnded,
    /// Correlation replaced
    Recalibrated(CorrelationTimestamp),
    /// Periodic poll
    WatchdogTick,
    /// Stop the worker
    Shutdown,
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::MasterUpdated { .. } => "master_updated",
            Trigger::MasterFailure => "master_failure",
            Trigger::FollowerEnded => "follower_ended",
            Trigger::Recalibrated(_) => "recalibrated",
            Trigger::WatchdogTick => "watchdog_tick",
            Trigger::Shutdown => "shutdown",
        }
    }
}

/// Multiplexes queued triggers with the periodic poll
#[derive(Debug)]
pub struct SyncWatchdog {
    triggers: mpsc::UnboundedReceiver<Trigger>,
    ticker: Interval,
}

impl SyncWatchdog {
    /// First tick fires one full `period` after creation
    ///
    /// Must be called within a tokio runtime.
    pub fn new(triggers: mpsc::UnboundedReceiver<Trigger>, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { triggers, ticker }
    }

    pub fn period(&self) -> Duration {
        self.ticker.period()
    }

    /// Next trigger; `None` once every sender is gone
    pub async fn next(&mut self) -> Option<Trigger> {
        tokio::select! {
            trigger = self.triggers.recv() => trigger,
            _ = self.ticker.tick() => Some(Trigger::WatchdogTick),
        }
    }
}
