//! Session statistics.

use std::time::Duration;

use contracts::SyncEvent;
use observability::SyncMetricsAggregator;
use sync_engine::SyncStats;
use tracing::{info, warn};

/// Statistics from a session run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Scenario steps executed
    pub steps: u64,

    /// Events delivered to the session's listeners
    pub events_received: u64,

    /// Total duration of the session
    pub duration: Duration,

    /// Final engine snapshot
    pub engine: SyncStats,

    /// Host-side metrics aggregator
    pub sync_metrics: SyncMetricsAggregator,
}

impl PipelineStats {
    /// Count and log an engine event
    pub fn record_event(&mut self, event: &SyncEvent, elapsed_ms: u64) {
        self.events_received += 1;
        self.sync_metrics.update_event(event);
        match event {
            SyncEvent::SyncNowAchievable => info!(elapsed_ms, "sync now achievable"),
            SyncEvent::Error(kind) => {
                warn!(elapsed_ms, error = %kind, code = kind.code(), "sync error")
            }
        }
    }

    /// Engine reconciliation passes per second
    pub fn reconcile_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.engine.reconciliations as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Scenario steps: {}", self.steps);
        println!("   └─ Events received: {}", self.events_received);

        let engine = &self.engine;
        println!("\n📈 Engine");
        println!(
            "   ├─ Reconciliations: {} ({:.2}/s)",
            engine.reconciliations,
            self.reconcile_rate()
        );
        println!("   ├─ Seeks: {}", engine.seeks);
        println!("   ├─ Errors: {}", engine.errors);
        println!("   ├─ Recoveries: {}", engine.recoveries);
        match engine.max_abs_drift() {
            Some(drift) => println!("   └─ Max recent drift: {:.1} ms", drift * 1000.0),
            None => println!("   └─ Max recent drift: N/A"),
        }

        let summary = self.sync_metrics.summary();
        println!("\n🎯 Observed");
        println!("   ├─ Within tolerance: {:.2}%", summary.in_tolerance_rate);
        println!("   ├─ Drift (ms): {}", summary.drift_ms);
        println!("   └─ Recalibrations: {}", summary.recalibrations);

        if !summary.errors_by_kind.is_empty() {
            println!("\n⚠️  Errors by kind");
            let mut kinds: Vec<_> = summary.errors_by_kind.iter().collect();
            kinds.sort();
            for (kind, count) in kinds {
                println!("   ├─ {}: {}", kind, count);
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SyncErrorKind;

    #[test]
    fn test_record_event_updates_aggregator() {
        let mut stats = PipelineStats::default();
        stats.record_event(&SyncEvent::Error(SyncErrorKind::InsufficientBuffer), 100);
        stats.record_event(&SyncEvent::SyncNowAchievable, 200);

        assert_eq!(stats.events_received, 2);
        assert_eq!(stats.sync_metrics.recoveries, 1);
        assert_eq!(stats.sync_metrics.summary().total_errors, 1);
    }

    #[test]
    fn test_reconcile_rate() {
        let stats = PipelineStats {
            duration: Duration::from_secs(2),
            engine: SyncStats {
                reconciliations: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!((stats.reconcile_rate() - 5.0).abs() < 1e-10);
    }
}
