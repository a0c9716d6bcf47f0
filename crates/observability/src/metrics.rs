//! Session-level sync metrics.
//!
//! The engine records its own counters; this module covers what a host
//! observes from outside: emitted events and the measured follower drift.

use std::collections::HashMap;

use contracts::{SyncErrorKind, SyncEvent};
use metrics::{counter, gauge, histogram};

/// Record an event delivered to a host listener
pub fn record_sync_event(event: &SyncEvent) {
    match event {
        SyncEvent::SyncNowAchievable => {
            counter!("media_sync_events_total", "kind" => "sync_now_achievable").increment(1);
        }
        SyncEvent::Error(kind) => {
            counter!(
                "media_sync_events_total",
                "kind" => "error",
                "error" => kind.as_str()
            )
            .increment(1);
        }
    }
}

/// Record the drift between where the follower is and where it should be
///
/// `drift` is in seconds, signed (expected - actual).
pub fn record_observed_drift(drift: f64) {
    gauge!("media_sync_observed_drift_ms").set(drift * 1000.0);
    histogram!("media_sync_observed_drift_ms_hist").record(drift.abs() * 1000.0);
}

/// Record the follower's current position (seconds)
pub fn record_follower_position(position: f64) {
    gauge!("media_sync_follower_position_seconds").set(position);
}

/// Record a correlation change made by the host
pub fn record_recalibration() {
    counter!("media_sync_recalibrations_total").increment(1);
}

/// Session metrics aggregator
///
/// Aggregates in memory so a run can print a summary at exit.
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    /// SyncNowAchievable events seen
    pub recoveries: u64,

    /// Error events seen, by kind
    pub errors: HashMap<SyncErrorKind, u64>,

    /// Host recalibrations
    pub recalibrations: u64,

    /// Absolute observed drift (milliseconds)
    pub drift_stats: RunningStats,

    /// Samples within tolerance
    pub in_tolerance: u64,
}

impl SyncMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_event(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::SyncNowAchievable => self.recoveries += 1,
            SyncEvent::Error(kind) => *self.errors.entry(*kind).or_insert(0) += 1,
        }
    }

    /// Add an observed drift sample, with the tolerance it is judged against
    pub fn update_drift(&mut self, drift_secs: f64, tolerance_secs: f64) {
        if drift_secs.abs() <= tolerance_secs {
            self.in_tolerance += 1;
        }
        self.drift_stats.push(drift_secs.abs() * 1000.0);
    }

    pub fn update_recalibration(&mut self) {
        self.recalibrations += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        let samples = self.drift_stats.count();
        MetricsSummary {
            recoveries: self.recoveries,
            total_errors: self.errors.values().sum(),
            errors_by_kind: self
                .errors
                .iter()
                .map(|(kind, count)| (kind.as_str().to_string(), *count))
                .collect(),
            recalibrations: self.recalibrations,
            in_tolerance_rate: if samples > 0 {
                self.in_tolerance as f64 / samples as f64 * 100.0
            } else {
                0.0
            },
            drift_ms: StatsSummary::from(&self.drift_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub recoveries: u64,
    pub total_errors: u64,
    pub errors_by_kind: HashMap<String, u64>,
    pub recalibrations: u64,
    pub in_tolerance_rate: f64,
    pub drift_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(f, "Recoveries: {}", self.recoveries)?;
        writeln!(f, "Errors: {}", self.total_errors)?;

        let mut kinds: Vec<_> = self.errors_by_kind.iter().collect();
        kinds.sort();
        for (kind, count) in kinds {
            writeln!(f, "  {}: {}", kind, count)?;
        }

        writeln!(f, "Recalibrations: {}", self.recalibrations)?;
        writeln!(f, "Within tolerance: {:.2}%", self.in_tolerance_rate)?;
        writeln!(f, "Observed drift (ms): {}", self.drift_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
