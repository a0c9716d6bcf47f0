//! # Observability
//!
//! Tracing and Prometheus metrics for media sync sessions.
//!
//! - Log filtering with a separate level for the engine crates
//! - A `sync_session` span carrying the session's engine settings
//! - Prometheus exporter with drift-sized histogram buckets
//! - Session metrics aggregation
//!
//! ## Example
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig::from_verbosity(1, false))?;
//!
//! let span = observability::session_span(&config);
//! let engine = SyncEngine::with_config(follower, config.correlation, config.engine, master);
//! span.record("engine", engine.id());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use contracts::MediaSyncConfig;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing::Span;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub use crate::metrics::{
    record_follower_position, record_observed_drift, record_recalibration, record_sync_event,
    MetricsSummary, RunningStats, StatsSummary, SyncMetricsAggregator,
};

/// Crates whose events follow `engine_log_level`
const ENGINE_TARGETS: [&str; 2] = ["sync_engine", "simulation"];

/// Drift histogram buckets in seconds, dense around typical tolerances
const DRIFT_BUCKETS_SECS: [f64; 10] = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0];

/// Observed drift histogram buckets in milliseconds
const OBSERVED_DRIFT_BUCKETS_MS: [f64; 9] = [1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0, 5000.0];

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is unset
    pub default_log_level: String,
    /// Level for the engine and simulation crates (None = same as default)
    pub engine_log_level: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
            engine_log_level: None,
        }
    }
}

impl ObservabilityConfig {
    /// Map `-v` / `-q` counts to filter levels
    ///
    /// One `-v` opens the engine up to `debug` (per-pass decisions) while the
    /// rest stays at `info`; two or more trace everything. `quiet` wins.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let (default_level, engine_level) = match (quiet, verbose) {
            (true, _) => ("warn", None),
            (false, 0) => ("info", None),
            (false, 1) => ("info", Some("debug")),
            (false, _) => ("trace", None),
        };

        Self {
            default_log_level: default_level.to_string(),
            engine_log_level: engine_level.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    /// `EnvFilter` directives, e.g. `info,sync_engine=debug,simulation=debug`
    pub fn filter_directives(&self) -> String {
        let mut directives = self.default_log_level.clone();
        if let Some(level) = &self.engine_log_level {
            for target in ENGINE_TARGETS {
                directives.push_str(&format!(",{target}={level}"));
            }
        }
        directives
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON
    #[default]
    Json,
    /// Multi-line, human readable
    Pretty,
    /// Single line
    Compact,
}

/// Initialize tracing (and Prometheus when a port is set)
///
/// `RUST_LOG` takes precedence over the configured levels.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directives()))
        .context("Invalid log filter")?;

    tracing_subscriber::registry()
        .with(fmt_layer(config.log_format).with_filter(filter))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        filter = %config.filter_directives(),
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_names(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

/// Span wrapping one sync session
///
/// `engine` starts empty; record it once the engine exists so every event of
/// the session carries the same id as its `media_sync_synchronised` gauge.
pub fn session_span(config: &MediaSyncConfig) -> Span {
    tracing::info_span!(
        "sync_session",
        engine = tracing::field::Empty,
        tolerance_ms = config.engine.tolerance_ms,
        poll_interval_ms = config.engine.poll_interval_ms,
        offset = config.correlation.offset(),
        duration_ms = config.simulation.duration_ms,
        events = config.simulation.events.len(),
    )
}

/// Initialize Prometheus only
///
/// For hosts that already installed their own tracing subscriber.
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn prometheus_builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("media_sync_drift_seconds".to_string()),
            &DRIFT_BUCKETS_SECS,
        )
        .and_then(|builder| {
            builder.set_buckets_for_metric(
                Matcher::Full("media_sync_observed_drift_ms_hist".to_string()),
                &OBSERVED_DRIFT_BUCKETS_MS,
            )
        })
        .context("Invalid histogram buckets")
}

fn install_prometheus(port: u16) -> Result<()> {
    prometheus_builder()?
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
