//! Session orchestrator - drives a scripted scenario against a live engine.
//!
//! The scenario is stepped in real time so the engine's watchdog interval keeps
//! its meaning relative to the simulated clocks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{FollowerMedia, MasterObserver, MediaSyncConfig, SyncEvent, SyncEventKind};
use observability::{record_follower_position, record_observed_drift, record_recalibration};
use simulation::{MockFollower, MockMaster, Scenario};
use sync_engine::SyncEngine;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Instrument, Span};

use super::PipelineStats;
use crate::error::CliError;

/// Session configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated configuration
    pub config: MediaSyncConfig,

    /// Session timeout (None = run the whole scenario)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main session orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the scenario to completion (or timeout) and tear the engine down
    ///
    /// Everything logged by the session, the engine worker included, is
    /// nested in one `sync_session` span.
    pub async fn run(self) -> Result<PipelineStats> {
        let span = observability::session_span(&self.config.config);
        self.run_in(span.clone()).instrument(span).await
    }

    async fn run_in(self, span: Span) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let config = &self.config.config;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let mut scenario = Scenario::new(config.simulation.clone());
        let master: Arc<MockMaster> = scenario.master();
        let follower: Arc<MockFollower> = scenario.follower();

        info!(
            master_start = config.simulation.master_start,
            follower_start = config.simulation.follower_start,
            events = config.simulation.events.len(),
            "Scenario prepared"
        );

        let engine = SyncEngine::with_config(
            follower.clone(),
            config.correlation,
            config.engine.clone(),
            master.clone(),
        );
        span.record("engine", engine.id());

        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SyncEvent>();
        for kind in [SyncEventKind::SyncNowAchievable, SyncEventKind::Error] {
            let tx = event_tx.clone();
            engine.add_event_listener(kind, move |event| {
                observability::record_sync_event(event);
                let _ = tx.send(*event);
            });
        }
        drop(event_tx);

        info!(tolerance_ms = config.engine.tolerance_ms, "Sync engine started");

        let mut stats = PipelineStats::default();
        let tolerance = engine.tolerance().as_secs();
        let step = Duration::from_millis(config.simulation.step_ms.max(1));

        let session = async {
            let mut ticker = tokio::time::interval(step);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while !scenario.is_finished() {
                ticker.tick().await;
                let outcome = scenario.step();
                stats.steps += 1;

                for correlation in outcome.recalibrations {
                    info!(
                        master_time = correlation.master_time,
                        other_time = correlation.other_time,
                        "Recalibrating"
                    );
                    engine.set_correlation(correlation);
                    record_recalibration();
                    stats.sync_metrics.update_recalibration();
                }

                while let Ok(event) = event_rx.try_recv() {
                    stats.record_event(&event, outcome.elapsed_ms);
                }

                if let Some(master_time) = master.content_time() {
                    if !follower.ended() && !follower.is_paused() {
                        let expected = master_time + engine.get_correlation().offset();
                        let drift = expected - follower.current_time();
                        record_observed_drift(drift);
                        stats.sync_metrics.update_drift(drift, tolerance);
                        debug!(
                            elapsed_ms = outcome.elapsed_ms,
                            drift_ms = drift * 1000.0,
                            "Observed drift"
                        );
                    }
                }
                record_follower_position(follower.current_time());
            }
        };

        let timed_out = match self.config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, session).await.is_err(),
            None => {
                session.await;
                false
            }
        };

        if timed_out {
            warn!(elapsed_ms = scenario.elapsed_ms(), "Session timed out");
        }

        info!("Shutting down sync engine...");
        engine.destroy();
        engine.join().await;

        let elapsed_ms = scenario.elapsed_ms();
        while let Ok(event) = event_rx.try_recv() {
            stats.record_event(&event, elapsed_ms);
        }

        if master.subscriber_count() != 0 || follower.ended_listener_count() != 0 {
            return Err(CliError::session("engine left subscriptions behind after destroy").into());
        }

        stats.engine = engine.stats();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            synchronised = engine.can_sync_with_master(),
            "Session shutdown complete"
        );

        Ok(stats)
    }
}
