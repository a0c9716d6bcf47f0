//! Reconciliation state machine.
//!
//! Every trigger, event-driven or polled, ends up in [`Reconciler::reconcile`].
//! The reconciler is synchronous and owns all mutable sync state; the engine
//! worker is the only caller, which serializes passes.

use contracts::{
    CorrelationTimestamp, FollowerMedia, MasterObserver, ReadyState, SyncEngineConfig,
    SyncErrorKind, SyncEvent,
};
use tracing::{debug, info, instrument};

use crate::correlation::CorrelationTransform;
use crate::drift::{Correction, DriftCorrector};
use crate::rate::RateController;
use crate::reporter::FailureReporter;
use crate::stats::{StatsRecorder, SyncStats};
use crate::watchdog::Trigger;

/// Sync state and the components consulted on each pass
#[derive(Debug)]
pub struct Reconciler {
    transform: CorrelationTransform,
    corrector: DriftCorrector,
    rate: RateController,
    reporter: FailureReporter,
    min_ready_state: ReadyState,
    stats: StatsRecorder,
}

impl Reconciler {
    pub fn new(correlation: CorrelationTimestamp, config: &SyncEngineConfig) -> Self {
        Self {
            transform: CorrelationTransform::new(correlation),
            corrector: DriftCorrector::new(config.tolerance()),
            rate: RateController::new(),
            reporter: FailureReporter::new(),
            min_ready_state: config.min_ready_state,
            stats: StatsRecorder::new(config.drift_history),
        }
    }

    pub fn can_sync_with_master(&self) -> bool {
        self.reporter.can_sync_with_master()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.snapshot()
    }

    /// Dispatch one trigger; returns the event to emit, if any
    pub fn handle(
        &mut self,
        trigger: Trigger,
        follower: &dyn FollowerMedia,
        master: &dyn MasterObserver,
    ) -> Option<SyncEvent> {
        metrics::counter!("media_sync_reconcile_total", "trigger" => trigger.name()).increment(1);

        let event = match trigger {
            Trigger::MasterUpdated { content_time } => {
                self.on_master_updated(content_time, follower, master)
            }
            Trigger::Recalibrated(correlation) => self.recalibrate(correlation, follower, master),
            Trigger::WatchdogTick => self.on_watchdog_tick(follower, master),
            Trigger::MasterFailure | Trigger::FollowerEnded => self.on_presentation_failure(),
            Trigger::Shutdown => None,
        };

        match event {
            Some(SyncEvent::Error(_)) => self.stats.record_error(),
            Some(SyncEvent::SyncNowAchievable) => self.stats.record_recovery(),
            None => {}
        }
        event
    }

    /// Master published a position reading
    ///
    /// A starved follower is reported before the reading is even looked at;
    /// an unknown reading is otherwise ignored.
    pub fn on_master_updated(
        &mut self,
        content_time: Option<f64>,
        follower: &dyn FollowerMedia,
        master: &dyn MasterObserver,
    ) -> Option<SyncEvent> {
        let ready_state = follower.ready_state();
        if ready_state < self.min_ready_state {
            debug!(
                ready_state = ready_state.ordinal(),
                threshold = self.min_ready_state.ordinal(),
                "follower starved, skipping correction"
            );
            return self
                .reporter
                .report_failure(SyncErrorKind::InsufficientBuffer);
        }

        let reading = content_time.filter(|t| !t.is_nan())?;
        let target = self.transform.target_time(reading);
        self.reconcile(Some(target), follower, master)
    }

    /// Periodic re-evaluation; always re-samples the master
    pub fn on_watchdog_tick(
        &mut self,
        follower: &dyn FollowerMedia,
        master: &dyn MasterObserver,
    ) -> Option<SyncEvent> {
        let target = master
            .content_time()
            .map(|reading| self.transform.target_time(reading));
        self.reconcile(target, follower, master)
    }

    /// Replace the correlation and re-evaluate against the master's current reading
    pub fn recalibrate(
        &mut self,
        correlation: CorrelationTimestamp,
        follower: &dyn FollowerMedia,
        master: &dyn MasterObserver,
    ) -> Option<SyncEvent> {
        info!(
            master_time = correlation.master_time,
            other_time = correlation.other_time,
            "correlation replaced"
        );
        self.transform.recalibrate(correlation);
        self.on_master_updated(master.content_time(), follower, master)
    }

    /// Master failure or follower end of stream
    pub fn on_presentation_failure(&mut self) -> Option<SyncEvent> {
        self.reporter
            .report_failure(SyncErrorKind::PresentationFailure)
    }

    /// Core evaluation against a follower-timeline target
    ///
    /// `None` or NaN targets are not syncable.
    #[instrument(level = "trace", name = "reconcile", skip(self, follower, master))]
    pub fn reconcile(
        &mut self,
        target_time: Option<f64>,
        follower: &dyn FollowerMedia,
        master: &dyn MasterObserver,
    ) -> Option<SyncEvent> {
        self.stats.record_reconciliation();

        let target = match target_time {
            Some(t) if t >= 0.0 && !follower.ended() => t,
            _ => {
                debug!(?target_time, ended = follower.ended(), "target not syncable");
                self.rate.pause(follower);
                return self.reporter.report_failure(SyncErrorKind::SyncFailed);
            }
        };

        let current = follower.current_time();
        let correction = self.corrector.evaluate(target, current);
        debug!(
            target_time = target,
            current,
            drift = correction.drift(),
            tolerance = self.corrector.tolerance().as_secs(),
            "drift evaluated"
        );
        metrics::histogram!("media_sync_drift_seconds").record(correction.drift().abs());

        if let Correction::Seek { target, drift } = correction {
            info!(target_time = target, drift, "synchronised follower with master");
            metrics::counter!("media_sync_seeks_total").increment(1);
            follower.set_current_time(target);
        }
        self.stats
            .record_drift(correction.drift(), correction.is_seek());

        let event = self.reporter.report_achievable();
        let action = self.rate.apply(follower, master.speed_multiplier());
        debug!(?action, "rate applied");
        event
    }
}
