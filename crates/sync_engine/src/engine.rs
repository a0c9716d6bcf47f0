//! Composition root: subscriptions, worker task and public contract.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    CorrelationTimestamp, FollowerMedia, ListenerId, MasterEvent, MasterObserver,
    SubscriptionId, SyncEngineConfig, SyncEvent, SyncEventKind, Tolerance,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::listeners::ListenerRegistry;
use crate::reconcile::Reconciler;
use crate::stats::SyncStats;
use crate::watchdog::{SyncWatchdog, Trigger};

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(0);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State visible to both the handle and the worker
struct Shared {
    /// Process-unique id, used as the `engine` metric label
    id: u64,
    correlation: Mutex<CorrelationTimestamp>,
    listeners: Mutex<ListenerRegistry>,
    destroyed: AtomicBool,
    synchronised: AtomicBool,
    stats: Mutex<SyncStats>,
}

impl Shared {
    fn new(correlation: CorrelationTimestamp) -> Self {
        Self {
            id: NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed),
            correlation: Mutex::new(correlation),
            listeners: Mutex::new(ListenerRegistry::new()),
            destroyed: AtomicBool::new(false),
            synchronised: AtomicBool::new(true),
            stats: Mutex::new(SyncStats::default()),
        }
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn publish_state(&self, reconciler: &Reconciler) {
        let synchronised = reconciler.can_sync_with_master();
        if self.synchronised.swap(synchronised, Ordering::SeqCst) != synchronised {
            self.record_synchronised(synchronised);
        }
        *lock(&self.stats) = reconciler.stats();
    }

    fn record_synchronised(&self, synchronised: bool) {
        metrics::gauge!("media_sync_synchronised", "engine" => self.id.to_string())
            .set(if synchronised { 1.0 } else { 0.0 });
    }

    /// Handlers run outside every internal lock
    fn dispatch(&self, event: &SyncEvent) {
        let handlers = lock(&self.listeners).handlers_for(event.kind());
        for handler in handlers {
            if self.is_destroyed() {
                return;
            }
            handler(event);
        }
    }
}

struct Subscriptions {
    master: SubscriptionId,
    follower_ended: SubscriptionId,
}

/// Keeps one follower phase-locked to one master timeline
///
/// Must be created within a tokio runtime. All reconciliation runs on a
/// single worker task fed by one channel, so passes never interleave.
/// Dropping the engine destroys it.
///
/// # Example
///
/// ```ignore
/// let engine = SyncEngine::create(
///     follower,
///     CorrelationTimestamp::new(1000.0, 500.0),
///     Tolerance::from_millis(50.0),
///     master,
/// );
/// engine.add_event_listener(SyncEventKind::Error, |event| eprintln!("{event:?}"));
/// // ...
/// engine.destroy();
/// ```
pub struct SyncEngine {
    config: SyncEngineConfig,
    shared: Arc<Shared>,
    triggers: mpsc::UnboundedSender<Trigger>,
    master: Arc<dyn MasterObserver>,
    follower: Arc<dyn FollowerMedia>,
    subscriptions: Mutex<Option<Subscriptions>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("id", &self.id())
            .field("config", &self.config)
            .field("correlation", &self.get_correlation())
            .field("can_sync_with_master", &self.can_sync_with_master())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl SyncEngine {
    /// Create an engine with the default watchdog interval and readiness threshold
    pub fn create(
        follower: Arc<dyn FollowerMedia>,
        correlation: CorrelationTimestamp,
        tolerance: Tolerance,
        master: Arc<dyn MasterObserver>,
    ) -> Self {
        Self::with_config(
            follower,
            correlation,
            SyncEngineConfig::with_tolerance(tolerance),
            master,
        )
    }

    /// Create an engine from a full configuration
    #[instrument(name = "sync_engine_create", skip_all, fields(tolerance_ms = config.tolerance_ms))]
    pub fn with_config(
        follower: Arc<dyn FollowerMedia>,
        correlation: CorrelationTimestamp,
        config: SyncEngineConfig,
        master: Arc<dyn MasterObserver>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new(correlation));

        let master_tx = tx.clone();
        let master_subscription = master.subscribe(Arc::new(move |event| {
            let trigger = match event {
                MasterEvent::MediaUpdated { content_time } => {
                    Trigger::MasterUpdated { content_time }
                }
                MasterEvent::Failure => Trigger::MasterFailure,
            };
            let _ = master_tx.send(trigger);
        }));

        let ended_tx = tx.clone();
        let ended_subscription = follower.on_ended(Arc::new(move || {
            let _ = ended_tx.send(Trigger::FollowerEnded);
        }));

        let watchdog = SyncWatchdog::new(rx, config.poll_interval());
        let reconciler = Reconciler::new(correlation, &config);
        let worker = tokio::spawn(sync_worker(
            reconciler,
            watchdog,
            Arc::clone(&shared),
            Arc::clone(&follower),
            Arc::clone(&master),
        ));

        info!(
            engine = shared.id,
            master_time = correlation.master_time,
            other_time = correlation.other_time,
            poll_interval_ms = config.poll_interval_ms,
            "sync engine created"
        );
        shared.record_synchronised(true);

        Self {
            config,
            shared,
            triggers: tx,
            master,
            follower,
            subscriptions: Mutex::new(Some(Subscriptions {
                master: master_subscription,
                follower_ended: ended_subscription,
            })),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Replace the correlation and re-evaluate right away
    ///
    /// The store and the enqueue happen under one lock, so concurrent callers
    /// reach the worker in the same order they overwrite the stored value.
    pub fn set_correlation(&self, correlation: CorrelationTimestamp) {
        let mut current = lock(&self.shared.correlation);
        *current = correlation;
        if !self.is_destroyed() {
            let _ = self.triggers.send(Trigger::Recalibrated(correlation));
        }
    }

    pub fn get_correlation(&self) -> CorrelationTimestamp {
        *lock(&self.shared.correlation)
    }

    /// Subscribe to engine events of `kind`
    ///
    /// Handlers run on the engine worker in registration order.
    pub fn add_event_listener<F>(&self, kind: SyncEventKind, handler: F) -> ListenerId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let mut listeners = lock(&self.shared.listeners);
        let id = listeners.add(kind, Arc::new(handler));
        if self.is_destroyed() {
            listeners.remove(kind, id);
        }
        id
    }

    /// Unsubscribe; unknown kind/id pairs are a no-op
    pub fn remove_event_listener(&self, kind: SyncEventKind, id: ListenerId) -> bool {
        lock(&self.shared.listeners).remove(kind, id)
    }

    /// Release subscriptions and the watchdog
    ///
    /// Idempotent and safe to call from an event handler of this engine.
    #[instrument(name = "sync_engine_destroy", skip(self))]
    pub fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(subscriptions) = lock(&self.subscriptions).take() {
            self.master.unsubscribe(subscriptions.master);
            self.follower
                .remove_ended_listener(subscriptions.follower_ended);
        }
        lock(&self.shared.listeners).clear();
        let _ = self.triggers.send(Trigger::Shutdown);

        info!("sync engine destroyed");
    }

    /// Wait for the worker task to finish; returns immediately if already joined
    pub async fn join(&self) {
        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = ?e, "sync engine worker panicked");
            }
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.is_destroyed()
    }

    /// Process-unique engine id; labels this engine's metrics
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Outcome of the most recent reconciliation pass
    pub fn can_sync_with_master(&self) -> bool {
        self.shared.synchronised.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SyncStats {
        lock(&self.shared.stats).clone()
    }

    pub fn tolerance(&self) -> Tolerance {
        self.config.tolerance()
    }

    pub fn config(&self) -> &SyncEngineConfig {
        &self.config
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Single consumer of every trigger
#[instrument(name = "sync_engine_worker", skip_all)]
async fn sync_worker(
    mut reconciler: Reconciler,
    mut watchdog: SyncWatchdog,
    shared: Arc<Shared>,
    follower: Arc<dyn FollowerMedia>,
    master: Arc<dyn MasterObserver>,
) {
    let period_ms = watchdog.period().as_millis() as u64;
    debug!(period_ms, "sync worker started");

    while let Some(trigger) = watchdog.next().await {
        if shared.is_destroyed() || matches!(trigger, Trigger::Shutdown) {
            break;
        }

        let event = reconciler.handle(trigger, follower.as_ref(), master.as_ref());
        shared.publish_state(&reconciler);
        if let Some(event) = event {
            shared.dispatch(&event);
        }
    }

    debug!("sync worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ReadyState, SyncErrorKind};
    use simulation::{MockFollower, MockMaster};
    use std::sync::OnceLock;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn config(tolerance_s: f64, poll_ms: u64) -> SyncEngineConfig {
        SyncEngineConfig {
            poll_interval_ms: poll_ms,
            ..SyncEngineConfig::with_tolerance(Tolerance::from_secs(tolerance_s))
        }
    }

    fn collect_events(engine: &SyncEngine) -> mpsc::UnboundedReceiver<SyncEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let error_tx = tx.clone();
        engine.add_event_listener(SyncEventKind::Error, move |event| {
            let _ = error_tx.send(*event);
        });
        engine.add_event_listener(SyncEventKind::SyncNowAchievable, move |event| {
            let _ = tx.send(*event);
        });
        rx
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> SyncEvent {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    async fn assert_no_event(rx: &mut mpsc::UnboundedReceiver<SyncEvent>, wait_ms: u64) {
        let result = timeout(Duration::from_millis(wait_ms), rx.recv()).await;
        assert!(
            !matches!(result, Ok(Some(_))),
            "unexpected event: {result:?}"
        );
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        timeout(Duration::from_secs(2), async {
            while !condition() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn test_create_subscribes_and_starts_synchronised() {
        let master = Arc::new(MockMaster::new(0.0, 1.0));
        let follower = Arc::new(MockFollower::playing(0.0));

        let engine = SyncEngine::create(
            follower.clone(),
            CorrelationTimestamp::default(),
            Tolerance::from_millis(50.0),
            master.clone(),
        );

        assert!(engine.can_sync_with_master());
        assert_eq!(master.subscriber_count(), 1);
        assert_eq!(follower.ended_listener_count(), 1);
        assert_eq!(engine.config().poll_interval_ms, 2000);
    }

    #[tokio::test]
    async fn test_master_update_seeks_with_correlation() {
        let master = Arc::new(MockMaster::new(2000.0, 1.0));
        let follower = Arc::new(MockFollower::playing(0.0));
        let engine = SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::new(1000.0, 500.0),
            config(0.05, 60_000),
            master.clone(),
        );

        master.emit_update();

        wait_until(|| engine.stats().reconciliations == 1).await;
        assert_eq!(follower.current_time(), 1500.0);
        assert_eq!(engine.stats().seeks, 1);
    }

    #[tokio::test]
    async fn test_single_emission_across_repeated_starvation() {
        let master = Arc::new(MockMaster::new(1.0, 1.0));
        let follower = Arc::new(MockFollower::playing(1.0));
        follower.set_ready_state(ReadyState::HaveMetadata);
        let engine = SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::default(),
            config(0.05, 60_000),
            master.clone(),
        );
        let mut events = collect_events(&engine);

        master.emit_update();
        master.emit_update();

        assert_eq!(
            next_event(&mut events).await,
            SyncEvent::Error(SyncErrorKind::InsufficientBuffer)
        );
        assert_no_event(&mut events, 100).await;
        assert!(!engine.can_sync_with_master());

        follower.set_ready_state(ReadyState::HaveEnoughData);
        master.emit_update();

        assert_eq!(next_event(&mut events).await, SyncEvent::SyncNowAchievable);
        assert_no_event(&mut events, 100).await;
        assert!(engine.can_sync_with_master());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent_and_silences_triggers() {
        let master = Arc::new(MockMaster::new(1.0, 1.0));
        let follower = Arc::new(MockFollower::playing(1.0));
        let engine = SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::default(),
            config(0.05, 20),
            master.clone(),
        );
        let mut events = collect_events(&engine);

        engine.destroy();
        engine.destroy();
        engine.join().await;

        assert!(engine.is_destroyed());
        assert_eq!(master.subscriber_count(), 0);
        assert_eq!(follower.ended_listener_count(), 0);

        master.set_unknown();
        master.emit_update();
        master.emit_failure();
        follower.finish();
        sleep(Duration::from_millis(80)).await;

        assert_no_event(&mut events, 50).await;
        assert!(!follower.is_paused());
    }

    #[tokio::test]
    async fn test_destroy_from_event_handler() {
        let master = Arc::new(MockMaster::new(1.0, 1.0));
        let follower = Arc::new(MockFollower::playing(1.0));
        let engine = Arc::new(SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::default(),
            config(0.05, 20),
            master.clone(),
        ));

        let slot: Arc<OnceLock<Arc<SyncEngine>>> = Arc::new(OnceLock::new());
        let _ = slot.set(Arc::clone(&engine));
        let handler_slot = Arc::clone(&slot);
        engine.add_event_listener(SyncEventKind::Error, move |_| {
            if let Some(engine) = handler_slot.get() {
                engine.destroy();
            }
        });
        let mut events = collect_events(&engine);

        master.emit_failure();

        wait_until(|| engine.is_destroyed()).await;
        engine.join().await;
        assert_eq!(master.subscriber_count(), 0);
        assert_no_event(&mut events, 80).await;
    }

    #[tokio::test]
    async fn test_set_correlation_reconciles_immediately() {
        let master = Arc::new(MockMaster::new(10.0, 1.0));
        let follower = Arc::new(MockFollower::playing(10.0));
        let engine = SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::default(),
            config(0.05, 60_000),
            master.clone(),
        );

        engine.set_correlation(CorrelationTimestamp::new(10.0, 3.0));

        assert_eq!(engine.get_correlation(), CorrelationTimestamp::new(10.0, 3.0));
        wait_until(|| follower.current_time() == 3.0).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_set_correlation_last_write_wins() {
        let master = Arc::new(MockMaster::new(100.0, 1.0));
        let follower = Arc::new(MockFollower::playing(0.0));
        let engine = Arc::new(SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::default(),
            config(0.05, 60_000),
            master.clone(),
        ));

        let writers = 8;
        let barrier = Arc::new(std::sync::Barrier::new(writers));
        let handles: Vec<_> = (1..=writers)
            .map(|i| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    engine.set_correlation(CorrelationTimestamp::new(0.0, i as f64 * 10.0));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        wait_until(|| engine.stats().reconciliations >= writers as u64).await;
        let stored = engine.get_correlation();
        assert_eq!(follower.current_time(), 100.0 + stored.offset());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_destroy_unsubscribes_once() {
        let master = Arc::new(MockMaster::new(0.0, 1.0));
        let follower = Arc::new(MockFollower::playing(0.0));
        let engine = Arc::new(SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::default(),
            config(0.05, 60_000),
            master.clone(),
        ));

        let callers = 8;
        let barrier = Arc::new(std::sync::Barrier::new(callers));
        let handles: Vec<_> = (0..callers)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    engine.destroy();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(engine.is_destroyed());
        assert_eq!(master.unsubscribe_calls(), 1);
        assert_eq!(follower.remove_ended_calls(), 1);
        assert_eq!(master.subscriber_count(), 0);
        assert_eq!(follower.ended_listener_count(), 0);

        engine.join().await;
        drop(engine);
        assert_eq!(master.unsubscribe_calls(), 1);
    }

    #[tokio::test]
    async fn test_engines_get_distinct_ids() {
        let master = Arc::new(MockMaster::new(0.0, 1.0));
        let first = SyncEngine::with_config(
            Arc::new(MockFollower::playing(0.0)),
            CorrelationTimestamp::default(),
            config(0.05, 60_000),
            master.clone(),
        );
        let second = SyncEngine::with_config(
            Arc::new(MockFollower::playing(0.0)),
            CorrelationTimestamp::default(),
            config(0.05, 60_000),
            master.clone(),
        );

        assert_ne!(first.id(), second.id());
        assert!(format!("{first:?}").contains(&format!("id: {}", first.id())));
    }

    #[tokio::test]
    async fn test_watchdog_converges_without_updates() {
        let master = Arc::new(MockMaster::new(105.0, 1.0));
        let follower = Arc::new(MockFollower::new(0.0));
        let engine = SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::new(100.0, 0.0),
            config(0.05, 25),
            master.clone(),
        );

        wait_until(|| (follower.current_time() - 5.0).abs() <= 0.05).await;
        assert!(!follower.is_paused());

        master.set_content_time(109.0);
        wait_until(|| (follower.current_time() - 9.0).abs() <= 0.05).await;
        assert!(engine.stats().reconciliations >= 2);
    }

    #[tokio::test]
    async fn test_watchdog_pauses_when_master_unknown() {
        let master = Arc::new(MockMaster::new(1.0, 1.0));
        let follower = Arc::new(MockFollower::playing(1.0));
        let engine = SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::default(),
            config(0.05, 25),
            master.clone(),
        );
        let mut events = collect_events(&engine);

        master.set_unknown();

        assert_eq!(
            next_event(&mut events).await,
            SyncEvent::Error(SyncErrorKind::SyncFailed)
        );
        assert!(follower.is_paused());
    }

    #[tokio::test]
    async fn test_presentation_failures() {
        let master = Arc::new(MockMaster::new(1.0, 1.0));
        let follower = Arc::new(MockFollower::playing(1.0));
        let engine = SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::default(),
            config(0.05, 60_000),
            master.clone(),
        );
        let mut events = collect_events(&engine);

        master.emit_failure();
        assert_eq!(
            next_event(&mut events).await,
            SyncEvent::Error(SyncErrorKind::PresentationFailure)
        );

        master.emit_update();
        assert_eq!(next_event(&mut events).await, SyncEvent::SyncNowAchievable);

        follower.finish();
        assert_eq!(
            next_event(&mut events).await,
            SyncEvent::Error(SyncErrorKind::PresentationFailure)
        );
    }

    #[tokio::test]
    async fn test_removed_listener_not_invoked() {
        let master = Arc::new(MockMaster::new(1.0, 1.0));
        let follower = Arc::new(MockFollower::playing(1.0));
        let engine = SyncEngine::with_config(
            follower.clone(),
            CorrelationTimestamp::default(),
            config(0.05, 60_000),
            master.clone(),
        );
        let (tx, mut removed_rx) = mpsc::unbounded_channel();
        let id = engine.add_event_listener(SyncEventKind::Error, move |event| {
            let _ = tx.send(*event);
        });
        let mut events = collect_events(&engine);

        assert!(engine.remove_event_listener(SyncEventKind::Error, id));
        assert!(!engine.remove_event_listener(SyncEventKind::Error, id));
        assert!(!engine.remove_event_listener(SyncEventKind::SyncNowAchievable, ListenerId(42)));

        master.emit_failure();
        assert_eq!(
            next_event(&mut events).await,
            SyncEvent::Error(SyncErrorKind::PresentationFailure)
        );
        assert!(removed_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drop_releases_subscriptions() {
        let master = Arc::new(MockMaster::new(1.0, 1.0));
        let follower = Arc::new(MockFollower::playing(1.0));
        {
            let _engine = SyncEngine::create(
                follower.clone(),
                CorrelationTimestamp::default(),
                Tolerance::from_millis(50.0),
                master.clone(),
            );
            assert_eq!(master.subscriber_count(), 1);
        }
        assert_eq!(master.subscriber_count(), 0);
        assert_eq!(follower.ended_listener_count(), 0);
    }

    #[tokio::test]
    async fn test_many_followers_share_one_master() {
        let master = Arc::new(MockMaster::new(4.0, 1.0));
        let first = Arc::new(MockFollower::playing(0.0));
        let second = Arc::new(MockFollower::playing(0.0));
        let engine_a = SyncEngine::with_config(
            first.clone(),
            CorrelationTimestamp::new(0.0, 1.0),
            config(0.05, 60_000),
            master.clone(),
        );
        let engine_b = SyncEngine::with_config(
            second.clone(),
            CorrelationTimestamp::new(0.0, 2.0),
            config(0.05, 60_000),
            master.clone(),
        );
        assert_eq!(master.subscriber_count(), 2);

        master.emit_update();
        wait_until(|| first.current_time() == 5.0 && second.current_time() == 6.0).await;

        engine_a.destroy();
        assert_eq!(master.subscriber_count(), 1);
        drop(engine_b);
        assert_eq!(master.subscriber_count(), 0);
    }
}
