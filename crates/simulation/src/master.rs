//! Mock master timeline
//!
//! Implements `MasterObserver`. Position advances only when told to, and
//! events are published only on `emit_update` / `emit_failure`, so a stalled
//! master is simply one nobody calls `emit_update` on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{MasterCallback, MasterEvent, MasterObserver, SubscriptionId};
use tracing::trace;

#[derive(Debug)]
struct MasterState {
    position: f64,
    known: bool,
    speed: f64,
}

/// Hand-driven master timeline
pub struct MockMaster {
    state: Mutex<MasterState>,
    subscribers: Mutex<Vec<(SubscriptionId, MasterCallback)>>,
    next_id: AtomicU64,
    unsubscribe_calls: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockMaster {
    /// Master at `position` seconds running at `speed`
    pub fn new(position: f64, speed: f64) -> Self {
        Self {
            state: Mutex::new(MasterState {
                position,
                known: true,
                speed,
            }),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            unsubscribe_calls: AtomicU64::new(0),
        }
    }

    /// Move the master clock forward by `dt` wall seconds, scaled by its speed
    pub fn advance(&self, dt: f64) {
        let mut state = lock(&self.state);
        state.position += dt * state.speed;
    }

    pub fn set_content_time(&self, position: f64) {
        let mut state = lock(&self.state);
        state.position = position;
        state.known = true;
    }

    pub fn set_speed_multiplier(&self, speed: f64) {
        lock(&self.state).speed = speed;
    }

    /// Report the position as unknown; the clock keeps running underneath
    pub fn set_unknown(&self) {
        lock(&self.state).known = false;
    }

    pub fn set_known(&self) {
        lock(&self.state).known = true;
    }

    /// Publish a position update with the current reading
    pub fn emit_update(&self) {
        let content_time = self.content_time();
        trace!(?content_time, "master position update");
        self.publish(MasterEvent::MediaUpdated { content_time });
    }

    pub fn emit_failure(&self) {
        trace!("master failure");
        self.publish(MasterEvent::Failure);
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Number of `unsubscribe` calls received, known ids or not
    pub fn unsubscribe_calls(&self) -> u64 {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    /// Callbacks run outside the subscriber lock
    fn publish(&self, event: MasterEvent) {
        let callbacks: Vec<MasterCallback> = lock(&self.subscribers)
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }
}

impl MasterObserver for MockMaster {
    fn content_time(&self) -> Option<f64> {
        let state = lock(&self.state);
        state.known.then_some(state.position)
    }

    fn speed_multiplier(&self) -> f64 {
        lock(&self.state).speed
    }

    fn subscribe(&self, callback: MasterCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.subscribers).push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.subscribers).retain(|(existing, _)| *existing != id);
    }
}
