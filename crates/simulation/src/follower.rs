//! Mock follower media
//!
//! Implements `FollowerMedia`. Starts paused at rate 1.0 with enough buffered
//! data, like a freshly loaded media element.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{EndedCallback, FollowerMedia, ReadyState, SubscriptionId};
use tracing::{debug, trace};

#[derive(Debug)]
struct FollowerState {
    position: f64,
    paused: bool,
    rate: f64,
    ended: bool,
    ready_state: ReadyState,
    seeks: Vec<f64>,
    play_calls: u64,
    pause_calls: u64,
}

/// Follower with a hand-driven clock
pub struct MockFollower {
    state: Mutex<FollowerState>,
    ended_listeners: Mutex<Vec<(SubscriptionId, EndedCallback)>>,
    next_id: AtomicU64,
    remove_ended_calls: AtomicU64,
    /// Clock skew relative to the nominal playback rate
    skew: f64,
    /// Media duration; reaching it ends playback
    duration: Option<f64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockFollower {
    /// Paused follower at `position`
    pub fn new(position: f64) -> Self {
        Self {
            state: Mutex::new(FollowerState {
                position,
                paused: true,
                rate: 1.0,
                ended: false,
                ready_state: ReadyState::HaveEnoughData,
                seeks: Vec::new(),
                play_calls: 0,
                pause_calls: 0,
            }),
            ended_listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            remove_ended_calls: AtomicU64::new(0),
            skew: 1.0,
            duration: None,
        }
    }

    /// Playing follower at `position`
    pub fn playing(position: f64) -> Self {
        let follower = Self::new(position);
        lock(&follower.state).paused = false;
        follower
    }

    pub fn with_skew(mut self, skew: f64) -> Self {
        self.skew = skew;
        self
    }

    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }

    /// Move the follower clock forward by `dt` wall seconds while playing
    pub fn advance(&self, dt: f64) {
        let reached_end = {
            let mut state = lock(&self.state);
            if state.paused || state.ended {
                return;
            }
            state.position += dt * state.rate * self.skew;
            match self.duration {
                Some(duration) if state.position >= duration => {
                    state.position = duration;
                    true
                }
                _ => false,
            }
        };

        if reached_end {
            self.finish();
        }
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        lock(&self.state).ready_state = ready_state;
    }

    /// Set the ended flag without notifying listeners
    pub fn set_ended(&self, ended: bool) {
        lock(&self.state).ended = ended;
    }

    /// Reach end of stream and notify "ended" listeners
    pub fn finish(&self) {
        lock(&self.state).ended = true;
        debug!("follower reached end of stream");

        let callbacks: Vec<EndedCallback> = lock(&self.ended_listeners)
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Every position forced through `set_current_time`, in order
    pub fn seeks(&self) -> Vec<f64> {
        lock(&self.state).seeks.clone()
    }

    pub fn play_calls(&self) -> u64 {
        lock(&self.state).play_calls
    }

    pub fn pause_calls(&self) -> u64 {
        lock(&self.state).pause_calls
    }

    pub fn ended_listener_count(&self) -> usize {
        lock(&self.ended_listeners).len()
    }

    /// Number of `remove_ended_listener` calls received
    pub fn remove_ended_calls(&self) -> u64 {
        self.remove_ended_calls.load(Ordering::SeqCst)
    }
}

impl FollowerMedia for MockFollower {
    fn current_time(&self) -> f64 {
        lock(&self.state).position
    }

    fn set_current_time(&self, time: f64) {
        let mut state = lock(&self.state);
        trace!(from = state.position, to = time, "follower seek");
        state.position = time;
        state.seeks.push(time);
        if let Some(duration) = self.duration {
            if time < duration {
                state.ended = false;
            }
        }
    }

    fn is_paused(&self) -> bool {
        lock(&self.state).paused
    }

    fn play(&self) {
        let mut state = lock(&self.state);
        state.paused = false;
        state.play_calls += 1;
    }

    fn pause(&self) {
        let mut state = lock(&self.state);
        state.paused = true;
        state.pause_calls += 1;
    }

    fn playback_rate(&self) -> f64 {
        lock(&self.state).rate
    }

    fn set_playback_rate(&self, rate: f64) {
        lock(&self.state).rate = rate;
    }

    fn ended(&self) -> bool {
        lock(&self.state).ended
    }

    fn ready_state(&self) -> ReadyState {
        lock(&self.state).ready_state
    }

    fn on_ended(&self, callback: EndedCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.ended_listeners).push((id, callback));
        id
    }

    fn remove_ended_listener(&self, id: SubscriptionId) {
        self.remove_ended_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.ended_listeners).retain(|(existing, _)| *existing != id);
    }
}
