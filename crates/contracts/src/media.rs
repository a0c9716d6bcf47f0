//! Collaborator contracts - master timeline observer and follower media
//!
//! Both collaborators are owned by the caller. The engine only observes and
//! mutates them through these narrow traits and never assumes exclusive
//! ownership: other code may read or write the follower at the same time.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Follower readiness level
///
/// Monotonic scale; a value below the configured threshold means there is
/// not enough buffered data to render immediately.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    /// Ordinal value on the readiness scale
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::HaveNothing),
            1 => Some(Self::HaveMetadata),
            2 => Some(Self::HaveCurrentData),
            3 => Some(Self::HaveFutureData),
            4 => Some(Self::HaveEnoughData),
            _ => None,
        }
    }
}

/// Identity of a subscription held on a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Event published by a master observer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MasterEvent {
    /// Master position updated; `None` when the position is unknown
    MediaUpdated { content_time: Option<f64> },
    /// Master reported its own sync loss
    Failure,
}

/// Master event callback type
pub type MasterCallback = Arc<dyn Fn(MasterEvent) + Send + Sync>;

/// Follower "playback ended" callback type
pub type EndedCallback = Arc<dyn Fn() + Send + Sync>;

/// Observer of the master timeline
///
/// # Example
///
/// ```ignore
/// let id = master.subscribe(Arc::new(|event| match event {
///     MasterEvent::MediaUpdated { content_time } => println!("master at {content_time:?}"),
///     MasterEvent::Failure => println!("master failed"),
/// }));
/// // ...
/// master.unsubscribe(id);
/// ```
pub trait MasterObserver: Send + Sync {
    /// Current master-timeline position (seconds), `None` when unknown
    fn content_time(&self) -> Option<f64>;

    /// Master playback speed: 0 = stopped, > 0 = playback rate
    fn speed_multiplier(&self) -> f64;

    /// Register a callback for position updates and failures
    fn subscribe(&self, callback: MasterCallback) -> SubscriptionId;

    /// Remove a callback; unknown ids are ignored
    fn unsubscribe(&self, id: SubscriptionId);
}

/// The locally rendered media being kept in step with the master
pub trait FollowerMedia: Send + Sync {
    /// Current follower position (seconds)
    fn current_time(&self) -> f64;

    /// Force a seek to `time`
    fn set_current_time(&self, time: f64);

    fn is_paused(&self) -> bool;

    fn play(&self);

    fn pause(&self);

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&self, rate: f64);

    /// Whether playback reached the natural end of the stream
    fn ended(&self) -> bool;

    fn ready_state(&self) -> ReadyState;

    /// Register a callback for the "ended" event
    fn on_ended(&self, callback: EndedCallback) -> SubscriptionId;

    /// Remove an "ended" callback; unknown ids are ignored
    fn remove_ended_listener(&self, id: SubscriptionId);
}
