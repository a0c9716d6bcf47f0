//! Timeline correlation and engine-emitted events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pair of same-instant readings on the master and follower timelines
///
/// Immutable; recalibration replaces the whole pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationTimestamp {
    /// Reading on the master timeline (seconds)
    pub master_time: f64,
    /// Reading on the follower ("other") timeline at the same instant (seconds)
    pub other_time: f64,
}

impl CorrelationTimestamp {
    pub fn new(master_time: f64, other_time: f64) -> Self {
        Self {
            master_time,
            other_time,
        }
    }

    /// Additive offset from the master timeline to the follower timeline
    #[inline]
    pub fn offset(&self) -> f64 {
        self.other_time - self.master_time
    }
}

/// Maximum acceptable drift before a hard correction, in seconds
///
/// Always finite and non-negative: the infallible constructors map NaN,
/// infinite or negative input to zero (correct on any drift). Use
/// [`Tolerance::try_from_millis`] to reject such input instead.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Tolerance(f64);

impl From<f64> for Tolerance {
    fn from(secs: f64) -> Self {
        Self::from_secs(secs)
    }
}

impl From<Tolerance> for f64 {
    fn from(tolerance: Tolerance) -> Self {
        tolerance.0
    }
}

impl Tolerance {
    pub fn from_secs(secs: f64) -> Self {
        if secs.is_finite() && secs >= 0.0 {
            Self(secs)
        } else {
            Self(0.0)
        }
    }

    pub fn from_millis(ms: f64) -> Self {
        Self::from_secs(ms / 1000.0)
    }

    /// Checked constructor; `Err` carries the offending value
    pub fn try_from_millis(ms: f64) -> Result<Self, f64> {
        if ms.is_finite() && ms >= 0.0 {
            Ok(Self(ms / 1000.0))
        } else {
            Err(ms)
        }
    }

    #[inline]
    pub fn as_secs(&self) -> f64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 * 1000.0
    }
}

/// Transient error kinds reported through `SyncEvent::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncErrorKind {
    /// Follower lacks enough buffered data to evaluate a correction
    InsufficientBuffer,
    /// Master or follower reported a presentation problem (e.g. stream ended)
    PresentationFailure,
    /// Reconciliation computed a non-actionable target
    SyncFailed,
}

impl SyncErrorKind {
    /// Broadcast media sync error code
    pub fn code(&self) -> u16 {
        match self {
            SyncErrorKind::InsufficientBuffer => 1,
            SyncErrorKind::PresentationFailure => 2,
            SyncErrorKind::SyncFailed => 11,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorKind::InsufficientBuffer => "INSUFFICIENT_BUFFER",
            SyncErrorKind::PresentationFailure => "PRESENTATION_FAILURE",
            SyncErrorKind::SyncFailed => "SYNC_FAILED",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted by a sync engine to its listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncEvent {
    /// Synchronization became achievable again
    SyncNowAchievable,
    /// Transient failure, carries the error kind
    Error(SyncErrorKind),
}

impl SyncEvent {
    pub fn kind(&self) -> SyncEventKind {
        match self {
            SyncEvent::SyncNowAchievable => SyncEventKind::SyncNowAchievable,
            SyncEvent::Error(_) => SyncEventKind::Error,
        }
    }
}

/// Event kinds a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncEventKind {
    SyncNowAchievable,
    Error,
}

impl SyncEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEventKind::SyncNowAchievable => "SyncNowAchievable",
            SyncEventKind::Error => "Error",
        }
    }
}

/// Opaque identity of a registered engine listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);
