//! # Sync Engine
//!
//! Media timeline synchronization engine.
//!
//! Keeps a locally rendered follower phase-locked to an observed master timeline:
//! - Correlation-based master → follower time mapping
//! - Tolerance-based hard correction (seek)
//! - Speed multiplier propagation (pause / play / rate)
//! - Event-driven and polled re-evaluation
//! - Transient failure reporting with automatic recovery
//!
//! ## Usage
//!
//! ```ignore
//! use sync_engine::{CorrelationTimestamp, SyncEngine, SyncEventKind, Tolerance};
//!
//! let engine = SyncEngine::create(
//!     follower,
//!     CorrelationTimestamp::new(1000.0, 500.0),
//!     Tolerance::from_millis(50.0),
//!     master,
//! );
//! engine.add_event_listener(SyncEventKind::SyncNowAchievable, |_| println!("in sync"));
//! ```

mod correlation;
mod drift;
mod engine;
mod listeners;
mod rate;
mod reconcile;
mod reporter;
mod stats;
mod watchdog;

pub use correlation::CorrelationTransform;
pub use drift::{Correction, DriftCorrector};
pub use engine::SyncEngine;
pub use listeners::{ListenerRegistry, SyncEventHandler};
pub use rate::{RateAction, RateController};
pub use reconcile::Reconciler;
pub use reporter::FailureReporter;
pub use stats::SyncStats;
pub use watchdog::{SyncWatchdog, Trigger};

// Re-export contracts types
pub use contracts::{
    CorrelationTimestamp, FollowerMedia, ListenerId, MasterObserver, ReadyState,
    SyncEngineConfig, SyncErrorKind, SyncEvent, SyncEventKind, Tolerance,
};
