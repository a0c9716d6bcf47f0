//! # Contracts
//!
//! Frozen interface contracts for the media timeline synchronization engine.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Master and follower positions are seconds (f64) on their own timelines
//! - A `CorrelationTimestamp` ties the two timelines together with an additive offset
//! - Configuration expresses durations in milliseconds

mod config;
mod error;
mod media;
mod sync;
mod sync_engine_config;

pub use config::*;
pub use error::*;
pub use media::*;
pub use sync::*;
pub use sync_engine_config::*;
