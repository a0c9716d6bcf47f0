//! MediaSyncConfig - Config Loader output
//!
//! Describes a complete sync session: engine settings, initial correlation and
//! the simulated master/follower scenario driven by the CLI.

use serde::{Deserialize, Serialize};

use crate::{CorrelationTimestamp, SyncEngineConfig};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete sync session configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaSyncConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Engine settings
    #[serde(default)]
    pub engine: SyncEngineConfig,

    /// Initial correlation between master and follower timelines
    #[serde(default)]
    pub correlation: CorrelationTimestamp,

    /// Simulated scenario
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Simulated master/follower scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Master content time at start (seconds)
    #[serde(default)]
    pub master_start: f64,

    /// Master speed multiplier at start
    #[serde(default = "default_speed")]
    pub master_speed: f64,

    /// Follower position at start (seconds)
    #[serde(default)]
    pub follower_start: f64,

    /// Follower clock skew; 1.0 runs exactly at its playback rate
    #[serde(default = "default_speed")]
    pub follower_skew: f64,

    /// Follower media duration (seconds); `None` never ends on its own
    #[serde(default)]
    pub follower_duration: Option<f64>,

    /// Simulation step (milliseconds)
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,

    /// Interval between master position updates (milliseconds)
    #[serde(default = "default_update_every_ms")]
    pub update_every_ms: u64,

    /// Total scenario length (milliseconds)
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    /// Scripted events, applied at their scenario offsets
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

fn default_speed() -> f64 {
    1.0
}

fn default_step_ms() -> u64 {
    50
}

fn default_update_every_ms() -> u64 {
    250
}

fn default_duration_ms() -> u64 {
    10_000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            master_start: 0.0,
            master_speed: default_speed(),
            follower_start: 0.0,
            follower_skew: default_speed(),
            follower_duration: None,
            step_ms: default_step_ms(),
            update_every_ms: default_update_every_ms(),
            duration_ms: default_duration_ms(),
            events: Vec::new(),
        }
    }
}

/// Scripted scenario event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptedEvent {
    /// Master keeps advancing but stops publishing position updates
    MasterStall { at_ms: u64, until_ms: u64 },
    /// Master position becomes unknown
    MasterUnknown { at_ms: u64, until_ms: u64 },
    /// Master speed multiplier changes
    SpeedChange { at_ms: u64, speed: f64 },
    /// Master reports a failure
    MasterFailure { at_ms: u64 },
    /// Follower readiness drops below the buffered-data threshold
    BufferStarvation { at_ms: u64, until_ms: u64 },
    /// Follower reaches end of stream
    FollowerEnd { at_ms: u64 },
    /// Correlation is replaced
    Recalibrate {
        at_ms: u64,
        master_time: f64,
        other_time: f64,
    },
}

impl ScriptedEvent {
    /// Scenario offset at which the event starts
    pub fn at_ms(&self) -> u64 {
        match self {
            ScriptedEvent::MasterStall { at_ms, .. }
            | ScriptedEvent::MasterUnknown { at_ms, .. }
            | ScriptedEvent::SpeedChange { at_ms, .. }
            | ScriptedEvent::MasterFailure { at_ms }
            | ScriptedEvent::BufferStarvation { at_ms, .. }
            | ScriptedEvent::FollowerEnd { at_ms }
            | ScriptedEvent::Recalibrate { at_ms, .. } => *at_ms,
        }
    }

    /// Scenario offset at which a windowed event stops
    pub fn until_ms(&self) -> Option<u64> {
        match self {
            ScriptedEvent::MasterStall { until_ms, .. }
            | ScriptedEvent::MasterUnknown { until_ms, .. }
            | ScriptedEvent::BufferStarvation { until_ms, .. } => Some(*until_ms),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScriptedEvent::MasterStall { .. } => "master_stall",
            ScriptedEvent::MasterUnknown { .. } => "master_unknown",
            ScriptedEvent::SpeedChange { .. } => "speed_change",
            ScriptedEvent::MasterFailure { .. } => "master_failure",
            ScriptedEvent::BufferStarvation { .. } => "buffer_starvation",
            ScriptedEvent::FollowerEnd { .. } => "follower_end",
            ScriptedEvent::Recalibrate { .. } => "recalibrate",
        }
    }
}
