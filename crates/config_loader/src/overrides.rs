//! Field overrides layered on top of a loaded file
//!
//! Engine and simulation settings a session may change without editing the
//! file. Validation runs after the overrides, never before them alone.

use contracts::MediaSyncConfig;

/// Optional replacements for selected config fields; `None` keeps the file value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    /// `engine.tolerance_ms`
    pub tolerance_ms: Option<f64>,
    /// `engine.poll_interval_ms`
    pub poll_interval_ms: Option<u64>,
    /// `simulation.duration_ms`
    pub duration_ms: Option<u64>,
    /// `simulation.follower_skew`
    pub follower_skew: Option<f64>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write every set field into `config`; returns the dotted paths changed
    pub fn apply(&self, config: &mut MediaSyncConfig) -> Vec<&'static str> {
        let mut applied = Vec::new();

        if let Some(tolerance_ms) = self.tolerance_ms {
            config.engine.tolerance_ms = tolerance_ms;
            applied.push("engine.tolerance_ms");
        }
        if let Some(poll_interval_ms) = self.poll_interval_ms {
            config.engine.poll_interval_ms = poll_interval_ms;
            applied.push("engine.poll_interval_ms");
        }
        if let Some(duration_ms) = self.duration_ms {
            config.simulation.duration_ms = duration_ms;
            applied.push("simulation.duration_ms");
        }
        if let Some(follower_skew) = self.follower_skew {
            config.simulation.follower_skew = follower_skew;
            applied.push("simulation.follower_skew");
        }

        applied
    }
}
