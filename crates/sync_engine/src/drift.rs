//! Tolerance-based drift correction.
//!
//! Corrections are binary: either the follower is snapped to the target or it
//! is left alone. Nothing is nudged proportionally.

use contracts::Tolerance;

/// Outcome of a drift check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Drift within tolerance
    None { drift: f64 },
    /// Seek the follower to `target`
    Seek { target: f64, drift: f64 },
}

impl Correction {
    /// Signed drift (target - current), seconds
    pub fn drift(&self) -> f64 {
        match self {
            Correction::None { drift } | Correction::Seek { drift, .. } => *drift,
        }
    }

    pub fn is_seek(&self) -> bool {
        matches!(self, Correction::Seek { .. })
    }
}

/// Decides whether a hard correction is needed
#[derive(Debug, Clone, Copy)]
pub struct DriftCorrector {
    tolerance: Tolerance,
}

impl DriftCorrector {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Compare the follower's actual position with where it should be
    ///
    /// Drift exactly equal to the tolerance does not trigger a seek.
    pub fn evaluate(&self, target: f64, current: f64) -> Correction {
        let drift = target - current;
        if drift.abs() > self.tolerance.as_secs() {
            Correction::Seek { target, drift }
        } else {
            Correction::None { drift }
        }
    }
}
