//! Propagates the master's speed multiplier to the follower.

use contracts::FollowerMedia;

/// Play-state change applied to the follower
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateAction {
    /// Nothing to change
    Unchanged,
    /// Follower was playing and got paused
    Paused,
    /// Follower rate set; `resumed` when it was paused before
    Playing { rate: f64, resumed: bool },
}

/// Applies play/pause and playback rate
#[derive(Debug, Clone, Copy, Default)]
pub struct RateController;

impl RateController {
    pub fn new() -> Self {
        Self
    }

    /// Speed 0 pauses; anything else resumes play and sets the rate
    pub fn apply(&self, follower: &dyn FollowerMedia, speed_multiplier: f64) -> RateAction {
        if speed_multiplier == 0.0 {
            return self.pause(follower);
        }

        let resumed = follower.is_paused();
        if resumed {
            follower.play();
        }
        follower.set_playback_rate(speed_multiplier);
        RateAction::Playing {
            rate: speed_multiplier,
            resumed,
        }
    }

    /// Pause the follower if it is playing
    pub fn pause(&self, follower: &dyn FollowerMedia) -> RateAction {
        if follower.is_paused() {
            RateAction::Unchanged
        } else {
            follower.pause();
            RateAction::Paused
        }
    }
}
