//! Scripted master/follower scenario.
//!
//! Step-driven and clock-free: the caller decides how fast to step, so the same
//! script runs in real time under the CLI and instantly under tests.

use std::sync::Arc;

use contracts::{CorrelationTimestamp, ReadyState, ScriptedEvent, SimulationConfig};
use tracing::{debug, info};

use crate::{MockFollower, MockMaster};

/// What happened during one step that the caller must act on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    /// Scenario offset after the step (milliseconds)
    pub elapsed_ms: u64,
    /// Whether the master published a position update
    pub master_updated: bool,
    /// Correlation replacements scheduled in this step
    pub recalibrations: Vec<CorrelationTimestamp>,
    /// Scripted events started in this step
    pub started: Vec<&'static str>,
}

#[derive(Debug, Default, Clone, Copy)]
struct EventProgress {
    started: bool,
    stopped: bool,
}

/// Drives a `MockMaster` / `MockFollower` pair through a script
pub struct Scenario {
    config: SimulationConfig,
    master: Arc<MockMaster>,
    follower: Arc<MockFollower>,
    elapsed_ms: u64,
    last_update_ms: Option<u64>,
    progress: Vec<EventProgress>,
}

impl Scenario {
    pub fn new(config: SimulationConfig) -> Self {
        let master = Arc::new(MockMaster::new(config.master_start, config.master_speed));
        let follower = Arc::new(
            MockFollower::new(config.follower_start)
                .with_skew(config.follower_skew)
                .with_duration(config.follower_duration),
        );
        let progress = vec![EventProgress::default(); config.events.len()];

        Self {
            config,
            master,
            follower,
            elapsed_ms: 0,
            last_update_ms: None,
            progress,
        }
    }

    pub fn master(&self) -> Arc<MockMaster> {
        Arc::clone(&self.master)
    }

    pub fn follower(&self) -> Arc<MockFollower> {
        Arc::clone(&self.follower)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.config.duration_ms
    }

    /// Whether the master is inside a scripted stall at the current offset
    pub fn master_stalled(&self) -> bool {
        self.config.events.iter().any(|event| match event {
            ScriptedEvent::MasterStall { at_ms, until_ms } => {
                (*at_ms..*until_ms).contains(&self.elapsed_ms)
            }
            _ => false,
        })
    }

    /// Advance both clocks by one step, apply due events, publish if due
    pub fn step(&mut self) -> StepOutcome {
        let step_ms = self.config.step_ms.max(1);
        let dt = step_ms as f64 / 1000.0;
        self.master.advance(dt);
        self.follower.advance(dt);
        self.elapsed_ms += step_ms;

        let mut outcome = StepOutcome {
            elapsed_ms: self.elapsed_ms,
            ..Default::default()
        };

        for idx in 0..self.config.events.len() {
            let event = self.config.events[idx].clone();
            let progress = self.progress[idx];

            if !progress.started && event.at_ms() <= self.elapsed_ms {
                self.progress[idx].started = true;
                info!(event = event.name(), at_ms = event.at_ms(), "scripted event started");
                outcome.started.push(event.name());
                if let Some(correlation) = self.start_event(&event) {
                    outcome.recalibrations.push(correlation);
                }
            }

            if let Some(until_ms) = event.until_ms() {
                if self.progress[idx].started && !progress.stopped && until_ms <= self.elapsed_ms
                {
                    self.progress[idx].stopped = true;
                    debug!(event = event.name(), until_ms, "scripted event stopped");
                    self.stop_event(&event);
                }
            }
        }

        let update_due = self
            .last_update_ms
            .map_or(true, |last| self.elapsed_ms - last >= self.config.update_every_ms);
        if update_due && !self.master_stalled() {
            self.master.emit_update();
            self.last_update_ms = Some(self.elapsed_ms);
            outcome.master_updated = true;
        }

        outcome
    }

    fn start_event(&self, event: &ScriptedEvent) -> Option<CorrelationTimestamp> {
        match event {
            ScriptedEvent::MasterStall { .. } => {}
            ScriptedEvent::MasterUnknown { .. } => self.master.set_unknown(),
            ScriptedEvent::SpeedChange { speed, .. } => self.master.set_speed_multiplier(*speed),
            ScriptedEvent::MasterFailure { .. } => self.master.emit_failure(),
            ScriptedEvent::BufferStarvation { .. } => {
                self.follower.set_ready_state(ReadyState::HaveCurrentData)
            }
            ScriptedEvent::FollowerEnd { .. } => self.follower.finish(),
            ScriptedEvent::Recalibrate {
                master_time,
                other_time,
                ..
            } => return Some(CorrelationTimestamp::new(*master_time, *other_time)),
        }
        None
    }

    fn stop_event(&self, event: &ScriptedEvent) {
        match event {
            ScriptedEvent::MasterUnknown { .. } => self.master.set_known(),
            ScriptedEvent::BufferStarvation { .. } => {
                self.follower.set_ready_state(ReadyState::HaveEnoughData)
            }
            _ => {}
        }
    }
}
