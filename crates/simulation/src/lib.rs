//! # Simulation
//!
//! In-process master and follower implementations for testing and demos.
//!
//! - `MockMaster`: a master timeline whose position, speed and events are driven by hand
//! - `MockFollower`: a follower with a skewable clock, readiness control and seek log
//! - `Scenario`: steps a master/follower pair through a scripted `SimulationConfig`

mod follower;
mod master;
mod scenario;

pub use follower::MockFollower;
pub use master::MockMaster;
pub use scenario::{Scenario, StepOutcome};
