//! Configuration validation
//!
//! Rules:
//! - tolerance finite and >= 0
//! - poll interval > 0, drift history > 0
//! - correlation readings finite
//! - simulation speeds/skew >= 0, step/duration > 0
//! - scripted windows well-formed (at_ms <= until_ms)

use contracts::{ContractError, MediaSyncConfig, ScriptedEvent, Tolerance};

/// Validate a MediaSyncConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &MediaSyncConfig) -> Result<(), ContractError> {
    validate_engine(config)?;
    validate_correlation(config)?;
    validate_simulation(config)?;
    validate_events(config)?;
    Ok(())
}

fn validate_engine(config: &MediaSyncConfig) -> Result<(), ContractError> {
    let engine = &config.engine;

    if let Err(value) = Tolerance::try_from_millis(engine.tolerance_ms) {
        return Err(ContractError::config_validation(
            "engine.tolerance_ms",
            format!("tolerance_ms must be finite and >= 0, got {value}"),
        ));
    }

    if engine.poll_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "engine.poll_interval_ms",
            "poll_interval_ms must be > 0",
        ));
    }

    if engine.drift_history == 0 {
        return Err(ContractError::config_validation(
            "engine.drift_history",
            "drift_history must be > 0",
        ));
    }

    Ok(())
}

fn validate_correlation(config: &MediaSyncConfig) -> Result<(), ContractError> {
    let correlation = &config.correlation;
    if !correlation.master_time.is_finite() || !correlation.other_time.is_finite() {
        return Err(ContractError::config_validation(
            "correlation",
            "master_time and other_time must be finite",
        ));
    }
    Ok(())
}

fn validate_simulation(config: &MediaSyncConfig) -> Result<(), ContractError> {
    let sim = &config.simulation;

    if !sim.master_start.is_finite() || !sim.follower_start.is_finite() {
        return Err(ContractError::config_validation(
            "simulation.master_start / simulation.follower_start",
            "start positions must be finite",
        ));
    }

    for (field, value) in [
        ("simulation.master_speed", sim.master_speed),
        ("simulation.follower_skew", sim.follower_skew),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ContractError::config_validation(
                field,
                format!("must be finite and >= 0, got {value}"),
            ));
        }
    }

    if let Some(duration) = sim.follower_duration {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ContractError::config_validation(
                "simulation.follower_duration",
                format!("follower_duration must be > 0, got {duration}"),
            ));
        }
    }

    if sim.step_ms == 0 {
        return Err(ContractError::config_validation(
            "simulation.step_ms",
            "step_ms must be > 0",
        ));
    }

    if sim.duration_ms == 0 {
        return Err(ContractError::config_validation(
            "simulation.duration_ms",
            "duration_ms must be > 0",
        ));
    }

    Ok(())
}

fn validate_events(config: &MediaSyncConfig) -> Result<(), ContractError> {
    for (idx, event) in config.simulation.events.iter().enumerate() {
        if let Some(until_ms) = event.until_ms() {
            if event.at_ms() > until_ms {
                return Err(ContractError::config_validation(
                    format!("simulation.events[{idx}]"),
                    format!(
                        "{}: at_ms ({}) must be <= until_ms ({})",
                        event.name(),
                        event.at_ms(),
                        until_ms
                    ),
                ));
            }
        }

        match event {
            ScriptedEvent::SpeedChange { speed, .. } if !speed.is_finite() || *speed < 0.0 => {
                return Err(ContractError::config_validation(
                    format!("simulation.events[{idx}].speed"),
                    format!("speed must be finite and >= 0, got {speed}"),
                ));
            }
            ScriptedEvent::Recalibrate {
                master_time,
                other_time,
                ..
            } if !master_time.is_finite() || !other_time.is_finite() => {
                return Err(ContractError::config_validation(
                    format!("simulation.events[{idx}]"),
                    "recalibrate: master_time and other_time must be finite",
                ));
            }
            _ => {}
        }
    }
    Ok(())
}
