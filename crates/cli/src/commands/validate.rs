//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{MediaSyncConfig, ScriptedEvent};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    tolerance_ms: f64,
    poll_interval_ms: u64,
    duration_ms: u64,
    event_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match super::load_config(&args.config, &Default::default()) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    tolerance_ms: config.engine.tolerance_ms,
                    poll_interval_ms: config.engine.poll_interval_ms,
                    duration_ms: config.simulation.duration_ms,
                    event_count: config.simulation.events.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("{e:#}")),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &MediaSyncConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let sim = &config.simulation;

    if config.engine.tolerance_ms == 0.0 {
        warnings.push("engine.tolerance_ms is 0 - every master update will seek".to_string());
    }

    if config.engine.poll_interval_ms > sim.duration_ms {
        warnings.push(format!(
            "engine.poll_interval_ms ({}) exceeds simulation.duration_ms ({}) - watchdog never fires",
            config.engine.poll_interval_ms, sim.duration_ms
        ));
    }

    if sim.update_every_ms < sim.step_ms {
        warnings.push(format!(
            "simulation.update_every_ms ({}) is below step_ms ({}) - updates are published once per step",
            sim.update_every_ms, sim.step_ms
        ));
    }

    for event in &sim.events {
        if event.at_ms() >= sim.duration_ms {
            warnings.push(format!(
                "{} at {} ms starts after the scenario ends",
                event.name(),
                event.at_ms()
            ));
        }
        if let ScriptedEvent::FollowerEnd { at_ms } = event {
            if *at_ms < sim.duration_ms {
                warnings.push(format!(
                    "follower_end at {at_ms} ms - the follower is not corrected after it ends"
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Tolerance: {} ms", summary.tolerance_ms);
            println!("  Watchdog interval: {} ms", summary.poll_interval_ms);
            println!("  Scenario duration: {} ms", summary.duration_ms);
            println!("  Scripted events: {}", summary.event_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
