//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{MediaSyncConfig, ScriptedEvent};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    engine: EngineInfo,
    correlation: CorrelationInfo,
    scenario: ScenarioInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<EventInfo>,
}

#[derive(Serialize)]
struct EngineInfo {
    tolerance_ms: f64,
    poll_interval_ms: u64,
    min_ready_state: String,
    drift_history: usize,
}

#[derive(Serialize)]
struct CorrelationInfo {
    master_time: f64,
    other_time: f64,
    offset: f64,
}

#[derive(Serialize)]
struct ScenarioInfo {
    master_start: f64,
    master_speed: f64,
    follower_start: f64,
    follower_skew: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    follower_duration: Option<f64>,
    step_ms: u64,
    update_every_ms: u64,
    duration_ms: u64,
    event_count: usize,
}

#[derive(Serialize)]
struct EventInfo {
    name: &'static str,
    at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    until_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = super::load_config(&args.config, &Default::default())?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn event_detail(event: &ScriptedEvent) -> Option<String> {
    match event {
        ScriptedEvent::SpeedChange { speed, .. } => Some(format!("speed {speed}")),
        ScriptedEvent::Recalibrate {
            master_time,
            other_time,
            ..
        } => Some(format!("master {master_time} <-> follower {other_time}")),
        _ => None,
    }
}

fn build_config_info(config: &MediaSyncConfig, args: &InfoArgs) -> ConfigInfo {
    let sim = &config.simulation;

    let events = if args.events {
        sim.events
            .iter()
            .map(|event| EventInfo {
                name: event.name(),
                at_ms: event.at_ms(),
                until_ms: event.until_ms(),
                detail: event_detail(event),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        engine: EngineInfo {
            tolerance_ms: config.engine.tolerance_ms,
            poll_interval_ms: config.engine.poll_interval_ms,
            min_ready_state: format!("{:?}", config.engine.min_ready_state),
            drift_history: config.engine.drift_history,
        },
        correlation: CorrelationInfo {
            master_time: config.correlation.master_time,
            other_time: config.correlation.other_time,
            offset: config.correlation.offset(),
        },
        scenario: ScenarioInfo {
            master_start: sim.master_start,
            master_speed: sim.master_speed,
            follower_start: sim.follower_start,
            follower_skew: sim.follower_skew,
            follower_duration: sim.follower_duration,
            step_ms: sim.step_ms,
            update_every_ms: sim.update_every_ms,
            duration_ms: sim.duration_ms,
            event_count: sim.events.len(),
        },
        events,
    }
}

fn print_config_info(config: &MediaSyncConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Media Sync Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let engine = &config.engine;
    println!("⚙️  Engine");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Tolerance: {} ms", engine.tolerance_ms);
    println!("   ├─ Watchdog interval: {} ms", engine.poll_interval_ms);
    println!("   ├─ Readiness threshold: {:?}", engine.min_ready_state);
    println!("   └─ Drift history: {} samples", engine.drift_history);

    let correlation = &config.correlation;
    println!("\n🔗 Correlation");
    println!("   ├─ Master: {}", correlation.master_time);
    println!("   ├─ Follower: {}", correlation.other_time);
    println!("   └─ Offset: {:+}", correlation.offset());

    let sim = &config.simulation;
    println!("\n🎬 Scenario");
    println!(
        "   ├─ Master: start {} s, speed {}",
        sim.master_start, sim.master_speed
    );
    match sim.follower_duration {
        Some(duration) => println!(
            "   ├─ Follower: start {} s, skew {}, ends at {} s",
            sim.follower_start, sim.follower_skew, duration
        ),
        None => println!(
            "   ├─ Follower: start {} s, skew {}",
            sim.follower_start, sim.follower_skew
        ),
    }
    println!(
        "   ├─ Step {} ms, update every {} ms",
        sim.step_ms, sim.update_every_ms
    );
    println!("   └─ Duration: {} ms", sim.duration_ms);

    if args.events && !sim.events.is_empty() {
        println!("\n📜 Scripted events ({})", sim.events.len());
        for (i, event) in sim.events.iter().enumerate() {
            let prefix = if i == sim.events.len() - 1 { "└─" } else { "├─" };
            let window = match event.until_ms() {
                Some(until_ms) => format!("{}..{} ms", event.at_ms(), until_ms),
                None => format!("{} ms", event.at_ms()),
            };
            match event_detail(event) {
                Some(detail) => println!("   {} {} @ {} ({})", prefix, event.name(), window, detail),
                None => println!("   {} {} @ {}", prefix, event.name(), window),
            }
        }
    } else {
        println!("\n📜 {} scripted events", sim.events.len());
    }

    println!();
}
