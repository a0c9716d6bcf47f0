//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigOverrides;
use contracts::MediaSyncConfig;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let config = super::load_config(&args.config, &overrides(args))?;

    info!(
        tolerance_ms = config.engine.tolerance_ms,
        poll_interval_ms = config.engine.poll_interval_ms,
        duration_ms = config.simulation.duration_ms,
        events = config.simulation.events.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        config,
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    let shutdown_signal = setup_shutdown_signal();

    info!("Starting sync session...");

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Sync session failed")?;
            info!(
                steps = stats.steps,
                events = stats.events_received,
                seeks = stats.engine.seeks,
                duration_secs = stats.duration.as_secs_f64(),
                "Sync session completed"
            );

            if args.json {
                let json = serde_json::to_string_pretty(&stats.engine)
                    .context("Failed to serialize engine statistics")?;
                println!("{}", json);
            } else {
                stats.print_summary();
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping session...");
        }
    }

    info!("Media Sync finished");
    Ok(())
}

/// Command-line (or `MEDIA_SYNC_*` environment) values layered over the file
fn overrides(args: &RunArgs) -> ConfigOverrides {
    ConfigOverrides {
        tolerance_ms: args.tolerance_ms,
        poll_interval_ms: args.poll_interval_ms,
        duration_ms: args.duration_ms,
        follower_skew: args.follower_skew,
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
///
/// If a handler cannot be installed the signal is simply never observed.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &MediaSyncConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Engine:");
    println!("  Tolerance: {} ms", config.engine.tolerance_ms);
    println!("  Watchdog interval: {} ms", config.engine.poll_interval_ms);
    println!("  Readiness threshold: {:?}", config.engine.min_ready_state);
    println!(
        "\nCorrelation: master {} <-> follower {}",
        config.correlation.master_time, config.correlation.other_time
    );

    let sim = &config.simulation;
    println!("\nScenario:");
    println!("  Master: start {} s, speed {}", sim.master_start, sim.master_speed);
    println!(
        "  Follower: start {} s, skew {}",
        sim.follower_start, sim.follower_skew
    );
    println!(
        "  Step {} ms, update every {} ms, duration {} ms",
        sim.step_ms, sim.update_every_ms, sim.duration_ms
    );
    println!("  Scripted events: {}", sim.events.len());
    println!();
}
