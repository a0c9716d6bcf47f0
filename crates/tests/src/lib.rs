//! # Integration Tests
//!
//! End-to-end tests: scripted scenario -> sync engine -> events.
//!
//! Covers:
//! - Configuration contracts
//! - Drift correction and self-healing under real timers
//! - Failure reporting and recovery across component boundaries

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, MediaSyncConfig, SyncErrorKind};

    #[test]
    fn test_default_config_is_valid() {
        let config = MediaSyncConfig {
            version: ConfigVersion::V1,
            engine: Default::default(),
            correlation: Default::default(),
            simulation: Default::default(),
        };
        assert!(config_loader::ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(SyncErrorKind::InsufficientBuffer.code(), 1);
        assert_eq!(SyncErrorKind::PresentationFailure.code(), 2);
        assert_eq!(SyncErrorKind::SyncFailed.code(), 11);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        CorrelationTimestamp, FollowerMedia, MasterObserver, ScriptedEvent, SimulationConfig,
        SyncEngineConfig, SyncErrorKind, SyncEvent, SyncEventKind, Tolerance,
    };
    use observability::SyncMetricsAggregator;
    use simulation::Scenario;
    use sync_engine::SyncEngine;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout};

    fn engine_config(tolerance_ms: f64, poll_ms: u64) -> SyncEngineConfig {
        SyncEngineConfig {
            poll_interval_ms: poll_ms,
            ..SyncEngineConfig::with_tolerance(Tolerance::from_millis(tolerance_ms))
        }
    }

    fn scenario(step_ms: u64, update_every_ms: u64, duration_ms: u64) -> SimulationConfig {
        SimulationConfig {
            step_ms,
            update_every_ms,
            duration_ms,
            ..Default::default()
        }
    }

    /// Engine attached to the scenario's master/follower pair
    fn attach(
        scenario: &Scenario,
        correlation: CorrelationTimestamp,
        config: SyncEngineConfig,
    ) -> (SyncEngine, mpsc::UnboundedReceiver<SyncEvent>) {
        let engine =
            SyncEngine::with_config(scenario.follower(), correlation, config, scenario.master());

        let (tx, rx) = mpsc::unbounded_channel();
        for kind in [SyncEventKind::Error, SyncEventKind::SyncNowAchievable] {
            let tx = tx.clone();
            engine.add_event_listener(kind, move |event| {
                let _ = tx.send(*event);
            });
        }
        (engine, rx)
    }

    /// Step the scenario in real time; returns the number of master updates
    async fn drive(scenario: &mut Scenario, engine: &SyncEngine) -> u64 {
        let step = Duration::from_millis(scenario.config().step_ms);
        let mut updates = 0;

        while !scenario.is_finished() {
            let outcome = scenario.step();
            if outcome.master_updated {
                updates += 1;
            }
            for correlation in outcome.recalibrations {
                engine.set_correlation(correlation);
            }
            sleep(step).await;
        }
        updates
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        timeout(Duration::from_secs(2), async {
            while !condition() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Expected minus actual follower position
    fn observed_drift(scenario: &Scenario, correlation: CorrelationTimestamp) -> f64 {
        let master_time = scenario.master().content_time().expect("master known");
        master_time + correlation.offset() - scenario.follower().current_time()
    }

    #[tokio::test]
    async fn test_skewed_follower_is_kept_within_tolerance() {
        let mut scenario = Scenario::new(SimulationConfig {
            follower_skew: 1.2,
            ..scenario(20, 100, 1000)
        });
        let (engine, mut events) =
            attach(&scenario, CorrelationTimestamp::default(), engine_config(30.0, 60_000));

        let updates = drive(&mut scenario, &engine).await;
        wait_until(|| engine.stats().reconciliations >= updates).await;

        let stats = engine.stats();
        assert!(stats.seeks >= 1, "skewed follower never corrected: {stats:?}");
        assert!(observed_drift(&scenario, engine.get_correlation()).abs() < 0.1);
        assert!(!scenario.follower().is_paused());
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_watchdog_heals_stalled_master() {
        let mut scenario = Scenario::new(SimulationConfig {
            follower_start: 5.0,
            events: vec![ScriptedEvent::MasterStall {
                at_ms: 0,
                until_ms: 10_000,
            }],
            ..scenario(20, 50, 400)
        });
        let (engine, mut events) =
            attach(&scenario, CorrelationTimestamp::default(), engine_config(50.0, 100));

        let updates = drive(&mut scenario, &engine).await;
        wait_until(|| engine.stats().seeks >= 1).await;

        assert_eq!(updates, 0);
        let seeks = scenario.follower().seeks();
        assert!(seeks[0] < 1.0, "follower not pulled back: {seeks:?}");
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_starvation_reported_once_then_recovers() {
        let toml = r#"
[engine]
tolerance_ms = 50.0
poll_interval_ms = 60000

[simulation]
step_ms = 25
update_every_ms = 50
duration_ms = 700

[[simulation.events]]
type = "buffer_starvation"
at_ms = 200
until_ms = 400
"#;
        let config = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let mut scenario = Scenario::new(config.simulation.clone());
        let (engine, mut events) = attach(&scenario, config.correlation, config.engine.clone());

        drive(&mut scenario, &engine).await;
        wait_until(|| engine.can_sync_with_master()).await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(
            drain(&mut events),
            vec![
                SyncEvent::Error(SyncErrorKind::InsufficientBuffer),
                SyncEvent::SyncNowAchievable,
            ]
        );
        let stats = engine.stats();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.recoveries, 1);
    }

    #[tokio::test]
    async fn test_recalibration_moves_follower_immediately() {
        let mut scenario = Scenario::new(SimulationConfig {
            events: vec![ScriptedEvent::Recalibrate {
                at_ms: 300,
                master_time: 0.0,
                other_time: 10.0,
            }],
            ..scenario(20, 100, 600)
        });
        let (engine, mut events) =
            attach(&scenario, CorrelationTimestamp::default(), engine_config(50.0, 60_000));

        let updates = drive(&mut scenario, &engine).await;
        // every update plus the recalibration itself
        wait_until(|| engine.stats().reconciliations > updates).await;

        assert_eq!(engine.get_correlation(), CorrelationTimestamp::new(0.0, 10.0));
        assert!(scenario.follower().seeks().iter().any(|&t| t > 9.0));
        assert!(observed_drift(&scenario, engine.get_correlation()).abs() < 0.1);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_master_pauses_until_known_again() {
        let mut scenario = Scenario::new(SimulationConfig {
            events: vec![ScriptedEvent::MasterUnknown {
                at_ms: 200,
                until_ms: 500,
            }],
            ..scenario(20, 50, 800)
        });
        let (engine, mut events) =
            attach(&scenario, CorrelationTimestamp::default(), engine_config(50.0, 50));

        drive(&mut scenario, &engine).await;
        wait_until(|| engine.can_sync_with_master()).await;
        sleep(Duration::from_millis(20)).await;

        assert_eq!(
            drain(&mut events),
            vec![
                SyncEvent::Error(SyncErrorKind::SyncFailed),
                SyncEvent::SyncNowAchievable,
            ]
        );
        let follower = scenario.follower();
        assert!(follower.pause_calls() >= 1);
        assert!(!follower.is_paused());
    }

    #[tokio::test]
    async fn test_master_failure_does_not_pause_follower() {
        let mut scenario = Scenario::new(SimulationConfig {
            events: vec![ScriptedEvent::MasterFailure { at_ms: 100 }],
            ..scenario(20, 100, 500)
        });
        let (engine, mut events) =
            attach(&scenario, CorrelationTimestamp::default(), engine_config(50.0, 60_000));

        drive(&mut scenario, &engine).await;
        wait_until(|| engine.can_sync_with_master()).await;
        sleep(Duration::from_millis(20)).await;

        assert_eq!(
            drain(&mut events),
            vec![
                SyncEvent::Error(SyncErrorKind::PresentationFailure),
                SyncEvent::SyncNowAchievable,
            ]
        );
        assert_eq!(scenario.follower().pause_calls(), 0);
    }

    #[tokio::test]
    async fn test_follower_end_reported_once() {
        let mut scenario = Scenario::new(SimulationConfig {
            events: vec![ScriptedEvent::FollowerEnd { at_ms: 200 }],
            ..scenario(20, 50, 500)
        });
        let (engine, mut events) =
            attach(&scenario, CorrelationTimestamp::default(), engine_config(50.0, 60_000));

        drive(&mut scenario, &engine).await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(
            drain(&mut events),
            vec![SyncEvent::Error(SyncErrorKind::PresentationFailure)]
        );
        assert!(!engine.can_sync_with_master());
        assert!(scenario.follower().ended());
    }

    #[tokio::test]
    async fn test_zero_speed_pauses_follower() {
        let mut scenario = Scenario::new(SimulationConfig {
            events: vec![ScriptedEvent::SpeedChange {
                at_ms: 200,
                speed: 0.0,
            }],
            ..scenario(20, 50, 400)
        });
        let (engine, mut events) =
            attach(&scenario, CorrelationTimestamp::default(), engine_config(50.0, 60_000));

        let updates = drive(&mut scenario, &engine).await;
        wait_until(|| engine.stats().reconciliations >= updates).await;

        let follower = scenario.follower();
        assert!(follower.is_paused());
        assert!(follower.play_calls() >= 1);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_destroy_mid_scenario_silences_engine() {
        let mut scenario = Scenario::new(SimulationConfig {
            events: vec![
                ScriptedEvent::BufferStarvation {
                    at_ms: 300,
                    until_ms: 500,
                },
                ScriptedEvent::MasterFailure { at_ms: 350 },
            ],
            ..scenario(20, 50, 600)
        });
        let master = scenario.master();
        let follower = scenario.follower();
        let (engine, mut events) =
            attach(&scenario, CorrelationTimestamp::default(), engine_config(50.0, 20));

        for _ in 0..5 {
            scenario.step();
            sleep(Duration::from_millis(20)).await;
        }
        engine.destroy();
        engine.join().await;
        let seeks_at_destroy = follower.seeks().len();

        drive(&mut scenario, &engine).await;

        assert!(engine.is_destroyed());
        assert_eq!(master.subscriber_count(), 0);
        assert_eq!(follower.ended_listener_count(), 0);
        assert_eq!(follower.seeks().len(), seeks_at_destroy);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_many_engines_share_one_master() {
        let master = Scenario::new(scenario(20, 50, 300)).master();

        let followers: Vec<_> = (0..4)
            .map(|i| Arc::new(simulation::MockFollower::new(i as f64)))
            .collect();
        let engines: Vec<_> = followers
            .iter()
            .map(|follower| {
                SyncEngine::with_config(
                    follower.clone(),
                    CorrelationTimestamp::new(0.0, 2.0),
                    engine_config(50.0, 60_000),
                    master.clone(),
                )
            })
            .collect();
        assert_eq!(master.subscriber_count(), 4);

        master.advance(1.0);
        master.emit_update();

        for engine in &engines {
            wait_until(|| engine.stats().reconciliations == 1).await;
        }
        for follower in &followers {
            assert_eq!(follower.current_time(), 3.0);
        }

        drop(engines);
        assert_eq!(master.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_observed_drift_aggregates_into_summary() {
        let mut scenario = Scenario::new(SimulationConfig {
            follower_skew: 1.1,
            ..scenario(20, 100, 600)
        });
        let (engine, _events) =
            attach(&scenario, CorrelationTimestamp::default(), engine_config(40.0, 60_000));
        let mut aggregator = SyncMetricsAggregator::new();

        while !scenario.is_finished() {
            scenario.step();
            sleep(Duration::from_millis(20)).await;
            let drift = observed_drift(&scenario, engine.get_correlation());
            aggregator.update_drift(drift, engine.tolerance().as_secs());
        }

        let summary = aggregator.summary();
        assert_eq!(summary.drift_ms.count, 30);
        assert!(summary.in_tolerance_rate > 50.0, "{summary}");
    }
}
