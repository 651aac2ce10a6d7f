use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use geoprox::{
    EngineConfig, EngineSnapshot, FixedClock, Frequency, ProximityEngine, SimulationConfig, SimulationPath,
    SimulationState, SnapshotStream, TriggerSpec,
};

fn engine(step_interval_ms: u64) -> ProximityEngine {
    let cfg = EngineConfig {
        simulation: SimulationConfig {
            step_interval_ms,
            path: SimulationPath::reference(),
        },
        ..EngineConfig::default()
    };
    ProximityEngine::with_clock(cfg, Arc::new(FixedClock::at("12:00").unwrap())).unwrap()
}

fn shell_always() -> TriggerSpec {
    TriggerSpec::builder()
        .title("Buy fuel")
        .coordinates(9.0820, 7.4800)
        .radius(300.0)
        .frequency(Frequency::Always)
        .build()
        .unwrap()
}

fn wait_for(stream: &SnapshotStream, mut done: impl FnMut(&EngineSnapshot) -> bool) -> EngineSnapshot {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let snapshot = stream.recv_timeout(remaining).expect("snapshot before deadline");
        if done(&snapshot) {
            return snapshot;
        }
    }
}

#[test]
fn reference_path_fires_once_at_final_waypoint_then_stops() {
    let engine = engine(10);
    let trigger = engine.add_trigger(shell_always()).unwrap();
    let stream = engine.subscribe().unwrap();

    let state = engine.start_simulation().unwrap();
    assert_eq!(
        state,
        SimulationState::Running {
            next_waypoint: 0,
            total: 7
        }
    );

    let mut alerts_before_last = Vec::new();
    let done = wait_for(&stream, |snapshot| {
        if snapshot.passes < 7 {
            alerts_before_last.push(snapshot.alerts.len());
        }
        snapshot.passes == 7
    });
    assert!(alerts_before_last.iter().all(|&n| n == 0));
    assert_eq!(done.simulation, SimulationState::Idle);
    assert_eq!(done.alerts.len(), 1);
    assert_eq!(done.alerts[0].trigger_id, trigger.id);
    assert_eq!(done.current_position.longitude, 7.4800);

    // No further ticks after natural completion.
    thread::sleep(Duration::from_millis(100));
    let later = engine.snapshot().unwrap();
    assert_eq!(later.passes, 7);
    assert_eq!(later.alerts.len(), 1);
}

#[test]
fn stop_halts_playback_and_keeps_state() {
    let engine = engine(40);
    engine.add_trigger(shell_always()).unwrap();
    let stream = engine.subscribe().unwrap();

    engine.start_simulation().unwrap();
    wait_for(&stream, |snapshot| snapshot.passes >= 1);

    assert_eq!(engine.stop_simulation().unwrap(), SimulationState::Idle);
    let stopped = engine.snapshot().unwrap();
    assert!(stopped.passes < 7);
    assert!(stopped.triggers[0].last_known_distance.is_some());

    thread::sleep(Duration::from_millis(200));
    assert_eq!(engine.snapshot().unwrap().passes, stopped.passes);

    // Stopping again is a no-op.
    assert_eq!(engine.stop_simulation().unwrap(), SimulationState::Idle);
}

#[test]
fn start_while_running_is_noop_and_restart_begins_at_first_waypoint() {
    let engine = engine(60_000);

    let first = engine.start_simulation().unwrap();
    let again = engine.start_simulation().unwrap();
    assert_eq!(first, again);

    engine.stop_simulation().unwrap();
    assert_eq!(
        engine.start_simulation().unwrap(),
        SimulationState::Running {
            next_waypoint: 0,
            total: 7
        }
    );
    assert_eq!(engine.snapshot().unwrap().passes, 0);
}

#[test]
fn custom_path_is_played_in_order() {
    let path = SimulationPath::new(vec![
        geoprox::Coordinate::new(9.0670, 7.4200),
        geoprox::Coordinate::new(9.0650, 7.4200),
    ])
    .unwrap();
    let cfg = EngineConfig {
        simulation: SimulationConfig {
            step_interval_ms: 5,
            path,
        },
        ..EngineConfig::default()
    };
    let engine = ProximityEngine::with_clock(cfg, Arc::new(FixedClock::at("09:30").unwrap())).unwrap();
    let seeded = engine.seed_demo_triggers().unwrap();
    let stream = engine.subscribe().unwrap();

    engine.start_simulation().unwrap();
    let done = wait_for(&stream, |snapshot| snapshot.passes == 2);

    assert_eq!(done.simulation, SimulationState::Idle);
    // The first waypoint is ~220 m north of Shoprite; the Once trigger fires there and stays consumed.
    assert_eq!(done.alerts.len(), 1);
    assert_eq!(done.alerts[0].trigger_id, seeded[1].id);
    assert!(done.triggers[1].triggered);
}

#[test]
fn dropping_engine_mid_run_shuts_down_cleanly() {
    let engine = engine(1);
    engine.start_simulation().unwrap();
    let stream = engine.subscribe().unwrap();
    drop(engine);

    // The worker is gone: the stream drains and then disconnects.
    while stream.try_recv().map(|s| s.is_some()).unwrap_or(false) {}
    assert!(stream.recv_timeout(Duration::from_secs(1)).is_err());
}
