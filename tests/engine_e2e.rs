use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use geoprox::{
    EngineConfig, FixedClock, Frequency, ProximityEngine, Timeframe, TriggerPatch, TriggerSpec,
};

const SHELL: (f64, f64) = (9.0820, 7.4800);
const HOME: (f64, f64) = (9.0765, 7.3986);

fn engine_at(hhmm: &str) -> ProximityEngine {
    let clock = Arc::new(FixedClock::at(hhmm).unwrap());
    ProximityEngine::with_clock(EngineConfig::default(), clock).unwrap()
}

fn fuel(frequency: Frequency) -> TriggerSpec {
    TriggerSpec::builder()
        .title("Buy fuel")
        .location("Shell Gas Station")
        .address("Wuse II, Abuja")
        .coordinates(SHELL.0, SHELL.1)
        .radius(300.0)
        .frequency(frequency)
        .build()
        .unwrap()
}

#[test]
fn position_at_center_fires_with_zero_distance() {
    let engine = engine_at("12:00");
    let trigger = engine.add_trigger(fuel(Frequency::Always)).unwrap();
    assert_eq!(trigger.distance_label(), "--");

    let fired = engine.feed_position(SHELL.0, SHELL.1).unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].trigger_id, trigger.id);
    assert_eq!(fired[0].distance_at_fire, 0.0);

    let snapshot = engine.snapshot().unwrap();
    assert_eq!(snapshot.alerts, fired);
    assert_eq!(snapshot.triggers[0].last_known_distance, Some(0.0));
    assert_eq!(snapshot.triggers[0].distance_label(), "0m");
}

#[test]
fn once_trigger_is_consumed() {
    let engine = engine_at("12:00");
    let trigger = engine.add_trigger(fuel(Frequency::Once)).unwrap();

    let first = engine.feed_position(SHELL.0, SHELL.1).unwrap();
    assert_eq!(first.len(), 1);
    assert!(engine.feed_position(SHELL.0, SHELL.1).unwrap().is_empty());

    engine.clear_alert(first[0].id).unwrap();
    assert!(engine.feed_position(SHELL.0, SHELL.1).unwrap().is_empty());
    assert!(engine.alerts().unwrap().is_empty());

    // A generic update cannot resurrect a consumed trigger.
    let updated = engine
        .update_trigger(
            trigger.id,
            TriggerPatch {
                radius: Some(500.0),
                ..TriggerPatch::default()
            },
        )
        .unwrap();
    assert!(updated.triggered);
    assert_eq!(updated.radius, 500.0);
    assert!(engine.feed_position(SHELL.0, SHELL.1).unwrap().is_empty());
}

#[test]
fn always_trigger_refires_after_clear() {
    let engine = engine_at("12:00");
    let trigger = engine.add_trigger(fuel(Frequency::Always)).unwrap();

    let first = engine.feed_position(SHELL.0, SHELL.1).unwrap();
    assert!(engine.feed_position(SHELL.0, SHELL.1).unwrap().is_empty());
    assert_eq!(engine.alerts().unwrap().len(), 1);

    let cleared = engine.clear_alert(first[0].id).unwrap();
    assert_eq!(cleared.map(|a| a.id), Some(first[0].id));
    assert_eq!(engine.clear_alert(first[0].id).unwrap(), None);

    let second = engine.feed_position(SHELL.0, SHELL.1).unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].trigger_id, trigger.id);
    assert_ne!(second[0].id, first[0].id);
}

#[test]
fn outside_timeframe_never_fires_or_updates_distance() {
    let engine = engine_at("23:00");
    let spec = TriggerSpec::builder()
        .title("Buy fuel")
        .coordinates(SHELL.0, SHELL.1)
        .radius(300.0)
        .frequency(Frequency::Always)
        .timeframe(Timeframe::new("08:00", "20:00").unwrap())
        .build()
        .unwrap();
    engine.add_trigger(spec).unwrap();

    assert!(engine.feed_position(SHELL.0, SHELL.1).unwrap().is_empty());
    let snapshot = engine.snapshot().unwrap();
    assert!(snapshot.alerts.is_empty());
    assert_eq!(snapshot.triggers[0].last_known_distance, None);
    assert_eq!(snapshot.passes, 1);
}

#[test]
fn disable_then_reenable() {
    let engine = engine_at("12:00");
    let trigger = engine.add_trigger(fuel(Frequency::Always)).unwrap();

    assert!(!engine.toggle_trigger(trigger.id).unwrap());
    assert!(engine.feed_position(SHELL.0, SHELL.1).unwrap().is_empty());
    assert_eq!(engine.triggers().unwrap()[0].last_known_distance, None);

    assert!(engine.toggle_trigger(trigger.id).unwrap());
    assert_eq!(engine.feed_position(SHELL.0, SHELL.1).unwrap().len(), 1);
}

#[test]
fn distances_track_latest_position() {
    let engine = engine_at("12:00");
    engine.add_trigger(fuel(Frequency::Always)).unwrap();

    assert!(engine.feed_position(HOME.0, HOME.1).unwrap().is_empty());
    let trigger = engine.triggers().unwrap().remove(0);
    let meters = trigger.last_known_distance.unwrap();
    assert!((8_000.0..10_000.0).contains(&meters), "got {meters}");
    assert!(trigger.distance_label().ends_with("km"));
    assert_eq!(engine.current_position().unwrap().latitude, HOME.0);
}

#[test]
fn invalid_specs_are_rejected() {
    let engine = engine_at("12:00");
    let bad_radius = TriggerSpec::builder()
        .title("x")
        .coordinates(SHELL.0, SHELL.1)
        .radius(0.0)
        .build();
    assert!(bad_radius.is_err());

    let missing_coordinates = TriggerSpec::builder().title("x").radius(10.0).build();
    assert!(missing_coordinates.is_err());

    let mut spec = fuel(Frequency::Once);
    spec.radius = -1.0;
    assert!(engine.add_trigger(spec).unwrap_err().is_validation());
    assert!(engine.triggers().unwrap().is_empty());
}

#[test]
fn removing_a_trigger_keeps_its_alert_until_cleared() {
    let engine = engine_at("12:00");
    let trigger = engine.add_trigger(fuel(Frequency::Always)).unwrap();
    let fired = engine.feed_position(SHELL.0, SHELL.1).unwrap();

    assert!(engine.remove_trigger(trigger.id).unwrap().is_some());
    assert!(engine.remove_trigger(trigger.id).unwrap().is_none());
    assert_eq!(engine.alerts().unwrap().len(), 1);

    engine.clear_alert(fired[0].id).unwrap();
    assert!(engine.alerts().unwrap().is_empty());
}

#[test]
fn subscribers_see_every_pass() {
    let engine = engine_at("12:00");
    let stream = engine.subscribe().unwrap();
    let initial = stream.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(initial.passes, 0);

    engine.add_trigger(fuel(Frequency::Always)).unwrap();
    engine.feed_position(SHELL.0, SHELL.1).unwrap();

    let added = stream.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(added.triggers.len(), 1);
    let evaluated = stream.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(evaluated.passes, 1);
    assert_eq!(evaluated.alerts.len(), 1);
    assert_eq!(engine.dropped_snapshots(), 0);
}

#[test]
fn concurrent_callers_never_duplicate_alerts() {
    let engine = Arc::new(engine_at("12:00"));
    let trigger = engine.add_trigger(fuel(Frequency::Always)).unwrap();

    let mut handles = Vec::new();
    for worker in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                if worker == 0 && i % 5 == 0 {
                    engine.toggle_trigger(trigger.id).unwrap();
                }
                for alert in engine.feed_position(SHELL.0, SHELL.1).unwrap() {
                    if worker == 1 {
                        engine.clear_alert(alert.id).unwrap();
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let alerts = engine.alerts().unwrap();
    assert!(alerts.len() <= 1);
    let ids: HashSet<_> = alerts.iter().map(|a| a.trigger_id).collect();
    assert_eq!(ids.len(), alerts.len());
}

#[test]
fn config_loads_from_json() {
    let cfg = EngineConfig::from_json_str(
        r#"{
            "start_position": {"latitude": 9.0820, "longitude": 7.4800},
            "simulation": {"step_interval_ms": 5}
        }"#,
    )
    .unwrap();
    let engine = ProximityEngine::with_clock(cfg, Arc::new(FixedClock::at("12:00").unwrap())).unwrap();
    assert_eq!(engine.current_position().unwrap().longitude, SHELL.1);
}
