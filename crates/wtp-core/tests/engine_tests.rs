//! ---
//! wtp_section: "04-orchestration"
//! wtp_subsection: "integration-tests"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "End-to-end behaviour of the simulation engine."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use serde_json::json;
use wtp_common::config::{AppConfig, ThresholdSet};
use wtp_core::{EventKind, PlantEvent, SimulationEngine};
use wtp_process::stages::sedimentation::{BACKWASH_DURATION, CLEAN_HEAD_LOSS};
use wtp_process::{BackwashState, ProcessState};
use wtp_scenario::{library, SimulationEventKind};

fn engine() -> SimulationEngine {
    SimulationEngine::with_clock(
        &AppConfig::default(),
        Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap(),
    )
}

fn run(engine: &mut SimulationEngine, ticks: usize) {
    for _ in 0..ticks {
        engine.tick();
    }
}

fn record(engine: &mut SimulationEngine, kinds: &[EventKind]) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in kinds {
        let seen = Arc::clone(&seen);
        engine.on(*kind, move |event| {
            let label = match event {
                PlantEvent::AlarmNew(alarm) => format!("alarm:new {}", alarm.id),
                PlantEvent::AlarmCleared(alarm) => format!("alarm:cleared {}", alarm.id),
                PlantEvent::Simulation(sim) => format!("simulation:event {:?}", sim.kind),
                other => other.kind().to_string(),
            };
            seen.lock().unwrap().push(label);
        });
    }
    seen
}

#[test]
fn backwash_completes_after_six_hundred_simulated_seconds() {
    let mut engine = engine();
    engine.inject_scenario(|state| {
        let mut next = state.clone();
        next.sedimentation.filter_head_loss = 9.0;
        next
    });
    engine
        .apply_control("backwash", &json!({"command": "start"}))
        .unwrap();
    assert_eq!(
        engine.state().sedimentation.backwash.remaining(),
        BACKWASH_DURATION
    );

    let ticks = (BACKWASH_DURATION / engine.tick_interval()) as usize;
    run(&mut engine, ticks - 1);
    assert!(engine.state().sedimentation.backwash.is_active());
    run(&mut engine, 1);
    let sed = &engine.state().sedimentation;
    assert_eq!(sed.backwash, BackwashState::Idle);
    assert_eq!(sed.filter_head_loss, CLEAN_HEAD_LOSS);
    assert_eq!(sed.backwash_count, 1);
}

#[test]
fn alum_dose_tracks_new_setpoint() {
    let mut engine = engine();
    engine.inject_scenario(|state| {
        let mut next = state.clone();
        next.coagulation.alum_dose_rate = 0.0;
        next
    });
    engine
        .apply_control("setpoint", &json!({"key": "alumDose", "value": 30.0}))
        .unwrap();
    run(&mut engine, 500);
    assert!((engine.state().coagulation.alum_dose_rate - 30.0).abs() < 1.0);
}

#[test]
fn finished_ph_holds_at_design_conditions() {
    let mut engine = engine();
    run(&mut engine, 2_000);
    assert!((engine.state().disinfection.finished_ph - 7.4).abs() < 0.1);
    assert!(engine.state().active_alarms().next().is_none());
}

#[test]
fn setpoints_are_clamped_and_unknown_commands_ignored() {
    let mut engine = engine();
    engine
        .apply_control("setpoint", &json!({"key": "chlorineDose", "value": 25.0}))
        .unwrap();
    assert_eq!(engine.state().disinfection.chlorine_dose_setpoint, 10.0);

    let before = engine.state().clone();
    assert!(engine.apply_control("selfDestruct", &json!({})).is_err());
    assert!(engine
        .apply_control("setpoint", &json!({"key": "goldDose", "value": 1.0}))
        .is_err());
    assert_eq!(engine.state(), &before);
}

#[test]
fn alarm_lifecycle_publishes_and_retains_cleared_alarm() {
    let mut engine = engine();
    let seen = record(
        &mut engine,
        &[EventKind::AlarmNew, EventKind::AlarmCleared],
    );

    engine.set_thresholds("AIT-403", ThresholdSet::high(7.0, 8.0));
    run(&mut engine, 2);
    let alarm = engine.state().alarm("AIT-403:H").cloned().unwrap();
    assert!(alarm.active);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["alarm:new AIT-403:H".to_owned()]
    );

    engine
        .apply_control("acknowledgeAlarm", &json!({"alarmId": "AIT-403:H"}))
        .unwrap();
    assert!(engine.state().alarm("AIT-403:H").unwrap().acknowledged);
    assert!(engine
        .alarm_manager()
        .history()
        .any(|record| record.id == "AIT-403:H" && record.acknowledged));

    engine.set_thresholds("AIT-403", ThresholdSet::high(8.0, 8.5));
    run(&mut engine, 1);
    assert!(!engine.state().alarm("AIT-403:H").unwrap().active);
    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(seen.lock().unwrap()[1], "alarm:cleared AIT-403:H");

    engine.set_speed(100.0);
    run(&mut engine, 7);
    assert!(engine.state().alarm("AIT-403:H").is_none());
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn scenario_runs_through_engine() {
    let mut engine = engine();
    let seen = record(&mut engine, &[EventKind::SimulationEvent]);
    engine
        .start_scenario_by_id(library::INTAKE_PUMP_FAILURE)
        .unwrap();
    assert_eq!(
        engine.state().active_scenario.as_deref(),
        Some(library::INTAKE_PUMP_FAILURE)
    );

    run(&mut engine, 29);
    assert!(!engine.state().intake.pump1.fault);
    run(&mut engine, 1);
    assert!(engine.state().intake.pump1.fault);
    assert!(!engine.scenario_complete());

    engine
        .apply_control("pump", &json!({"pumpId": "intakePump2", "command": "start"}))
        .unwrap();
    run(&mut engine, 120);
    assert!(engine.scenario_complete());

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[..3],
        [
            format!("simulation:event {:?}", SimulationEventKind::ScenarioStarted),
            format!("simulation:event {:?}", SimulationEventKind::StepFired),
            format!("simulation:event {:?}", SimulationEventKind::ScenarioCompleted),
        ]
    );
}

#[test]
fn scenario_step_fires_on_millisecond_ticks() {
    let mut config = AppConfig::default();
    config.simulation.tick_interval = std::time::Duration::from_millis(1);
    let mut engine =
        SimulationEngine::with_clock(&config, Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap());
    engine
        .start_scenario_by_id(library::INTAKE_PUMP_FAILURE)
        .unwrap();

    run(&mut engine, 14_999);
    assert!(!engine.state().intake.pump1.fault);
    assert!(engine.state().intake.pump1.running);
    run(&mut engine, 2);
    assert!(engine.state().intake.pump1.fault);
    assert!(!engine.state().intake.pump1.running);
}

#[test]
fn tripped_pump_stays_off_after_fault_reset() {
    let mut engine = engine();
    engine
        .start_scenario_by_id(library::INTAKE_PUMP_FAILURE)
        .unwrap();
    run(&mut engine, 40);
    assert!(engine.state().intake.pump1.fault);

    engine
        .apply_control("pump", &json!({"pumpId": "intakePump1", "command": "reset"}))
        .unwrap();
    run(&mut engine, 5);
    assert!(!engine.state().intake.pump1.fault);
    assert!(!engine.state().intake.pump1.running);

    engine
        .apply_control("pump", &json!({"pumpId": "intakePump1", "command": "start"}))
        .unwrap();
    assert!(engine.state().intake.pump1.running);
}

#[test]
fn removing_thresholds_clears_active_alarm() {
    let mut engine = engine();
    let seen = record(&mut engine, &[EventKind::AlarmNew, EventKind::AlarmCleared]);
    engine.set_thresholds("FIT-101", ThresholdSet::high(4.0, 50.0));
    run(&mut engine, 1);
    assert!(engine.state().alarm("FIT-101:H").is_some_and(|alarm| alarm.active));

    engine.set_thresholds("FIT-101", ThresholdSet::default());
    run(&mut engine, 10);
    assert!(engine.state().alarms.iter().all(|alarm| !alarm.active));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "alarm:new FIT-101:H".to_owned(),
            "alarm:cleared FIT-101:H".to_owned(),
        ]
    );
}

#[test]
fn historian_query_accepts_unbounded_windows() {
    let mut engine = engine();
    run(&mut engine, 10);
    assert_eq!(engine.historian().tag_history("FIT-101", f64::INFINITY).len(), 10);
    assert_eq!(engine.historian().tag_history("FIT-101", 1.0e13).len(), 10);
}

#[test]
fn reset_restores_design_conditions_at_current_time() {
    let mut engine = engine();
    engine.set_speed(10.0);
    engine
        .start_scenario_by_id(library::FILTER_BREAKTHROUGH)
        .unwrap();
    run(&mut engine, 20);
    let now = engine.state().timestamp;
    let seen = record(&mut engine, &[EventKind::SimulationReset]);

    engine.reset();

    let state = engine.state();
    assert_eq!(state.timestamp, now);
    assert_eq!(state.elapsed, 0.0);
    assert_eq!(state.speed, 10.0);
    assert!(state.active_scenario.is_none());
    assert_eq!(
        state.sedimentation,
        ProcessState::initial(now).sedimentation
    );
    assert!(engine.historian().is_empty());
    assert_eq!(engine.alarm_manager().history_len(), 0);
    assert!(engine.scenario_engine().active_scenario().is_none());
    assert_eq!(*seen.lock().unwrap(), vec!["simulation:reset".to_owned()]);
}

#[test]
fn removed_listener_stops_receiving() {
    let mut engine = engine();
    let count = Arc::new(Mutex::new(0));
    let id = {
        let count = Arc::clone(&count);
        engine.on(EventKind::StateUpdate, move |_| *count.lock().unwrap() += 1)
    };
    run(&mut engine, 3);
    assert!(engine.off(EventKind::StateUpdate, id));
    run(&mut engine, 3);
    assert_eq!(*count.lock().unwrap(), 3);
}

#[test]
fn historian_window_follows_simulated_time() {
    let mut engine = engine();
    run(&mut engine, 40);
    let samples = engine.historian().tag_history("FIT-101", 5.0);
    assert_eq!(samples.len(), 11);
    assert!(engine
        .historian()
        .tag_history("NOPE-1", 5.0)
        .iter()
        .all(|sample| sample.value == 0.0));
}

#[test]
fn scenario_file_is_registered_and_started() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demand.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
id = "demand-surge"
name = "Demand surge"
duration_s = 120

[[steps]]
trigger_at = 1
action = {{ type = "force_setpoint", key = "distributionDemand", value = 9.5 }}
"#
    )
    .unwrap();

    let mut engine = engine();
    let id = engine.load_scenario_file(&path).unwrap();
    assert!(engine.scenarios().any(|scenario| scenario.id == id));
    engine.start_scenario_by_id(&id).unwrap();
    run(&mut engine, 2);
    assert_eq!(engine.state().disinfection.distribution_demand, 9.5);

    run(&mut engine, 240);
    assert!(engine.state().active_scenario.is_none());
}
