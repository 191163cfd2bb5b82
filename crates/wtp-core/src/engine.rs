//! ---
//! wtp_section: "04-orchestration"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Simulation engine owning the plant state and its subsystems."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::{debug, trace, warn};
use wtp_alarms::{merge, AlarmManager};
use wtp_common::config::{AppConfig, ThresholdSet, MAX_SPEED, MIN_SPEED};
use wtp_common::time::advance;
use wtp_historian::Historian;
use wtp_logging::{log_system_event, wtp_info, EventOrigin, LogContext, SystemEventOutcome};
use wtp_metrics::EngineMetrics;
use wtp_process::stages::step_plant;
use wtp_process::{clamp, AlarmPriority, DiurnalPhase, ProcessState};
use wtp_scenario::{
    library, ScenarioDefinition, ScenarioEngine, ScenarioError, ScenarioHost, SimulationEvent,
    SimulationEventKind,
};

use crate::commands::{CommandError, ControlCommand};
use crate::events::{EventBus, EventKind, ListenerId, OperatorEvent, PlantEvent};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no scenario registered with id '{0}'")]
    UnknownScenario(String),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// Scenario host view over the engine's state and bus, borrowed for one call.
struct ScenarioContext<'a> {
    state: &'a mut ProcessState,
    bus: &'a mut EventBus,
    metrics: Option<&'a EngineMetrics>,
}

impl ScenarioHost for ScenarioContext<'_> {
    fn state(&self) -> &ProcessState {
        &*self.state
    }

    fn inject(&mut self, apply: &dyn Fn(&ProcessState) -> ProcessState) {
        let next = apply(&*self.state);
        *self.state = next;
    }

    fn emit_simulation_event(&mut self, event: SimulationEvent) {
        if event.kind == SimulationEventKind::StepFired {
            if let Some(metrics) = self.metrics {
                metrics.record_scenario_step(
                    &event.scenario_id,
                    event.action.as_deref().unwrap_or("unknown"),
                );
            }
        }
        self.bus.emit(PlantEvent::Simulation(&event));
    }
}

/// Owns the plant state and advances it one fixed interval per [`tick`](Self::tick).
///
/// Every method is synchronous; hosts that share the engine across tasks wrap
/// it in a mutex (see [`PlantRuntime`](crate::PlantRuntime)).
#[derive(Debug)]
pub struct SimulationEngine {
    state: ProcessState,
    phase: DiurnalPhase,
    tick_interval: f64,
    tick_count: u64,
    cleared_retention_s: f64,
    alarms: AlarmManager,
    historian: Historian,
    scenarios: ScenarioEngine,
    library: IndexMap<String, ScenarioDefinition>,
    bus: EventBus,
    metrics: Option<EngineMetrics>,
}

impl SimulationEngine {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_clock(config, Utc::now())
    }

    /// Build an engine whose simulated clock starts at `start`.
    pub fn with_clock(config: &AppConfig, start: DateTime<Utc>) -> Self {
        let mut state = ProcessState::initial(start);
        state.running = config.simulation.start_running;
        state.speed = clamp(config.simulation.speed, MIN_SPEED, MAX_SPEED);
        let library = library::builtin()
            .into_iter()
            .map(|scenario| (scenario.id.clone(), scenario))
            .collect();
        Self {
            state,
            phase: DiurnalPhase::default(),
            tick_interval: config.simulation.tick_seconds(),
            tick_count: 0,
            cleared_retention_s: config.alarms.cleared_retention.as_secs_f64(),
            alarms: AlarmManager::from_config(&config.alarms),
            historian: Historian::from_config(&config.historian),
            scenarios: ScenarioEngine::new(),
            library,
            bus: EventBus::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    pub fn historian(&self) -> &Historian {
        &self.historian
    }

    pub fn alarm_manager(&self) -> &AlarmManager {
        &self.alarms
    }

    pub fn scenario_engine(&self) -> &ScenarioEngine {
        &self.scenarios
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Wall-clock seconds per tick before the speed multiplier.
    pub fn tick_interval(&self) -> f64 {
        self.tick_interval
    }

    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&PlantEvent<'_>) + Send + 'static,
    {
        self.bus.on(kind, Box::new(listener))
    }

    pub fn off(&mut self, kind: EventKind, id: ListenerId) -> bool {
        self.bus.off(kind, id)
    }

    /// Advance the plant by `tick_interval * speed` simulated seconds. No-op while paused.
    pub fn tick(&mut self) {
        if !self.state.running {
            return;
        }
        let started = Instant::now();
        let dt = self.tick_interval * self.state.speed;

        let (mut next, phase) = step_plant(&self.state, self.phase, dt);
        self.phase = phase;
        next.timestamp = advance(self.state.timestamp, dt);
        next.elapsed = self.state.elapsed + dt;
        self.tick_count += 1;

        let evaluation = self.alarms.evaluate(&next);
        next.alarms = merge(
            &next.alarms,
            &evaluation,
            next.timestamp,
            self.cleared_retention_s,
        );
        self.state = next;
        self.historian.record(&self.state);

        if let Some(elapsed) = self.scenarios.elapsed_at(self.state.timestamp) {
            let mut host = ScenarioContext {
                state: &mut self.state,
                bus: &mut self.bus,
                metrics: self.metrics.as_ref(),
            };
            self.scenarios.tick(&mut host, elapsed);
        }

        for alarm in &evaluation.new_alarms {
            if let Some(metrics) = &self.metrics {
                metrics.record_alarm_transition("raised", alarm.priority.as_ref());
            }
            self.bus.emit(PlantEvent::AlarmNew(alarm));
        }
        for alarm in &evaluation.cleared_alarms {
            if let Some(metrics) = &self.metrics {
                metrics.record_alarm_transition("cleared", alarm.priority.as_ref());
            }
            self.bus.emit(PlantEvent::AlarmCleared(alarm));
        }
        self.bus.emit(PlantEvent::StateUpdate(&self.state));

        if let Some(metrics) = &self.metrics {
            for priority in AlarmPriority::iter() {
                let count = self
                    .state
                    .active_alarms()
                    .filter(|alarm| alarm.priority == priority)
                    .count();
                metrics.set_active_alarms(priority.as_ref(), count);
            }
            metrics.observe_tick(started.elapsed().as_secs_f64(), self.state.elapsed);
        }
        trace!(
            tick = self.tick_count,
            dt,
            elapsed = self.state.elapsed,
            raised = evaluation.new_alarms.len(),
            cleared = evaluation.cleared_alarms.len(),
            "engine tick"
        );
    }

    /// Parse and apply an untyped command.
    ///
    /// Unknown kinds, ids and actions come back as a [`CommandError`] and leave
    /// the state untouched; callers that treat them as no-ops can drop the error.
    pub fn apply_control(&mut self, kind: &str, payload: &Value) -> Result<(), CommandError> {
        match ControlCommand::parse(kind, payload) {
            Ok(command) => self.apply_with_payload(command, payload.clone()),
            Err(err) => {
                self.reject(kind, &err);
                Err(err)
            }
        }
    }

    pub fn apply(&mut self, command: ControlCommand) -> Result<(), CommandError> {
        self.apply_with_payload(command, Value::Null)
    }

    fn apply_with_payload(
        &mut self,
        command: ControlCommand,
        payload: Value,
    ) -> Result<(), CommandError> {
        let next = match command.apply(&self.state) {
            Ok(next) => next,
            Err(err) => {
                self.reject(command.kind(), &err);
                return Err(err);
            }
        };
        let now = next.timestamp;
        match &command {
            ControlCommand::AcknowledgeAlarm { id } => self.alarms.acknowledge_in_history(id, now),
            ControlCommand::AcknowledgeAll => {
                for alarm in &next.alarms {
                    self.alarms.acknowledge_in_history(&alarm.id, now);
                }
            }
            _ => {}
        }
        self.state = next;

        let description = command.describe();
        let ctx = LogContext::new()
            .with_tick(self.tick_count)
            .with_scenario(self.state.active_scenario.as_deref());
        log_system_event(
            Some(&ctx),
            EventOrigin::Operator,
            command.kind(),
            &description,
            SystemEventOutcome::Success,
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_command(command.kind(), "applied");
        }
        let event = OperatorEvent {
            kind: command.kind().to_owned(),
            description,
            at: now,
            payload,
        };
        self.bus.emit(PlantEvent::Operator(&event));
        self.bus.emit(PlantEvent::StateUpdate(&self.state));
        Ok(())
    }

    fn reject(&self, kind: &str, err: &CommandError) {
        log_system_event(
            Some(&LogContext::new().with_tick(self.tick_count)),
            EventOrigin::Operator,
            kind,
            &err.to_string(),
            SystemEventOutcome::Rejected,
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_command(kind, "rejected");
        }
    }

    /// Replace the state with `apply(current)` outside of any scenario step.
    pub fn inject_scenario<F>(&mut self, apply: F)
    where
        F: FnOnce(&ProcessState) -> ProcessState,
    {
        self.state = apply(&self.state);
    }

    /// Add or replace a scenario in the engine's library.
    pub fn register_scenario(&mut self, scenario: ScenarioDefinition) -> Result<(), EngineError> {
        scenario.validate()?;
        debug!(scenario = %scenario.id, steps = scenario.steps.len(), "scenario registered");
        self.library.insert(scenario.id.clone(), scenario);
        Ok(())
    }

    /// Load a TOML scenario file into the library and return its id.
    pub fn load_scenario_file(&mut self, path: impl AsRef<Path>) -> Result<String, EngineError> {
        let scenario = ScenarioDefinition::from_file(path)?;
        let id = scenario.id.clone();
        self.register_scenario(scenario)?;
        Ok(id)
    }

    pub fn scenarios(&self) -> impl Iterator<Item = &ScenarioDefinition> {
        self.library.values()
    }

    /// Start `scenario` at the current simulated time, replacing any running one.
    pub fn start_scenario(&mut self, scenario: ScenarioDefinition) {
        let start = self.state.timestamp;
        let mut host = ScenarioContext {
            state: &mut self.state,
            bus: &mut self.bus,
            metrics: self.metrics.as_ref(),
        };
        self.scenarios.start(scenario, &mut host, start);
        self.bus.emit(PlantEvent::StateUpdate(&self.state));
    }

    pub fn start_scenario_by_id(&mut self, id: &str) -> Result<(), EngineError> {
        let scenario = self
            .library
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownScenario(id.to_owned()))?;
        self.start_scenario(scenario);
        Ok(())
    }

    pub fn stop_scenario(&mut self) {
        let mut host = ScenarioContext {
            state: &mut self.state,
            bus: &mut self.bus,
            metrics: self.metrics.as_ref(),
        };
        self.scenarios.stop(&mut host);
    }

    /// True when a scenario is running and all of its completion conditions hold.
    pub fn scenario_complete(&self) -> bool {
        self.scenarios
            .active_scenario()
            .is_some_and(|scenario| scenario.is_complete(&self.state))
    }

    /// Return the plant to design conditions at the current simulated time.
    ///
    /// Speed and the run flag are operator settings and survive the reset.
    pub fn reset(&mut self) {
        self.stop_scenario();
        let mut state = ProcessState::initial(self.state.timestamp);
        state.running = self.state.running;
        state.speed = self.state.speed;
        self.state = state;
        self.phase = DiurnalPhase::default();
        self.tick_count = 0;
        self.historian.clear();
        self.alarms.clear_history();
        log_system_event(
            None,
            EventOrigin::System,
            "simulation.reset",
            "plant reset to design conditions",
            SystemEventOutcome::Success,
        );
        self.bus.emit(PlantEvent::SimulationReset(&self.state));
    }

    pub fn set_running(&mut self, running: bool) {
        if self.state.running != running {
            wtp_info!(
                context = LogContext::new().with_tick(self.tick_count),
                "simulation {}",
                if running { "resumed" } else { "paused" }
            );
        }
        self.state.running = running;
    }

    /// Set the simulated-seconds-per-second multiplier, clamped to the supported range.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        if !speed.is_finite() {
            warn!(speed, "ignoring non-finite simulation speed");
            return self.state.speed;
        }
        self.state.speed = clamp(speed, MIN_SPEED, MAX_SPEED);
        self.state.speed
    }

    pub fn set_thresholds(&mut self, tag: impl Into<String>, set: ThresholdSet) {
        self.alarms.set_thresholds(tag, set);
    }
}
