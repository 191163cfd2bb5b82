//! ---
//! wtp_section: "03-training-scenarios"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Training scenarios and fault injection."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wtp_common::time::seconds_between;
use wtp_logging::{log_system_event, wtp_info, EventOrigin, LogContext, SystemEventOutcome};
use wtp_process::{clamp, ProcessState, Setpoint};

use crate::definition::{ScenarioAction, ScenarioDefinition};

/// Whatever owns the plant state while a scenario plays against it.
pub trait ScenarioHost {
    fn state(&self) -> &ProcessState;

    /// Replace the plant state with `apply(current)`.
    fn inject(&mut self, apply: &dyn Fn(&ProcessState) -> ProcessState);

    fn emit_simulation_event(&mut self, event: SimulationEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationEventKind {
    ScenarioStarted,
    StepFired,
    ScenarioCompleted,
    ScenarioStopped,
}

/// Scenario lifecycle notification delivered through the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub kind: SimulationEventKind,
    pub scenario_id: String,
    pub message: String,
    /// Simulated seconds since scenario start.
    pub elapsed: f64,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveRamp {
    parameter: Setpoint,
    from: f64,
    target: f64,
    started: f64,
    duration_s: f64,
}

impl ActiveRamp {
    fn progress(&self, elapsed: f64) -> f64 {
        if self.duration_s <= 0.0 {
            return 1.0;
        }
        clamp((elapsed - self.started) / self.duration_s, 0.0, 1.0)
    }

    fn value_at(&self, elapsed: f64) -> f64 {
        self.from + (self.target - self.from) * self.progress(elapsed)
    }
}

#[derive(Debug, Clone)]
struct ActiveScenario {
    definition: ScenarioDefinition,
    started_at: DateTime<Utc>,
    fired: Vec<bool>,
    ramps: Vec<ActiveRamp>,
    completion_reported: bool,
}

/// Plays one [`ScenarioDefinition`] at a time.
#[derive(Debug, Clone, Default)]
pub struct ScenarioEngine {
    active: Option<ActiveScenario>,
}

impl ScenarioEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_scenario(&self) -> Option<&ScenarioDefinition> {
        self.active.as_ref().map(|active| &active.definition)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|active| active.started_at)
    }

    /// Simulated seconds between scenario start and `now`.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Option<f64> {
        self.started_at()
            .map(|started| seconds_between(started, now))
    }

    pub fn fired_steps(&self) -> usize {
        self.active
            .as_ref()
            .map(|active| active.fired.iter().filter(|fired| **fired).count())
            .unwrap_or_default()
    }

    /// Start `scenario`, replacing any running one. Steps due at zero fire immediately.
    pub fn start(
        &mut self,
        scenario: ScenarioDefinition,
        host: &mut dyn ScenarioHost,
        start_time: DateTime<Utc>,
    ) {
        if self.active.is_some() {
            self.stop(host);
        }
        let id = scenario.id.clone();
        let steps = scenario.steps.len();
        self.active = Some(ActiveScenario {
            fired: vec![false; steps],
            definition: scenario,
            started_at: start_time,
            ramps: Vec::new(),
            completion_reported: false,
        });

        let scenario_id = id.clone();
        host.inject(&move |state| ProcessState {
            active_scenario: Some(scenario_id.clone()),
            ..state.clone()
        });
        let ctx = LogContext::new().with_scenario(Some(&id));
        log_system_event(
            Some(&ctx),
            EventOrigin::Scenario,
            "scenario.start",
            "training scenario started",
            SystemEventOutcome::Success,
        );
        host.emit_simulation_event(SimulationEvent {
            kind: SimulationEventKind::ScenarioStarted,
            scenario_id: id,
            message: "scenario started".to_owned(),
            elapsed: 0.0,
            at: start_time,
            action: None,
        });
        self.tick(host, 0.0);
    }

    /// Stop the running scenario. Injected faults stay in place.
    pub fn stop(&mut self, host: &mut dyn ScenarioHost) {
        let Some(active) = self.active.take() else {
            return;
        };
        let at = host.state().timestamp;
        let elapsed = seconds_between(active.started_at, at);
        host.inject(&|state| ProcessState {
            active_scenario: None,
            ..state.clone()
        });
        let ctx = LogContext::new().with_scenario(Some(&active.definition.id));
        wtp_info!(context = ctx, "scenario stopped after {:.1}s", elapsed);
        host.emit_simulation_event(SimulationEvent {
            kind: SimulationEventKind::ScenarioStopped,
            scenario_id: active.definition.id,
            message: "scenario stopped".to_owned(),
            elapsed,
            at,
            action: None,
        });
    }

    /// Advance the running scenario to `elapsed` simulated seconds since start.
    ///
    /// Each step fires once, on the first tick whose `elapsed` reaches its
    /// trigger. Ramps are re-applied on every tick until they finish.
    pub fn tick(&mut self, host: &mut dyn ScenarioHost, elapsed: f64) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let duration = active.definition.duration_s;
        if duration > 0.0 && elapsed > duration {
            debug!(scenario = %active.definition.id, elapsed, duration, "scenario duration elapsed");
            self.stop(host);
            return;
        }

        let at = host.state().timestamp;
        for index in 0..active.definition.steps.len() {
            let step = &active.definition.steps[index];
            if active.fired[index] || elapsed < step.trigger_at {
                continue;
            }
            active.fired[index] = true;
            let action = step.action.clone();
            let message = step
                .message
                .clone()
                .unwrap_or_else(|| format!("{} {}", action.label(), action.parameters()));

            if let ScenarioAction::Ramp {
                parameter,
                target,
                duration_s,
            } = action
            {
                active.ramps.push(ActiveRamp {
                    parameter,
                    from: parameter.get(host.state()),
                    target,
                    started: elapsed,
                    duration_s,
                });
            } else {
                host.inject(&|state| action.apply(state));
            }

            let ctx = LogContext::new().with_scenario(Some(&active.definition.id));
            log_system_event(
                Some(&ctx),
                EventOrigin::Scenario,
                "scenario.step",
                &message,
                SystemEventOutcome::Success,
            );
            host.emit_simulation_event(SimulationEvent {
                kind: SimulationEventKind::StepFired,
                scenario_id: active.definition.id.clone(),
                message,
                elapsed,
                at,
                action: Some(action.label().to_owned()),
            });
        }

        for ramp in &active.ramps {
            let value = ramp.value_at(elapsed);
            let parameter = ramp.parameter;
            host.inject(&move |state| {
                let mut next = state.clone();
                parameter.set(&mut next, value);
                next
            });
        }
        active.ramps.retain(|ramp| ramp.progress(elapsed) < 1.0);

        if !active.completion_reported && active.definition.is_complete(host.state()) {
            active.completion_reported = true;
            wtp_info!(
                context = LogContext::new().with_scenario(Some(&active.definition.id)),
                "scenario objectives met"
            );
            host.emit_simulation_event(SimulationEvent {
                kind: SimulationEventKind::ScenarioCompleted,
                scenario_id: active.definition.id.clone(),
                message: "scenario objectives met".to_owned(),
                elapsed,
                at,
                action: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ScenarioStep;

    struct TestHost {
        state: ProcessState,
        events: Vec<SimulationEvent>,
    }

    impl ScenarioHost for TestHost {
        fn state(&self) -> &ProcessState {
            &self.state
        }

        fn inject(&mut self, apply: &dyn Fn(&ProcessState) -> ProcessState) {
            self.state = apply(&self.state);
        }

        fn emit_simulation_event(&mut self, event: SimulationEvent) {
            self.events.push(event);
        }
    }

    fn ramp_scenario() -> ScenarioDefinition {
        ScenarioDefinition {
            id: "ramp".to_owned(),
            name: "Ramp".to_owned(),
            description: String::new(),
            difficulty: Default::default(),
            duration_s: 0.0,
            steps: vec![ScenarioStep::at(
                10.0,
                ScenarioAction::Ramp {
                    parameter: Setpoint::SourceTurbidity,
                    target: 112.0,
                    duration_s: 100.0,
                },
            )],
            completion: Vec::new(),
        }
    }

    #[test]
    fn ramp_moves_linearly_then_holds() {
        let mut host = TestHost {
            state: ProcessState::initial(Utc::now()),
            events: Vec::new(),
        };
        let mut engine = ScenarioEngine::new();
        let start = host.state.timestamp;
        engine.start(ramp_scenario(), &mut host, start);

        engine.tick(&mut host, 10.0);
        assert_eq!(host.state.intake.source_turbidity_base, 12.0);
        engine.tick(&mut host, 60.0);
        assert!((host.state.intake.source_turbidity_base - 62.0).abs() < 1e-9);
        engine.tick(&mut host, 110.0);
        assert!((host.state.intake.source_turbidity_base - 112.0).abs() < 1e-9);

        host.state.intake.source_turbidity_base = 20.0;
        engine.tick(&mut host, 200.0);
        assert_eq!(host.state.intake.source_turbidity_base, 20.0);
    }

    #[test]
    fn restarting_replaces_running_scenario() {
        let mut host = TestHost {
            state: ProcessState::initial(Utc::now()),
            events: Vec::new(),
        };
        let mut engine = ScenarioEngine::new();
        let start = host.state.timestamp;
        engine.start(ramp_scenario(), &mut host, start);
        engine.start(ramp_scenario(), &mut host, start);
        let kinds: Vec<_> = host.events.iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SimulationEventKind::ScenarioStarted,
                SimulationEventKind::ScenarioStopped,
                SimulationEventKind::ScenarioStarted,
            ]
        );
        assert_eq!(host.state.active_scenario.as_deref(), Some("ramp"));
    }
}
