//! ---
//! wtp_section: "03-training-scenarios"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Training scenarios and fault injection."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use wtp_process::{tags, EquipmentId, ProcessField, ProcessState, Setpoint, ValveId};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("unable to read scenario file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("scenario '{id}' is invalid: {reason}")]
    Invalid { id: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

/// Declarative training scenario, usually loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Simulated seconds before the scenario stops itself; 0 runs until stopped.
    #[serde(default)]
    pub duration_s: f64,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
    /// All conditions must hold for the scenario to count as complete.
    #[serde(default)]
    pub completion: Vec<CompletionCondition>,
}

impl ScenarioDefinition {
    /// Load a scenario from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse::<Self>()
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        let invalid = |reason: String| ScenarioError::Invalid {
            id: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty".to_owned()));
        }
        if !self.duration_s.is_finite() || self.duration_s < 0.0 {
            return Err(invalid(format!("duration_s {} must be >= 0", self.duration_s)));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if !step.trigger_at.is_finite() || step.trigger_at < 0.0 {
                return Err(invalid(format!(
                    "step {} trigger_at {} must be >= 0",
                    index, step.trigger_at
                )));
            }
            if let ScenarioAction::Ramp { duration_s, .. } = &step.action {
                if !duration_s.is_finite() || *duration_s < 0.0 {
                    return Err(invalid(format!("step {} ramp duration must be >= 0", index)));
                }
            }
        }
        for condition in &self.completion {
            if let Some(tag) = condition.tag() {
                if tags::definition(tag).is_none() {
                    return Err(invalid(format!("completion references unknown tag {}", tag)));
                }
            }
        }
        Ok(())
    }

    /// True when every completion condition holds. Scenarios without
    /// conditions never complete on their own.
    pub fn is_complete(&self, state: &ProcessState) -> bool {
        !self.completion.is_empty()
            && self
                .completion
                .iter()
                .all(|condition| condition.is_met(state))
    }
}

impl std::str::FromStr for ScenarioDefinition {
    type Err = ScenarioError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let definition = toml::from_str::<Self>(input)?;
        definition.validate()?;
        Ok(definition)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Simulated seconds after scenario start.
    pub trigger_at: f64,
    pub action: ScenarioAction,
    /// Text surfaced to the trainee when the step fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScenarioStep {
    pub fn at(trigger_at: f64, action: ScenarioAction) -> Self {
        Self {
            trigger_at,
            action,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Supported fault-injection actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioAction {
    /// Trip a pump, mixer, or feeder.
    EquipmentFault { unit: EquipmentId },
    /// Clear a fault injected earlier without restarting the unit.
    EquipmentRestore { unit: EquipmentId },
    /// Jam a valve at its current position.
    ValveFault { valve: ValveId },
    /// Move a setpoint linearly to `target` over `duration_s` simulated seconds.
    Ramp {
        parameter: Setpoint,
        target: f64,
        #[serde(default)]
        duration_s: f64,
    },
    /// Overwrite a measured process value.
    Preload { field: ProcessField, value: f64 },
    /// Step an operator setpoint.
    ForceSetpoint { key: Setpoint, value: f64 },
}

impl ScenarioAction {
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioAction::EquipmentFault { .. } => "equipment_fault",
            ScenarioAction::EquipmentRestore { .. } => "equipment_restore",
            ScenarioAction::ValveFault { .. } => "valve_fault",
            ScenarioAction::Ramp { .. } => "ramp",
            ScenarioAction::Preload { .. } => "preload",
            ScenarioAction::ForceSetpoint { .. } => "force_setpoint",
        }
    }

    pub fn parameters(&self) -> serde_json::Value {
        match self {
            ScenarioAction::EquipmentFault { unit } | ScenarioAction::EquipmentRestore { unit } => {
                serde_json::json!({ "unit": unit })
            }
            ScenarioAction::ValveFault { valve } => serde_json::json!({ "valve": valve }),
            ScenarioAction::Ramp {
                parameter,
                target,
                duration_s,
            } => serde_json::json!({
                "parameter": parameter,
                "target": target,
                "duration_s": duration_s,
            }),
            ScenarioAction::Preload { field, value } => {
                serde_json::json!({ "field": field, "value": value })
            }
            ScenarioAction::ForceSetpoint { key, value } => {
                serde_json::json!({ "key": key, "value": value })
            }
        }
    }

    /// Apply the instantaneous part of the action. Ramps are advanced by the engine.
    pub fn apply(&self, state: &ProcessState) -> ProcessState {
        let mut next = state.clone();
        match self {
            ScenarioAction::EquipmentFault { unit } => {
                let equipment = next.equipment_mut(*unit);
                equipment.fault = true;
                equipment.running = false;
            }
            ScenarioAction::EquipmentRestore { unit } => next.equipment_mut(*unit).fault = false,
            ScenarioAction::ValveFault { valve } => next.valve_mut(*valve).fault = true,
            ScenarioAction::Ramp { .. } => {}
            ScenarioAction::Preload { field, value } => {
                field.set(&mut next, *value);
            }
            ScenarioAction::ForceSetpoint { key, value } => {
                key.set(&mut next, *value);
            }
        }
        next
    }
}

/// Predicate over the plant state used to judge scenario completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionCondition {
    TagBelow { tag: String, value: f64 },
    TagAbove { tag: String, value: f64 },
    EquipmentRunning { unit: EquipmentId },
    EquipmentHealthy { unit: EquipmentId },
    BackwashCompleted {
        #[serde(default = "default_backwash_count")]
        count: u32,
    },
    NoUnacknowledgedAlarms,
}

fn default_backwash_count() -> u32 {
    1
}

impl CompletionCondition {
    fn tag(&self) -> Option<&str> {
        match self {
            CompletionCondition::TagBelow { tag, .. } | CompletionCondition::TagAbove { tag, .. } => {
                Some(tag)
            }
            _ => None,
        }
    }

    pub fn is_met(&self, state: &ProcessState) -> bool {
        match self {
            CompletionCondition::TagBelow { tag, value } => {
                tags::value(state, tag).is_some_and(|current| current < *value)
            }
            CompletionCondition::TagAbove { tag, value } => {
                tags::value(state, tag).is_some_and(|current| current > *value)
            }
            CompletionCondition::EquipmentRunning { unit } => state.equipment(*unit).is_available(),
            CompletionCondition::EquipmentHealthy { unit } => !state.equipment(*unit).fault,
            CompletionCondition::BackwashCompleted { count } => {
                state.sedimentation.backwash_count >= *count
            }
            CompletionCondition::NoUnacknowledgedAlarms => state.unacknowledged_alarm_count() == 0,
        }
    }
}
