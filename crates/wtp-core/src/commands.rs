//! ---
//! wtp_section: "04-orchestration"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Operator command parsing and application."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use wtp_process::stages::{intake, sedimentation};
use wtp_process::{clamp, EquipmentId, ProcessState, Setpoint, ValveId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command kind '{0}'")]
    UnknownKind(String),
    #[error("malformed {kind} payload: {reason}")]
    Malformed { kind: &'static str, reason: String },
    #[error("unknown {target} '{id}'")]
    UnknownTarget { target: &'static str, id: String },
    #[error("unknown {kind} action '{action}'")]
    UnknownAction { kind: &'static str, action: String },
    #[error("{0} requires a numeric value")]
    MissingValue(&'static str),
    #[error("valve {0} is faulted and does not respond")]
    ValveFaulted(ValveId),
    #[error("no alarm with id '{0}'")]
    UnknownAlarm(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PumpAction {
    Start,
    Stop,
    SetSpeed(f64),
    /// Clear a latched fault; the unit keeps its run state.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValveAction {
    Open,
    Close,
    SetPosition(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackwashAction {
    Start,
    Abort,
}

/// Typed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Pump { unit: EquipmentId, action: PumpAction },
    Valve { valve: ValveId, action: ValveAction },
    Setpoint { key: Setpoint, value: f64 },
    Backwash(BackwashAction),
    AcknowledgeAlarm { id: String },
    AcknowledgeAll,
    ClearScreen,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PumpPayload {
    pump_id: String,
    command: String,
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValvePayload {
    valve_id: String,
    command: String,
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SetpointPayload {
    key: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct BackwashPayload {
    command: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgePayload {
    alarm_id: String,
}

fn payload<T: for<'de> Deserialize<'de>>(kind: &'static str, value: &Value) -> Result<T, CommandError> {
    T::deserialize(value).map_err(|err| CommandError::Malformed {
        kind,
        reason: err.to_string(),
    })
}

impl ControlCommand {
    /// Parse the untyped `(kind, payload)` form used by front ends.
    ///
    /// | kind | payload |
    /// |------|---------|
    /// | `pump` | `{pumpId, command: start\|stop\|setSpeed\|reset, value?}` |
    /// | `valve` | `{valveId, command: open\|close\|setPosition, value?}` |
    /// | `setpoint` | `{key, value}` |
    /// | `backwash` | `{command: start\|abort}` |
    /// | `acknowledgeAlarm` | `{alarmId}` |
    /// | `acknowledgeAll`, `clearScreen` | ignored |
    pub fn parse(kind: &str, value: &Value) -> Result<Self, CommandError> {
        match kind {
            "pump" => {
                let body: PumpPayload = payload("pump", value)?;
                let unit = body
                    .pump_id
                    .parse::<EquipmentId>()
                    .map_err(|_| CommandError::UnknownTarget {
                        target: "pump",
                        id: body.pump_id.clone(),
                    })?;
                let action = match body.command.as_str() {
                    "start" => PumpAction::Start,
                    "stop" => PumpAction::Stop,
                    "reset" => PumpAction::Reset,
                    "setSpeed" => {
                        PumpAction::SetSpeed(body.value.ok_or(CommandError::MissingValue("setSpeed"))?)
                    }
                    other => {
                        return Err(CommandError::UnknownAction {
                            kind: "pump",
                            action: other.to_owned(),
                        })
                    }
                };
                Ok(ControlCommand::Pump { unit, action })
            }
            "valve" => {
                let body: ValvePayload = payload("valve", value)?;
                let valve = body
                    .valve_id
                    .parse::<ValveId>()
                    .map_err(|_| CommandError::UnknownTarget {
                        target: "valve",
                        id: body.valve_id.clone(),
                    })?;
                let action = match body.command.as_str() {
                    "open" => ValveAction::Open,
                    "close" => ValveAction::Close,
                    "setPosition" => ValveAction::SetPosition(
                        body.value.ok_or(CommandError::MissingValue("setPosition"))?,
                    ),
                    other => {
                        return Err(CommandError::UnknownAction {
                            kind: "valve",
                            action: other.to_owned(),
                        })
                    }
                };
                Ok(ControlCommand::Valve { valve, action })
            }
            "setpoint" => {
                let body: SetpointPayload = payload("setpoint", value)?;
                let key = body
                    .key
                    .parse::<Setpoint>()
                    .map_err(|_| CommandError::UnknownTarget {
                        target: "setpoint",
                        id: body.key.clone(),
                    })?;
                Ok(ControlCommand::Setpoint {
                    key,
                    value: body.value,
                })
            }
            "backwash" => {
                let body: BackwashPayload = payload("backwash", value)?;
                match body.command.as_str() {
                    "start" => Ok(ControlCommand::Backwash(BackwashAction::Start)),
                    "abort" => Ok(ControlCommand::Backwash(BackwashAction::Abort)),
                    other => Err(CommandError::UnknownAction {
                        kind: "backwash",
                        action: other.to_owned(),
                    }),
                }
            }
            "acknowledgeAlarm" => {
                let body: AcknowledgePayload = payload("acknowledgeAlarm", value)?;
                Ok(ControlCommand::AcknowledgeAlarm { id: body.alarm_id })
            }
            "acknowledgeAll" => Ok(ControlCommand::AcknowledgeAll),
            "clearScreen" => Ok(ControlCommand::ClearScreen),
            other => Err(CommandError::UnknownKind(other.to_owned())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ControlCommand::Pump { .. } => "pump",
            ControlCommand::Valve { .. } => "valve",
            ControlCommand::Setpoint { .. } => "setpoint",
            ControlCommand::Backwash(_) => "backwash",
            ControlCommand::AcknowledgeAlarm { .. } => "acknowledgeAlarm",
            ControlCommand::AcknowledgeAll => "acknowledgeAll",
            ControlCommand::ClearScreen => "clearScreen",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ControlCommand::Pump { unit, action } => match action {
                PumpAction::Start => format!("{unit} started"),
                PumpAction::Stop => format!("{unit} stopped"),
                PumpAction::SetSpeed(speed) => format!("{unit} speed set to {speed:.1}%"),
                PumpAction::Reset => format!("{unit} fault reset"),
            },
            ControlCommand::Valve { valve, action } => match action {
                ValveAction::Open => format!("{valve} opened"),
                ValveAction::Close => format!("{valve} closed"),
                ValveAction::SetPosition(position) => {
                    format!("{valve} positioned to {position:.1}%")
                }
            },
            ControlCommand::Setpoint { key, value } => format!("{key} setpoint changed to {value}"),
            ControlCommand::Backwash(BackwashAction::Start) => "filter backwash started".to_owned(),
            ControlCommand::Backwash(BackwashAction::Abort) => "filter backwash aborted".to_owned(),
            ControlCommand::AcknowledgeAlarm { id } => format!("alarm {id} acknowledged"),
            ControlCommand::AcknowledgeAll => "all alarms acknowledged".to_owned(),
            ControlCommand::ClearScreen => "bar screen cleaned".to_owned(),
        }
    }

    /// Produce the state that results from this command, stamped at `state.timestamp`.
    /// Out-of-range values are clamped rather than rejected.
    pub fn apply(&self, state: &ProcessState) -> Result<ProcessState, CommandError> {
        let mut next = state.clone();
        let now = state.timestamp;
        match self {
            ControlCommand::Pump { unit, action } => {
                let equipment = next.equipment_mut(*unit);
                match action {
                    PumpAction::Start => equipment.running = true,
                    PumpAction::Stop => equipment.running = false,
                    PumpAction::SetSpeed(speed) => equipment.speed = clamp(*speed, 0.0, 100.0),
                    PumpAction::Reset => equipment.fault = false,
                }
            }
            ControlCommand::Valve { valve, action } => {
                let status = next.valve_mut(*valve);
                if status.fault {
                    return Err(CommandError::ValveFaulted(*valve));
                }
                match action {
                    ValveAction::Open => {
                        status.open = true;
                        status.position = 100.0;
                    }
                    ValveAction::Close => {
                        status.open = false;
                        status.position = 0.0;
                    }
                    ValveAction::SetPosition(position) => {
                        status.position = clamp(*position, 0.0, 100.0);
                        status.open = status.position > 0.0;
                    }
                }
            }
            ControlCommand::Setpoint { key, value } => {
                key.set(&mut next, *value);
            }
            ControlCommand::Backwash(BackwashAction::Start) => {
                next.sedimentation = sedimentation::start_backwash(&state.sedimentation);
            }
            ControlCommand::Backwash(BackwashAction::Abort) => {
                next.sedimentation = sedimentation::abort_backwash(&state.sedimentation);
            }
            ControlCommand::AcknowledgeAlarm { id } => {
                let alarm = next
                    .alarms
                    .iter_mut()
                    .find(|alarm| alarm.id == *id)
                    .ok_or_else(|| CommandError::UnknownAlarm(id.clone()))?;
                alarm.acknowledge(now);
            }
            ControlCommand::AcknowledgeAll => {
                for alarm in next.alarms.iter_mut() {
                    alarm.acknowledge(now);
                }
            }
            ControlCommand::ClearScreen => {
                next.intake = intake::clear_screen(&state.intake);
            }
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn parses_pump_payload() {
        let command =
            ControlCommand::parse("pump", &json!({"pumpId": "intakePump2", "command": "start"}))
                .unwrap();
        assert_eq!(
            command,
            ControlCommand::Pump {
                unit: EquipmentId::IntakePump2,
                action: PumpAction::Start
            }
        );
    }

    #[test]
    fn rejects_unknown_targets_and_kinds() {
        assert_eq!(
            ControlCommand::parse("pump", &json!({"pumpId": "pump9", "command": "start"})),
            Err(CommandError::UnknownTarget {
                target: "pump",
                id: "pump9".to_owned()
            })
        );
        assert_eq!(
            ControlCommand::parse("launch", &Value::Null),
            Err(CommandError::UnknownKind("launch".to_owned()))
        );
        assert!(matches!(
            ControlCommand::parse("pump", &json!({"pumpId": "intakePump1", "command": "setSpeed"})),
            Err(CommandError::MissingValue("setSpeed"))
        ));
        assert!(matches!(
            ControlCommand::parse("setpoint", &json!({"key": "alumDose"})),
            Err(CommandError::Malformed { .. })
        ));
    }

    #[test]
    fn speed_and_position_are_clamped() {
        let state = ProcessState::initial(Utc::now());
        let next = ControlCommand::Pump {
            unit: EquipmentId::IntakePump1,
            action: PumpAction::SetSpeed(140.0),
        }
        .apply(&state)
        .unwrap();
        assert_eq!(next.intake.pump1.speed, 100.0);

        let next = ControlCommand::Valve {
            valve: ValveId::IntakeValve,
            action: ValveAction::SetPosition(-5.0),
        }
        .apply(&state)
        .unwrap();
        assert_eq!(next.intake.intake_valve.position, 0.0);
        assert!(!next.intake.intake_valve.open);
    }

    #[test]
    fn faulted_valve_ignores_commands() {
        let mut state = ProcessState::initial(Utc::now());
        state.intake.intake_valve.fault = true;
        let result = ControlCommand::Valve {
            valve: ValveId::IntakeValve,
            action: ValveAction::Close,
        }
        .apply(&state);
        assert_eq!(result, Err(CommandError::ValveFaulted(ValveId::IntakeValve)));
    }

    #[test]
    fn reset_clears_fault_without_restarting() {
        let mut state = ProcessState::initial(Utc::now());
        state.intake.pump1.fault = true;
        state.intake.pump1.running = false;
        let next = ControlCommand::Pump {
            unit: EquipmentId::IntakePump1,
            action: PumpAction::Reset,
        }
        .apply(&state)
        .unwrap();
        assert!(!next.intake.pump1.fault);
        assert!(!next.intake.pump1.running);
    }
}
