//! ---
//! wtp_section: "03-training-scenarios"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Built-in training scenario library."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use wtp_process::{EquipmentId, ProcessField, Setpoint};

use crate::definition::{
    CompletionCondition, Difficulty, ScenarioAction, ScenarioDefinition, ScenarioStep,
};

pub const INTAKE_PUMP_FAILURE: &str = "intake-pump-1-failure";
pub const TURBIDITY_SPIKE: &str = "raw-turbidity-spike";
pub const FILTER_BREAKTHROUGH: &str = "filter-breakthrough";
pub const CHLORINE_FEED_FAILURE: &str = "chlorine-feed-failure";
pub const COLD_WATER_EVENT: &str = "cold-water-event";

fn tag_below(tag: &str, value: f64) -> CompletionCondition {
    CompletionCondition::TagBelow {
        tag: tag.to_owned(),
        value,
    }
}

fn tag_above(tag: &str, value: f64) -> CompletionCondition {
    CompletionCondition::TagAbove {
        tag: tag.to_owned(),
        value,
    }
}

/// Scenarios shipped with the simulator, in presentation order.
pub fn builtin() -> Vec<ScenarioDefinition> {
    vec![
        ScenarioDefinition {
            id: INTAKE_PUMP_FAILURE.to_owned(),
            name: "Intake Pump 1 Failure".to_owned(),
            description: "The duty raw water pump trips. Bring the standby pump online and \
                          restore plant flow."
                .to_owned(),
            difficulty: Difficulty::Beginner,
            duration_s: 1_800.0,
            steps: vec![ScenarioStep::at(
                15.0,
                ScenarioAction::EquipmentFault {
                    unit: EquipmentId::IntakePump1,
                },
            )
            .with_message("Intake pump 1 tripped on motor overload")],
            completion: vec![
                CompletionCondition::EquipmentRunning {
                    unit: EquipmentId::IntakePump2,
                },
                tag_above("FIT-101", 4.5),
            ],
        },
        ScenarioDefinition {
            id: TURBIDITY_SPIKE.to_owned(),
            name: "Raw Water Turbidity Spike".to_owned(),
            description: "A storm upstream drives source turbidity up sharply. Adjust the alum \
                          dose to keep filtered water compliant."
                .to_owned(),
            difficulty: Difficulty::Intermediate,
            duration_s: 3_600.0,
            steps: vec![ScenarioStep::at(
                30.0,
                ScenarioAction::Ramp {
                    parameter: Setpoint::SourceTurbidity,
                    target: 150.0,
                    duration_s: 900.0,
                },
            )
            .with_message("Heavy rainfall reported in the watershed")],
            completion: vec![tag_above("FIT-201", 40.0), tag_below("AIT-302", 0.3)],
        },
        ScenarioDefinition {
            id: FILTER_BREAKTHROUGH.to_owned(),
            name: "Filter Breakthrough".to_owned(),
            description: "The filter is near the end of its run and head loss is climbing. \
                          Backwash before turbidity breaks through."
                .to_owned(),
            difficulty: Difficulty::Intermediate,
            duration_s: 2_400.0,
            steps: vec![
                ScenarioStep::at(
                    0.0,
                    ScenarioAction::Preload {
                        field: ProcessField::FilterRunTime,
                        value: 60.0,
                    },
                ),
                ScenarioStep::at(
                    0.0,
                    ScenarioAction::Preload {
                        field: ProcessField::FilterHeadLoss,
                        value: 7.5,
                    },
                ),
                ScenarioStep::at(
                    60.0,
                    ScenarioAction::Preload {
                        field: ProcessField::FilterHeadLoss,
                        value: 9.0,
                    },
                )
                .with_message("Filter head loss rising rapidly"),
            ],
            completion: vec![
                CompletionCondition::BackwashCompleted { count: 1 },
                tag_below("AIT-302", 0.3),
            ],
        },
        ScenarioDefinition {
            id: CHLORINE_FEED_FAILURE.to_owned(),
            name: "Chlorine Feed Failure".to_owned(),
            description: "The chlorine feed pump fails. Restore disinfection before the \
                          residual drops out of compliance."
                .to_owned(),
            difficulty: Difficulty::Advanced,
            duration_s: 3_600.0,
            steps: vec![ScenarioStep::at(
                60.0,
                ScenarioAction::EquipmentFault {
                    unit: EquipmentId::ChlorineFeedPump,
                },
            )
            .with_message("Chlorine feed pump lost prime")],
            completion: vec![
                CompletionCondition::EquipmentRunning {
                    unit: EquipmentId::ChlorineFeedPump,
                },
                tag_above("AIT-401", 1.0),
                CompletionCondition::NoUnacknowledgedAlarms,
            ],
        },
        ScenarioDefinition {
            id: COLD_WATER_EVENT.to_owned(),
            name: "Cold Water Event".to_owned(),
            description: "Snowmelt chills the source and carries silt. Coagulation slows down; \
                          compensate with chemistry."
                .to_owned(),
            difficulty: Difficulty::Advanced,
            duration_s: 3_600.0,
            steps: vec![
                ScenarioStep::at(
                    0.0,
                    ScenarioAction::Ramp {
                        parameter: Setpoint::SourceTemperature,
                        target: 2.0,
                        duration_s: 1_200.0,
                    },
                )
                .with_message("Source temperature falling"),
                ScenarioStep::at(
                    0.0,
                    ScenarioAction::Ramp {
                        parameter: Setpoint::SourceTurbidity,
                        target: 35.0,
                        duration_s: 1_200.0,
                    },
                ),
            ],
            completion: vec![tag_above("FIT-201", 25.0), tag_below("AIT-302", 0.3)],
        },
    ]
}

pub fn find(id: &str) -> Option<ScenarioDefinition> {
    builtin().into_iter().find(|scenario| scenario.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scenarios_validate() {
        let scenarios = builtin();
        assert_eq!(scenarios.len(), 5);
        for scenario in &scenarios {
            scenario.validate().unwrap();
        }
    }

    #[test]
    fn find_by_id() {
        assert_eq!(find(INTAKE_PUMP_FAILURE).unwrap().steps[0].trigger_at, 15.0);
        assert!(find("missing").is_none());
    }
}
