//! ---
//! wtp_section: "03-training-scenarios"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Training scenarios and fault injection."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
//! Scripted training scenarios.
//!
//! A [`ScenarioDefinition`] is a timeline of fault-injection steps plus the
//! completion criteria a trainee has to reach. The [`ScenarioEngine`] plays
//! one definition at a time against a [`ScenarioHost`], which owns the plant
//! state.

pub mod definition;
pub mod engine;
pub mod library;

pub use definition::{
    CompletionCondition, Difficulty, ScenarioAction, ScenarioDefinition, ScenarioError,
    ScenarioStep,
};
pub use engine::{ScenarioEngine, ScenarioHost, SimulationEvent, SimulationEventKind};
