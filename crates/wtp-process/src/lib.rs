//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Process state model and stage transition functions."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
//! Plant process model for WTP-Sim.
//!
//! The crate holds the authoritative [`ProcessState`] shape, the numeric
//! primitives shared by every stage, the static tag catalogue, and the four
//! stage transition functions. Stage functions are pure: they take the current
//! sub-state plus upstream values and return the next sub-state.

pub mod alarm;
pub mod numeric;
pub mod parameters;
pub mod stages;
pub mod state;
pub mod tags;

pub use alarm::{Alarm, AlarmCondition, AlarmPriority};
pub use numeric::{clamp, first_order, lag_factor, lag_step, ChemicalFeed};
pub use parameters::{ProcessField, Setpoint};
pub use stages::intake::DiurnalPhase;
pub use state::{
    BackwashState, CoagulationState, DisinfectionState, EquipmentId, EquipmentStatus, IntakeState,
    ProcessState, SedimentationState, ValveId, ValveStatus,
};
pub use tags::{TagDefinition, TAGS};
