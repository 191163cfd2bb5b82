//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Process state model and stage transition functions."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
//! Stage transition functions, applied in dependency order each tick:
//! intake, coagulation, sedimentation, disinfection.

pub mod coagulation;
pub mod disinfection;
pub mod intake;
pub mod sedimentation;

use crate::state::ProcessState;
use intake::DiurnalPhase;

/// Run all four stages for one step of `dt` simulated seconds.
///
/// Returns the next state (timestamp untouched) and the advanced diurnal phase.
pub fn step_plant(state: &ProcessState, phase: DiurnalPhase, dt: f64) -> (ProcessState, DiurnalPhase) {
    let (intake, phase) = intake::update(&state.intake, phase, dt);
    let coagulation = coagulation::update(&state.coagulation, &intake, dt);
    let sedimentation = sedimentation::update(&state.sedimentation, &coagulation, &intake, dt);
    let disinfection = disinfection::update(
        &state.disinfection,
        &disinfection::Upstream {
            intake: &intake,
            coagulation: &coagulation,
            sedimentation: &sedimentation,
        },
        dt,
    );
    let next = ProcessState {
        intake,
        coagulation,
        sedimentation,
        disinfection,
        ..state.clone()
    };
    (next, phase)
}
