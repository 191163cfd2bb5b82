//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "stage"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Clarification, sludge handling, and granular media filtration."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use crate::numeric::{accumulate_run_hours, clamp, first_order};
use crate::state::{BackwashState, CoagulationState, IntakeState, SedimentationState};

pub const BASE_CLARIFIER_EFFICIENCY: f64 = 0.9;
pub const SLUDGE_SAFE_DEPTH: f64 = 3.0;
pub const SLUDGE_PENALTY_SPAN: f64 = 6.0;
pub const MAX_SLUDGE_PENALTY: f64 = 0.5;
pub const MAX_SLUDGE_DEPTH: f64 = 10.0;
/// ft/s of blanket growth per NTU of floc turbidity per MGD.
pub const SLUDGE_ACCUMULATION: f64 = 1.0e-5;
/// ft/s of blanket withdrawal at 100 % sludge pump speed.
pub const SLUDGE_REMOVAL: f64 = 4.0e-4;
pub const CLARIFIER_TAU: f64 = 900.0;
/// ft/h of head loss per NTU of filter influent turbidity.
pub const HEAD_LOSS_RATE: f64 = 0.5;
pub const MAX_HEAD_LOSS: f64 = 15.0;
pub const CLEAN_HEAD_LOSS: f64 = 1.0;
/// Filter run hours after which head loss stops accumulating.
pub const MAX_RUN_TIME: f64 = 72.0;
pub const BACKWASH_DURATION: f64 = 600.0;
pub const FILTER_PASS_FRACTION: f64 = 0.08;
pub const BREAKTHROUGH_ONSET: f64 = 8.0;
pub const BREAKTHROUGH_FULL: f64 = 10.0;
pub const MAX_BREAKTHROUGH_PENALTY: f64 = 1.5;
pub const FILTER_TAU: f64 = 120.0;

pub fn sludge_impact(depth: f64) -> f64 {
    MAX_SLUDGE_PENALTY * clamp((depth - SLUDGE_SAFE_DEPTH) / SLUDGE_PENALTY_SPAN, 0.0, 1.0)
}

pub fn clarifier_efficiency(depth: f64) -> f64 {
    BASE_CLARIFIER_EFFICIENCY * (1.0 - sludge_impact(depth))
}

/// Extra effluent turbidity once head loss passes the breakthrough onset.
pub fn breakthrough_penalty(head_loss: f64) -> f64 {
    let span = BREAKTHROUGH_FULL - BREAKTHROUGH_ONSET;
    MAX_BREAKTHROUGH_PENALTY * clamp((head_loss - BREAKTHROUGH_ONSET) / span, 0.0, 1.0)
}

pub fn start_backwash(state: &SedimentationState) -> SedimentationState {
    if state.backwash.is_active() {
        return state.clone();
    }
    SedimentationState {
        backwash: BackwashState::Active {
            remaining: BACKWASH_DURATION,
        },
        ..state.clone()
    }
}

/// Cancel an in-progress backwash; head loss is left as-is.
pub fn abort_backwash(state: &SedimentationState) -> SedimentationState {
    SedimentationState {
        backwash: BackwashState::Idle,
        ..state.clone()
    }
}

pub fn update(
    state: &SedimentationState,
    coagulation: &CoagulationState,
    intake: &IntakeState,
    dt: f64,
) -> SedimentationState {
    let efficiency = clarifier_efficiency(state.sludge_blanket_depth);
    let clarifier_turbidity = first_order(
        state.clarifier_turbidity,
        coagulation.floc_turbidity * (1.0 - efficiency),
        dt,
        CLARIFIER_TAU,
    )
    .max(0.0);

    let accumulation = SLUDGE_ACCUMULATION * coagulation.floc_turbidity * intake.raw_flow;
    let removal = SLUDGE_REMOVAL * state.sludge_pump.output_fraction();
    let sludge_blanket_depth = clamp(
        state.sludge_blanket_depth + (accumulation - removal) * dt,
        0.0,
        MAX_SLUDGE_DEPTH,
    );

    let mut filter_head_loss = state.filter_head_loss;
    let mut filter_run_time = state.filter_run_time;
    let mut backwash_count = state.backwash_count;
    let backwash = match state.backwash {
        BackwashState::Active { remaining } => {
            let remaining = remaining - dt;
            if remaining <= 0.0 {
                filter_head_loss = CLEAN_HEAD_LOSS;
                filter_run_time = 0.0;
                backwash_count += 1;
                BackwashState::Idle
            } else {
                BackwashState::Active { remaining }
            }
        }
        BackwashState::Idle => {
            if filter_run_time < MAX_RUN_TIME {
                filter_head_loss = clamp(
                    filter_head_loss + HEAD_LOSS_RATE * clarifier_turbidity * dt / 3600.0,
                    0.0,
                    MAX_HEAD_LOSS,
                );
            }
            filter_run_time += dt / 3600.0;
            BackwashState::Idle
        }
    };

    let filter_target =
        clarifier_turbidity * FILTER_PASS_FRACTION + breakthrough_penalty(filter_head_loss);
    let filter_effluent_turbidity =
        first_order(state.filter_effluent_turbidity, filter_target, dt, FILTER_TAU).max(0.0);

    let mut sludge_pump = state.sludge_pump;
    sludge_pump.run_hours = accumulate_run_hours(&state.sludge_pump, dt);

    SedimentationState {
        clarifier_turbidity,
        sludge_blanket_depth,
        sludge_pump,
        filter_head_loss,
        filter_run_time,
        filter_effluent_turbidity,
        backwash,
        backwash_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ProcessState;
    use chrono::Utc;

    #[test]
    fn sludge_penalty_caps_at_half() {
        assert_eq!(sludge_impact(0.0), 0.0);
        assert_eq!(sludge_impact(SLUDGE_SAFE_DEPTH), 0.0);
        assert_eq!(sludge_impact(50.0), MAX_SLUDGE_PENALTY);
        assert!((clarifier_efficiency(50.0) - 0.45).abs() < 1e-9);
    }

    #[test]
    fn breakthrough_ramps_linearly() {
        assert_eq!(breakthrough_penalty(7.9), 0.0);
        assert!((breakthrough_penalty(9.0) - 0.75).abs() < 1e-9);
        assert_eq!(breakthrough_penalty(12.0), MAX_BREAKTHROUGH_PENALTY);
    }

    #[test]
    fn backwash_runs_for_exactly_its_duration() {
        let plant = ProcessState::initial(Utc::now());
        let mut state = plant.sedimentation.clone();
        state.filter_head_loss = 9.0;
        state.filter_run_time = 50.0;
        state = start_backwash(&state);
        assert_eq!(state.backwash.remaining(), BACKWASH_DURATION);

        for _ in 0..1_199 {
            state = update(&state, &plant.coagulation, &plant.intake, 0.5);
        }
        assert!(state.backwash.is_active());
        assert_eq!(state.filter_head_loss, 9.0);

        state = update(&state, &plant.coagulation, &plant.intake, 0.5);
        assert_eq!(state.backwash, BackwashState::Idle);
        assert_eq!(state.filter_head_loss, CLEAN_HEAD_LOSS);
        assert_eq!(state.filter_run_time, 0.0);
        assert_eq!(state.backwash_count, 1);
    }

    #[test]
    fn abort_keeps_head_loss() {
        let plant = ProcessState::initial(Utc::now());
        let mut state = plant.sedimentation.clone();
        state.filter_head_loss = 7.0;
        state = start_backwash(&state);
        state = update(&state, &plant.coagulation, &plant.intake, 10.0);
        state = abort_backwash(&state);
        assert_eq!(state.backwash, BackwashState::Idle);
        assert_eq!(state.filter_head_loss, 7.0);
    }

    #[test]
    fn head_loss_stops_at_run_time_trigger() {
        let plant = ProcessState::initial(Utc::now());
        let mut state = plant.sedimentation.clone();
        state.filter_run_time = MAX_RUN_TIME;
        state.filter_head_loss = 5.0;
        state = update(&state, &plant.coagulation, &plant.intake, 3_600.0);
        assert_eq!(state.filter_head_loss, 5.0);

        let mut fresh = plant.sedimentation.clone();
        let before = fresh.filter_head_loss;
        fresh = update(&fresh, &plant.coagulation, &plant.intake, 3_600.0);
        assert!(fresh.filter_head_loss > before);
    }

    #[test]
    fn stopped_sludge_pump_grows_blanket() {
        let plant = ProcessState::initial(Utc::now());
        let mut state = plant.sedimentation.clone();
        state.sludge_pump.running = false;
        let start = state.sludge_blanket_depth;
        state = update(&state, &plant.coagulation, &plant.intake, 600.0);
        assert!(state.sludge_blanket_depth > start);
    }
}
