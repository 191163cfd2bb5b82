//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "stage"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Raw water intake: pumps, wet well, screens, source quality."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::f64::consts::PI;

use crate::numeric::{accumulate_run_hours, clamp, first_order};
use crate::state::{EquipmentStatus, IntakeState};

/// Rated flow of one intake pump at 100 % speed, MGD.
pub const PUMP_RATED_FLOW: f64 = 5.0;
pub const MAX_RAW_FLOW: f64 = 10.0;
pub const FLOW_TAU: f64 = 5.0;
/// Level drop per second per MGD drawn from the wet well.
pub const OUTFLOW_COEFFICIENT: f64 = 0.001;
pub const MAX_WET_WELL_LEVEL: f64 = 20.0;
pub const SCREEN_DP_DRIFT: f64 = 0.0005;
pub const SCREEN_DP_MAX: f64 = 15.0;
pub const SCREEN_DP_CLEAN: f64 = 2.0;
pub const TURBIDITY_TAU: f64 = 300.0;
pub const DIURNAL_AMPLITUDE: f64 = 0.15;
pub const DIURNAL_PERIOD: f64 = 86_400.0;

/// Seconds into the diurnal turbidity cycle, threaded explicitly between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiurnalPhase(pub f64);

impl DiurnalPhase {
    pub fn advance(self, dt: f64) -> Self {
        DiurnalPhase((self.0 + dt.max(0.0)) % DIURNAL_PERIOD)
    }

    /// Multiplier applied to the base turbidity, centred on 1.0.
    pub fn turbidity_multiplier(&self) -> f64 {
        1.0 + DIURNAL_AMPLITUDE * (2.0 * PI * self.0 / DIURNAL_PERIOD).sin()
    }
}

fn pump_flow(pump: &EquipmentStatus) -> f64 {
    pump.output_fraction() * PUMP_RATED_FLOW
}

pub fn target_flow(state: &IntakeState) -> f64 {
    (pump_flow(&state.pump1) + pump_flow(&state.pump2)) * state.intake_valve.fraction()
}

pub fn update(state: &IntakeState, phase: DiurnalPhase, dt: f64) -> (IntakeState, DiurnalPhase) {
    let phase = phase.advance(dt);

    let raw_flow = clamp(
        first_order(state.raw_flow, target_flow(state), dt, FLOW_TAU),
        0.0,
        MAX_RAW_FLOW,
    );
    let wet_well_level = clamp(
        state.wet_well_level + (state.natural_inflow - raw_flow * OUTFLOW_COEFFICIENT) * dt,
        0.0,
        MAX_WET_WELL_LEVEL,
    );
    let screen_dp = clamp(
        state.screen_dp + SCREEN_DP_DRIFT * dt,
        0.0,
        SCREEN_DP_MAX,
    );
    let turbidity_target = state.source_turbidity_base * phase.turbidity_multiplier();
    let raw_turbidity = first_order(state.raw_turbidity, turbidity_target, dt, TURBIDITY_TAU).max(0.0);

    let mut pump1 = state.pump1;
    pump1.run_hours = accumulate_run_hours(&state.pump1, dt);
    let mut pump2 = state.pump2;
    pump2.run_hours = accumulate_run_hours(&state.pump2, dt);

    let next = IntakeState {
        pump1,
        pump2,
        raw_flow,
        wet_well_level,
        screen_dp,
        raw_turbidity,
        ..state.clone()
    };
    (next, phase)
}

/// Screen differential pressure right after a manual rake/clean.
pub fn clear_screen(state: &IntakeState) -> IntakeState {
    IntakeState {
        screen_dp: SCREEN_DP_CLEAN,
        ..state.clone()
    }
}
