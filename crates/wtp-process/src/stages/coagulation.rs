//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "stage"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Coagulant feed, rapid mix, and flocculation basin."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use crate::numeric::{accumulate_run_hours, clamp, first_order, ChemicalFeed};
use crate::state::{CoagulationState, EquipmentStatus, IntakeState};

pub const ALUM_FEED: ChemicalFeed = ChemicalFeed::new(30.0, 120.0);
/// mg/L of alum needed per NTU of raw turbidity for full effectiveness.
pub const DOSE_TURBIDITY_RATIO: f64 = 1.5;
pub const MAX_REMOVAL_FRACTION: f64 = 0.85;
pub const FLOC_TAU: f64 = 600.0;
pub const MAX_FLOC_TURBIDITY: f64 = 1_000.0;
pub const RAPID_MIX_TARGET_RPM: f64 = 120.0;
pub const FLOC_MIX_TARGET_RPM: f64 = 30.0;
pub const MIXER_TAU: f64 = 10.0;
const TEMP_FULL_EFFECT: f64 = 20.0;
const TEMP_FLOOR: f64 = 1.0;
const TEMP_FACTOR_FLOOR: f64 = 0.4;

/// Cold water slows floc formation; full effect above ~20 C.
pub fn temperature_factor(temperature: f64) -> f64 {
    let span = TEMP_FULL_EFFECT - TEMP_FLOOR;
    clamp(
        TEMP_FACTOR_FLOOR + (1.0 - TEMP_FACTOR_FLOOR) * (temperature - TEMP_FLOOR) / span,
        TEMP_FACTOR_FLOOR,
        1.0,
    )
}

pub fn effectiveness(dose: f64, raw_turbidity: f64, temperature: f64) -> f64 {
    let demand = (raw_turbidity * DOSE_TURBIDITY_RATIO).max(f64::EPSILON);
    clamp(dose / demand * temperature_factor(temperature), 0.0, 1.0)
}

/// 0.6 with both mixers idle, 1.0 with both at target speed.
pub fn mixing_factor(rapid_rpm: f64, floc_rpm: f64) -> f64 {
    0.6 + 0.2 * clamp(rapid_rpm / RAPID_MIX_TARGET_RPM, 0.0, 1.0)
        + 0.2 * clamp(floc_rpm / FLOC_MIX_TARGET_RPM, 0.0, 1.0)
}

fn mixer_rpm(mixer: &EquipmentStatus, rpm: f64, target: f64, dt: f64) -> f64 {
    let target = if mixer.is_available() { target } else { 0.0 };
    first_order(rpm, target, dt, MIXER_TAU).max(0.0)
}

pub fn update(state: &CoagulationState, intake: &IntakeState, dt: f64) -> CoagulationState {
    let alum_dose_rate = ALUM_FEED.step(
        state.alum_dose_rate,
        state.alum_dose_setpoint,
        state.alum_feed_pump.is_available(),
        dt,
    );
    let rapid_mix_rpm = mixer_rpm(&state.rapid_mixer, state.rapid_mix_rpm, RAPID_MIX_TARGET_RPM, dt);
    let floc_mix_rpm = mixer_rpm(&state.floc_mixer, state.floc_mix_rpm, FLOC_MIX_TARGET_RPM, dt);

    let coagulation_effectiveness =
        effectiveness(alum_dose_rate, intake.raw_turbidity, intake.source_temperature);
    let target = intake.raw_turbidity * (1.0 - MAX_REMOVAL_FRACTION * coagulation_effectiveness)
        / mixing_factor(rapid_mix_rpm, floc_mix_rpm);
    let floc_turbidity = clamp(
        first_order(state.floc_turbidity, target, dt, FLOC_TAU),
        0.0,
        MAX_FLOC_TURBIDITY,
    );

    let mut alum_feed_pump = state.alum_feed_pump;
    alum_feed_pump.run_hours = accumulate_run_hours(&state.alum_feed_pump, dt);
    let mut rapid_mixer = state.rapid_mixer;
    rapid_mixer.run_hours = accumulate_run_hours(&state.rapid_mixer, dt);
    let mut floc_mixer = state.floc_mixer;
    floc_mixer.run_hours = accumulate_run_hours(&state.floc_mixer, dt);

    CoagulationState {
        alum_feed_pump,
        alum_dose_setpoint: state.alum_dose_setpoint,
        alum_dose_rate,
        rapid_mixer,
        floc_mixer,
        rapid_mix_rpm,
        floc_mix_rpm,
        coagulation_effectiveness,
        floc_turbidity,
    }
}
