//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "stage"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Chlorination, pH adjustment, fluoridation, and clearwell storage."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use crate::numeric::{accumulate_run_hours, clamp, first_order, ChemicalFeed};
use crate::state::{
    CoagulationState, DisinfectionState, IntakeState, SedimentationState,
};

pub const CHLORINE_FEED: ChemicalFeed = ChemicalFeed::new(30.0, 180.0);
pub const CAUSTIC_FEED: ChemicalFeed = ChemicalFeed::new(45.0, 180.0);
pub const FLUORIDE_FEED: ChemicalFeed = ChemicalFeed::new(60.0, 300.0);
/// Fraction of applied chlorine that remains as free residual.
pub const CHLORINE_EFFICIENCY: f64 = 0.6;
/// mg/L chlorine demand per NTU of filtered water turbidity.
pub const TURBIDITY_DEMAND: f64 = 0.3;
pub const PLANT_RESIDUAL_TAU: f64 = 180.0;
pub const MAX_RESIDUAL: f64 = 10.0;
/// Bulk decay rate in the distribution system, 1/h.
pub const DISTRIBUTION_DECAY_RATE: f64 = 0.05;
/// Mean water age at the distribution monitoring point, h.
pub const DISTRIBUTION_TRAVEL_TIME: f64 = 12.0;
pub const DISTRIBUTION_TAU: f64 = 1_800.0;
/// pH units lost per mg/L alum.
pub const ALUM_PH_DEPRESSION: f64 = 0.02;
/// pH units gained per mg/L caustic.
pub const CAUSTIC_PH_FACTOR: f64 = 0.2;
pub const PH_TAU: f64 = 300.0;
pub const PH_MIN: f64 = 6.0;
pub const PH_MAX: f64 = 9.5;
pub const FLUORIDE_BACKGROUND: f64 = 0.1;
pub const FLUORIDE_TAU: f64 = 600.0;
pub const MAX_FLUORIDE: f64 = 4.0;
/// Clearwell level change per second per MGD.
pub const CLEARWELL_COEFFICIENT: f64 = 0.001;
pub const CLEARWELL_CAPACITY: f64 = 20.0;

/// Values this stage reads from the stages computed before it in the same tick.
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a> {
    pub intake: &'a IntakeState,
    pub coagulation: &'a CoagulationState,
    pub sedimentation: &'a SedimentationState,
}

pub fn plant_residual_target(chlorine_dose: f64, filter_turbidity: f64) -> f64 {
    chlorine_dose * CHLORINE_EFFICIENCY - TURBIDITY_DEMAND * filter_turbidity
}

pub fn distribution_residual_target(plant_residual: f64) -> f64 {
    plant_residual * (-DISTRIBUTION_DECAY_RATE * DISTRIBUTION_TRAVEL_TIME).exp()
}

pub fn ph_target(source_ph: f64, alum_dose: f64, caustic_dose: f64) -> f64 {
    source_ph - ALUM_PH_DEPRESSION * alum_dose + CAUSTIC_PH_FACTOR * caustic_dose
}

pub fn update(state: &DisinfectionState, upstream: &Upstream<'_>, dt: f64) -> DisinfectionState {
    let chlorine_dose_rate = CHLORINE_FEED.step(
        state.chlorine_dose_rate,
        state.chlorine_dose_setpoint,
        state.chlorine_feed_pump.is_available(),
        dt,
    );
    let ph_adjust_dose_rate = CAUSTIC_FEED.step(
        state.ph_adjust_dose_rate,
        state.ph_adjust_dose_setpoint,
        state.caustic_feed_pump.is_available(),
        dt,
    );
    let fluoride_dose_rate = FLUORIDE_FEED.step(
        state.fluoride_dose_rate,
        state.fluoride_dose_setpoint,
        state.fluoride_feed_pump.is_available(),
        dt,
    );

    let plant_residual = clamp(
        first_order(
            state.plant_residual,
            plant_residual_target(
                chlorine_dose_rate,
                upstream.sedimentation.filter_effluent_turbidity,
            ),
            dt,
            PLANT_RESIDUAL_TAU,
        ),
        0.0,
        MAX_RESIDUAL,
    );
    let distribution_residual = clamp(
        first_order(
            state.distribution_residual,
            distribution_residual_target(plant_residual),
            dt,
            DISTRIBUTION_TAU,
        ),
        0.0,
        MAX_RESIDUAL,
    );
    let finished_ph = clamp(
        first_order(
            state.finished_ph,
            ph_target(
                upstream.intake.source_ph,
                upstream.coagulation.alum_dose_rate,
                ph_adjust_dose_rate,
            ),
            dt,
            PH_TAU,
        ),
        PH_MIN,
        PH_MAX,
    );
    let fluoride_residual = clamp(
        first_order(
            state.fluoride_residual,
            fluoride_dose_rate + FLUORIDE_BACKGROUND,
            dt,
            FLUORIDE_TAU,
        ),
        0.0,
        MAX_FLUORIDE,
    );

    let inflow = if upstream.sedimentation.backwash.is_active() {
        0.0
    } else {
        upstream.intake.raw_flow * CLEARWELL_COEFFICIENT
    };
    let outflow = state.distribution_demand
        * state.clearwell_outlet_valve.fraction()
        * CLEARWELL_COEFFICIENT;
    let clearwell_level = clamp(
        state.clearwell_level + (inflow - outflow) * dt,
        0.0,
        CLEARWELL_CAPACITY,
    );

    let mut chlorine_feed_pump = state.chlorine_feed_pump;
    chlorine_feed_pump.run_hours = accumulate_run_hours(&state.chlorine_feed_pump, dt);
    let mut caustic_feed_pump = state.caustic_feed_pump;
    caustic_feed_pump.run_hours = accumulate_run_hours(&state.caustic_feed_pump, dt);
    let mut fluoride_feed_pump = state.fluoride_feed_pump;
    fluoride_feed_pump.run_hours = accumulate_run_hours(&state.fluoride_feed_pump, dt);

    DisinfectionState {
        chlorine_feed_pump,
        chlorine_dose_rate,
        plant_residual,
        distribution_residual,
        caustic_feed_pump,
        ph_adjust_dose_rate,
        finished_ph,
        fluoride_feed_pump,
        fluoride_dose_rate,
        fluoride_residual,
        clearwell_level,
        ..state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{BackwashState, ProcessState};
    use chrono::Utc;

    fn run(plant: &ProcessState, seconds: usize) -> DisinfectionState {
        let upstream = Upstream {
            intake: &plant.intake,
            coagulation: &plant.coagulation,
            sedimentation: &plant.sedimentation,
        };
        let mut state = plant.disinfection.clone();
        for _ in 0..seconds {
            state = update(&state, &upstream, 1.0);
        }
        state
    }

    #[test]
    fn finished_ph_converges_to_balance() {
        let mut plant = ProcessState::initial(Utc::now());
        plant.disinfection.finished_ph = 6.5;
        let state = run(&plant, 3_600);
        assert!((state.finished_ph - 7.4).abs() < 0.1);
    }

    #[test]
    fn turbid_water_exerts_chlorine_demand() {
        assert!(plant_residual_target(2.5, 2.0) < plant_residual_target(2.5, 0.05));
        assert!(distribution_residual_target(1.0) < 1.0);
    }

    #[test]
    fn chlorine_feed_failure_drops_residuals() {
        let mut plant = ProcessState::initial(Utc::now());
        plant.disinfection.chlorine_feed_pump.fault = true;
        let state = run(&plant, 3_600);
        assert!(state.chlorine_dose_rate < 0.01);
        assert!(state.plant_residual < 0.05);
        assert!(state.distribution_residual < plant.disinfection.distribution_residual);
    }

    #[test]
    fn clearwell_drains_during_backwash() {
        let mut plant = ProcessState::initial(Utc::now());
        plant.sedimentation.backwash = BackwashState::Active { remaining: 600.0 };
        let state = run(&plant, 600);
        assert!((state.clearwell_level - (12.0 - 0.005 * 600.0)).abs() < 1e-6);
    }

    #[test]
    fn residuals_never_negative() {
        let mut plant = ProcessState::initial(Utc::now());
        plant.sedimentation.filter_effluent_turbidity = 50.0;
        plant.disinfection.chlorine_dose_setpoint = 0.0;
        let state = run(&plant, 600);
        assert!(state.plant_residual >= 0.0);
        assert!(state.distribution_residual >= 0.0);
    }
}
