//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Named operator setpoints and directly writable process fields."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::numeric::clamp;
use crate::state::ProcessState;

/// Operator-adjustable setpoints, addressed by their camelCase key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Setpoint {
    AlumDose,
    ChlorineDose,
    PhAdjustDose,
    FluorideDose,
    SourceTurbidity,
    SourceTemperature,
    SourcePh,
    NaturalInflow,
    DistributionDemand,
}

impl Setpoint {
    /// Inclusive accepted range; writes outside it are clamped.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Setpoint::AlumDose => (0.0, 100.0),
            Setpoint::ChlorineDose => (0.0, 10.0),
            Setpoint::PhAdjustDose => (0.0, 20.0),
            Setpoint::FluorideDose => (0.0, 2.0),
            Setpoint::SourceTurbidity => (0.5, 500.0),
            Setpoint::SourceTemperature => (0.0, 35.0),
            Setpoint::SourcePh => (5.5, 9.5),
            Setpoint::NaturalInflow => (0.0, 0.02),
            Setpoint::DistributionDemand => (0.0, 10.0),
        }
    }

    pub fn get(&self, state: &ProcessState) -> f64 {
        match self {
            Setpoint::AlumDose => state.coagulation.alum_dose_setpoint,
            Setpoint::ChlorineDose => state.disinfection.chlorine_dose_setpoint,
            Setpoint::PhAdjustDose => state.disinfection.ph_adjust_dose_setpoint,
            Setpoint::FluorideDose => state.disinfection.fluoride_dose_setpoint,
            Setpoint::SourceTurbidity => state.intake.source_turbidity_base,
            Setpoint::SourceTemperature => state.intake.source_temperature,
            Setpoint::SourcePh => state.intake.source_ph,
            Setpoint::NaturalInflow => state.intake.natural_inflow,
            Setpoint::DistributionDemand => state.disinfection.distribution_demand,
        }
    }

    /// Write `value` clamped to [`Setpoint::range`]; returns the stored value.
    pub fn set(&self, state: &mut ProcessState, value: f64) -> f64 {
        let (min, max) = self.range();
        let value = clamp(value, min, max);
        let slot = match self {
            Setpoint::AlumDose => &mut state.coagulation.alum_dose_setpoint,
            Setpoint::ChlorineDose => &mut state.disinfection.chlorine_dose_setpoint,
            Setpoint::PhAdjustDose => &mut state.disinfection.ph_adjust_dose_setpoint,
            Setpoint::FluorideDose => &mut state.disinfection.fluoride_dose_setpoint,
            Setpoint::SourceTurbidity => &mut state.intake.source_turbidity_base,
            Setpoint::SourceTemperature => &mut state.intake.source_temperature,
            Setpoint::SourcePh => &mut state.intake.source_ph,
            Setpoint::NaturalInflow => &mut state.intake.natural_inflow,
            Setpoint::DistributionDemand => &mut state.disinfection.distribution_demand,
        };
        *slot = value;
        value
    }
}

/// Physical process values a training scenario may overwrite directly.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ProcessField {
    RawTurbidity,
    WetWellLevel,
    ScreenDp,
    FlocTurbidity,
    ClarifierTurbidity,
    SludgeBlanketDepth,
    FilterHeadLoss,
    FilterRunTime,
    FilterEffluentTurbidity,
    PlantResidual,
    DistributionResidual,
    FinishedPh,
    FluorideResidual,
    ClearwellLevel,
}

impl ProcessField {
    pub fn range(&self) -> (f64, f64) {
        match self {
            ProcessField::RawTurbidity => (0.0, 1_000.0),
            ProcessField::WetWellLevel => (0.0, 20.0),
            ProcessField::ScreenDp => (0.0, 15.0),
            ProcessField::FlocTurbidity => (0.0, 1_000.0),
            ProcessField::ClarifierTurbidity => (0.0, 1_000.0),
            ProcessField::SludgeBlanketDepth => (0.0, 10.0),
            ProcessField::FilterHeadLoss => (0.0, 15.0),
            ProcessField::FilterRunTime => (0.0, 1_000.0),
            ProcessField::FilterEffluentTurbidity => (0.0, 100.0),
            ProcessField::PlantResidual => (0.0, 10.0),
            ProcessField::DistributionResidual => (0.0, 10.0),
            ProcessField::FinishedPh => (6.0, 9.5),
            ProcessField::FluorideResidual => (0.0, 4.0),
            ProcessField::ClearwellLevel => (0.0, 20.0),
        }
    }

    pub fn get(&self, state: &ProcessState) -> f64 {
        match self {
            ProcessField::RawTurbidity => state.intake.raw_turbidity,
            ProcessField::WetWellLevel => state.intake.wet_well_level,
            ProcessField::ScreenDp => state.intake.screen_dp,
            ProcessField::FlocTurbidity => state.coagulation.floc_turbidity,
            ProcessField::ClarifierTurbidity => state.sedimentation.clarifier_turbidity,
            ProcessField::SludgeBlanketDepth => state.sedimentation.sludge_blanket_depth,
            ProcessField::FilterHeadLoss => state.sedimentation.filter_head_loss,
            ProcessField::FilterRunTime => state.sedimentation.filter_run_time,
            ProcessField::FilterEffluentTurbidity => state.sedimentation.filter_effluent_turbidity,
            ProcessField::PlantResidual => state.disinfection.plant_residual,
            ProcessField::DistributionResidual => state.disinfection.distribution_residual,
            ProcessField::FinishedPh => state.disinfection.finished_ph,
            ProcessField::FluorideResidual => state.disinfection.fluoride_residual,
            ProcessField::ClearwellLevel => state.disinfection.clearwell_level,
        }
    }

    pub fn set(&self, state: &mut ProcessState, value: f64) -> f64 {
        let (min, max) = self.range();
        let value = clamp(value, min, max);
        let slot = match self {
            ProcessField::RawTurbidity => &mut state.intake.raw_turbidity,
            ProcessField::WetWellLevel => &mut state.intake.wet_well_level,
            ProcessField::ScreenDp => &mut state.intake.screen_dp,
            ProcessField::FlocTurbidity => &mut state.coagulation.floc_turbidity,
            ProcessField::ClarifierTurbidity => &mut state.sedimentation.clarifier_turbidity,
            ProcessField::SludgeBlanketDepth => &mut state.sedimentation.sludge_blanket_depth,
            ProcessField::FilterHeadLoss => &mut state.sedimentation.filter_head_loss,
            ProcessField::FilterRunTime => &mut state.sedimentation.filter_run_time,
            ProcessField::FilterEffluentTurbidity => {
                &mut state.sedimentation.filter_effluent_turbidity
            }
            ProcessField::PlantResidual => &mut state.disinfection.plant_residual,
            ProcessField::DistributionResidual => &mut state.disinfection.distribution_residual,
            ProcessField::FinishedPh => &mut state.disinfection.finished_ph,
            ProcessField::FluorideResidual => &mut state.disinfection.fluoride_residual,
            ProcessField::ClearwellLevel => &mut state.disinfection.clearwell_level,
        };
        *slot = value;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use strum::IntoEnumIterator;

    #[test]
    fn setpoint_writes_are_clamped() {
        let mut state = ProcessState::initial(Utc::now());
        assert_eq!(Setpoint::ChlorineDose.set(&mut state, 25.0), 10.0);
        assert_eq!(state.disinfection.chlorine_dose_setpoint, 10.0);
        assert_eq!(Setpoint::SourcePh.set(&mut state, 1.0), 5.5);
        assert_eq!(Setpoint::SourceTurbidity.set(&mut state, f64::NAN), 0.5);
    }

    #[test]
    fn keys_parse_from_camel_case() {
        assert_eq!("phAdjustDose".parse::<Setpoint>().unwrap(), Setpoint::PhAdjustDose);
        assert_eq!(
            "filterHeadLoss".parse::<ProcessField>().unwrap(),
            ProcessField::FilterHeadLoss
        );
        assert!("bogus".parse::<Setpoint>().is_err());
    }

    #[test]
    fn initial_values_lie_inside_ranges() {
        let state = ProcessState::initial(Utc::now());
        for setpoint in Setpoint::iter() {
            let (min, max) = setpoint.range();
            let value = setpoint.get(&state);
            assert!(value >= min && value <= max, "{setpoint} = {value}");
        }
        for field in ProcessField::iter() {
            let (min, max) = field.range();
            let value = field.get(&state);
            assert!(value >= min && value <= max, "{field} = {value}");
        }
    }
}
