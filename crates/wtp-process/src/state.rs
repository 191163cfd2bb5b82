//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Process state model and stage transition functions."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::alarm::Alarm;

/// Status of a pump, mixer, or other rotating unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentStatus {
    pub running: bool,
    pub fault: bool,
    /// Commanded speed, 0-100 %.
    pub speed: f64,
    /// Cumulative run hours; never decreases.
    pub run_hours: f64,
}

impl EquipmentStatus {
    pub fn running(speed: f64) -> Self {
        Self {
            running: true,
            fault: false,
            speed,
            run_hours: 0.0,
        }
    }

    pub fn standby(speed: f64) -> Self {
        Self {
            running: false,
            fault: false,
            speed,
            run_hours: 0.0,
        }
    }

    pub fn stopped() -> Self {
        Self::standby(0.0)
    }

    pub fn with_run_hours(mut self, run_hours: f64) -> Self {
        self.run_hours = run_hours;
        self
    }

    /// Running and not faulted.
    pub fn is_available(&self) -> bool {
        self.running && !self.fault
    }

    /// Speed as a 0-1 fraction, zero when unavailable.
    pub fn output_fraction(&self) -> f64 {
        if self.is_available() {
            (self.speed / 100.0).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Status of a modulating valve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValveStatus {
    pub open: bool,
    pub fault: bool,
    /// Position, 0-100 % open.
    pub position: f64,
}

impl ValveStatus {
    pub fn open_at(position: f64) -> Self {
        Self {
            open: position > 0.0,
            fault: false,
            position,
        }
    }

    /// Hydraulic opening as a 0-1 fraction.
    pub fn fraction(&self) -> f64 {
        (self.position / 100.0).clamp(0.0, 1.0)
    }
}

/// Addressable rotating equipment.
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
pub enum EquipmentId {
    IntakePump1,
    IntakePump2,
    AlumFeedPump,
    RapidMixer,
    FlocMixer,
    SludgePump,
    ChlorineFeedPump,
    CausticFeedPump,
    FluorideFeedPump,
}

/// Addressable valves.
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
pub enum ValveId {
    IntakeValve,
    ClearwellOutletValve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeState {
    pub pump1: EquipmentStatus,
    pub pump2: EquipmentStatus,
    pub intake_valve: ValveStatus,
    /// Raw water flow, MGD.
    pub raw_flow: f64,
    /// Wet-well level, ft.
    pub wet_well_level: f64,
    /// Bar-screen differential pressure, inH2O.
    pub screen_dp: f64,
    /// Raw turbidity as measured at the intake analyzer, NTU.
    pub raw_turbidity: f64,
    /// Operator-settable centre of the diurnal turbidity signal, NTU.
    pub source_turbidity_base: f64,
    /// Source water temperature, degrees C.
    pub source_temperature: f64,
    pub source_ph: f64,
    /// Natural inflow to the wet well, ft/s of level rise.
    pub natural_inflow: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoagulationState {
    pub alum_feed_pump: EquipmentStatus,
    pub alum_dose_setpoint: f64,
    /// Applied alum dose, mg/L.
    pub alum_dose_rate: f64,
    pub rapid_mixer: EquipmentStatus,
    pub floc_mixer: EquipmentStatus,
    pub rapid_mix_rpm: f64,
    pub floc_mix_rpm: f64,
    /// 0-1.
    pub coagulation_effectiveness: f64,
    /// Flocculation basin turbidity, NTU.
    pub floc_turbidity: f64,
}

/// Filter backwash sub-machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum BackwashState {
    #[default]
    Idle,
    Active {
        /// Simulated seconds left in the sequence.
        remaining: f64,
    },
}

impl BackwashState {
    pub fn is_active(&self) -> bool {
        matches!(self, BackwashState::Active { .. })
    }

    pub fn remaining(&self) -> f64 {
        match self {
            BackwashState::Idle => 0.0,
            BackwashState::Active { remaining } => *remaining,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SedimentationState {
    /// Clarifier effluent turbidity, NTU.
    pub clarifier_turbidity: f64,
    /// Sludge blanket depth, ft.
    pub sludge_blanket_depth: f64,
    pub sludge_pump: EquipmentStatus,
    /// Filter head loss, ft.
    pub filter_head_loss: f64,
    /// Hours since the last completed backwash.
    pub filter_run_time: f64,
    /// Combined filter effluent turbidity, NTU.
    pub filter_effluent_turbidity: f64,
    pub backwash: BackwashState,
    /// Completed backwash cycles since reset.
    pub backwash_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisinfectionState {
    pub chlorine_feed_pump: EquipmentStatus,
    pub chlorine_dose_setpoint: f64,
    pub chlorine_dose_rate: f64,
    /// Free chlorine leaving the clearwell, mg/L.
    pub plant_residual: f64,
    /// Free chlorine at the distribution monitoring point, mg/L.
    pub distribution_residual: f64,
    pub caustic_feed_pump: EquipmentStatus,
    pub ph_adjust_dose_setpoint: f64,
    pub ph_adjust_dose_rate: f64,
    pub finished_ph: f64,
    pub fluoride_feed_pump: EquipmentStatus,
    pub fluoride_dose_setpoint: f64,
    pub fluoride_dose_rate: f64,
    pub fluoride_residual: f64,
    /// Clearwell level, ft.
    pub clearwell_level: f64,
    pub clearwell_outlet_valve: ValveStatus,
    /// High-service demand drawn from the clearwell, MGD.
    pub distribution_demand: f64,
}

/// Single source of truth for the whole plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessState {
    /// Simulated clock.
    pub timestamp: DateTime<Utc>,
    /// Simulated seconds since the last reset.
    pub elapsed: f64,
    pub running: bool,
    /// Simulated seconds per wall-clock second.
    pub speed: f64,
    pub intake: IntakeState,
    pub coagulation: CoagulationState,
    pub sedimentation: SedimentationState,
    pub disinfection: DisinfectionState,
    pub alarms: Vec<Alarm>,
    pub active_scenario: Option<String>,
}

impl ProcessState {
    /// Plant at steady design conditions, clock anchored at `at`.
    pub fn initial(at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at,
            elapsed: 0.0,
            running: true,
            speed: 1.0,
            intake: IntakeState {
                pump1: EquipmentStatus::running(100.0).with_run_hours(12_450.0),
                pump2: EquipmentStatus::standby(100.0).with_run_hours(9_870.0),
                intake_valve: ValveStatus::open_at(100.0),
                raw_flow: 5.0,
                wet_well_level: 10.0,
                screen_dp: 2.0,
                raw_turbidity: 12.0,
                source_turbidity_base: 12.0,
                source_temperature: 15.0,
                source_ph: 7.2,
                natural_inflow: 0.005,
            },
            coagulation: CoagulationState {
                alum_feed_pump: EquipmentStatus::running(100.0).with_run_hours(4_310.0),
                alum_dose_setpoint: 18.0,
                alum_dose_rate: 18.0,
                rapid_mixer: EquipmentStatus::running(100.0).with_run_hours(20_115.0),
                floc_mixer: EquipmentStatus::running(100.0).with_run_hours(19_980.0),
                rapid_mix_rpm: 120.0,
                floc_mix_rpm: 30.0,
                coagulation_effectiveness: 0.84,
                floc_turbidity: 3.4,
            },
            sedimentation: SedimentationState {
                clarifier_turbidity: 0.34,
                sludge_blanket_depth: 2.5,
                sludge_pump: EquipmentStatus::running(50.0).with_run_hours(7_025.0),
                filter_head_loss: 1.0,
                filter_run_time: 0.0,
                filter_effluent_turbidity: 0.03,
                backwash: BackwashState::Idle,
                backwash_count: 0,
            },
            disinfection: DisinfectionState {
                chlorine_feed_pump: EquipmentStatus::running(100.0).with_run_hours(6_540.0),
                chlorine_dose_setpoint: 2.5,
                chlorine_dose_rate: 2.5,
                plant_residual: 1.49,
                distribution_residual: 0.82,
                caustic_feed_pump: EquipmentStatus::running(100.0).with_run_hours(5_200.0),
                ph_adjust_dose_setpoint: 2.8,
                ph_adjust_dose_rate: 2.8,
                finished_ph: 7.4,
                fluoride_feed_pump: EquipmentStatus::running(100.0).with_run_hours(3_880.0),
                fluoride_dose_setpoint: 0.7,
                fluoride_dose_rate: 0.7,
                fluoride_residual: 0.8,
                clearwell_level: 12.0,
                clearwell_outlet_valve: ValveStatus::open_at(100.0),
                distribution_demand: 5.0,
            },
            alarms: Vec::new(),
            active_scenario: None,
        }
    }

    pub fn equipment(&self, id: EquipmentId) -> &EquipmentStatus {
        match id {
            EquipmentId::IntakePump1 => &self.intake.pump1,
            EquipmentId::IntakePump2 => &self.intake.pump2,
            EquipmentId::AlumFeedPump => &self.coagulation.alum_feed_pump,
            EquipmentId::RapidMixer => &self.coagulation.rapid_mixer,
            EquipmentId::FlocMixer => &self.coagulation.floc_mixer,
            EquipmentId::SludgePump => &self.sedimentation.sludge_pump,
            EquipmentId::ChlorineFeedPump => &self.disinfection.chlorine_feed_pump,
            EquipmentId::CausticFeedPump => &self.disinfection.caustic_feed_pump,
            EquipmentId::FluorideFeedPump => &self.disinfection.fluoride_feed_pump,
        }
    }

    pub fn equipment_mut(&mut self, id: EquipmentId) -> &mut EquipmentStatus {
        match id {
            EquipmentId::IntakePump1 => &mut self.intake.pump1,
            EquipmentId::IntakePump2 => &mut self.intake.pump2,
            EquipmentId::AlumFeedPump => &mut self.coagulation.alum_feed_pump,
            EquipmentId::RapidMixer => &mut self.coagulation.rapid_mixer,
            EquipmentId::FlocMixer => &mut self.coagulation.floc_mixer,
            EquipmentId::SludgePump => &mut self.sedimentation.sludge_pump,
            EquipmentId::ChlorineFeedPump => &mut self.disinfection.chlorine_feed_pump,
            EquipmentId::CausticFeedPump => &mut self.disinfection.caustic_feed_pump,
            EquipmentId::FluorideFeedPump => &mut self.disinfection.fluoride_feed_pump,
        }
    }

    pub fn valve(&self, id: ValveId) -> &ValveStatus {
        match id {
            ValveId::IntakeValve => &self.intake.intake_valve,
            ValveId::ClearwellOutletValve => &self.disinfection.clearwell_outlet_valve,
        }
    }

    pub fn valve_mut(&mut self, id: ValveId) -> &mut ValveStatus {
        match id {
            ValveId::IntakeValve => &mut self.intake.intake_valve,
            ValveId::ClearwellOutletValve => &mut self.disinfection.clearwell_outlet_valve,
        }
    }

    pub fn alarm(&self, id: &str) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id == id)
    }

    pub fn active_alarms(&self) -> impl Iterator<Item = &Alarm> {
        self.alarms.iter().filter(|alarm| alarm.active)
    }

    pub fn unacknowledged_alarm_count(&self) -> usize {
        self.alarms
            .iter()
            .filter(|alarm| alarm.active && !alarm.acknowledged)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use strum::IntoEnumIterator;

    #[test]
    fn equipment_ids_parse_from_camel_case() {
        assert_eq!(
            "intakePump1".parse::<EquipmentId>().unwrap(),
            EquipmentId::IntakePump1
        );
        assert_eq!(EquipmentId::FlocMixer.as_ref(), "flocMixer");
        assert!("bogusPump".parse::<EquipmentId>().is_err());
    }

    #[test]
    fn accessors_cover_every_unit() {
        let mut state = ProcessState::initial(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        for id in EquipmentId::iter() {
            state.equipment_mut(id).fault = true;
            assert!(state.equipment(id).fault);
        }
        for id in ValveId::iter() {
            state.valve_mut(id).position = 25.0;
            assert_eq!(state.valve(id).fraction(), 0.25);
        }
    }

    #[test]
    fn backwash_state_serializes_with_tag() {
        let json = serde_json::to_value(BackwashState::Active { remaining: 12.5 }).unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["remaining"], 12.5);
    }
}
