//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Static catalogue of monitored process tags."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use indexmap::IndexMap;

use crate::state::ProcessState;

/// Monitored process value: the join key between state, alarms, and historian.
#[derive(Clone, Copy)]
pub struct TagDefinition {
    pub id: &'static str,
    pub description: &'static str,
    pub units: &'static str,
    read: fn(&ProcessState) -> f64,
}

impl TagDefinition {
    pub fn read(&self, state: &ProcessState) -> f64 {
        (self.read)(state)
    }
}

impl std::fmt::Debug for TagDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagDefinition")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("units", &self.units)
            .finish()
    }
}

macro_rules! tag {
    ($id:literal, $description:literal, $units:literal, |$state:ident| $read:expr) => {
        TagDefinition {
            id: $id,
            description: $description,
            units: $units,
            read: |$state: &ProcessState| $read,
        }
    };
}

pub const TAGS: &[TagDefinition] = &[
    tag!("FIT-101", "Raw water flow", "MGD", |s| s.intake.raw_flow),
    tag!("LIT-101", "Wet well level", "ft", |s| s.intake.wet_well_level),
    tag!("PDIT-101", "Bar screen differential pressure", "inH2O", |s| s.intake.screen_dp),
    tag!("AIT-101", "Raw water turbidity", "NTU", |s| s.intake.raw_turbidity),
    tag!("TIT-101", "Source water temperature", "degC", |s| s.intake.source_temperature),
    tag!("AIT-102", "Source water pH", "pH", |s| s.intake.source_ph),
    tag!("FIT-201", "Alum dose", "mg/L", |s| s.coagulation.alum_dose_rate),
    tag!("AIT-201", "Flocculation basin turbidity", "NTU", |s| s.coagulation.floc_turbidity),
    tag!("XI-201", "Coagulation effectiveness", "fraction", |s| s
        .coagulation
        .coagulation_effectiveness),
    tag!("AIT-301", "Clarifier effluent turbidity", "NTU", |s| s
        .sedimentation
        .clarifier_turbidity),
    tag!("LIT-301", "Sludge blanket depth", "ft", |s| s
        .sedimentation
        .sludge_blanket_depth),
    tag!("PDIT-301", "Filter head loss", "ft", |s| s.sedimentation.filter_head_loss),
    tag!("AIT-302", "Filter effluent turbidity", "NTU", |s| s
        .sedimentation
        .filter_effluent_turbidity),
    tag!("FIT-401", "Chlorine dose", "mg/L", |s| s.disinfection.chlorine_dose_rate),
    tag!("AIT-401", "Plant chlorine residual", "mg/L", |s| s.disinfection.plant_residual),
    tag!("AIT-402", "Distribution chlorine residual", "mg/L", |s| s
        .disinfection
        .distribution_residual),
    tag!("AIT-403", "Finished water pH", "pH", |s| s.disinfection.finished_ph),
    tag!("AIT-404", "Fluoride residual", "mg/L", |s| s.disinfection.fluoride_residual),
    tag!("LIT-401", "Clearwell level", "ft", |s| s.disinfection.clearwell_level),
    tag!("FIT-402", "Distribution demand", "MGD", |s| s.disinfection.distribution_demand),
];

pub fn definition(tag: &str) -> Option<&'static TagDefinition> {
    TAGS.iter().find(|def| def.id == tag)
}

/// Current value of `tag`, or `None` for an unknown tag.
pub fn value(state: &ProcessState, tag: &str) -> Option<f64> {
    definition(tag).map(|def| def.read(state))
}

/// Sample every catalogued tag in catalogue order.
pub fn extract(state: &ProcessState) -> IndexMap<&'static str, f64> {
    TAGS.iter().map(|def| (def.id, def.read(state))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;

    #[test]
    fn tag_ids_are_unique() {
        let ids: HashSet<_> = TAGS.iter().map(|def| def.id).collect();
        assert_eq!(ids.len(), TAGS.len());
    }

    #[test]
    fn extract_reads_live_values() {
        let mut state = ProcessState::initial(Utc::now());
        state.sedimentation.filter_head_loss = 6.25;
        let values = extract(&state);
        assert_eq!(values["PDIT-301"], 6.25);
        assert_eq!(values.len(), TAGS.len());
        assert_eq!(value(&state, "AIT-102"), Some(7.2));
        assert_eq!(value(&state, "NOPE-999"), None);
    }
}
