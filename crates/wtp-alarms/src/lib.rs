//! ---
//! wtp_section: "02-supervision"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Threshold alarm evaluation for monitored process tags."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
//! Alarm evaluation for WTP-Sim.
//!
//! [`AlarmManager::evaluate`] compares the current [`ProcessState`] against the
//! configured threshold sets and reports deltas only. Folding those deltas into
//! the alarm list carried by the state is done by [`merge`], which the engine
//! calls once per tick.
//!
//! [`ProcessState`]: wtp_process::ProcessState

pub mod manager;
pub mod merge;

pub use manager::{AlarmEvaluation, AlarmManager, AlarmValueUpdate};
pub use merge::merge;
pub use wtp_common::config::ThresholdSet;
