//! ---
//! wtp_section: "00-shared-runtime"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Shared primitives and utilities for the simulator runtime."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
//! Core shared primitives for the WTP-Sim workspace.
//! This crate exposes configuration loading, tracing initialisation, and the
//! simulated-clock helpers consumed across the workspace.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AlarmConfig, AppConfig, HistorianConfig, LoggingConfig, MetricsConfig, SimulationConfig,
    ThresholdSet,
};
pub use logging::{init_tracing, LogFormat};
