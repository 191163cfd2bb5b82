//! ---
//! wtp_section: "04-orchestration"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Simulation engine, command API, event bus, and tick runtime."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
//! Orchestration layer for WTP-Sim.
//!
//! [`SimulationEngine`] owns the [`ProcessState`](wtp_process::ProcessState)
//! together with the alarm manager, historian and scenario engine, and
//! publishes changes on an [`EventBus`]. [`PlantRuntime`] drives it from a
//! tokio task at a fixed wall-clock period.

pub mod commands;
pub mod engine;
pub mod events;
pub mod runtime;

pub use commands::{BackwashAction, CommandError, ControlCommand, PumpAction, ValveAction};
pub use engine::{EngineError, SimulationEngine};
pub use events::{EventBus, EventKind, ListenerId, OperatorEvent, PlantEvent};
pub use runtime::{PlantHandle, PlantRuntime, SharedEngine};
