//! ---
//! wtp_section: "00-shared-runtime"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Structured logging context and event helpers."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Structured logging helpers shared by the WTP-Sim crates.

use serde::{Deserialize, Serialize};
use tracing::Level;

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Treatment stage the event concerns (intake, coagulation, ...).
    pub stage: Option<&'a str>,
    /// Equipment or valve identifier.
    pub unit: Option<&'a str>,
    /// Engine tick counter.
    pub tick: Option<u64>,
    /// Active training scenario.
    pub scenario: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a stage name.
    pub fn with_stage(mut self, stage: &'a str) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attach an equipment or valve identifier.
    pub fn with_unit(mut self, unit: &'a str) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Attach a tick value.
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Attach the active scenario id, if any.
    pub fn with_scenario(mut self, scenario: Option<&'a str>) -> Self {
        self.scenario = scenario;
        self
    }
}

/// Who initiated a logged plant event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrigin {
    /// A trainee or instructor command.
    Operator,
    /// A scripted scenario step.
    Scenario,
    /// The engine itself (reset, lifecycle).
    System,
}

impl EventOrigin {
    /// Stable lowercase label used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOrigin::Operator => "operator",
            EventOrigin::Scenario => "scenario",
            EventOrigin::System => "system",
        }
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation was rejected or ignored.
    Rejected,
    /// The operation failed.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Rejected => "rejected",
            SystemEventOutcome::Fault => "fault",
        }
    }

    fn level(&self) -> Level {
        match self {
            SystemEventOutcome::Success => Level::INFO,
            SystemEventOutcome::Rejected => Level::WARN,
            SystemEventOutcome::Fault => Level::ERROR,
        }
    }
}

/// Emit a standardized plant event with its origin and outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    origin: EventOrigin,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                origin = origin.as_str(),
                outcome = outcome.as_str(),
                stage = ctx.stage.unwrap_or(""),
                unit = ctx.unit.unwrap_or(""),
                tick = ctx.tick.unwrap_or_default(),
                scenario = ctx.scenario.unwrap_or(""),
                message = %message
            )
        };
    }
    match outcome.level() {
        Level::ERROR => emit!(Level::ERROR),
        Level::WARN => emit!(Level::WARN),
        _ => emit!(Level::INFO),
    }
}
