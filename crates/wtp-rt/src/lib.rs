//! ---
//! wtp_section: "00-shared-runtime"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Runtime helpers supporting the engine loop."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
//! Real-time scheduling helpers for the WTP-Sim runtime.

pub mod scheduling;

pub use scheduling::{RateLimiter, TickTiming};
