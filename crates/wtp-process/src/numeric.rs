//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Numeric primitives shared by the stage models."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use crate::state::EquipmentStatus;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Clamp `value` into `[min, max]`. NaN collapses to `min`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Fraction of the remaining distance a first-order lag covers in `dt` seconds.
///
/// A non-positive time constant means "instantaneous" and yields `1.0`.
pub fn lag_factor(dt: f64, tau: f64) -> f64 {
    if tau <= 0.0 {
        return 1.0;
    }
    clamp(1.0 - (-dt / tau).exp(), 0.0, 1.0)
}

/// Move `current` toward `target` by `factor` of the gap.
pub fn lag_step(current: f64, target: f64, factor: f64) -> f64 {
    let factor = clamp(factor, 0.0, 1.0);
    if factor >= 1.0 {
        return target;
    }
    current + (target - current) * factor
}

/// First-order lag over `dt` seconds with time constant `tau`.
pub fn first_order(current: f64, target: f64, dt: f64, tau: f64) -> f64 {
    lag_step(current, target, lag_factor(dt, tau))
}

/// Advance cumulative run hours for a unit that is running and healthy.
pub fn accumulate_run_hours(unit: &EquipmentStatus, dt: f64) -> f64 {
    if unit.is_available() && dt > 0.0 {
        unit.run_hours + dt / SECONDS_PER_HOUR
    } else {
        unit.run_hours
    }
}

/// Ramp and decay time constants for one chemical feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChemicalFeed {
    /// Seconds to approach the setpoint while the feed pump runs.
    pub ramp_tau: f64,
    /// Seconds to decay toward zero once feed stops.
    pub decay_tau: f64,
}

impl ChemicalFeed {
    pub const fn new(ramp_tau: f64, decay_tau: f64) -> Self {
        Self {
            ramp_tau,
            decay_tau,
        }
    }

    /// Next applied dose rate: ramps toward `setpoint` while `feeding`, decays to zero otherwise.
    pub fn step(&self, rate: f64, setpoint: f64, feeding: bool, dt: f64) -> f64 {
        let next = if feeding {
            first_order(rate, setpoint.max(0.0), dt, self.ramp_tau)
        } else {
            first_order(rate, 0.0, dt, self.decay_tau)
        };
        next.max(0.0)
    }
}
