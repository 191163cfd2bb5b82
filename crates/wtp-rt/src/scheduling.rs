//! ---
//! wtp_section: "00-shared-runtime"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Runtime helpers supporting the engine loop."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;
use wtp_common::time::jitter_us;

/// Async rate limiter that keeps the engine loop on a fixed wall-clock period.
///
/// Missed ticks are delayed rather than bursted, so a stalled host never
/// replays a backlog of simulated time.
#[derive(Debug)]
pub struct RateLimiter {
    interval: tokio::time::Interval,
    period: Duration,
    last: Option<Instant>,
}

/// Timing of one completed wait on the [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTiming {
    pub at: Instant,
    /// Wall-clock time since the previous tick, `None` on the first tick.
    pub since_last: Option<Duration>,
    pub jitter_us: i64,
}

impl TickTiming {
    pub fn overran(&self, period: Duration) -> bool {
        self.since_last.is_some_and(|elapsed| elapsed > period * 2)
    }
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            period,
            last: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn tick(&mut self) -> TickTiming {
        let at = self.interval.tick().await;
        let since_last = self.last.map(|previous| at.duration_since(previous));
        self.last = Some(at);
        let jitter = since_last
            .map(|elapsed| jitter_us(elapsed, self.period))
            .unwrap_or_default();
        trace!(jitter_us = jitter, "rate limiter tick");
        TickTiming {
            at,
            since_last,
            jitter_us: jitter,
        }
    }

    /// Restart the period from now, discarding the previous tick reference.
    pub fn reset(&mut self) {
        self.interval.reset();
        self.last = None;
    }
}
