//! ---
//! wtp_section: "02-supervision"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Ring buffer of per-tick tag snapshots."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
//! In-memory time-series historian.
//!
//! One [`HistorianPoint`] is recorded per engine tick. The buffer holds a fixed
//! number of points and evicts the oldest on overflow.
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;
use wtp_common::config::HistorianConfig;
use wtp_process::{tags, ProcessState};

/// Snapshot of every catalogued tag at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorianPoint {
    pub timestamp: DateTime<Utc>,
    pub values: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct Historian {
    points: VecDeque<HistorianPoint>,
    capacity: usize,
}

impl Default for Historian {
    fn default() -> Self {
        Self::from_config(&HistorianConfig::default())
    }
}

impl Historian {
    /// A zero capacity is raised to one so the latest point is always available.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn from_config(config: &HistorianConfig) -> Self {
        Self::new(config.capacity)
    }

    pub fn record(&mut self, state: &ProcessState) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        let values = tags::extract(state)
            .into_iter()
            .map(|(tag, value)| (tag.to_owned(), value))
            .collect();
        self.points.push_back(HistorianPoint {
            timestamp: state.timestamp,
            values,
        });
        trace!(points = self.points.len(), "historian sample recorded");
    }

    /// Samples of `tag` within `duration_s` of the newest point, oldest first.
    /// Tags absent from a point read as `0.0`. A window reaching past the
    /// calendar range (or an infinite one) covers the whole buffer.
    pub fn tag_history(&self, tag: &str, duration_s: f64) -> Vec<TagSample> {
        let Some(latest) = self.points.back() else {
            return Vec::new();
        };
        let cutoff = wtp_common::time::checked_advance(latest.timestamp, -duration_s.max(0.0));
        self.points
            .iter()
            .filter(|point| cutoff.map_or(true, |cutoff| point.timestamp >= cutoff))
            .map(|point| TagSample {
                timestamp: point.timestamp,
                value: point.values.get(tag).copied().unwrap_or(0.0),
            })
            .collect()
    }

    pub fn latest(&self) -> Option<&HistorianPoint> {
        self.points.back()
    }

    pub fn points(&self) -> impl Iterator<Item = &HistorianPoint> {
        self.points.iter()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn state_at(seconds: i64) -> ProcessState {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut state = ProcessState::initial(start + chrono::Duration::seconds(seconds));
        state.intake.raw_flow = seconds as f64;
        state
    }

    #[test]
    fn oldest_points_are_evicted() {
        let mut historian = Historian::new(3);
        for t in 0..5 {
            historian.record(&state_at(t));
        }
        assert_eq!(historian.len(), 3);
        let flows: Vec<f64> = historian
            .tag_history("FIT-101", 3_600.0)
            .iter()
            .map(|sample| sample.value)
            .collect();
        assert_eq!(flows, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn window_never_returns_older_points() {
        let mut historian = Historian::new(100);
        for t in 0..60 {
            historian.record(&state_at(t));
        }
        let latest = historian.latest().unwrap().timestamp;
        let window = historian.tag_history("FIT-101", 10.0);
        assert_eq!(window.len(), 11);
        assert!(window
            .iter()
            .all(|sample| sample.timestamp >= latest - chrono::Duration::seconds(10)));
    }

    #[test]
    fn unbounded_windows_return_whole_buffer() {
        let mut historian = Historian::new(100);
        for t in 0..10 {
            historian.record(&state_at(t));
        }
        assert_eq!(historian.tag_history("FIT-101", f64::INFINITY).len(), 10);
        assert_eq!(historian.tag_history("FIT-101", 1.0e13).len(), 10);
        assert_eq!(historian.tag_history("FIT-101", f64::MAX).len(), 10);
        assert_eq!(historian.tag_history("FIT-101", f64::NAN).len(), 1);
        assert_eq!(historian.tag_history("FIT-101", -5.0).len(), 1);
    }

    #[test]
    fn unknown_tag_reads_zero() {
        let mut historian = Historian::new(10);
        historian.record(&state_at(0));
        let samples = historian.tag_history("NOPE-1", 60.0);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 0.0);
    }

    #[test]
    fn clear_empties_buffer() {
        let mut historian = Historian::new(0);
        assert_eq!(historian.capacity(), 1);
        historian.record(&state_at(1));
        historian.record(&state_at(2));
        assert_eq!(historian.len(), 1);
        historian.clear();
        assert!(historian.is_empty());
        assert!(historian.tag_history("FIT-101", 60.0).is_empty());
    }
}
