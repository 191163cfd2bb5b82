//! ---
//! wtp_section: "02-supervision"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Threshold alarm evaluation for monitored process tags."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wtp_common::config::{AlarmConfig, ThresholdSet};
use wtp_process::{tags, Alarm, AlarmCondition, ProcessState};

pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Point-in-time value refresh for an alarm that is still active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmValueUpdate {
    pub id: String,
    pub value: f64,
}

/// Alarm deltas produced by one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvaluation {
    pub new_alarms: Vec<Alarm>,
    pub cleared_alarms: Vec<Alarm>,
    pub value_updates: Vec<AlarmValueUpdate>,
}

impl AlarmEvaluation {
    /// True when no alarm was raised or cleared; value updates are not transitions.
    pub fn has_transitions(&self) -> bool {
        !self.new_alarms.is_empty() || !self.cleared_alarms.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AlarmManager {
    thresholds: IndexMap<String, ThresholdSet>,
    history: VecDeque<Alarm>,
    history_capacity: usize,
}

impl Default for AlarmManager {
    fn default() -> Self {
        Self::from_config(&AlarmConfig::default())
    }
}

impl AlarmManager {
    pub fn new(thresholds: IndexMap<String, ThresholdSet>, history_capacity: usize) -> Self {
        Self {
            thresholds,
            history: VecDeque::with_capacity(history_capacity.min(DEFAULT_HISTORY_CAPACITY)),
            history_capacity,
        }
    }

    pub fn from_config(config: &AlarmConfig) -> Self {
        Self::new(config.thresholds.clone(), config.history_capacity)
    }

    pub fn thresholds(&self) -> &IndexMap<String, ThresholdSet> {
        &self.thresholds
    }

    /// Install or replace the limits for one tag. An empty set removes the tag.
    pub fn set_thresholds(&mut self, tag: impl Into<String>, set: ThresholdSet) {
        let tag = tag.into();
        if set.is_empty() {
            self.thresholds.shift_remove(&tag);
        } else {
            debug!(tag = %tag, thresholds = ?set, "alarm thresholds updated");
            self.thresholds.insert(tag, set);
        }
    }

    pub fn replace_thresholds(&mut self, thresholds: IndexMap<String, ThresholdSet>) {
        self.thresholds = thresholds;
    }

    /// Alarm history, most recent first.
    pub fn history(&self) -> impl Iterator<Item = &Alarm> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Mirror an operator acknowledgement onto the history record of an active alarm.
    pub fn acknowledge_in_history(&mut self, id: &str, at: DateTime<Utc>) {
        if let Some(record) = self
            .history
            .iter_mut()
            .find(|alarm| alarm.id == id && alarm.active)
        {
            record.acknowledge(at);
        }
    }

    pub fn evaluate(&mut self, state: &ProcessState) -> AlarmEvaluation {
        let mut evaluation = AlarmEvaluation::default();
        let now = state.timestamp;

        for (tag, set) in &self.thresholds {
            let Some(value) = tags::value(state, tag) else {
                continue;
            };
            for (condition, limit, active) in conditions(set, value) {
                let id = Alarm::id_for(tag, condition);
                let existing = state
                    .alarms
                    .iter()
                    .find(|alarm| alarm.id == id && alarm.active);
                match (active, existing) {
                    (true, None) => {
                        let description = match tags::definition(tag) {
                            Some(def) => format!("{} {}", def.description, condition.label()),
                            None => format!("{} {}", tag, condition.label()),
                        };
                        let alarm = Alarm::raise(tag, description, condition, value, limit, now);
                        info!(alarm_id = %alarm.id, priority = %alarm.priority, value, setpoint = limit, "alarm raised");
                        evaluation.new_alarms.push(alarm);
                    }
                    (true, Some(_)) => evaluation
                        .value_updates
                        .push(AlarmValueUpdate { id, value }),
                    (false, Some(alarm)) => {
                        let mut cleared = alarm.clone();
                        cleared.value = value;
                        cleared.clear(now);
                        info!(alarm_id = %cleared.id, value, "alarm cleared");
                        evaluation.cleared_alarms.push(cleared);
                    }
                    (false, None) => {}
                }
            }
        }

        // Limits removed at runtime release whatever they were holding active.
        for alarm in state.alarms.iter().filter(|alarm| alarm.active) {
            let still_configured = self
                .thresholds
                .get(&alarm.tag)
                .is_some_and(|set| limit_for(set, alarm.condition).is_some());
            if still_configured {
                continue;
            }
            let mut cleared = alarm.clone();
            if let Some(value) = tags::value(state, &alarm.tag) {
                cleared.value = value;
            }
            cleared.clear(now);
            info!(alarm_id = %cleared.id, "alarm cleared, limit no longer configured");
            evaluation.cleared_alarms.push(cleared);
        }

        for alarm in &evaluation.new_alarms {
            self.push_history(alarm.clone());
        }
        for cleared in &evaluation.cleared_alarms {
            if let Some(record) = self
                .history
                .iter_mut()
                .find(|alarm| alarm.id == cleared.id && alarm.active)
            {
                record.clear(now);
            }
        }
        evaluation
    }

    fn push_history(&mut self, alarm: Alarm) {
        if self.history_capacity == 0 {
            return;
        }
        self.history.push_front(alarm);
        self.history.truncate(self.history_capacity);
    }
}

fn limit_for(set: &ThresholdSet, condition: AlarmCondition) -> Option<f64> {
    match condition {
        AlarmCondition::HighHigh => set.hh,
        AlarmCondition::High => set.h,
        AlarmCondition::Low => set.l,
        AlarmCondition::LowLow => set.ll,
    }
}

/// Which conditions of `set` hold for `value`. HH suppresses H, LL suppresses L.
fn conditions(set: &ThresholdSet, value: f64) -> Vec<(AlarmCondition, f64, bool)> {
    let mut out = Vec::with_capacity(4);
    let hh_active = set.hh.is_some_and(|limit| value >= limit);
    let ll_active = set.ll.is_some_and(|limit| value <= limit);
    if let Some(limit) = set.hh {
        out.push((AlarmCondition::HighHigh, limit, hh_active));
    }
    if let Some(limit) = set.h {
        out.push((AlarmCondition::High, limit, value >= limit && !hh_active));
    }
    if let Some(limit) = set.l {
        out.push((AlarmCondition::Low, limit, value <= limit && !ll_active));
    }
    if let Some(limit) = set.ll {
        out.push((AlarmCondition::LowLow, limit, ll_active));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_between_bands() {
        let set = ThresholdSet::band(2.0, 4.0, 16.0, 18.0);
        let active = |value| {
            conditions(&set, value)
                .into_iter()
                .filter(|(_, _, active)| *active)
                .map(|(condition, _, _)| condition)
                .collect::<Vec<_>>()
        };
        assert_eq!(active(19.0), vec![AlarmCondition::HighHigh]);
        assert_eq!(active(17.0), vec![AlarmCondition::High]);
        assert_eq!(active(10.0), Vec::<AlarmCondition>::new());
        assert_eq!(active(3.0), vec![AlarmCondition::Low]);
        assert_eq!(active(1.0), vec![AlarmCondition::LowLow]);
    }

    #[test]
    fn partial_sets_only_report_configured_conditions() {
        let set = ThresholdSet::high(0.3, 1.0);
        assert_eq!(conditions(&set, 0.0).len(), 2);
        assert!(conditions(&ThresholdSet::default(), 5.0).is_empty());
    }

    #[test]
    fn empty_set_removes_tag() {
        let mut manager = AlarmManager::default();
        assert!(manager.thresholds().contains_key("AIT-302"));
        manager.set_thresholds("AIT-302", ThresholdSet::default());
        assert!(!manager.thresholds().contains_key("AIT-302"));
    }
}
