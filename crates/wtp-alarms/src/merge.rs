//! ---
//! wtp_section: "02-supervision"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Fold alarm deltas into the alarm list carried by the process state."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use wtp_common::time::seconds_between;
use wtp_process::Alarm;

use crate::manager::AlarmEvaluation;

/// Apply one evaluation to `current` and evict cleared alarms older than `retention_s`.
///
/// A newly raised alarm replaces any retained cleared record with the same id, so
/// each (tag, condition) pair appears at most once.
pub fn merge(
    current: &[Alarm],
    evaluation: &AlarmEvaluation,
    now: DateTime<Utc>,
    retention_s: f64,
) -> Vec<Alarm> {
    let mut alarms: Vec<Alarm> = current.to_vec();

    for update in &evaluation.value_updates {
        if let Some(alarm) = alarms
            .iter_mut()
            .find(|alarm| alarm.id == update.id && alarm.active)
        {
            alarm.value = update.value;
        }
    }

    for cleared in &evaluation.cleared_alarms {
        if let Some(alarm) = alarms
            .iter_mut()
            .find(|alarm| alarm.id == cleared.id && alarm.active)
        {
            alarm.value = cleared.value;
            alarm.clear(cleared.cleared_at.unwrap_or(now));
        }
    }

    for raised in &evaluation.new_alarms {
        alarms.retain(|alarm| alarm.id != raised.id);
        alarms.push(raised.clone());
    }

    alarms.retain(|alarm| match (alarm.active, alarm.cleared_at) {
        (false, Some(cleared_at)) => seconds_between(cleared_at, now) <= retention_s,
        _ => true,
    });
    alarms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::AlarmValueUpdate;
    use chrono::TimeZone;
    use wtp_process::AlarmCondition;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
    }

    fn raised(tag: &str, condition: AlarmCondition, t: i64) -> Alarm {
        Alarm::raise(tag, "test", condition, 1.0, 0.5, at(t))
    }

    #[test]
    fn value_updates_touch_active_records_only() {
        let alarm = raised("AIT-302", AlarmCondition::High, 0);
        let evaluation = AlarmEvaluation {
            value_updates: vec![AlarmValueUpdate {
                id: alarm.id.clone(),
                value: 0.7,
            }],
            ..Default::default()
        };
        let merged = merge(&[alarm], &evaluation, at(1), 300.0);
        assert_eq!(merged[0].value, 0.7);
    }

    #[test]
    fn reraise_replaces_cleared_record() {
        let mut old = raised("AIT-302", AlarmCondition::High, 0);
        old.clear(at(10));
        let fresh = raised("AIT-302", AlarmCondition::High, 20);
        let evaluation = AlarmEvaluation {
            new_alarms: vec![fresh.clone()],
            ..Default::default()
        };
        let merged = merge(&[old], &evaluation, at(20), 300.0);
        assert_eq!(merged, vec![fresh]);
    }

    #[test]
    fn cleared_alarms_evicted_after_retention() {
        let mut alarm = raised("LIT-101", AlarmCondition::Low, 0);
        alarm.clear(at(10));
        let none = AlarmEvaluation::default();
        assert_eq!(merge(&[alarm.clone()], &none, at(310), 300.0).len(), 1);
        assert!(merge(&[alarm], &none, at(311), 300.0).is_empty());
    }
}
