//! ---
//! wtp_section: "01-process-model"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Alarm records carried inside the process state."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Operator-facing urgency of an alarm.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmPriority {
    Critical,
    High,
    Medium,
    Low,
}

/// Threshold band that was crossed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
)]
pub enum AlarmCondition {
    #[serde(rename = "HH")]
    #[strum(serialize = "HH")]
    HighHigh,
    #[serde(rename = "H")]
    #[strum(serialize = "H")]
    High,
    #[serde(rename = "L")]
    #[strum(serialize = "L")]
    Low,
    #[serde(rename = "LL")]
    #[strum(serialize = "LL")]
    LowLow,
}

impl AlarmCondition {
    pub fn priority(&self) -> AlarmPriority {
        match self {
            AlarmCondition::HighHigh | AlarmCondition::LowLow => AlarmPriority::Critical,
            AlarmCondition::High => AlarmPriority::High,
            AlarmCondition::Low => AlarmPriority::Medium,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlarmCondition::HighHigh => "High-High",
            AlarmCondition::High => "High",
            AlarmCondition::Low => "Low",
            AlarmCondition::LowLow => "Low-Low",
        }
    }
}

/// One alarm instance; identity is the (tag, condition) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: String,
    pub tag: String,
    pub description: String,
    pub priority: AlarmPriority,
    pub value: f64,
    pub setpoint: f64,
    pub condition: AlarmCondition,
    pub active: bool,
    pub acknowledged: bool,
    pub raised_at: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cleared_at: Option<DateTime<Utc>>,
}

impl Alarm {
    pub fn id_for(tag: &str, condition: AlarmCondition) -> String {
        format!("{}:{}", tag, condition)
    }

    pub fn raise(
        tag: &str,
        description: impl Into<String>,
        condition: AlarmCondition,
        value: f64,
        setpoint: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::id_for(tag, condition),
            tag: tag.to_owned(),
            description: description.into(),
            priority: condition.priority(),
            value,
            setpoint,
            condition,
            active: true,
            acknowledged: false,
            raised_at: at,
            acknowledged_at: None,
            cleared_at: None,
        }
    }

    pub fn acknowledge(&mut self, at: DateTime<Utc>) {
        if !self.acknowledged {
            self.acknowledged = true;
            self.acknowledged_at = Some(at);
        }
    }

    pub fn clear(&mut self, at: DateTime<Utc>) {
        self.active = false;
        self.cleared_at = Some(at);
    }
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} ({:.2} vs {:.2})",
            self.priority, self.id, self.description, self.value, self.setpoint
        )
    }
}
