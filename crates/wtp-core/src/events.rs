//! ---
//! wtp_section: "04-orchestration"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Typed event bus for engine notifications."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use wtp_process::{Alarm, ProcessState};
use wtp_scenario::SimulationEvent;

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
pub enum EventKind {
    #[serde(rename = "state:update")]
    #[strum(serialize = "state:update")]
    StateUpdate,
    #[serde(rename = "alarm:new")]
    #[strum(serialize = "alarm:new")]
    AlarmNew,
    #[serde(rename = "alarm:cleared")]
    #[strum(serialize = "alarm:cleared")]
    AlarmCleared,
    #[serde(rename = "simulation:reset")]
    #[strum(serialize = "simulation:reset")]
    SimulationReset,
    #[serde(rename = "operator:event")]
    #[strum(serialize = "operator:event")]
    OperatorEvent,
    #[serde(rename = "simulation:event")]
    #[strum(serialize = "simulation:event")]
    SimulationEvent,
}

/// Operator command record, published after the command was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorEvent {
    pub kind: String,
    pub description: String,
    pub at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// Borrowed view of one notification; subscribers clone what they keep.
#[derive(Debug, Clone, Copy)]
pub enum PlantEvent<'a> {
    StateUpdate(&'a ProcessState),
    AlarmNew(&'a Alarm),
    AlarmCleared(&'a Alarm),
    SimulationReset(&'a ProcessState),
    Operator(&'a OperatorEvent),
    Simulation(&'a SimulationEvent),
}

impl PlantEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            PlantEvent::StateUpdate(_) => EventKind::StateUpdate,
            PlantEvent::AlarmNew(_) => EventKind::AlarmNew,
            PlantEvent::AlarmCleared(_) => EventKind::AlarmCleared,
            PlantEvent::SimulationReset(_) => EventKind::SimulationReset,
            PlantEvent::Operator(_) => EventKind::OperatorEvent,
            PlantEvent::Simulation(_) => EventKind::SimulationEvent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&PlantEvent<'_>) + Send>;

struct Subscription {
    id: ListenerId,
    kind: EventKind,
    listener: Listener,
}

/// Synchronous listener list. Delivery follows registration order and a
/// panicking listener unwinds through [`EventBus::emit`].
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription { id, kind, listener });
        id
    }

    /// Remove a listener; false when `id` was not registered for `kind`.
    pub fn off(&mut self, kind: EventKind, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|subscription| !(subscription.id == id && subscription.kind == kind));
        self.subscriptions.len() != before
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .iter()
            .filter(|subscription| subscription.kind == kind)
            .count()
    }

    pub fn emit(&mut self, event: PlantEvent<'_>) {
        let kind = event.kind();
        for subscription in self
            .subscriptions
            .iter_mut()
            .filter(|subscription| subscription.kind == kind)
        {
            (subscription.listener)(&event);
        }
    }
}
