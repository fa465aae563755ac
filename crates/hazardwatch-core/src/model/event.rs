// ── Lifecycle events and history snapshots ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::emergency::Emergency;

/// Transitions that leave an entry in the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Transition {
    Raised,
    Escalated,
}

/// Immutable copy of an emergency taken at a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub transition: Transition,
    pub recorded_at: DateTime<Utc>,
    pub emergency: Emergency,
}

/// Broadcast for every state change of an emergency.
///
/// Each variant carries the emergency as it looked right after the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "emergency", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Raised(Emergency),
    Escalated(Emergency),
    Acknowledged(Emergency),
    Dismissed(Emergency),
}

impl LifecycleEvent {
    pub fn emergency(&self) -> &Emergency {
        match self {
            Self::Raised(e) | Self::Escalated(e) | Self::Acknowledged(e) | Self::Dismissed(e) => e,
        }
    }
}
