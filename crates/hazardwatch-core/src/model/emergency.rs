// ── Emergency domain types ──

use std::borrow::{Borrow, Cow};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Appended to the display segment of an escalated alert's notifications.
/// The stored `segment` field never carries it.
pub const ESCALATION_MARKER: &str = " - ESCALATED";

/// Identifier of an emergency, equal to the raw feed event id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmergencyId(String);

impl EmergencyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmergencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmergencyId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for EmergencyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for EmergencyId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    CriticalEscalated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Active,
    Acknowledged,
    Dismissed,
}

/// One hazard alert, tracked from the moment the feed raised it until an
/// operator acknowledges or dismisses it.
///
/// Serialized in camelCase: this is also the record shape handed to the
/// persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emergency {
    pub id: EmergencyId,
    pub segment: String,
    pub cause: String,
    pub severity: Severity,
    pub status: Status,
    pub escalated: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_at: Option<DateTime<Utc>>,
}

impl Emergency {
    /// A freshly raised alert: active, critical, not escalated.
    pub fn raised(
        id: EmergencyId,
        segment: impl Into<String>,
        cause: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            segment: segment.into(),
            cause: cause.into(),
            severity: Severity::Critical,
            status: Status::Active,
            escalated: false,
            created_at: at,
            acknowledged_at: None,
            escalated_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Escalation only ever applies once, and only to an active alert.
    pub fn can_escalate(&self) -> bool {
        self.is_active() && !self.escalated
    }

    /// Segment text for notification payloads, marked once escalated.
    pub fn display_segment(&self) -> Cow<'_, str> {
        if self.escalated {
            Cow::Owned(format!("{}{ESCALATION_MARKER}", self.segment))
        } else {
            Cow::Borrowed(&self.segment)
        }
    }

    /// Promote to the escalated tier. Returns `false` (and leaves the alert
    /// untouched) if it is no longer active or has already escalated.
    pub(crate) fn mark_escalated(&mut self, at: DateTime<Utc>) -> bool {
        if !self.can_escalate() {
            return false;
        }
        self.escalated = true;
        self.severity = Severity::CriticalEscalated;
        self.escalated_at = Some(at);
        true
    }

    /// Returns `false` if the alert was not active.
    pub(crate) fn mark_acknowledged(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = Status::Acknowledged;
        self.acknowledged_at = Some(at);
        true
    }

    pub(crate) fn mark_dismissed(&mut self) {
        self.status = Status::Dismissed;
    }
}
