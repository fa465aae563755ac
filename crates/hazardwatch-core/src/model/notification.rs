// ── Notification payloads handed to channels ──

use serde::{Deserialize, Serialize};

use super::emergency::{Emergency, EmergencyId, Severity};

const TITLE_RAISED: &str = "FIRE EMERGENCY ALERT";
const TITLE_ESCALATED: &str = "ESCALATED FIRE EMERGENCY ALERT";
const TITLE_ACKNOWLEDGED: &str = "Emergency acknowledged";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChannelKind {
    /// Visual, persistent on-screen alert.
    Popup,
    /// Sound playback.
    Audible,
    /// Permission-gated desktop push notification.
    Push,
}

impl ChannelKind {
    /// Whether the channel needs an explicit permission grant before use.
    pub fn is_permission_gated(self) -> bool {
        matches!(self, Self::Push)
    }
}

/// Which sound an audible channel should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Hazard,
    Acknowledged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    Acknowledge,
    DispatchServices,
}

impl NotificationAction {
    pub fn title(self) -> &'static str {
        match self {
            Self::Acknowledge => "Acknowledge",
            Self::DispatchServices => "Dispatch Emergency Services",
        }
    }
}

/// Result of a channel permission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Granted,
    Denied,
    /// Not decided yet; the operator has not been asked.
    Prompt,
}

impl Permission {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Channel-agnostic notification payload.
///
/// `tag` is the emergency id, so a persistent-notification channel that
/// receives the escalated payload replaces the original instead of
/// stacking a second one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub tag: EmergencyId,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub severity: Severity,
    pub cue: Cue,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Hazard notification for a raised or escalated emergency.
    pub fn for_emergency(emergency: &Emergency, icon: &str) -> Self {
        let title = if emergency.escalated {
            TITLE_ESCALATED
        } else {
            TITLE_RAISED
        };

        Self {
            tag: emergency.id.clone(),
            title: title.into(),
            body: format!(
                "Hazard detected in {}!\nImmediate action required.\nCause: {}",
                emergency.display_segment(),
                emergency.cause
            ),
            icon: icon.into(),
            severity: emergency.severity,
            cue: Cue::Hazard,
            require_interaction: true,
            actions: vec![
                NotificationAction::Acknowledge,
                NotificationAction::DispatchServices,
            ],
        }
    }

    /// Confirmation played/shown after an operator acknowledged the alert.
    pub fn acknowledgment(emergency: &Emergency, icon: &str) -> Self {
        Self {
            tag: emergency.id.clone(),
            title: TITLE_ACKNOWLEDGED.into(),
            body: format!("{} ({}) acknowledged", emergency.segment, emergency.cause),
            icon: icon.into(),
            severity: emergency.severity,
            cue: Cue::Acknowledged,
            require_interaction: false,
            actions: Vec::new(),
        }
    }
}
