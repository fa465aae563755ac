// ── Operator notification settings ──

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::notification::ChannelKind;
use crate::error::CoreError;

/// Shortest escalation delay an operator may configure.
pub const MIN_ESCALATION_DELAY: Duration = Duration::from_secs(1);

/// Longest escalation delay an operator may configure (30 minutes).
pub const MAX_ESCALATION_DELAY: Duration = Duration::from_secs(30 * 60);

const DEFAULT_ESCALATION_DELAY: Duration = Duration::from_secs(5 * 60);

/// Per-channel enable flags.
///
/// Persisted alongside every emergency record as `notificationChannels`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFlags {
    pub popup: bool,
    pub audible: bool,
    pub push: bool,
}

impl ChannelFlags {
    pub fn is_enabled(self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Popup => self.popup,
            ChannelKind::Audible => self.audible,
            ChannelKind::Push => self.push,
        }
    }

    pub fn set(&mut self, kind: ChannelKind, enabled: bool) {
        match kind {
            ChannelKind::Popup => self.popup = enabled,
            ChannelKind::Audible => self.audible = enabled,
            ChannelKind::Push => self.push = enabled,
        }
    }
}

impl Default for ChannelFlags {
    fn default() -> Self {
        Self {
            popup: true,
            audible: true,
            push: true,
        }
    }
}

/// Someone to be told about an emergency. Informational only: contacts
/// ride along with persisted records and never influence dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub address: String,
}

/// Process-wide notification settings.
///
/// Readers always work on an immutable snapshot taken when they need it;
/// see [`SettingsRegistry`](crate::store::SettingsRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    pub channels: ChannelFlags,
    pub escalation_enabled: bool,
    pub escalation_delay: Duration,
    pub contacts: Vec<Contact>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            channels: ChannelFlags::default(),
            escalation_enabled: true,
            escalation_delay: DEFAULT_ESCALATION_DELAY,
            contacts: Vec::new(),
        }
    }
}

impl NotificationSettings {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_escalation_delay(self.escalation_delay)?;
        for contact in &self.contacts {
            if contact.name.trim().is_empty() {
                return Err(CoreError::validation("contacts", "contact name is empty"));
            }
        }
        Ok(())
    }

    /// Produce the settings that result from applying `update`, validated.
    pub fn apply(&self, update: &SettingsUpdate) -> Result<Self, CoreError> {
        let mut next = self.clone();
        if let Some(popup) = update.popup {
            next.channels.popup = popup;
        }
        if let Some(audible) = update.audible {
            next.channels.audible = audible;
        }
        if let Some(push) = update.push {
            next.channels.push = push;
        }
        if let Some(enabled) = update.escalation_enabled {
            next.escalation_enabled = enabled;
        }
        if let Some(delay) = update.escalation_delay {
            next.escalation_delay = delay;
        }
        if let Some(ref contacts) = update.contacts {
            next.contacts.clone_from(contacts);
        }
        next.validate()?;
        Ok(next)
    }
}

fn validate_escalation_delay(delay: Duration) -> Result<(), CoreError> {
    if delay.is_zero() {
        return Err(CoreError::validation(
            "escalation_delay",
            "must be greater than zero",
        ));
    }
    if delay < MIN_ESCALATION_DELAY || delay > MAX_ESCALATION_DELAY {
        return Err(CoreError::validation(
            "escalation_delay",
            format!(
                "must be between {}s and {}s, got {}s",
                MIN_ESCALATION_DELAY.as_secs(),
                MAX_ESCALATION_DELAY.as_secs(),
                delay.as_secs_f64()
            ),
        ));
    }
    Ok(())
}

/// A partial settings edit from the operator. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub popup: Option<bool>,
    pub audible: Option<bool>,
    pub push: Option<bool>,
    pub escalation_enabled: Option<bool>,
    pub escalation_delay: Option<Duration>,
    pub contacts: Option<Vec<Contact>>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
