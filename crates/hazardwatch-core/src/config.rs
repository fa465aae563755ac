// ── Runtime engine configuration ──
//
// Everything the engine needs to start, already resolved and typed.
// The host (or hazardwatch-config) builds an `EngineConfig` and hands it
// in; core never reads files or environment variables itself.

use crate::error::CoreError;
use crate::model::NotificationSettings;

/// Type-tag substrings that mark a feed record as an emergency class.
pub const DEFAULT_EMERGENCY_MARKERS: &[&str] = &["EMERGENCY"];

/// Cause keywords that identify a hazard.
pub const DEFAULT_HAZARD_KEYWORDS: &[&str] = &["fire", "flame", "smoke", "gas"];

/// Number of history entries retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

const DEFAULT_ICON: &str = "/fire-emergency-icon.png";
const DEFAULT_ACKNOWLEDGED_BY: &str = "Manager";

/// Configuration for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Settings the session starts with. Operators may change them later.
    pub settings: NotificationSettings,
    /// Case-insensitive substrings of the record `type` that mark an emergency.
    pub emergency_markers: Vec<String>,
    /// Case-insensitive cause keywords.
    pub hazard_keywords: Vec<String>,
    /// Maximum number of history entries (oldest evicted first).
    pub history_capacity: usize,
    /// Icon reference passed to visual channels.
    pub notification_icon: String,
    /// Recorded as the author of acknowledgment sub-records.
    pub acknowledged_by: String,
    /// Raw ids the host already processed in an earlier session.
    pub seen_ids: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settings: NotificationSettings::default(),
            emergency_markers: DEFAULT_EMERGENCY_MARKERS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            hazard_keywords: DEFAULT_HAZARD_KEYWORDS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            notification_icon: DEFAULT_ICON.into(),
            acknowledged_by: DEFAULT_ACKNOWLEDGED_BY.into(),
            seen_ids: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.settings.validate()?;

        if self.history_capacity == 0 {
            return Err(CoreError::validation(
                "history_capacity",
                "must be at least 1",
            ));
        }
        if self.emergency_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(CoreError::validation(
                "emergency_markers",
                "at least one non-empty marker is required",
            ));
        }
        Ok(())
    }
}
