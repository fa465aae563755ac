// ── Feed record classification ──
//
// Turns raw feed records into canonical emergencies. The classifier is
// deliberately permissive: an emergency-class record qualifies on a
// hazard keyword in its cause OR on merely naming a segment. Anything
// else is dropped without complaint.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::config::EngineConfig;
use crate::model::{Emergency, EmergencyId, RawAlert};

const UNKNOWN_SEGMENT: &str = "Unknown location";
const UNKNOWN_CAUSE: &str = "Unspecified hazard";

#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Upper-cased type markers.
    markers: Vec<String>,
    /// Lower-cased cause keywords.
    keywords: Vec<String>,
}

impl Normalizer {
    pub fn new<M, K>(markers: M, keywords: K) -> Self
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_ascii_uppercase())
                .filter(|m| !m.is_empty())
                .collect(),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.emergency_markers, &config.hazard_keywords)
    }

    pub fn is_emergency_class(&self, raw: &RawAlert) -> bool {
        let kind = raw.kind.to_ascii_uppercase();
        self.markers.iter().any(|m| kind.contains(m.as_str()))
    }

    pub fn mentions_hazard(&self, raw: &RawAlert) -> bool {
        raw.cause().is_some_and(|cause| {
            let cause = cause.to_lowercase();
            self.keywords.iter().any(|k| cause.contains(k.as_str()))
        })
    }

    /// Whether the record should enter the alert pipeline.
    pub fn is_actionable(&self, raw: &RawAlert) -> bool {
        !raw.id.trim().is_empty()
            && raw.acknowledged != Some(true)
            && self.is_emergency_class(raw)
            && (self.mentions_hazard(raw) || raw.segment().is_some())
    }

    /// Canonical emergency for an actionable record, stamped with `now`.
    pub fn normalize(&self, raw: &RawAlert, now: DateTime<Utc>) -> Option<Emergency> {
        if !self.is_actionable(raw) {
            trace!(id = %raw.id, kind = %raw.kind, "feed record dropped by classifier");
            return None;
        }

        Some(Emergency::raised(
            EmergencyId::new(raw.id.trim()),
            raw.segment().unwrap_or(UNKNOWN_SEGMENT),
            raw.cause().unwrap_or(UNKNOWN_CAUSE),
            now,
        ))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
