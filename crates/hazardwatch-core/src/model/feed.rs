// ── Raw feed records ──

use serde::{Deserialize, Serialize};

/// A record as pushed by the sensor-event feed.
///
/// Only `id` and `type` are guaranteed; everything else is whatever the
/// building firmware chose to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlert {
    pub id: String,

    /// Event class tag, e.g. `"EMERGENCY"` or `"ARDUINO_EMERGENCY"`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,

    /// Set by the feed once the alert was handled elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged: Option<bool>,
}

impl RawAlert {
    /// Convenience constructor for an `EMERGENCY` record.
    pub fn emergency(id: impl Into<String>, segment: &str, cause: &str) -> Self {
        Self {
            id: id.into(),
            kind: "EMERGENCY".into(),
            cause: Some(cause.into()),
            segment: Some(segment.into()),
            acknowledged: None,
        }
    }

    /// The segment, if present and not blank.
    pub fn segment(&self) -> Option<&str> {
        self.segment.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// The cause, if present and not blank.
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feed_json_with_optional_fields() {
        let raw: RawAlert = serde_json::from_str(
            r#"{"id":"1","type":"EMERGENCY","segment":"Kitchen","cause":"Gas Leak"}"#,
        )
        .unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert_eq!(raw.kind, "EMERGENCY");
        assert_eq!(raw.segment(), Some("Kitchen"));
        assert_eq!(raw.acknowledged, None);

        let bare: RawAlert = serde_json::from_str(r#"{"id":"2","type":"STATUS"}"#)
            .unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert_eq!(bare.cause(), None);
        assert_eq!(bare.segment(), None);
    }

    #[test]
    fn blank_fields_count_as_absent() {
        let mut raw = RawAlert::emergency("1", "   ", "");
        assert_eq!(raw.segment(), None);
        assert_eq!(raw.cause(), None);

        raw.segment = Some(" Parking ".into());
        assert_eq!(raw.segment(), Some("Parking"));
    }
}
