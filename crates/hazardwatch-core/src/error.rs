// ── Core error types ──
//
// Errors surfaced by the engine API and by the collaborator traits
// (channels, persistence sinks). None of these ever abort the alert
// lifecycle itself: channel and sink failures are logged where they
// happen and only operator-facing calls return them.

use thiserror::Error;

use crate::model::ChannelKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Engine lifecycle ─────────────────────────────────────────────
    #[error("Engine is not running")]
    EngineStopped,

    #[error("Engine has already been started")]
    AlreadyStarted,

    // ── Validation errors ────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    // ── Channel errors ───────────────────────────────────────────────
    #[error("{channel} channel unavailable: {reason}")]
    ChannelUnavailable { channel: ChannelKind, reason: String },

    #[error("{channel} channel permission denied")]
    PermissionDenied { channel: ChannelKind },

    // ── Persistence errors ───────────────────────────────────────────
    #[error("Persistence write failed: {message}")]
    Persistence { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
