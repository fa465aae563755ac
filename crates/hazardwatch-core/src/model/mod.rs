// ── Domain model ──
//
// Canonical representation of a hazard alert and everything that travels
// with it: the raw feed record it came from, the operator settings that
// shape its notifications, the payloads handed to channels, and the
// lifecycle events and history snapshots it leaves behind.

pub mod emergency;
pub mod event;
pub mod feed;
pub mod notification;
pub mod settings;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use hazardwatch_core::model::*` gives you everything.

pub use emergency::{ESCALATION_MARKER, Emergency, EmergencyId, Severity, Status};
pub use event::{HistoryEntry, LifecycleEvent, Transition};
pub use feed::RawAlert;
pub use notification::{ChannelKind, Cue, Notification, NotificationAction, Permission};
pub use settings::{
    ChannelFlags, Contact, MAX_ESCALATION_DELAY, MIN_ESCALATION_DELAY, NotificationSettings,
    SettingsUpdate,
};
