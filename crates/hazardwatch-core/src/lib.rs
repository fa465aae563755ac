// hazardwatch-core: Alert lifecycle engine between a sensor feed and notification channels.

pub mod channel;
pub mod config;
pub mod dedup;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod scheduler;
pub mod sink;
pub mod store;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use channel::NotificationChannel;
pub use config::EngineConfig;
pub use dedup::Deduplicator;
pub use dispatch::{DispatchRecord, Dispatcher};
pub use engine::{Command, CommandResult, Engine, EngineState, FeedSummary, IngestOutcome};
pub use error::CoreError;
pub use normalize::Normalizer;
pub use scheduler::{ArmedTimer, EscalationScheduler};
pub use sink::{AcknowledgmentRecord, EmergencyRecord, MemorySink, NullSink, PersistenceSink};
pub use store::{ActiveAlerts, HistoryStore, SettingsRegistry};
pub use stream::{AlertFilter, Snapshot, SnapshotStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Alert lifecycle
    Emergency, EmergencyId, HistoryEntry, LifecycleEvent, Severity, Status, Transition,
    // Feed input
    RawAlert,
    // Settings
    ChannelFlags, Contact, NotificationSettings, SettingsUpdate,
    // Notification payloads
    ChannelKind, Cue, Notification, NotificationAction, Permission,
};
