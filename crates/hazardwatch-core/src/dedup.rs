// ── Raw event deduplication ──

use dashmap::DashSet;

use crate::model::EmergencyId;

/// Remembers every raw id that entered the pipeline during this process.
///
/// The seen-set is not persisted. Hosts that need replay protection across
/// restarts seed it through [`with_seen`](Self::with_seen).
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: DashSet<EmergencyId>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seen<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EmergencyId>,
    {
        let seen = DashSet::new();
        for id in ids {
            seen.insert(id.into());
        }
        Self { seen }
    }

    /// Returns `true` exactly once per id. Check and mark happen under the
    /// same shard lock, so concurrent deliveries of one id race safely.
    pub fn should_process(&self, id: &str) -> bool {
        self.seen.insert(EmergencyId::from(id))
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
