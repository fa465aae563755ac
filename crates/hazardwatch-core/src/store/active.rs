// ── Active alerts ──
//
// Every emergency raised this session that has not been dismissed,
// acknowledged ones included.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::model::{Emergency, EmergencyId};
use crate::stream::{Snapshot, SnapshotStream};

pub struct ActiveAlerts {
    by_id: DashMap<EmergencyId, Arc<Emergency>>,
    version: watch::Sender<u64>,
    /// Sorted by creation time, then id.
    snapshot: watch::Sender<Snapshot<Emergency>>,
}

impl ActiveAlerts {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_id: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert a new alert. Returns `false` and leaves the store untouched
    /// if the id is already present.
    pub fn insert(&self, emergency: Emergency) -> bool {
        let inserted = match self.by_id.entry(emergency.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(emergency));
                true
            }
        };
        if inserted {
            self.publish();
        }
        inserted
    }

    pub fn get(&self, id: &str) -> Option<Arc<Emergency>> {
        self.by_id.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Apply `f` to a copy of the alert and store the result if `f`
    /// returns `true`. Returns the stored alert after a change, `None` if
    /// the alert is unknown or `f` declined.
    pub fn update<F>(&self, id: &str, f: F) -> Option<Arc<Emergency>>
    where
        F: FnOnce(&mut Emergency) -> bool,
    {
        let updated = {
            let mut entry = self.by_id.get_mut(id)?;
            let mut next = Emergency::clone(entry.value());
            if !f(&mut next) {
                return None;
            }
            let next = Arc::new(next);
            *entry.value_mut() = Arc::clone(&next);
            next
        };
        self.publish();
        Some(updated)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Emergency>> {
        let removed = self.by_id.remove(id).map(|(_, v)| v);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn snapshot(&self) -> Snapshot<Emergency> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotStream<Emergency> {
        SnapshotStream::new(self.snapshot.subscribe())
    }

    /// Bumped on every mutation.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn publish(&self) {
        let mut values: Vec<Arc<Emergency>> =
            self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for ActiveAlerts {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::model::Status;

    fn alert(id: &str, age_secs: i64) -> Emergency {
        Emergency::raised(
            id.into(),
            "Kitchen",
            "Fire",
            Utc::now() - Duration::seconds(age_secs),
        )
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let store = ActiveAlerts::new();
        assert!(store.insert(alert("1", 0)));
        assert!(!store.insert(alert("1", 0)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn snapshot_is_ordered_by_creation_time() {
        let store = ActiveAlerts::new();
        store.insert(alert("new", 1));
        store.insert(alert("old", 60));

        let ids: Vec<_> = store.snapshot().iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["old", "new"]);
    }

    #[test]
    fn update_publishes_only_when_changed() {
        let store = ActiveAlerts::new();
        store.insert(alert("1", 0));
        let before = store.snapshot();

        let acked = store.update("1", |e| e.mark_acknowledged(Utc::now())).unwrap();
        assert_eq!(acked.status, Status::Acknowledged);
        assert!(store.update("1", |e| e.mark_acknowledged(Utc::now())).is_none());
        assert!(store.update("missing", |_| true).is_none());

        // Older snapshots are immutable.
        assert_eq!(before[0].status, Status::Active);
        assert_eq!(store.snapshot()[0].status, Status::Acknowledged);
        assert_eq!(store.version(), 2);
    }

    #[tokio::test]
    async fn subscribers_see_removals() {
        let store = ActiveAlerts::new();
        store.insert(alert("1", 0));
        let mut sub = store.subscribe();
        assert_eq!(sub.current().len(), 1);

        assert!(store.remove("1").is_some());
        assert!(store.remove("1").is_none());
        assert!(sub.changed().await.unwrap().is_empty());
        assert!(store.is_empty());
    }
}
