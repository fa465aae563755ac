// ── Bounded transition history ──

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::watch;

use crate::model::{Emergency, HistoryEntry, Transition};
use crate::stream::{Snapshot, SnapshotStream};

/// Fixed-capacity log of raise and escalation snapshots. Once full, the
/// oldest entry is evicted for each new one.
pub struct HistoryStore {
    capacity: usize,
    entries: Mutex<VecDeque<Arc<HistoryEntry>>>,
    /// Newest first.
    snapshot: watch::Sender<Snapshot<HistoryEntry>>,
}

impl HistoryStore {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            snapshot,
        }
    }

    /// Append an immutable copy of `emergency` as it is right now.
    pub fn record(&self, transition: Transition, emergency: &Emergency) -> Arc<HistoryEntry> {
        let entry = Arc::new(HistoryEntry {
            transition,
            recorded_at: Utc::now(),
            emergency: emergency.clone(),
        });

        let values = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(Arc::clone(&entry));
            entries.iter().rev().cloned().collect::<Vec<_>>()
        };

        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        entry
    }

    /// Entries, newest first.
    pub fn snapshot(&self) -> Snapshot<HistoryEntry> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotStream<HistoryEntry> {
        SnapshotStream::new(self.snapshot.subscribe())
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
