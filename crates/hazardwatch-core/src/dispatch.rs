// ── Notification dispatch ──
//
// Fans an emergency out to every enabled channel and writes it to the
// persistence sink. Delivery runs on tracked background tasks so the
// caller never waits on a channel; failures are logged per channel and
// never reach the caller or sibling channels. Sink writes go through one
// queue and land in the order they were issued, independent of how long
// any channel takes.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use dashmap::DashMap;
use strum::IntoEnumIterator;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::channel::NotificationChannel;
use crate::model::{
    ChannelKind, Emergency, EmergencyId, Notification, NotificationSettings, Permission, Severity,
};
use crate::sink::{AcknowledgmentRecord, EmergencyRecord, PersistenceSink};

/// Which channels have been claimed for an emergency, per severity.
///
/// Makes re-dispatch additive: escalating an alert notifies every channel
/// again at the new severity, but replaying a dispatch at the same
/// severity notifies nobody twice. A claim is released again when the
/// channel turns out not to be permitted, so the record only keeps pairs
/// that were actually handed to a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchRecord {
    notified: BTreeSet<(Severity, ChannelKind)>,
}

impl DispatchRecord {
    pub fn has_notified(&self, severity: Severity, kind: ChannelKind) -> bool {
        self.notified.contains(&(severity, kind))
    }

    pub fn channels_at(&self, severity: Severity) -> Vec<ChannelKind> {
        self.notified
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, k)| *k)
            .collect()
    }

    /// Returns `true` if the pair was not yet recorded.
    pub(crate) fn mark(&mut self, severity: Severity, kind: ChannelKind) -> bool {
        self.notified.insert((severity, kind))
    }

    pub(crate) fn release(&mut self, severity: Severity, kind: ChannelKind) {
        self.notified.remove(&(severity, kind));
    }
}

// ── Ordered persistence ──────────────────────────────────────────────

enum PendingWrite {
    Emergency(EmergencyRecord),
    Acknowledgment(AcknowledgmentRecord),
}

impl PendingWrite {
    async fn apply(self, sink: &dyn PersistenceSink) {
        match self {
            Self::Emergency(record) => {
                if let Err(e) = sink.append_emergency(&record).await {
                    warn!(id = %record.emergency.id, error = %e, "failed to persist emergency");
                }
            }
            Self::Acknowledgment(record) => {
                if let Err(e) = sink.append_acknowledgment(&record).await {
                    warn!(id = %record.alert_id, error = %e, "failed to persist acknowledgment");
                }
            }
        }
    }
}

#[derive(Default)]
struct WriteQueue {
    pending: VecDeque<PendingWrite>,
    /// Set while a writer task is draining `pending`.
    writing: bool,
}

fn lock_queue(queue: &Mutex<WriteQueue>) -> std::sync::MutexGuard<'_, WriteQueue> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn write_in_order(sink: Arc<dyn PersistenceSink>, queue: Arc<Mutex<WriteQueue>>) {
    loop {
        let next = {
            let mut queue = lock_queue(&queue);
            let next = queue.pending.pop_front();
            if next.is_none() {
                queue.writing = false;
            }
            next
        };
        let Some(write) = next else { break };
        write.apply(sink.as_ref()).await;
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────

pub struct Dispatcher {
    channels: HashMap<ChannelKind, Vec<Arc<dyn NotificationChannel>>>,
    sink: Arc<dyn PersistenceSink>,
    /// Cached permission answers, filled on first use of a channel kind.
    permissions: Arc<DashMap<ChannelKind, Permission>>,
    records: Arc<DashMap<EmergencyId, DispatchRecord>>,
    writes: Arc<Mutex<WriteQueue>>,
    icon: String,
    tasks: TaskTracker,
    /// Serializes `drain` so one caller's `reopen` cannot strand another's `wait`.
    draining: tokio::sync::Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        channels: Vec<Arc<dyn NotificationChannel>>,
        sink: Arc<dyn PersistenceSink>,
        icon: impl Into<String>,
    ) -> Self {
        let mut by_kind: HashMap<ChannelKind, Vec<Arc<dyn NotificationChannel>>> = HashMap::new();
        for channel in channels {
            by_kind.entry(channel.kind()).or_default().push(channel);
        }

        Self {
            channels: by_kind,
            sink,
            permissions: Arc::new(DashMap::new()),
            records: Arc::new(DashMap::new()),
            writes: Arc::new(Mutex::new(WriteQueue::default())),
            icon: icon.into(),
            tasks: TaskTracker::new(),
            draining: tokio::sync::Mutex::new(()),
        }
    }

    /// Channel kinds with at least one registered implementation.
    pub fn registered_kinds(&self) -> Vec<ChannelKind> {
        ChannelKind::iter()
            .filter(|k| self.channels.contains_key(k))
            .collect()
    }

    pub fn record(&self, id: &EmergencyId) -> Option<DispatchRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Notify every enabled, not-yet-notified channel about `emergency` and
    /// persist it together with `settings`.
    ///
    /// Returns the channel kinds claimed by this call. Delivery itself
    /// happens in the background.
    pub fn dispatch(&self, emergency: &Emergency, settings: &NotificationSettings) -> Vec<ChannelKind> {
        let claimed = self.claim(emergency, settings);
        self.persist(PendingWrite::Emergency(EmergencyRecord::new(
            emergency.clone(),
            settings,
        )));

        debug!(
            id = %emergency.id,
            severity = %emergency.severity,
            channels = ?claimed,
            "dispatching emergency"
        );

        let targets = self.targets(&claimed);
        let notification = Notification::for_emergency(emergency, &self.icon);
        let permissions = Arc::clone(&self.permissions);
        let records = Arc::clone(&self.records);
        let id = emergency.id.clone();
        let severity = emergency.severity;

        self.tasks.spawn(async move {
            let skipped = deliver_all(&targets, &notification, &permissions).await;
            if let Some(mut record) = records.get_mut(&id) {
                for kind in skipped {
                    record.release(severity, kind);
                }
            }
        });

        claimed
    }

    /// Play the acknowledgment cue on every audible channel and persist the
    /// acknowledgment sub-record. Ends dispatch tracking for the alert.
    /// The cue plays regardless of the audible channel flag.
    pub fn acknowledge(&self, emergency: &Emergency, acknowledged_by: &str) {
        self.records.remove(&emergency.id);
        self.persist(PendingWrite::Acknowledgment(AcknowledgmentRecord {
            alert_id: emergency.id.clone(),
            acknowledged_at: emergency.acknowledged_at.unwrap_or_else(Utc::now),
            acknowledged_by: acknowledged_by.to_owned(),
            status: emergency.status,
        }));

        let targets = self.targets(&[ChannelKind::Audible]);
        if targets.is_empty() {
            return;
        }
        let notification = Notification::acknowledgment(emergency, &self.icon);
        let permissions = Arc::clone(&self.permissions);
        self.tasks.spawn(async move {
            deliver_all(&targets, &notification, &permissions).await;
        });
    }

    /// Drop dispatch tracking for an alert that left the lifecycle.
    pub fn forget(&self, id: &EmergencyId) {
        self.records.remove(id);
    }

    /// Ask every permission-gated channel for permission.
    ///
    /// Returns `true` only if at least one gated channel exists and all of
    /// them granted.
    pub async fn request_permission(&self) -> bool {
        let gated: Vec<Arc<dyn NotificationChannel>> = self
            .channels
            .iter()
            .filter(|(kind, _)| kind.is_permission_gated())
            .flat_map(|(_, list)| list.iter().cloned())
            .collect();

        if gated.is_empty() {
            debug!("no permission-gated channels registered");
            return false;
        }

        let mut granted = true;
        for channel in gated {
            let kind = channel.kind();
            let answer = channel.request_permission().await;
            remember_permission(&self.permissions, kind, answer);
            info!(channel = %kind, permission = ?answer, "channel permission requested");
            granted &= answer.is_granted();
        }
        granted
    }

    /// Wait for every in-flight delivery and persistence write.
    pub async fn drain(&self) {
        let _draining = self.draining.lock().await;
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Queue a sink write behind every earlier one, starting a writer task
    /// if none is running.
    fn persist(&self, write: PendingWrite) {
        let mut queue = lock_queue(&self.writes);
        queue.pending.push_back(write);
        if queue.writing {
            return;
        }
        queue.writing = true;
        drop(queue);

        self.tasks.spawn(write_in_order(
            Arc::clone(&self.sink),
            Arc::clone(&self.writes),
        ));
    }

    fn claim(&self, emergency: &Emergency, settings: &NotificationSettings) -> Vec<ChannelKind> {
        let mut record = self.records.entry(emergency.id.clone()).or_default();
        ChannelKind::iter()
            .filter(|kind| settings.channels.is_enabled(*kind) && self.channels.contains_key(kind))
            .filter(|kind| record.mark(emergency.severity, *kind))
            .collect()
    }

    fn targets(&self, kinds: &[ChannelKind]) -> Vec<Arc<dyn NotificationChannel>> {
        kinds
            .iter()
            .filter_map(|kind| self.channels.get(kind))
            .flat_map(|list| list.iter().cloned())
            .collect()
    }
}

// ── Delivery helpers ─────────────────────────────────────────────────

/// Deliver to every target; returns the kinds skipped for lack of
/// permission.
async fn deliver_all(
    targets: &[Arc<dyn NotificationChannel>],
    notification: &Notification,
    permissions: &DashMap<ChannelKind, Permission>,
) -> BTreeSet<ChannelKind> {
    let deliveries = targets.iter().map(|channel| async move {
        let delivered = deliver(channel.as_ref(), notification, permissions).await;
        (channel.kind(), delivered)
    });
    futures_util::future::join_all(deliveries)
        .await
        .into_iter()
        .filter(|(_, permitted)| !permitted)
        .map(|(kind, _)| kind)
        .collect()
}

/// Returns `false` if the channel was not permitted to run.
async fn deliver(
    channel: &dyn NotificationChannel,
    notification: &Notification,
    permissions: &DashMap<ChannelKind, Permission>,
) -> bool {
    let kind = channel.kind();
    if !is_permitted(channel, permissions).await {
        debug!(channel = %kind, tag = %notification.tag, "channel not permitted, skipping");
        return false;
    }

    match channel.notify(notification).await {
        Ok(()) => debug!(channel = %kind, tag = %notification.tag, "notification delivered"),
        Err(e) => warn!(
            channel = %kind,
            tag = %notification.tag,
            error = %e,
            "notification channel failed"
        ),
    }
    true
}

async fn is_permitted(
    channel: &dyn NotificationChannel,
    permissions: &DashMap<ChannelKind, Permission>,
) -> bool {
    let kind = channel.kind();
    let cached = permissions.get(&kind).map(|p| *p.value());
    if let Some(permission) = cached {
        return permission.is_granted();
    }

    let answer = channel.permission().await;
    remember_permission(permissions, kind, answer);
    answer.is_granted()
}

/// Undecided answers are not cached so the next use asks again.
fn remember_permission(
    permissions: &DashMap<ChannelKind, Permission>,
    kind: ChannelKind,
    answer: Permission,
) {
    if answer == Permission::Prompt {
        permissions.remove(&kind);
    } else {
        permissions.insert(kind, answer);
    }
}
