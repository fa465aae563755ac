// Channel doubles for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use crate::channel::NotificationChannel;
use crate::error::CoreError;
use crate::model::{ChannelKind, Cue, Notification, Permission};
use crate::sink::{AcknowledgmentRecord, EmergencyRecord, PersistenceSink};

/// Forwards every delivered notification to a receiver.
pub(crate) struct RecordingChannel {
    kind: ChannelKind,
    tx: mpsc::UnboundedSender<Notification>,
}

impl RecordingChannel {
    pub(crate) fn new(kind: ChannelKind) -> (Arc<Self>, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { kind, tx }), rx)
    }
}

impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), CoreError>> {
        let _ = self.tx.send(notification.clone());
        futures_util::future::ready(Ok(())).boxed()
    }
}

/// Always fails, as an unplugged speaker would.
pub(crate) struct FailingChannel(pub(crate) ChannelKind);

impl NotificationChannel for FailingChannel {
    fn kind(&self) -> ChannelKind {
        self.0
    }

    fn notify<'a>(&'a self, _notification: &'a Notification) -> BoxFuture<'a, Result<(), CoreError>> {
        futures_util::future::ready(Err(CoreError::ChannelUnavailable {
            channel: self.0,
            reason: "device unplugged".into(),
        }))
        .boxed()
    }
}

/// Push channel with a scripted permission state. Requesting permission
/// always grants.
pub(crate) struct GatedChannel {
    permission: Mutex<Permission>,
    queries: AtomicUsize,
    tx: mpsc::UnboundedSender<Notification>,
}

impl GatedChannel {
    pub(crate) fn new(
        permission: Permission,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = Self {
            permission: Mutex::new(permission),
            queries: AtomicUsize::new(0),
            tx,
        };
        (Arc::new(channel), rx)
    }

    pub(crate) fn permission_queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl NotificationChannel for GatedChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    fn permission(&self) -> BoxFuture<'_, Permission> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let current = *self.permission.lock().unwrap_or_else(PoisonError::into_inner);
        futures_util::future::ready(current).boxed()
    }

    fn request_permission(&self) -> BoxFuture<'_, Permission> {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner) = Permission::Granted;
        futures_util::future::ready(Permission::Granted).boxed()
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), CoreError>> {
        let _ = self.tx.send(notification.clone());
        futures_util::future::ready(Ok(())).boxed()
    }
}

/// Takes `delay` to deliver hazard notifications, acknowledgment cues are
/// immediate.
pub(crate) struct SlowChannel {
    kind: ChannelKind,
    delay: std::time::Duration,
}

impl SlowChannel {
    pub(crate) fn new(kind: ChannelKind, delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self { kind, delay })
    }
}

impl NotificationChannel for SlowChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), CoreError>> {
        let delay = match notification.cue {
            Cue::Hazard => self.delay,
            Cue::Acknowledged => std::time::Duration::ZERO,
        };
        tokio::time::sleep(delay).map(Ok).boxed()
    }
}

/// Sink that records the order of its writes as `emergency:<id>:<severity>`
/// and `ack:<id>` entries.
#[derive(Default)]
pub(crate) struct OrderedSink {
    writes: Mutex<Vec<String>>,
}

impl OrderedSink {
    pub(crate) fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, entry: String) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

impl PersistenceSink for OrderedSink {
    fn append_emergency<'a>(
        &'a self,
        record: &'a EmergencyRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        self.push(format!(
            "emergency:{}:{:?}",
            record.emergency.id, record.emergency.severity
        ));
        futures_util::future::ready(Ok(())).boxed()
    }

    fn append_acknowledgment<'a>(
        &'a self,
        record: &'a AcknowledgmentRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        self.push(format!("ack:{}", record.alert_id));
        futures_util::future::ready(Ok(())).boxed()
    }
}
