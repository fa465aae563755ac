// ── Engine ──
//
// The handle hosts talk to. Owns every store, the dispatcher and the
// event loop task, and exposes feed ingestion, operator actions and
// reactive views over the alert lifecycle.

mod command;
mod event_loop;

use std::sync::Arc;

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use command::{Command, CommandResult, IngestOutcome};
use command::CommandEnvelope;

use crate::channel::NotificationChannel;
use crate::config::EngineConfig;
use crate::dedup::Deduplicator;
use crate::dispatch::{DispatchRecord, Dispatcher};
use crate::error::CoreError;
use crate::model::{
    Emergency, EmergencyId, HistoryEntry, LifecycleEvent, NotificationSettings, RawAlert,
    SettingsUpdate,
};
use crate::normalize::Normalizer;
use crate::scheduler::ArmedTimer;
use crate::sink::PersistenceSink;
use crate::store::{ActiveAlerts, HistoryStore, SettingsRegistry};
use crate::stream::{Snapshot, SnapshotStream};

const COMMAND_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 256;

// ── EngineState ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EngineState {
    /// Created, event loop not yet running.
    Idle,
    Running,
    /// Shut down for good; an engine is not restartable.
    Stopped,
}

/// Tally of one followed feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub received: usize,
    pub raised: usize,
    pub duplicates: usize,
    pub ignored: usize,
}

// ── Engine ───────────────────────────────────────────────────────────

/// Cheaply cloneable handle to one alert lifecycle engine.
///
/// Create with [`new`](Self::new), then [`start`](Self::start) the event
/// loop from inside a Tokio runtime. Lifecycle operations fail with
/// [`CoreError::EngineStopped`] unless the engine is running; read-side
/// accessors work in every state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    normalizer: Normalizer,
    dedup: Deduplicator,
    dispatcher: Dispatcher,
    active: ActiveAlerts,
    history: HistoryStore,
    settings: SettingsRegistry,
    state: watch::Sender<EngineState>,
    event_tx: broadcast::Sender<Arc<LifecycleEvent>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl EngineInner {
    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(Arc::new(event));
    }
}

impl Engine {
    /// Build an engine from a validated configuration, the channels to
    /// notify and the sink to persist into. Does not start the event loop.
    pub fn new(
        config: EngineConfig,
        channels: Vec<Arc<dyn NotificationChannel>>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let settings = SettingsRegistry::new(config.settings.clone())?;
        let dispatcher = Dispatcher::new(channels, sink, config.notification_icon.clone());
        let (state, _) = watch::channel(EngineState::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        debug!(
            channels = ?dispatcher.registered_kinds(),
            seen = config.seen_ids.len(),
            history_capacity = config.history_capacity,
            "engine created"
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                normalizer: Normalizer::from_config(&config),
                dedup: Deduplicator::with_seen(config.seen_ids.iter().map(String::as_str)),
                dispatcher,
                active: ActiveAlerts::new(),
                history: HistoryStore::new(config.history_capacity),
                settings,
                state,
                event_tx,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                config,
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the event loop.
    pub async fn start(&self) -> Result<(), CoreError> {
        match *self.inner.state.borrow() {
            EngineState::Idle => {}
            EngineState::Running => return Err(CoreError::AlreadyStarted),
            EngineState::Stopped => return Err(CoreError::EngineStopped),
        }

        let rx = self
            .inner
            .command_rx
            .lock()
            .await
            .take()
            .ok_or(CoreError::AlreadyStarted)?;

        let handle = tokio::spawn(event_loop::run(
            Arc::clone(&self.inner),
            rx,
            self.inner.cancel.clone(),
        ));
        self.inner.task_handles.lock().await.push(handle);
        // `send` is a no-op without live receivers; the state must stick.
        self.inner.state.send_replace(EngineState::Running);

        info!(channels = ?self.inner.dispatcher.registered_kinds(), "engine started");
        Ok(())
    }

    /// Stop the event loop and feed tasks, drop armed timers and wait for
    /// in-flight deliveries and writes.
    pub async fn shutdown(&self) {
        if *self.inner.state.borrow() == EngineState::Stopped {
            return;
        }
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.dispatcher.drain().await;
        self.inner.state.send_replace(EngineState::Stopped);
        debug!("engine stopped");
    }

    /// Wait until every delivery and persistence write started so far has
    /// finished.
    pub async fn flush(&self) {
        self.inner.dispatcher.drain().await;
    }

    pub fn state(&self) -> watch::Receiver<EngineState> {
        self.inner.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        *self.inner.state.borrow() == EngineState::Running
    }

    // ── Command execution ────────────────────────────────────────────

    /// Send a command to the event loop and wait for its result.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        if !self.is_running() {
            return Err(CoreError::EngineStopped);
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::EngineStopped)?;

        rx.await.map_err(|_| CoreError::EngineStopped)?
    }

    /// Feed one raw record into the lifecycle.
    pub async fn ingest(&self, raw: RawAlert) -> Result<IngestOutcome, CoreError> {
        match self.execute(Command::Ingest(raw)).await? {
            CommandResult::Ingested(outcome) => Ok(outcome),
            other => Err(unexpected(&other)),
        }
    }

    /// Acknowledge an active alert. `Ok(None)` if there was nothing to
    /// acknowledge.
    pub async fn acknowledge(&self, id: impl Into<EmergencyId>) -> Result<Option<Emergency>, CoreError> {
        self.updated(Command::Acknowledge { id: id.into() }).await
    }

    /// Remove an alert as a false alarm. `Ok(None)` if it was not active.
    pub async fn dismiss(&self, id: impl Into<EmergencyId>) -> Result<Option<Emergency>, CoreError> {
        self.updated(Command::Dismiss { id: id.into() }).await
    }

    /// Escalate an active alert right away instead of waiting for its
    /// timer. `Ok(None)` if it is not eligible.
    pub async fn escalate(&self, id: impl Into<EmergencyId>) -> Result<Option<Emergency>, CoreError> {
        self.updated(Command::Escalate { id: id.into() }).await
    }

    /// Escalation timers currently armed, soonest first.
    pub async fn armed_timers(&self) -> Result<Vec<ArmedTimer>, CoreError> {
        match self.execute(Command::ArmedTimers).await? {
            CommandResult::Timers(timers) => Ok(timers),
            other => Err(unexpected(&other)),
        }
    }

    async fn updated(&self, command: Command) -> Result<Option<Emergency>, CoreError> {
        match self.execute(command).await? {
            CommandResult::Updated(emergency) => Ok(emergency),
            other => Err(unexpected(&other)),
        }
    }

    // ── Feed attachment ──────────────────────────────────────────────

    /// Forward every record of `feed` into the engine on a background
    /// task, until the feed ends or the engine shuts down.
    pub fn follow_feed<S>(&self, feed: S) -> Result<JoinHandle<FeedSummary>, CoreError>
    where
        S: Stream<Item = RawAlert> + Send + 'static,
    {
        if !self.is_running() {
            return Err(CoreError::EngineStopped);
        }

        let engine = self.clone();
        let cancel = self.inner.cancel.child_token();
        Ok(tokio::spawn(async move {
            let mut feed = std::pin::pin!(feed);
            let mut summary = FeedSummary::default();
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    next = feed.next() => {
                        let Some(raw) = next else {
                            debug!(?summary, "feed ended");
                            break;
                        };
                        summary.received += 1;
                        match engine.ingest(raw).await {
                            Ok(IngestOutcome::Raised(_)) => summary.raised += 1,
                            Ok(IngestOutcome::Duplicate) => summary.duplicates += 1,
                            Ok(IngestOutcome::Ignored) => summary.ignored += 1,
                            Err(e) => {
                                warn!(error = %e, "feed stopped");
                                break;
                            }
                        }
                    }
                }
            }
            summary
        }))
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn settings(&self) -> Arc<NotificationSettings> {
        self.inner.settings.snapshot()
    }

    /// Merge a partial settings edit. Applies to dispatches and timers
    /// started afterwards; timers already armed keep their deadline.
    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<Arc<NotificationSettings>, CoreError> {
        self.inner.settings.update(update)
    }

    /// Settings version, bumped on every successful update.
    pub fn subscribe_settings(&self) -> watch::Receiver<u64> {
        self.inner.settings.subscribe()
    }

    /// Ask permission-gated channels for permission and record the answer
    /// as the push channel flag.
    pub async fn request_channel_permission(&self) -> Result<bool, CoreError> {
        let granted = self.inner.dispatcher.request_permission().await;
        self.inner.settings.update(&SettingsUpdate {
            push: Some(granted),
            ..SettingsUpdate::default()
        })?;
        Ok(granted)
    }

    // ── State observation ────────────────────────────────────────────

    pub fn events(&self) -> broadcast::Receiver<Arc<LifecycleEvent>> {
        self.inner.event_tx.subscribe()
    }

    /// Alerts not yet dismissed, oldest first.
    pub fn active_snapshot(&self) -> Snapshot<Emergency> {
        self.inner.active.snapshot()
    }

    pub fn active(&self, id: &str) -> Option<Arc<Emergency>> {
        self.inner.active.get(id)
    }

    pub fn subscribe_active(&self) -> SnapshotStream<Emergency> {
        self.inner.active.subscribe()
    }

    /// History entries, newest first.
    pub fn history_snapshot(&self) -> Snapshot<HistoryEntry> {
        self.inner.history.snapshot()
    }

    pub fn subscribe_history(&self) -> SnapshotStream<HistoryEntry> {
        self.inner.history.subscribe()
    }

    pub fn dispatch_record(&self, id: &EmergencyId) -> Option<DispatchRecord> {
        self.inner.dispatcher.record(id)
    }

    /// Whether a raw id has already been processed this session.
    pub fn has_seen(&self, id: &str) -> bool {
        self.inner.dedup.has_seen(id)
    }
}

fn unexpected(result: &CommandResult) -> CoreError {
    CoreError::Internal(format!("unexpected command result: {result:?}"))
}
