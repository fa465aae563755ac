#![allow(clippy::unwrap_used)]

// Lifecycle scenarios driven through the public engine API with a
// recording channel per kind and an in-memory sink.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pretty_assertions::assert_eq;

use hazardwatch_core::{
    AcknowledgmentRecord, ChannelKind, CoreError, Cue, EmergencyRecord, Engine, EngineConfig,
    EngineState, IngestOutcome, LifecycleEvent, MemorySink, Notification, NotificationChannel,
    PersistenceSink, RawAlert, Severity, SettingsUpdate, Status, Transition,
};

// ── Test doubles ────────────────────────────────────────────────────

struct Recorder {
    kind: ChannelKind,
    seen: Mutex<Vec<Notification>>,
}

impl Recorder {
    fn new(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    fn hazard_count(&self, severity: Severity) -> usize {
        self.seen()
            .iter()
            .filter(|n| n.cue == Cue::Hazard && n.severity == severity)
            .count()
    }
}

impl NotificationChannel for Recorder {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), CoreError>> {
        self.seen.lock().unwrap().push(notification.clone());
        futures_util::future::ready(Ok(())).boxed()
    }
}

/// Popup that takes a while to show hazard banners.
struct SlowPopup;

impl NotificationChannel for SlowPopup {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Popup
    }

    fn notify<'a>(&'a self, _notification: &'a Notification) -> BoxFuture<'a, Result<(), CoreError>> {
        tokio::time::sleep(Duration::from_millis(200)).map(Ok).boxed()
    }
}

/// Sink that keeps the order of its writes.
#[derive(Default)]
struct WriteLog(Mutex<Vec<String>>);

impl WriteLog {
    fn writes(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl PersistenceSink for WriteLog {
    fn append_emergency<'a>(
        &'a self,
        record: &'a EmergencyRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        self.0.lock().unwrap().push(format!(
            "emergency:{}:{:?}",
            record.emergency.id, record.emergency.severity
        ));
        futures_util::future::ready(Ok(())).boxed()
    }

    fn append_acknowledgment<'a>(
        &'a self,
        record: &'a AcknowledgmentRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        self.0.lock().unwrap().push(format!("ack:{}", record.alert_id));
        futures_util::future::ready(Ok(())).boxed()
    }
}

struct Harness {
    engine: Engine,
    popup: Arc<Recorder>,
    audible: Arc<Recorder>,
    sink: Arc<MemorySink>,
}

async fn harness(delay: Duration) -> Harness {
    let popup = Recorder::new(ChannelKind::Popup);
    let audible = Recorder::new(ChannelKind::Audible);
    let sink = Arc::new(MemorySink::new());

    let mut config = EngineConfig::default();
    config.settings.escalation_delay = delay;

    let engine = Engine::new(config, vec![popup.clone(), audible.clone()], sink.clone()).unwrap();
    engine.start().await.unwrap();

    Harness {
        engine,
        popup,
        audible,
        sink,
    }
}

fn kitchen_gas_leak() -> RawAlert {
    RawAlert::emergency("1", "Kitchen", "Gas Leak")
}

const FIVE_MINUTES: Duration = Duration::from_secs(300);

// ── Engine state ────────────────────────────────────────────────────

#[tokio::test]
async fn start_publishes_running_and_shutdown_publishes_stopped() {
    let popup = Recorder::new(ChannelKind::Popup);
    let engine = Engine::new(EngineConfig::default(), vec![popup], Arc::new(MemorySink::new())).unwrap();
    assert!(!engine.is_running());

    engine.start().await.unwrap();
    assert!(engine.is_running());
    assert_eq!(*engine.state().borrow(), EngineState::Running);
    assert!(matches!(engine.start().await, Err(CoreError::AlreadyStarted)));

    engine.shutdown().await;
    assert!(!engine.is_running());
    assert_eq!(*engine.state().borrow(), EngineState::Stopped);
    assert!(matches!(engine.start().await, Err(CoreError::EngineStopped)));
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn raise_dispatches_once_and_arms_timer() {
    let h = harness(FIVE_MINUTES).await;

    let outcome = h.engine.ingest(kitchen_gas_leak()).await.unwrap();
    h.engine.flush().await;

    let IngestOutcome::Raised(emergency) = outcome else {
        panic!("expected a raised emergency, got {outcome:?}");
    };
    assert_eq!(emergency.segment, "Kitchen");
    assert_eq!(emergency.cause, "Gas Leak");
    assert_eq!(emergency.severity, Severity::Critical);
    assert_eq!(emergency.status, Status::Active);

    assert_eq!(h.popup.hazard_count(Severity::Critical), 1);
    assert_eq!(h.audible.hazard_count(Severity::Critical), 1);
    assert_eq!(h.popup.seen()[0].tag.as_str(), "1");
    assert_eq!(h.sink.emergencies().len(), 1);

    let timers = h.engine.armed_timers().await.unwrap();
    assert_eq!(timers.len(), 1);
    assert_eq!(timers[0].id.as_str(), "1");
    assert_eq!(timers[0].remaining(), FIVE_MINUTES);

    let history = h.engine.history_snapshot();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transition, Transition::Raised);
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn acknowledge_before_deadline_cancels_escalation() {
    let h = harness(FIVE_MINUTES).await;
    h.engine.ingest(kitchen_gas_leak()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    let acked = h.engine.acknowledge("1").await.unwrap().unwrap();
    assert_eq!(acked.status, Status::Acknowledged);
    assert!(acked.acknowledged_at.is_some());
    assert!(h.engine.armed_timers().await.unwrap().is_empty());

    tokio::time::sleep(FIVE_MINUTES * 2).await;
    h.engine.flush().await;

    let current = h.engine.active("1").unwrap();
    assert!(!current.escalated);
    assert_eq!(current.status, Status::Acknowledged);
    assert_eq!(h.popup.hazard_count(Severity::CriticalEscalated), 0);
    assert_eq!(h.engine.history_snapshot().len(), 1);

    let acks = h.sink.acknowledgments_for("1");
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].acknowledged_by, "Manager");
    assert!(
        h.audible
            .seen()
            .iter()
            .any(|n| n.cue == Cue::Acknowledged)
    );
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unacknowledged_alert_escalates_once_at_deadline() {
    let h = harness(FIVE_MINUTES).await;
    let mut events = h.engine.events();
    h.engine.ingest(kitchen_gas_leak()).await.unwrap();

    let raised = events.recv().await.unwrap();
    assert!(matches!(*raised, LifecycleEvent::Raised(_)));
    let escalated = events.recv().await.unwrap();
    let LifecycleEvent::Escalated(ref emergency) = *escalated else {
        panic!("expected escalation, got {escalated:?}");
    };
    assert!(emergency.escalated);
    assert_eq!(emergency.severity, Severity::CriticalEscalated);
    assert_eq!(emergency.segment, "Kitchen");

    h.engine.flush().await;
    let escalated_payloads: Vec<_> = h
        .popup
        .seen()
        .into_iter()
        .filter(|n| n.severity == Severity::CriticalEscalated)
        .collect();
    assert_eq!(escalated_payloads.len(), 1);
    assert!(escalated_payloads[0].body.contains("Kitchen - ESCALATED"));
    assert_eq!(h.audible.hazard_count(Severity::CriticalEscalated), 1);

    // One-shot: nothing further ever happens.
    tokio::time::sleep(FIVE_MINUTES * 3).await;
    h.engine.flush().await;
    assert_eq!(h.popup.hazard_count(Severity::CriticalEscalated), 1);
    assert!(h.engine.escalate("1").await.unwrap().is_none());

    let history = h.engine.history_snapshot();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].transition, Transition::Escalated);
    assert_eq!(history[1].transition, Transition::Raised);
    assert!(!history[1].emergency.escalated);
    assert_eq!(h.sink.emergencies().len(), 2);
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn duplicate_feed_records_dispatch_once() {
    let h = harness(FIVE_MINUTES).await;

    let first = h.engine.ingest(kitchen_gas_leak()).await.unwrap();
    let second = h.engine.ingest(kitchen_gas_leak()).await.unwrap();
    h.engine.flush().await;

    assert!(first.is_raised());
    assert_eq!(second, IngestOutcome::Duplicate);
    assert_eq!(h.popup.seen().len(), 1);
    assert_eq!(h.engine.armed_timers().await.unwrap().len(), 1);
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dismiss_removes_alert_and_cancels_timer() {
    let h = harness(FIVE_MINUTES).await;
    h.engine.ingest(kitchen_gas_leak()).await.unwrap();

    let dismissed = h.engine.dismiss("1").await.unwrap().unwrap();
    assert_eq!(dismissed.status, Status::Dismissed);
    assert!(h.engine.active_snapshot().is_empty());
    assert!(h.engine.armed_timers().await.unwrap().is_empty());

    tokio::time::sleep(FIVE_MINUTES * 2).await;
    h.engine.flush().await;

    assert_eq!(h.engine.history_snapshot().len(), 1);
    assert!(h.sink.acknowledgments().is_empty());
    assert_eq!(h.sink.emergencies().len(), 1);
    assert_eq!(h.popup.hazard_count(Severity::CriticalEscalated), 0);

    // A dismissed id stays processed.
    let replay = h.engine.ingest(kitchen_gas_leak()).await.unwrap();
    assert_eq!(replay, IngestOutcome::Duplicate);
    h.engine.shutdown().await;
}

// ── Edge cases ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn operator_actions_on_unknown_ids_are_noops() {
    let h = harness(FIVE_MINUTES).await;

    assert!(h.engine.acknowledge("missing").await.unwrap().is_none());
    assert!(h.engine.dismiss("missing").await.unwrap().is_none());
    assert!(h.engine.escalate("missing").await.unwrap().is_none());

    h.engine.ingest(kitchen_gas_leak()).await.unwrap();
    h.engine.acknowledge("1").await.unwrap();
    assert!(h.engine.acknowledge("1").await.unwrap().is_none());
    h.engine.flush().await;
    assert_eq!(h.sink.acknowledgments_for("1").len(), 1);
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn non_hazard_records_are_dropped_silently() {
    let h = harness(FIVE_MINUTES).await;

    let status = RawAlert {
        kind: "STATUS".into(),
        ..kitchen_gas_leak()
    };
    let handled = RawAlert {
        acknowledged: Some(true),
        ..RawAlert::emergency("2", "Garage", "Smoke")
    };

    assert_eq!(h.engine.ingest(status).await.unwrap(), IngestOutcome::Ignored);
    assert_eq!(h.engine.ingest(handled).await.unwrap(), IngestOutcome::Ignored);
    h.engine.flush().await;

    assert!(h.popup.seen().is_empty());
    assert!(h.engine.active_snapshot().is_empty());

    // An ignored record does not burn its id.
    assert!(h.engine.ingest(kitchen_gas_leak()).await.unwrap().is_raised());
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn history_keeps_fifty_most_recent() {
    let h = harness(FIVE_MINUTES).await;
    h.engine
        .update_settings(&SettingsUpdate {
            escalation_enabled: Some(false),
            ..SettingsUpdate::default()
        })
        .unwrap();

    for id in 0..60 {
        h.engine
            .ingest(RawAlert::emergency(id.to_string(), "Hall", "Fire"))
            .await
            .unwrap();
    }

    let history = h.engine.history_snapshot();
    assert_eq!(history.len(), 50);
    assert_eq!(history[0].emergency.id.as_str(), "59");
    assert_eq!(history[49].emergency.id.as_str(), "10");
    assert!(h.engine.armed_timers().await.unwrap().is_empty());
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn settings_changes_apply_to_future_work_only() {
    let h = harness(FIVE_MINUTES).await;
    h.engine.ingest(kitchen_gas_leak()).await.unwrap();

    h.engine
        .update_settings(&SettingsUpdate {
            audible: Some(false),
            escalation_delay: Some(Duration::from_secs(30)),
            ..SettingsUpdate::default()
        })
        .unwrap();
    h.engine
        .ingest(RawAlert::emergency("2", "Garage", "Smoke"))
        .await
        .unwrap();
    h.engine.flush().await;

    let timers = h.engine.armed_timers().await.unwrap();
    assert_eq!(timers[0].id.as_str(), "2");
    assert_eq!(timers[0].remaining(), Duration::from_secs(30));
    assert_eq!(timers[1].remaining(), FIVE_MINUTES);

    let audible_tags: Vec<_> = h
        .audible
        .seen()
        .iter()
        .map(|n| n.tag.to_string())
        .collect();
    assert_eq!(audible_tags, vec!["1"]);

    let records = h.sink.emergencies();
    assert!(records[0].notification_channels.audible);
    assert!(!records[1].notification_channels.audible);
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn escalation_disabled_arms_nothing() {
    let popup = Recorder::new(ChannelKind::Popup);
    let mut config = EngineConfig::default();
    config.settings.escalation_enabled = false;
    let engine = Engine::new(config, vec![popup.clone()], Arc::new(MemorySink::new())).unwrap();
    engine.start().await.unwrap();

    engine.ingest(kitchen_gas_leak()).await.unwrap();
    assert!(engine.armed_timers().await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_secs(3600)).await;
    engine.flush().await;
    assert_eq!(popup.seen().len(), 1);
    assert!(!engine.active("1").unwrap().escalated);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn seeded_ids_are_never_raised() {
    let mut config = EngineConfig::default();
    config.seen_ids = vec!["1".into()];
    let engine = Engine::new(config, Vec::new(), Arc::new(MemorySink::new())).unwrap();
    engine.start().await.unwrap();

    assert_eq!(
        engine.ingest(kitchen_gas_leak()).await.unwrap(),
        IngestOutcome::Duplicate
    );
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_drops_pending_escalations() {
    let h = harness(FIVE_MINUTES).await;
    h.engine.ingest(kitchen_gas_leak()).await.unwrap();
    h.engine.shutdown().await;

    tokio::time::sleep(FIVE_MINUTES * 2).await;
    assert_eq!(h.popup.hazard_count(Severity::CriticalEscalated), 0);
    assert!(matches!(
        h.engine.ingest(kitchen_gas_leak()).await,
        Err(CoreError::EngineStopped)
    ));
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = EngineConfig::default();
    config.history_capacity = 0;
    let result = Engine::new(config, Vec::new(), Arc::new(MemorySink::new()));
    assert!(matches!(result, Err(CoreError::Validation { .. })));
}

#[tokio::test(start_paused = true)]
async fn persistence_follows_lifecycle_order_behind_slow_channel() {
    let log = Arc::new(WriteLog::default());
    let engine = Engine::new(EngineConfig::default(), vec![Arc::new(SlowPopup)], log.clone()).unwrap();
    engine.start().await.unwrap();

    engine.ingest(kitchen_gas_leak()).await.unwrap();
    engine.acknowledge("1").await.unwrap();
    engine
        .ingest(RawAlert::emergency("2", "Garage", "Smoke"))
        .await
        .unwrap();
    engine.escalate("2").await.unwrap();
    engine.flush().await;

    assert_eq!(
        log.writes(),
        [
            "emergency:1:Critical",
            "ack:1",
            "emergency:2:Critical",
            "emergency:2:CriticalEscalated",
        ]
    );
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn acknowledgment_cue_plays_with_sound_alerts_off() {
    let h = harness(FIVE_MINUTES).await;
    h.engine
        .update_settings(&SettingsUpdate {
            audible: Some(false),
            ..SettingsUpdate::default()
        })
        .unwrap();

    h.engine.ingest(kitchen_gas_leak()).await.unwrap();
    h.engine.acknowledge("1").await.unwrap();
    h.engine.flush().await;

    let cues: Vec<Cue> = h.audible.seen().iter().map(|n| n.cue).collect();
    assert_eq!(cues, vec![Cue::Acknowledged]);
    h.engine.shutdown().await;
}
