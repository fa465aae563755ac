// ── Engine event loop ──
//
// The single task that owns the escalation scheduler. Commands and timer
// expiries are handled strictly one after another, so for any alert id
// the order raise, escalate, acknowledge or dismiss is total. A command
// that is ready in the same poll as an expiry goes first.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::EngineInner;
use super::command::{Command, CommandEnvelope, CommandResult, IngestOutcome};
use crate::error::CoreError;
use crate::model::{Emergency, EmergencyId, LifecycleEvent, RawAlert, Transition};
use crate::scheduler::EscalationScheduler;

pub(super) async fn run(
    inner: Arc<EngineInner>,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    let mut scheduler = EscalationScheduler::new();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&inner, &mut scheduler, envelope.command);
                let _ = envelope.response_tx.send(result);
            }
            expired = scheduler.next_expired() => {
                debug!(id = %expired.id, "escalation timer fired");
                escalate(&inner, &expired.id);
            }
        }
    }

    if scheduler.armed_count() > 0 {
        debug!(pending = scheduler.armed_count(), "dropping armed escalation timers");
    }
    scheduler.clear();
}

// ── Command routing ──────────────────────────────────────────────────

fn route_command(
    inner: &EngineInner,
    scheduler: &mut EscalationScheduler,
    command: Command,
) -> Result<CommandResult, CoreError> {
    match command {
        Command::Ingest(raw) => Ok(CommandResult::Ingested(ingest(inner, scheduler, &raw))),
        Command::Acknowledge { id } => Ok(CommandResult::Updated(acknowledge(
            inner, scheduler, &id,
        ))),
        Command::Dismiss { id } => Ok(CommandResult::Updated(dismiss(inner, scheduler, &id))),
        Command::Escalate { id } => {
            scheduler.cancel(&id);
            Ok(CommandResult::Updated(escalate(inner, &id)))
        }
        Command::ArmedTimers => Ok(CommandResult::Timers(scheduler.armed())),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

fn ingest(inner: &EngineInner, scheduler: &mut EscalationScheduler, raw: &RawAlert) -> IngestOutcome {
    let Some(emergency) = inner.normalizer.normalize(raw, Utc::now()) else {
        trace!(id = %raw.id, kind = %raw.kind, "feed record is not an actionable hazard");
        return IngestOutcome::Ignored;
    };

    if !inner.dedup.should_process(emergency.id.as_str()) {
        trace!(id = %emergency.id, "duplicate feed record");
        return IngestOutcome::Duplicate;
    }
    if !inner.active.insert(emergency.clone()) {
        return IngestOutcome::Duplicate;
    }

    let settings = inner.settings.snapshot();
    inner.history.record(Transition::Raised, &emergency);
    let channels = inner.dispatcher.dispatch(&emergency, &settings);

    if settings.escalation_enabled {
        scheduler.arm(&emergency, settings.escalation_delay);
    }

    info!(
        id = %emergency.id,
        segment = %emergency.segment,
        cause = %emergency.cause,
        channels = ?channels,
        escalation_armed = settings.escalation_enabled,
        "emergency raised"
    );
    inner.emit(LifecycleEvent::Raised(emergency.clone()));
    IngestOutcome::Raised(emergency)
}

/// Promote an alert to the escalated tier and notify again. Used by both
/// the timer and the operator; the one-shot rule makes a second call a
/// no-op.
fn escalate(inner: &EngineInner, id: &EmergencyId) -> Option<Emergency> {
    let Some(updated) = inner.active.update(id.as_str(), |e| e.mark_escalated(Utc::now())) else {
        debug!(id = %id, "escalation skipped, alert no longer eligible");
        return None;
    };
    let emergency = Emergency::clone(&updated);

    let settings = inner.settings.snapshot();
    inner.history.record(Transition::Escalated, &emergency);
    let channels = inner.dispatcher.dispatch(&emergency, &settings);

    warn!(
        id = %emergency.id,
        segment = %emergency.segment,
        channels = ?channels,
        "emergency escalated"
    );
    inner.emit(LifecycleEvent::Escalated(emergency.clone()));
    Some(emergency)
}

fn acknowledge(
    inner: &EngineInner,
    scheduler: &mut EscalationScheduler,
    id: &EmergencyId,
) -> Option<Emergency> {
    let Some(updated) = inner
        .active
        .update(id.as_str(), |e| e.mark_acknowledged(Utc::now()))
    else {
        debug!(id = %id, "acknowledge ignored, no active alert");
        return None;
    };
    let emergency = Emergency::clone(&updated);

    let cancelled = scheduler.cancel(id);
    inner
        .dispatcher
        .acknowledge(&emergency, &inner.config.acknowledged_by);

    info!(id = %id, timer_cancelled = cancelled, "emergency acknowledged");
    inner.emit(LifecycleEvent::Acknowledged(emergency.clone()));
    Some(emergency)
}

fn dismiss(
    inner: &EngineInner,
    scheduler: &mut EscalationScheduler,
    id: &EmergencyId,
) -> Option<Emergency> {
    let Some(removed) = inner.active.remove(id.as_str()) else {
        debug!(id = %id, "dismiss ignored, no active alert");
        return None;
    };

    let cancelled = scheduler.cancel(id);
    inner.dispatcher.forget(id);

    let mut emergency = Emergency::clone(&removed);
    emergency.mark_dismissed();

    info!(id = %id, timer_cancelled = cancelled, "emergency dismissed");
    inner.emit(LifecycleEvent::Dismissed(emergency.clone()));
    Some(emergency)
}
