// ── Engine command API ──
//
// Everything that touches alert lifecycle state flows through a
// `Command`. The event loop handles commands one at a time, interleaved
// with escalation timer expiries.

use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::model::{Emergency, EmergencyId, RawAlert};
use crate::scheduler::ArmedTimer;

/// A command together with the channel its result goes back on.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandResult, CoreError>>,
}

#[derive(Debug, Clone)]
pub enum Command {
    // ── Feed ─────────────────────────────────────────────────────────
    Ingest(RawAlert),

    // ── Operator actions ─────────────────────────────────────────────
    Acknowledge { id: EmergencyId },
    Dismiss { id: EmergencyId },
    Escalate { id: EmergencyId },

    // ── Introspection ────────────────────────────────────────────────
    ArmedTimers,
}

#[derive(Debug, Clone)]
pub enum CommandResult {
    Ingested(IngestOutcome),
    /// The alert after the action, or `None` if the action was a no-op.
    Updated(Option<Emergency>),
    Timers(Vec<ArmedTimer>),
}

/// What happened to a feed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new emergency entered the lifecycle.
    Raised(Emergency),
    /// The id was already processed.
    Duplicate,
    /// Not an actionable hazard.
    Ignored,
}

impl IngestOutcome {
    pub fn is_raised(&self) -> bool {
        matches!(self, Self::Raised(_))
    }
}
