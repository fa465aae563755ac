// ── Escalation timers ──
//
// One timer per active emergency, keyed by id. Owned by the engine's
// event loop, which is the only place timers are armed, cancelled or
// fired, so an expiry and a cancellation can never interleave.

use std::collections::HashMap;
use std::future::poll_fn;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::time::DelayQueue;
use tokio_util::time::delay_queue::Key;

use crate::model::{Emergency, EmergencyId};

/// A pending escalation, as seen from outside the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedTimer {
    pub id: EmergencyId,
    pub deadline: Instant,
}

impl ArmedTimer {
    /// Time left until the timer fires, zero if already due.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

pub struct EscalationScheduler {
    queue: DelayQueue<Emergency>,
    armed: HashMap<EmergencyId, (Key, Instant)>,
}

impl EscalationScheduler {
    pub fn new() -> Self {
        Self {
            queue: DelayQueue::new(),
            armed: HashMap::new(),
        }
    }

    /// Arm a timer for `emergency`. Does nothing and returns `false` if a
    /// timer for the same id is already armed.
    pub fn arm(&mut self, emergency: &Emergency, delay: Duration) -> bool {
        if self.armed.contains_key(&emergency.id) {
            return false;
        }
        let deadline = Instant::now() + delay;
        let key = self.queue.insert_at(emergency.clone(), deadline);
        self.armed.insert(emergency.id.clone(), (key, deadline));
        true
    }

    /// Disarm the timer for `id`. Returns `true` if one was armed.
    pub fn cancel(&mut self, id: &EmergencyId) -> bool {
        match self.armed.remove(id) {
            Some((key, _)) => {
                self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, id: &EmergencyId) -> bool {
        self.armed.contains_key(id)
    }

    pub fn deadline(&self, id: &EmergencyId) -> Option<Instant> {
        self.armed.get(id).map(|(_, deadline)| *deadline)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// Armed timers, soonest first.
    pub fn armed(&self) -> Vec<ArmedTimer> {
        let mut timers: Vec<ArmedTimer> = self
            .armed
            .iter()
            .map(|(id, (_, deadline))| ArmedTimer {
                id: id.clone(),
                deadline: *deadline,
            })
            .collect();
        timers.sort_by(|a, b| a.deadline.cmp(&b.deadline).then_with(|| a.id.cmp(&b.id)));
        timers
    }

    /// Disarm everything.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.armed.clear();
    }

    /// Wait for the next timer to fire and return the emergency it was
    /// armed for. Pends forever while nothing is armed.
    ///
    /// Cancel-safe: dropping the future before it resolves loses nothing.
    pub async fn next_expired(&mut self) -> Emergency {
        poll_fn(|cx| self.poll_expired(cx)).await
    }

    fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<Emergency> {
        match self.queue.poll_expired(cx) {
            Poll::Ready(Some(expired)) => {
                let emergency = expired.into_inner();
                self.armed.remove(&emergency.id);
                Poll::Ready(emergency)
            }
            // An empty queue reports `None`; a later insert re-polls us.
            Poll::Ready(None) | Poll::Pending => Poll::Pending,
        }
    }
}

impl Default for EscalationScheduler {
    fn default() -> Self {
        Self::new()
    }
}
