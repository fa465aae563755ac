// ── Filter predicates over alert snapshots ──

use crate::model::{Emergency, Severity, Status};

/// Predicate for narrowing an active-alert snapshot without going back
/// to the engine.
pub enum AlertFilter {
    All,
    /// Still waiting for an operator.
    Active,
    Acknowledged,
    Escalated,
    BySegment(String),
    BySeverity(Severity),
    Custom(Box<dyn Fn(&Emergency) -> bool + Send + Sync>),
}

impl AlertFilter {
    pub fn matches(&self, emergency: &Emergency) -> bool {
        match self {
            Self::All => true,
            Self::Active => emergency.is_active(),
            Self::Acknowledged => emergency.status == Status::Acknowledged,
            Self::Escalated => emergency.escalated,
            Self::BySegment(segment) => emergency.segment.eq_ignore_ascii_case(segment),
            Self::BySeverity(severity) => emergency.severity == *severity,
            Self::Custom(f) => f(emergency),
        }
    }

    /// Keep the matching alerts of a snapshot, preserving order.
    pub fn apply<'a, I>(&self, alerts: I) -> Vec<&'a Emergency>
    where
        I: IntoIterator<Item = &'a Emergency>,
    {
        alerts.into_iter().filter(|e| self.matches(e)).collect()
    }
}

impl std::fmt::Debug for AlertFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Active => f.write_str("Active"),
            Self::Acknowledged => f.write_str("Acknowledged"),
            Self::Escalated => f.write_str("Escalated"),
            Self::BySegment(s) => f.debug_tuple("BySegment").field(s).finish(),
            Self::BySeverity(s) => f.debug_tuple("BySeverity").field(s).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
