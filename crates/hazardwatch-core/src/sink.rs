// ── Persistence sink seam ──
//
// Append-only writes of emergency records and acknowledgment sub-records.
// The engine never reads back: while running, in-memory state is the
// source of truth and a failed write is logged and forgotten.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::error::CoreError;
use crate::model::{ChannelFlags, Contact, Emergency, EmergencyId, NotificationSettings, Status};

/// An emergency as written on every dispatch, together with the settings
/// that were in force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRecord {
    #[serde(flatten)]
    pub emergency: Emergency,
    pub notification_channels: ChannelFlags,
    pub contacts: Vec<Contact>,
    pub recorded_at: DateTime<Utc>,
}

impl EmergencyRecord {
    pub fn new(emergency: Emergency, settings: &NotificationSettings) -> Self {
        Self {
            emergency,
            notification_channels: settings.channels,
            contacts: settings.contacts.clone(),
            recorded_at: Utc::now(),
        }
    }
}

/// Audit sub-record stored under an alert id when an operator acknowledges it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgmentRecord {
    pub alert_id: EmergencyId,
    pub acknowledged_at: DateTime<Utc>,
    pub acknowledged_by: String,
    pub status: Status,
}

pub trait PersistenceSink: Send + Sync {
    fn append_emergency<'a>(
        &'a self,
        record: &'a EmergencyRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>>;

    fn append_acknowledgment<'a>(
        &'a self,
        record: &'a AcknowledgmentRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>>;
}

/// Discards every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PersistenceSink for NullSink {
    fn append_emergency<'a>(
        &'a self,
        _record: &'a EmergencyRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        futures_util::future::ready(Ok(())).boxed()
    }

    fn append_acknowledgment<'a>(
        &'a self,
        _record: &'a AcknowledgmentRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        futures_util::future::ready(Ok(())).boxed()
    }
}

/// Keeps every write in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    emergencies: Mutex<Vec<EmergencyRecord>>,
    acknowledgments: Mutex<Vec<AcknowledgmentRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emergencies(&self) -> Vec<EmergencyRecord> {
        self.emergencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn acknowledgments(&self) -> Vec<AcknowledgmentRecord> {
        self.acknowledgments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Acknowledgment sub-records stored under one alert id.
    pub fn acknowledgments_for(&self, id: &str) -> Vec<AcknowledgmentRecord> {
        self.acknowledgments()
            .into_iter()
            .filter(|r| r.alert_id.as_str() == id)
            .collect()
    }
}

impl PersistenceSink for MemorySink {
    fn append_emergency<'a>(
        &'a self,
        record: &'a EmergencyRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        self.emergencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        futures_util::future::ready(Ok(())).boxed()
    }

    fn append_acknowledgment<'a>(
        &'a self,
        record: &'a AcknowledgmentRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        self.acknowledgments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        futures_util::future::ready(Ok(())).boxed()
    }
}
