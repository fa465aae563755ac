//! JSON-lines persistence log.
//!
//! Every emergency dispatch and every acknowledgment becomes one line,
//! tagged with a `record` field. The log is append-only while running;
//! reading it back is for `hazardwatch records` and for priming the
//! deduplicator at start-up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use hazardwatch_core::{
    AcknowledgmentRecord, CoreError, Emergency, EmergencyRecord, PersistenceSink, Status,
};

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum LogLine<'a> {
    Emergency(&'a EmergencyRecord),
    Acknowledgment(&'a AcknowledgmentRecord),
}

#[derive(Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum StoredLine {
    Emergency(Emergency),
    Acknowledgment(StoredAcknowledgment),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAcknowledgment {
    alert_id: String,
    acknowledged_at: DateTime<Utc>,
    acknowledged_by: String,
}

// ── Writer ───────────────────────────────────────────────────────────

pub struct JsonlSink {
    path: PathBuf,
    /// Opened on first write.
    file: Mutex<Option<File>>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    async fn append(&self, line: &LogLine<'_>) -> Result<(), CoreError> {
        let mut text = serde_json::to_string(line)?;
        text.push('\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await.map_err(persistence)?);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(text.as_bytes()).await.map_err(persistence)?;
            file.flush().await.map_err(persistence)?;
        }
        Ok(())
    }

    async fn open(&self) -> std::io::Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        debug!(path = %self.path.display(), "opening persistence log");
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
    }
}

fn persistence(err: std::io::Error) -> CoreError {
    CoreError::Persistence {
        message: err.to_string(),
    }
}

impl PersistenceSink for JsonlSink {
    fn append_emergency<'a>(
        &'a self,
        record: &'a EmergencyRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        async move { self.append(&LogLine::Emergency(record)).await }.boxed()
    }

    fn append_acknowledgment<'a>(
        &'a self,
        record: &'a AcknowledgmentRecord,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        async move { self.append(&LogLine::Acknowledgment(record)).await }.boxed()
    }
}

// ── Reader ───────────────────────────────────────────────────────────

/// Latest known state of one alert in the log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedAlert {
    #[serde(flatten)]
    pub emergency: Emergency,
    pub acknowledged_by: Option<String>,
}

impl LoggedAlert {
    fn apply(&mut self, ack: StoredAcknowledgment) {
        self.emergency.status = Status::Acknowledged;
        self.emergency.acknowledged_at = Some(ack.acknowledged_at);
        self.acknowledged_by = Some(ack.acknowledged_by);
    }

    /// Take a later emergency line. Escalation and acknowledgment are
    /// one-way, so neither is undone by a line that lacks them.
    fn merge(&mut self, emergency: Emergency) {
        if self.emergency.escalated && !emergency.escalated {
            return;
        }
        let acknowledged = self.emergency.status == Status::Acknowledged;
        let acknowledged_at = self.emergency.acknowledged_at;
        self.emergency = emergency;
        if acknowledged {
            self.emergency.status = Status::Acknowledged;
            self.emergency.acknowledged_at = acknowledged_at;
        }
    }
}

/// Read the log, folding every alert's records into its latest state, in
/// order of first appearance. A missing file reads as empty; malformed
/// lines are skipped. An acknowledgment seen before its emergency line is
/// held until that line shows up.
pub fn read_log(path: &Path) -> std::io::Result<Vec<LoggedAlert>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut alerts: Vec<LoggedAlert> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut orphans: HashMap<String, StoredAcknowledgment> = HashMap::new();

    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StoredLine>(line) {
            Ok(StoredLine::Emergency(emergency)) => {
                let id = emergency.id.to_string();
                if let Some(alert) = index.get(&id).and_then(|&i| alerts.get_mut(i)) {
                    alert.merge(emergency);
                    continue;
                }
                let mut alert = LoggedAlert {
                    emergency,
                    acknowledged_by: None,
                };
                if let Some(ack) = orphans.remove(&id) {
                    alert.apply(ack);
                }
                index.insert(id, alerts.len());
                alerts.push(alert);
            }
            Ok(StoredLine::Acknowledgment(ack)) => {
                match index.get(&ack.alert_id).and_then(|&i| alerts.get_mut(i)) {
                    Some(alert) => alert.apply(ack),
                    None => {
                        orphans.insert(ack.alert_id.clone(), ack);
                    }
                }
            }
            Err(e) => warn!(line = n + 1, error = %e, "skipping malformed log line"),
        }
    }
    if !orphans.is_empty() {
        debug!(count = orphans.len(), "acknowledgments without an emergency record");
    }
    Ok(alerts)
}
