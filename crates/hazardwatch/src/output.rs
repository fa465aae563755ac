//! Output formatting: table, JSON, plain.
//!
//! Renders listings in the format selected by `--output`. Tables use
//! `tabled`, structured formats use serde, plain emits one id per line.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Local, Utc};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use hazardwatch_core::{Emergency, HistoryEntry, Severity, Status};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Severity label, red once escalated.
pub fn severity_label(severity: Severity, color: bool) -> String {
    let label = severity.to_string();
    match (color, severity) {
        (false, _) => label,
        (true, Severity::Critical) => label.yellow().bold().to_string(),
        (true, Severity::CriticalEscalated) => label.red().bold().to_string(),
    }
}

pub fn status_label(status: Status, color: bool) -> String {
    let label = status.to_string();
    if !color {
        return label;
    }
    match status {
        Status::Active => label.red().to_string(),
        Status::Acknowledged => label.green().to_string(),
        Status::Dismissed => label.dimmed().to_string(),
    }
}

pub fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct AlertRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Segment")]
    pub segment: String,
    #[tabled(rename = "Cause")]
    pub cause: String,
    #[tabled(rename = "Severity")]
    pub severity: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Raised")]
    pub raised: String,
}

impl AlertRow {
    pub fn from_emergency(e: &Emergency, color: bool) -> Self {
        Self {
            id: e.id.to_string(),
            segment: e.segment.clone(),
            cause: e.cause.clone(),
            severity: severity_label(e.severity, color),
            status: status_label(e.status, color),
            raised: local_time(e.created_at),
        }
    }
}

#[derive(Tabled)]
pub struct HistoryRow {
    #[tabled(rename = "When")]
    pub when: String,
    #[tabled(rename = "Transition")]
    pub transition: String,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Segment")]
    pub segment: String,
    #[tabled(rename = "Severity")]
    pub severity: String,
}

impl HistoryRow {
    pub fn from_entry(entry: &HistoryEntry, color: bool) -> Self {
        Self {
            when: local_time(entry.recorded_at),
            transition: entry.transition.to_string(),
            id: entry.emergency.id.to_string(),
            segment: entry.emergency.segment.clone(),
            severity: severity_label(entry.emergency.severity, color),
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serializable items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    if rows.is_empty() {
        return "(none)".into();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}
