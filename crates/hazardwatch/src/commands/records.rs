//! `hazardwatch records`: read back the persistence log.

use tabled::Tabled;

use crate::cli::{GlobalOpts, RecordsArgs};
use crate::commands::{load_config, log_path};
use crate::error::CliError;
use crate::output::{self, severity_label, should_color, status_label};
use crate::sink::{LoggedAlert, read_log};

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Segment")]
    segment: String,
    #[tabled(rename = "Cause")]
    cause: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Raised")]
    raised: String,
    #[tabled(rename = "Acknowledged by")]
    acknowledged_by: String,
}

pub fn handle(args: &RecordsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = load_config(global)?;
    let path = log_path(args.log.as_deref(), &cfg);
    let color = should_color(global.color);

    let mut alerts = read_log(&path)?;
    if args.unacknowledged {
        alerts.retain(|a| a.acknowledged_by.is_none());
    }

    let out = output::render_list(
        global.output,
        &alerts,
        |a: &LoggedAlert| RecordRow {
            id: a.emergency.id.to_string(),
            segment: a.emergency.segment.clone(),
            cause: a.emergency.cause.clone(),
            severity: severity_label(a.emergency.severity, color),
            status: status_label(a.emergency.status, color),
            raised: a.emergency.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            acknowledged_by: a.acknowledged_by.clone().unwrap_or_else(|| "-".into()),
        },
        |a| a.emergency.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
