//! Console notification channels.
//!
//! The popup channel prints a banner to stdout, the audible channel rings
//! the terminal bell, and the push channel stands in for desktop
//! notifications and only works when `--push` was given.

use std::io::{self, Write};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use owo_colors::OwoColorize;

use hazardwatch_core::{
    ChannelKind, CoreError, Cue, Notification, NotificationChannel, Permission, Severity,
};

fn write_stdout(text: &str) -> Result<(), CoreError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}")
        .and_then(|()| stdout.flush())
        .map_err(|e| CoreError::ChannelUnavailable {
            channel: ChannelKind::Popup,
            reason: e.to_string(),
        })
}

// ── Banner (popup) ───────────────────────────────────────────────────

pub struct BannerChannel {
    color: bool,
}

impl BannerChannel {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn render(&self, notification: &Notification) -> String {
        let rule = "=".repeat(60);
        let title = match (self.color, notification.severity) {
            (false, _) => notification.title.clone(),
            (true, Severity::Critical) => notification.title.yellow().bold().to_string(),
            (true, Severity::CriticalEscalated) => {
                notification.title.on_red().white().bold().to_string()
            }
        };
        let actions = notification
            .actions
            .iter()
            .map(|a| format!("[{}]", a.title()))
            .collect::<Vec<_>>()
            .join(" ");

        let mut lines = vec![rule.clone(), format!("{title}  (alert {})", notification.tag)];
        lines.extend(notification.body.lines().map(str::to_owned));
        if !actions.is_empty() {
            lines.push(format!("{actions}  -> type `ack {}`", notification.tag));
        }
        lines.push(rule);
        lines.join("\n")
    }
}

impl NotificationChannel for BannerChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Popup
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), CoreError>> {
        let result = write_stdout(&self.render(notification));
        futures_util::future::ready(result).boxed()
    }
}

// ── Terminal bell (audible) ──────────────────────────────────────────

/// Rings three times for a hazard and once for an acknowledgment.
pub struct BellChannel;

impl BellChannel {
    pub fn pattern(cue: Cue) -> &'static str {
        match cue {
            Cue::Hazard => "\x07\x07\x07",
            Cue::Acknowledged => "\x07",
        }
    }
}

impl NotificationChannel for BellChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Audible
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), CoreError>> {
        let mut stderr = io::stderr().lock();
        let result = stderr
            .write_all(Self::pattern(notification.cue).as_bytes())
            .and_then(|()| stderr.flush())
            .map_err(|e| CoreError::ChannelUnavailable {
                channel: ChannelKind::Audible,
                reason: e.to_string(),
            });
        futures_util::future::ready(result).boxed()
    }
}

// ── Push ─────────────────────────────────────────────────────────────

pub struct PushChannel {
    allowed: bool,
}

impl PushChannel {
    pub fn new(allowed: bool) -> Self {
        Self { allowed }
    }
}

impl NotificationChannel for PushChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    fn permission(&self) -> BoxFuture<'_, Permission> {
        let answer = if self.allowed {
            Permission::Granted
        } else {
            Permission::Prompt
        };
        futures_util::future::ready(answer).boxed()
    }

    fn request_permission(&self) -> BoxFuture<'_, Permission> {
        let answer = if self.allowed {
            Permission::Granted
        } else {
            Permission::Denied
        };
        futures_util::future::ready(answer).boxed()
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), CoreError>> {
        let first_line = notification.body.lines().next().unwrap_or_default();
        let result = write_stdout(&format!(
            "[push] {}: {first_line} (tag {})",
            notification.title, notification.tag
        ));
        futures_util::future::ready(result).boxed()
    }
}
