//! Operator console commands typed while `hazardwatch run` is active.

use std::str::FromStr;
use std::time::Duration;

use hazardwatch_core::ChannelKind;

pub const HELP: &str = "\
commands:
  ack <id>              acknowledge an alert
  dismiss <id>          dismiss an alert as a false alarm
  escalate <id>         escalate an alert now
  list                  show active alerts
  history               show raise and escalation history
  timers                show pending escalations
  delay <duration>      set the escalation delay, e.g. 30s or 5m
  enable <channel>      turn popup, audible or push on
  disable <channel>     turn popup, audible or push off
  permission            ask for push permission
  quit                  stop watching";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Acknowledge(String),
    Dismiss(String),
    Escalate(String),
    List,
    History,
    Timers,
    Delay(Duration),
    Channel { kind: ChannelKind, enabled: bool },
    Permission,
    Help,
    Quit,
}

impl FromStr for OperatorCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".into());
        };
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments for `{verb}`"));
        }

        let required = |what: &str| -> Result<String, String> {
            arg.map(str::to_owned)
                .ok_or_else(|| format!("`{verb}` needs {what}"))
        };

        match verb.to_ascii_lowercase().as_str() {
            "ack" | "acknowledge" => Ok(Self::Acknowledge(required("an alert id")?)),
            "dismiss" => Ok(Self::Dismiss(required("an alert id")?)),
            "escalate" => Ok(Self::Escalate(required("an alert id")?)),
            "list" | "ls" => Ok(Self::List),
            "history" => Ok(Self::History),
            "timers" => Ok(Self::Timers),
            "delay" => {
                let raw = required("a duration")?;
                humantime::parse_duration(&raw)
                    .map(Self::Delay)
                    .map_err(|e| format!("'{raw}' is not a duration: {e}"))
            }
            "enable" | "disable" => {
                let raw = required("a channel (popup, audible, push)")?;
                let kind = ChannelKind::from_str(&raw.to_ascii_lowercase())
                    .map_err(|_| format!("unknown channel '{raw}'"))?;
                Ok(Self::Channel {
                    kind,
                    enabled: verb.eq_ignore_ascii_case("enable"),
                })
            }
            "permission" => Ok(Self::Permission),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command `{other}`, type `help`")),
        }
    }
}
