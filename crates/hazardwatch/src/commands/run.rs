//! `hazardwatch run`: follow a feed and drive the operator console.

use std::sync::Arc;
use std::time::Duration;

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::Tabled;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hazardwatch_core::{
    CoreError, Engine, FeedSummary, LifecycleEvent, NotificationChannel, NullSink,
    PersistenceSink, SettingsUpdate,
};

use crate::cli::{GlobalOpts, RunArgs};
use crate::commands::{load_config, log_path};
use crate::console::{BannerChannel, BellChannel, PushChannel};
use crate::error::CliError;
use crate::feed;
use crate::operator::{self, OperatorCommand};
use crate::output::{self, AlertRow, HistoryRow, should_color};
use crate::sink::{JsonlSink, read_log};

type OperatorInput = Lines<BufReader<Stdin>>;

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = load_config(global)?;
    let mut engine_config = cfg.to_engine_config()?;
    if let Some(delay) = args.escalation_delay {
        engine_config.settings.escalation_delay = delay;
    }
    if args.no_escalation {
        engine_config.settings.escalation_enabled = false;
    }

    let sink: Arc<dyn PersistenceSink> = if args.no_log {
        Arc::new(NullSink)
    } else {
        let path = log_path(args.log.as_deref(), &cfg);
        if cfg.persistence.seed_from_log {
            engine_config.seen_ids = read_log(&path)?
                .into_iter()
                .map(|a| a.emergency.id.to_string())
                .collect();
            debug!(seen = engine_config.seen_ids.len(), path = %path.display(), "seeded processed ids");
        }
        Arc::new(JsonlSink::new(path))
    };

    let color = should_color(global.color);
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![
        Arc::new(BannerChannel::new(color)),
        Arc::new(BellChannel),
        Arc::new(PushChannel::new(args.push)),
    ];

    let engine = Engine::new(engine_config, channels, sink)?;
    let records = feed::open(&args.feed).await?;

    engine.start().await?;
    if args.push {
        let granted = engine.request_channel_permission().await?;
        info!(granted, "push permission requested");
    }
    let feed_task = engine.follow_feed(records)?;

    let result = if args.once {
        run_once(&engine, feed_task, global).await
    } else {
        let operator_input = (args.feed != feed::STDIN)
            .then(|| BufReader::new(tokio::io::stdin()).lines());
        watch(&engine, feed_task, operator_input, global).await
    };

    engine.shutdown().await;
    result
}

// ── One-shot mode ────────────────────────────────────────────────────

async fn run_once(
    engine: &Engine,
    feed_task: JoinHandle<FeedSummary>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let summary = join_feed(feed_task).await?;
    engine.flush().await;

    print_active(engine, global)?;
    report_summary(&summary, global.quiet);
    Ok(())
}

async fn join_feed(task: JoinHandle<FeedSummary>) -> Result<FeedSummary, CliError> {
    task.await
        .map_err(|e| CliError::Engine(CoreError::Internal(format!("feed task failed: {e}"))))
}

fn report_summary(summary: &FeedSummary, quiet: bool) {
    if quiet {
        return;
    }
    eprintln!(
        "feed: {} records, {} raised, {} duplicates, {} ignored",
        summary.received, summary.raised, summary.duplicates, summary.ignored
    );
}

// ── Interactive mode ─────────────────────────────────────────────────

async fn watch(
    engine: &Engine,
    mut feed_task: JoinHandle<FeedSummary>,
    mut operator_input: Option<OperatorInput>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = should_color(global.color);
    let mut events = engine.events();
    let mut feed_done = false;

    if operator_input.is_some() && !global.quiet {
        eprintln!("watching feed; type `help` for commands");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            joined = &mut feed_task, if !feed_done => {
                feed_done = true;
                match joined {
                    Ok(summary) => report_summary(&summary, global.quiet),
                    Err(e) => warn!(error = %e, "feed task failed"),
                }
            }
            line = next_line(&mut operator_input) => {
                let Some(line) = line else {
                    // Operator console closed: let the feed finish, then stop.
                    if !feed_done {
                        let summary = join_feed(feed_task).await?;
                        engine.flush().await;
                        report_summary(&summary, global.quiet);
                    }
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<OperatorCommand>() {
                    Ok(OperatorCommand::Quit) => break,
                    Ok(command) => execute(engine, command, global).await?,
                    Err(msg) => eprintln!("{msg}"),
                }
            }
            event = events.recv() => match event {
                Ok(event) => report_event(&event, color, global.quiet),
                Err(RecvError::Lagged(missed)) => warn!(missed, "event notices dropped"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

async fn next_line(input: &mut Option<OperatorInput>) -> Option<String> {
    match input {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

fn report_event(event: &LifecycleEvent, color: bool, quiet: bool) {
    if quiet {
        return;
    }
    let e = event.emergency();
    let (label, detail) = match event {
        LifecycleEvent::Raised(_) => ("raised", format!("{} ({})", e.segment, e.cause)),
        LifecycleEvent::Escalated(_) => ("ESCALATED", format!("{} ({})", e.segment, e.cause)),
        LifecycleEvent::Acknowledged(_) => ("acknowledged", e.segment.clone()),
        LifecycleEvent::Dismissed(_) => ("dismissed", e.segment.clone()),
    };
    let label = match (color, event) {
        (false, _) => label.to_owned(),
        (true, LifecycleEvent::Escalated(_)) => label.red().bold().to_string(),
        (true, LifecycleEvent::Raised(_)) => label.yellow().to_string(),
        (true, _) => label.green().to_string(),
    };
    eprintln!("* {label} {}: {detail}", e.id);
}

// ── Operator commands ────────────────────────────────────────────────

async fn execute(
    engine: &Engine,
    command: OperatorCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match command {
        OperatorCommand::Acknowledge(id) => {
            if engine.acknowledge(id.as_str()).await?.is_none() {
                eprintln!("no active alert {id}");
            }
        }
        OperatorCommand::Dismiss(id) => {
            if engine.dismiss(id.as_str()).await?.is_none() {
                eprintln!("no alert {id}");
            }
        }
        OperatorCommand::Escalate(id) => {
            if engine.escalate(id.as_str()).await?.is_none() {
                eprintln!("alert {id} cannot be escalated");
            }
        }
        OperatorCommand::List => print_active(engine, global)?,
        OperatorCommand::History => print_history(engine, global)?,
        OperatorCommand::Timers => print_timers(engine, global).await?,
        OperatorCommand::Delay(delay) => {
            let update = SettingsUpdate {
                escalation_delay: Some(delay),
                ..SettingsUpdate::default()
            };
            match engine.update_settings(&update) {
                Ok(settings) => eprintln!(
                    "escalation delay is now {}",
                    humantime::format_duration(settings.escalation_delay)
                ),
                Err(e) => eprintln!("{e}"),
            }
        }
        OperatorCommand::Channel { kind, enabled } => {
            let mut update = SettingsUpdate::default();
            match kind {
                hazardwatch_core::ChannelKind::Popup => update.popup = Some(enabled),
                hazardwatch_core::ChannelKind::Audible => update.audible = Some(enabled),
                hazardwatch_core::ChannelKind::Push => update.push = Some(enabled),
            }
            engine.update_settings(&update)?;
            eprintln!("{kind} {}", if enabled { "enabled" } else { "disabled" });
        }
        OperatorCommand::Permission => {
            let granted = engine.request_channel_permission().await?;
            eprintln!(
                "push permission {}",
                if granted { "granted" } else { "denied" }
            );
        }
        OperatorCommand::Help => eprintln!("{}", operator::HELP),
        OperatorCommand::Quit => {}
    }
    Ok(())
}

fn print_active(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let color = should_color(global.color);
    let snapshot = engine.active_snapshot();
    let out = output::render_list(
        global.output,
        snapshot.as_slice(),
        |e| AlertRow::from_emergency(e, color),
        |e| e.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn print_history(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let color = should_color(global.color);
    let snapshot = engine.history_snapshot();
    let out = output::render_list(
        global.output,
        snapshot.as_slice(),
        |h| HistoryRow::from_entry(h, color),
        |h| h.emergency.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[derive(Clone, Serialize, Tabled)]
struct TimerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Escalates in")]
    escalates_in: String,
}

async fn print_timers(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let rows: Vec<TimerRow> = engine
        .armed_timers()
        .await?
        .into_iter()
        .map(|t| TimerRow {
            id: t.id.to_string(),
            escalates_in: humantime::format_duration(Duration::from_secs(
                t.remaining().as_secs(),
            ))
            .to_string(),
        })
        .collect();
    let out = output::render_list(global.output, &rows, TimerRow::clone, |t| t.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
