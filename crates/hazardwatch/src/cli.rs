//! Clap derive structures for the `hazardwatch` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hazardwatch -- fire and gas alert console
#[derive(Debug, Parser)]
#[command(
    name = "hazardwatch",
    version,
    about = "Watch a building sensor feed and raise, escalate and track hazard alerts",
    long_about = "Reads JSON-lines sensor records, raises an alert for every new fire or gas \
        emergency, notifies the console channels, escalates unacknowledged alerts \
        after a delay and keeps a bounded history.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to use instead of the platform default
    #[arg(long, short = 'c', env = "HAZARDWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format for tables and listings
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow a sensor feed and manage alerts until interrupted
    Run(RunArgs),

    /// Show emergency records from the persistence log
    Records(RecordsArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

// ── run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// JSON-lines feed to read, `-` for stdin
    #[arg(long, short = 'f', default_value = "-")]
    pub feed: String,

    /// Exit once the feed ends and print the active alerts
    #[arg(long)]
    pub once: bool,

    /// Allow the desktop push channel
    #[arg(long)]
    pub push: bool,

    /// Escalation delay, e.g. `30s` or `5m` (overrides config)
    #[arg(long, short = 'd', value_parser = humantime::parse_duration)]
    pub escalation_delay: Option<std::time::Duration>,

    /// Never escalate alerts
    #[arg(long)]
    pub no_escalation: bool,

    /// Persistence log (overrides config)
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Do not write a persistence log
    #[arg(long, conflicts_with = "log")]
    pub no_log: bool,
}

// ── records ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RecordsArgs {
    /// Persistence log to read (overrides config)
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Only show alerts without an acknowledgment
    #[arg(long)]
    pub unacknowledged: bool,
}

// ── config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display the resolved configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
