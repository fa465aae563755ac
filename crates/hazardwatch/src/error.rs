//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use hazardwatch_config::ConfigError;
use hazardwatch_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const FEED: i32 = 4;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Feed ─────────────────────────────────────────────────────────
    #[error("Could not open feed {path}")]
    #[diagnostic(
        code(hazardwatch::feed_unavailable),
        help("Pass a readable JSON-lines file with --feed, or `-` to read stdin.")
    )]
    FeedUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ── Engine ───────────────────────────────────────────────────────
    #[error("Alert engine error: {0}")]
    #[diagnostic(code(hazardwatch::engine))]
    Engine(CoreError),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hazardwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(hazardwatch::config),
        help(
            "Check the config file (see: hazardwatch config path)\n\
             or HAZARDWATCH_* environment variables."
        )
    )]
    Config(ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(hazardwatch::config_exists),
        help("Run: hazardwatch config init --force to overwrite it")
    )]
    ConfigExists { path: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(hazardwatch::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(hazardwatch::serialization))]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FeedUnavailable { .. } => exit_code::FEED,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Config(_) => exit_code::CONFIG,
            Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Engine(_) | Self::Io(_) | Self::Serialization(_) => exit_code::GENERAL,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Engine(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}
