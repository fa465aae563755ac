//! Subcommand handlers.

pub mod config_cmd;
pub mod records;
pub mod run;

use std::path::Path;

use hazardwatch_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config from `--config` if given, else the platform default.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_path(global);
    Ok(hazardwatch_config::load_config_from(&path)?)
}

pub fn config_path(global: &GlobalOpts) -> std::path::PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(hazardwatch_config::config_path)
}

/// Log path from a command flag, falling back to the config.
pub fn log_path(flag: Option<&Path>, config: &Config) -> std::path::PathBuf {
    flag.map_or_else(|| config.persistence_path(), Path::to_path_buf)
}
