//! Config subcommand handlers.

use hazardwatch_config::{Config, save_config_to};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::commands::{config_path, load_config};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_path(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = load_config(global)?;
            // Validate before showing so broken values surface here.
            cfg.to_engine_config()?;
            let text = toml::to_string_pretty(&cfg).map_err(|e| CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            })?;
            output::print_output(text.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            save_config_to(&Config::default(), &path)?;
            if !global.quiet {
                eprintln!("wrote default configuration to {}", path.display());
            }
            Ok(())
        }
    }
}
