//! Configuration for the grid server
//!
//! Command-line arguments, the TOML configuration file and its defaults.

pub mod args;
pub mod settings;

pub use args::Args;
pub use settings::{Config, LoaderKind, LoggingSettings, ModuleSettings, ServerSettings, KNOWN_SERVICES};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

/// Load configuration from file or create the default configuration.
///
/// A missing file is created with the default settings, which are then
/// used. Command-line overrides are applied and the result validated.
///
/// # Errors
/// * File I/O failures
/// * TOML parse failures
/// * Settings rejected by [`Config::validate`]
pub async fn load_config(args: &Args) -> Result<Config> {
    let mut config = if args.config.exists() {
        let config_str = tokio::fs::read_to_string(&args.config).await?;
        match toml::de::from_str::<Config>(&config_str) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse config file {}: {}", args.config.display(), e);
                return Err(e.into());
            }
        }
    } else {
        warn!("Configuration file not found: {}, using defaults", args.config.display());

        let default_config = Config::default();
        let config_str = toml::to_string_pretty(&default_config)?;
        tokio::fs::write(&args.config, config_str).await?;
        info!("Created default configuration file: {}", args.config.display());

        default_config
    };

    apply_overrides(&mut config, args);
    config
        .validate()
        .map_err(|reason| anyhow!("Invalid configuration {}: {}", args.config.display(), reason))?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(directory) = &args.modules {
        config.modules.directory = directory.clone();
    }
    if args.debug {
        config.logging.level = "debug".to_string();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
}
