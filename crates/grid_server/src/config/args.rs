//! Command-line argument parsing

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the grid server.
///
/// Flags override the matching configuration file settings.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    ///
    /// If the file doesn't exist, a default configuration is written there.
    #[arg(short, long, default_value = "grid.toml")]
    pub config: PathBuf,

    /// Module directory, overriding `[modules] directory`
    #[arg(short, long)]
    pub modules: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: PathBuf::from("grid.toml"),
            modules: None,
            debug: false,
            json_logs: false,
        }
    }
}
