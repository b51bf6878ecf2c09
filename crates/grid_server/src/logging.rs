//! Logging setup
//!
//! `tracing` subscriber with an `EnvFilter` (`RUST_LOG` wins over the
//! configured level) and a human-readable or JSON `fmt` layer.

use crate::config::LoggingSettings;
use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global logging subscriber.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn setup_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let registry = tracing_subscriber::registry().with(filter);

    if settings.json_format {
        registry
            .with(fmt::layer().json().with_target(false).with_thread_names(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_names(true))
            .try_init()?;
    }

    tracing::info!("🔧 Logging initialized with level: {}", settings.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_setup_only_once() {
        let settings = LoggingSettings::default();
        // Other tests in this binary may have installed a subscriber first.
        let first = setup_logging(&settings);
        let second = setup_logging(&settings);
        assert!(second.is_err());
        let _ = first;
    }
}
