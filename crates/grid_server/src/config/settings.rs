//! Configuration file structures.

use grid_connectors::{ConnectorSection, ConnectorSections};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Service connectors the host knows how to bring up.
pub const KNOWN_SERVICES: &[&str] = &["AssetService"];

/// Grid server configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub modules: ModuleSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// One section per connector, `[connectors.<Name>]`
    #[serde(default = "default_connectors")]
    pub connectors: ConnectorSections,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Connectors to start, by section name
    #[serde(default)]
    pub services: Vec<String>,
    /// Abort startup on the first connector that fails to initialize
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    /// Shared libraries opened at runtime
    Library,
    /// Modules linked into the server binary
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSettings {
    pub directory: PathBuf,
    #[serde(default = "default_loader")]
    pub loader: LoaderKind,
    /// Load the module directory on startup
    #[serde(default = "default_auto_load")]
    pub auto_load: bool,
    /// If non-empty, only these modules are loaded
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// Per-module load limit in seconds; 0 disables it
    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: u64,
}

impl ModuleSettings {
    pub fn load_timeout(&self) -> Option<Duration> {
        (self.load_timeout_secs > 0).then(|| Duration::from_secs(self.load_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json_format: bool,
}

fn default_fail_fast() -> bool {
    true
}

fn default_loader() -> LoaderKind {
    LoaderKind::Static
}

fn default_auto_load() -> bool {
    true
}

fn default_load_timeout() -> u64 {
    30
}

fn default_level() -> String {
    "info".to_string()
}

fn default_connectors() -> ConnectorSections {
    ConnectorSections::new().with_section(
        "AssetService",
        ConnectorSection::with_implementation(module_asset_memory::MEMORY_ASSET_SERVICE),
    )
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            modules: ModuleSettings::default(),
            logging: LoggingSettings::default(),
            connectors: default_connectors(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            services: vec!["AssetService".to_string()],
            fail_fast: default_fail_fast(),
        }
    }
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("modules"),
            loader: default_loader(),
            auto_load: default_auto_load(),
            whitelist: Vec::new(),
            load_timeout_secs: default_load_timeout(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_format: false,
        }
    }
}

impl Config {
    /// Checks settings that can be judged without loading anything.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(unknown) = self
            .server
            .services
            .iter()
            .find(|service| !KNOWN_SERVICES.contains(&service.as_str()))
        {
            return Err(format!(
                "unknown service '{}' (known: {})",
                unknown,
                KNOWN_SERVICES.join(", ")
            ));
        }
        if self.modules.directory.as_os_str().is_empty() {
            return Err("module directory cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.services, vec!["AssetService".to_string()]);
        assert!(config.server.fail_fast);
        assert_eq!(config.modules.loader, LoaderKind::Static);
        assert_eq!(config.modules.load_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.connectors.get("AssetService").unwrap().implementation.as_deref(),
            Some("MemoryAssetService")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [modules]
            directory = "/srv/grid/modules"
            loader = "library"
            load_timeout_secs = 0

            [connectors.AssetService]
            implementation = "NullAssetService"
            "#,
        )
        .unwrap();

        assert_eq!(config.modules.loader, LoaderKind::Library);
        assert!(config.modules.load_timeout().is_none());
        assert!(config.modules.auto_load);
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.connectors.get("AssetService").unwrap().implementation.as_deref(),
            Some("NullAssetService")
        );
    }

    #[test]
    fn test_unknown_service_is_rejected() {
        let mut config = Config::default();
        config.server.services.push("GridUserService".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.contains("GridUserService"));
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.connectors, Config::default().connectors);
        assert_eq!(parsed.modules.directory, PathBuf::from("modules"));
    }
}
