//! Connector configuration sections.

use crate::error::ConnectorError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const IMPLEMENTATION_KEY: &str = "implementation";
pub const AUTH_TYPE_KEY: &str = "auth_type";
pub const AUTH_USERNAME_KEY: &str = "http_auth_username";
pub const AUTH_PASSWORD_KEY: &str = "http_auth_password";

/// One `[connectors.<Name>]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSection {
    /// Name of the implementation to resolve from the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_auth_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_auth_password: Option<String>,
    /// Implementation-specific keys, passed through untouched
    #[serde(flatten)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl ConnectorSection {
    pub fn with_implementation(name: impl Into<String>) -> Self {
        Self {
            implementation: Some(name.into()),
            ..Self::default()
        }
    }

    /// The configured implementation name. Blank values count as missing.
    pub fn implementation(&self, section: &str) -> Result<&str, ConnectorError> {
        required(section, IMPLEMENTATION_KEY, self.implementation.as_deref())
    }

    /// Parses the section's authentication settings.
    pub fn auth_mode(&self, section: &str) -> Result<AuthMode, ConnectorError> {
        match self.auth_type.as_deref().map(str::trim) {
            None | Some("") | Some("None") => Ok(AuthMode::None),
            Some("BasicHttpAuthentication") => Ok(AuthMode::Basic {
                username: required(section, AUTH_USERNAME_KEY, self.http_auth_username.as_deref())?.to_string(),
                password: required(section, AUTH_PASSWORD_KEY, self.http_auth_password.as_deref())?.to_string(),
            }),
            Some(other) => Err(ConnectorError::InvalidConfiguration {
                section: section.to_string(),
                reason: format!("unknown {AUTH_TYPE_KEY} '{other}'"),
            }),
        }
    }
}

fn required<'a>(section: &str, key: &'static str, value: Option<&'a str>) -> Result<&'a str, ConnectorError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConnectorError::MissingConfiguration {
            section: section.to_string(),
            key: Some(key),
        }),
    }
}

/// All connector sections, keyed by section name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorSections(HashMap<String, ConnectorSection>);

impl ConnectorSections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, name: impl Into<String>, section: ConnectorSection) -> Self {
        self.insert(name, section);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, section: ConnectorSection) -> Option<ConnectorSection> {
        self.0.insert(name.into(), section)
    }

    pub fn get(&self, name: &str) -> Option<&ConnectorSection> {
        self.0.get(name)
    }

    /// Looks up a section, failing when it is absent.
    pub fn section(&self, name: &str) -> Result<&ConnectorSection, ConnectorError> {
        self.get(name).ok_or_else(|| ConnectorError::MissingConfiguration {
            section: name.to_string(),
            key: None,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How callers of a connector's route must authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    None,
    Basic { username: String, password: String },
}
