//! Zoekt Dispatch Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.zoekt-dispatch/config.toml`
//! - Explicit config file passed on the command line
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → explicit file → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Root configuration for Zoekt Dispatch.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ZoektConfig {
    /// Known search nodes
    pub nodes: Vec<NodeConfig>,

    /// Credentials used on every node request
    pub auth: AuthConfig,

    /// HTTP client settings
    pub client: ClientConfig,

    /// Feature toggles
    pub features: FeatureConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// A Zoekt node reachable by the dispatcher.
///
/// # Example TOML
///
/// ```toml
/// [[nodes]]
/// id = 1
/// name = "zoekt-1"
/// url = "http://zoekt-1:6080"
/// search_url = "http://zoekt-1:6090"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    /// Node identifier used by callers to route searches
    pub id: u64,

    /// Human readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Indexing base URL; also serves search when `search_url` is unset
    pub url: String,

    /// Dedicated search base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_url: Option<String>,
}

impl NodeConfig {
    pub fn new(id: u64, url: impl Into<String>) -> Self {
        Self {
            id,
            name: None,
            url: url.into(),
            search_url: None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let key = format!("nodes[{}]", self.id);
        validate_url(&format!("{}.url", key), &self.url)?;
        if let Some(ref search_url) = self.search_url {
            validate_url(&format!("{}.search_url", key), search_url)?;
        }
        Ok(())
    }
}

fn validate_url(key: &str, url: &str) -> Result<(), ConfigError> {
    if url.trim().is_empty() {
        return Err(ConfigError::invalid_value(key, "URL must not be empty"));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::invalid_value(
            key,
            format!("'{}' is not an http(s) URL", url),
        ));
    }
    Ok(())
}

/// Credential sources.
///
/// Basic auth credentials live in files so they can be mounted as secrets;
/// a missing username file disables basic auth entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// File containing the basic auth username
    pub username_file: Option<PathBuf>,

    /// File containing the basic auth password
    pub password_file: Option<PathBuf>,

    /// File containing the shared JWT signing secret
    pub jwt_secret_file: Option<PathBuf>,

    /// Environment variable holding the JWT signing secret.
    /// Used when `jwt_secret_file` is unset or unreadable.
    pub jwt_secret_env: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username_file: None,
            password_file: None,
            jwt_secret_file: None,
            jwt_secret_env: Some("ZOEKT_JWT_SECRET".to_string()),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Log request and response bodies at debug level
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            debug: false,
        }
    }
}

/// Feature toggles.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FeatureConfig {
    /// Send structured (v2) payloads to proxy nodes for every user
    pub ast_search_payload: bool,

    /// Users that get the structured payload even when it is globally off
    pub ast_search_payload_users: Vec<u64>,
}

impl FeatureConfig {
    /// Whether the structured payload applies to the given user.
    pub fn ast_search_payload_enabled_for(&self, user_id: Option<u64>) -> bool {
        self.ast_search_payload
            || user_id.is_some_and(|id| self.ast_search_payload_users.contains(&id))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override request timeout
    pub timeout_secs: Option<u64>,

    /// Override body debug logging
    pub debug: Option<bool>,

    /// Override the structured payload toggle
    pub ast_search_payload: Option<bool>,

    /// Override log level
    pub log_level: Option<String>,
}

impl ZoektConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(timeout) = overrides.timeout_secs {
            self.client.timeout_secs = timeout;
        }

        if let Some(debug) = overrides.debug {
            self.client.debug = debug;
        }

        if let Some(enabled) = overrides.ast_search_payload {
            self.features.ast_search_payload = enabled;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(ConfigError::DuplicateNode { id: node.id });
            }
            node.validate()?;
        }

        if self.client.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "client.timeout_secs",
                "must be greater than zero",
            ));
        }

        Ok(())
    }
}
