//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.zoekt-dispatch/config.toml`
//! 2. Explicit config file (e.g. `--config`)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{
    AuthConfig, ClientConfig, ConfigOverrides, FeatureConfig, LogFormat, LoggingConfig,
    NodeConfig, ZoektConfig,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".zoekt-dispatch";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.zoekt-dispatch`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config file, as written
    global_config: Option<ConfigLayer>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.zoekt-dispatch`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Load configuration with an optional explicit file and CLI overrides.
    ///
    /// Merges config in order: global → explicit file → overrides.
    /// An explicit file that does not exist is an error; a missing global
    /// file is not.
    pub fn load(
        &mut self,
        explicit: Option<&Path>,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<ZoektConfig, ConfigError> {
        let mut config = ZoektConfig::default();

        if let Some(global) = self.global_layer()? {
            config = global.apply(config);
        }

        if let Some(path) = explicit {
            debug!("Loading config from {:?}", path);
            config = load_layer(path)?.apply(config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;

        Ok(config)
    }

    /// Load only the global configuration, over defaults.
    pub fn load_global(&mut self) -> Result<Option<ZoektConfig>, ConfigError> {
        Ok(self
            .global_layer()?
            .map(|layer| layer.apply(ZoektConfig::default())))
    }

    fn global_layer(&mut self) -> Result<Option<ConfigLayer>, ConfigError> {
        if let Some(ref layer) = self.global_config {
            return Ok(Some(layer.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let layer = load_layer(&global_path)?;

        self.global_config = Some(layer.clone());

        Ok(Some(layer))
    }

    /// Save configuration to an arbitrary path.
    pub fn save(&self, path: &Path, config: &ZoektConfig) -> Result<(), ConfigError> {
        save_config_file(path, config)
    }

    /// Initialize the global configuration directory.
    ///
    /// Creates `~/.zoekt-dispatch/config.toml` with default configuration
    /// unless the file already exists.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        if !global_dir.exists() {
            std::fs::create_dir_all(global_dir)
                .map_err(|e| ConfigError::create_dir(global_dir, e))?;
        }

        let config_path = global_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            save_config_file(&config_path, &ZoektConfig::default())?;
        }

        Ok(config_path)
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn load_layer(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

fn save_config_file(path: &Path, config: &ZoektConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// One configuration file as written.
///
/// Scalars are optional so that a file overrides only what it sets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    nodes: Vec<NodeConfig>,
    auth: AuthLayer,
    client: ClientLayer,
    features: FeatureLayer,
    logging: LoggingLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AuthLayer {
    username_file: Option<PathBuf>,
    password_file: Option<PathBuf>,
    jwt_secret_file: Option<PathBuf>,
    jwt_secret_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ClientLayer {
    timeout_secs: Option<u64>,
    debug: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FeatureLayer {
    ast_search_payload: Option<bool>,
    ast_search_payload_users: Vec<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LoggingLayer {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl ConfigLayer {
    /// Merge this layer over `base`; values set here win.
    fn apply(self, base: ZoektConfig) -> ZoektConfig {
        ZoektConfig {
            nodes: merge_nodes(base.nodes, self.nodes),
            auth: merge_auth(base.auth, self.auth),
            client: ClientConfig {
                timeout_secs: self.client.timeout_secs.unwrap_or(base.client.timeout_secs),
                debug: self.client.debug.unwrap_or(base.client.debug),
            },
            features: merge_features(base.features, self.features),
            logging: LoggingConfig {
                level: self.logging.level.unwrap_or(base.logging.level),
                format: self.logging.format.unwrap_or(base.logging.format),
            },
        }
    }
}

/// Overlay nodes replace base nodes with the same id; new ids are appended.
fn merge_nodes(base: Vec<NodeConfig>, overlay: Vec<NodeConfig>) -> Vec<NodeConfig> {
    let mut nodes = base;
    for node in overlay {
        match nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => nodes.push(node),
        }
    }
    nodes
}

fn merge_auth(base: AuthConfig, overlay: AuthLayer) -> AuthConfig {
    AuthConfig {
        username_file: overlay.username_file.or(base.username_file),
        password_file: overlay.password_file.or(base.password_file),
        jwt_secret_file: overlay.jwt_secret_file.or(base.jwt_secret_file),
        jwt_secret_env: overlay.jwt_secret_env.or(base.jwt_secret_env),
    }
}

/// The allowlist accumulates across layers.
fn merge_features(base: FeatureConfig, overlay: FeatureLayer) -> FeatureConfig {
    let mut users = base.ast_search_payload_users;
    for user in overlay.ast_search_payload_users {
        if !users.contains(&user) {
            users.push(user);
        }
    }

    FeatureConfig {
        ast_search_payload: overlay
            .ast_search_payload
            .unwrap_or(base.ast_search_payload),
        ast_search_payload_users: users,
    }
}
