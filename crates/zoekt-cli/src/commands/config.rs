//! Config command - View and manage configuration
//!
//! - Show the effective configuration
//! - Get a single value by dotted key
//! - Create the global config file
//! - Show configuration file paths

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;
use zoekt_config::{ConfigLoader, ZoektConfig};

use super::{load_config, print_info};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Get a specific configuration value
    Get(GetArgs),

    /// Create the global configuration file with defaults
    Init,

    /// Show configuration file paths
    Path(PathArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON instead of TOML
    #[arg(long)]
    json: bool,
}

/// Arguments for the get command
#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Configuration key (e.g., "client.timeout_secs")
    key: String,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Whether global config exists
    pub global_exists: bool,
    /// Explicit config file, if given
    pub explicit: Option<PathBuf>,
}

/// Execute the config command
pub async fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, global),
        ConfigCommand::Get(args) => execute_get(args, global),
        ConfigCommand::Init => execute_init(global),
        ConfigCommand::Path(args) => execute_path(args, global),
    }
}

fn execute_show(args: ShowArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let toml = toml_string(&config)?;
        print!("{}", toml);
    }

    Ok(())
}

fn execute_get(args: GetArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;

    let value = get_config_value(&config, &args.key)
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", args.key))?;

    match value {
        serde_json::Value::String(s) => println!("{}", s),
        serde_json::Value::Null => println!("null"),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }

    Ok(())
}

fn execute_init(global: GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let path = loader
        .init_global()
        .context("Failed to initialize global configuration")?;

    print_info(&format!("Global config: {}", path.display()), global.quiet);
    Ok(())
}

fn execute_path(args: PathArgs, global: GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let global_path = loader.global_config_path();

    let paths = ConfigPaths {
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        global: global_path,
        explicit: global.config.clone(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    match paths.global {
        Some(ref gp) => {
            let status = if paths.global_exists { "exists" } else { "not found" };
            println!("Global:   {} ({})", gp.display(), status);
        }
        None => println!("Global:   not available (no home directory)"),
    }

    if let Some(ref explicit) = paths.explicit {
        let status = if explicit.exists() { "exists" } else { "not found" };
        println!("Explicit: {} ({})", explicit.display(), status);
    }

    Ok(())
}

fn toml_string(config: &ZoektConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration")
}

/// Look up a dotted key such as `client.timeout_secs`.
fn get_config_value(config: &ZoektConfig, key: &str) -> Option<serde_json::Value> {
    let mut value = serde_json::to_value(config).ok()?;
    for part in key.split('.') {
        value = match value {
            serde_json::Value::Object(mut map) => map.remove(part)?,
            serde_json::Value::Array(mut items) => {
                let index: usize = part.parse().ok()?;
                if index >= items.len() {
                    return None;
                }
                items.swap_remove(index)
            }
            _ => return None,
        };
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoekt_config::NodeConfig;

    #[test]
    fn test_get_config_value() {
        let config = ZoektConfig {
            nodes: vec![NodeConfig::new(1, "http://a:6080")],
            ..Default::default()
        };

        assert_eq!(
            get_config_value(&config, "client.timeout_secs"),
            Some(serde_json::json!(30))
        );
        assert_eq!(
            get_config_value(&config, "nodes.0.url"),
            Some(serde_json::json!("http://a:6080"))
        );
        assert_eq!(get_config_value(&config, "nodes.3.url"), None);
        assert_eq!(get_config_value(&config, "client.nope"), None);
    }

    #[test]
    fn test_toml_string_drops_unset_options() {
        let toml = toml_string(&ZoektConfig::default()).unwrap();
        assert!(toml.contains("timeout_secs = 30"));
        assert!(!toml.contains("username_file"));
    }
}
