//! Zoekt Dispatch CLI - Send searches to Zoekt nodes
//!
//! An operator tool for exercising the search dispatcher against real
//! nodes: single-node searches, fan-out searches through a proxying node,
//! and configuration management.
//!
//! # Usage
//!
//! ```bash
//! # Search two projects on node 1
//! zoekt-dispatch search "fn main" --node 1 --project 10 --project 11
//!
//! # Fan out over two nodes
//! zoekt-dispatch proxy "lang:rust Mutex" --target 1=10,11 --target 2=12
//!
//! # List configured nodes
//! zoekt-dispatch nodes
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zoekt_config::LogFormat;

mod commands;
mod progress;

/// Zoekt Dispatch - Search request dispatch for Zoekt nodes
#[derive(Parser, Debug)]
#[command(name = "zoekt-dispatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "ZOEKT_DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "ZOEKT_DISPATCH_TIMEOUT")]
    timeout: Option<u64>,

    /// Log request and response bodies
    #[arg(long, global = true)]
    debug_bodies: bool,

    /// Send the structured payload to proxy nodes for every user
    #[arg(long, global = true)]
    ast_payload: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> zoekt_config::ConfigOverrides {
        zoekt_config::ConfigOverrides {
            timeout_secs: self.timeout,
            debug: self.debug_bodies.then_some(true),
            ast_search_payload: self.ast_payload.then_some(true),
            log_level: self.log_level_override().map(String::from),
        }
    }

    fn log_level_override(&self) -> Option<&'static str> {
        if self.quiet {
            Some("error")
        } else if self.verbose || self.debug_bodies {
            Some("debug")
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search projects on a single node
    Search(commands::search::SearchArgs),

    /// Search across nodes through a proxying node
    Proxy(commands::proxy::ProxyArgs),

    /// List configured nodes
    Nodes(commands::nodes::NodesArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config errors surface from the command itself; logging falls back to
    // defaults when the config cannot be read here.
    let logging = commands::peek_logging_config(&cli.global);
    let level = cli
        .global
        .log_level_override()
        .map(String::from)
        .unwrap_or(logging.level);

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.with_ansi(true).finish())?
        }
    }

    match cli.command {
        Commands::Search(args) => commands::search::execute(args, cli.global).await,
        Commands::Proxy(args) => commands::proxy::execute(args, cli.global).await,
        Commands::Nodes(args) => commands::nodes::execute(args, cli.global).await,
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global).await,
    }
}
