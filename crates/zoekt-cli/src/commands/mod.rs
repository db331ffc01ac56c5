//! CLI command implementations

pub mod config;
pub mod nodes;
pub mod proxy;
pub mod search;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde_json::{json, Value};
use zoekt_client::{SearchMode, SearchQuery, SearchResponse, SearchSource, ZoektClient};
use zoekt_config::{ConfigLoader, LoggingConfig, ZoektConfig};

use crate::progress;
use crate::GlobalOptions;

/// Load configuration: global file, then `--config`, then CLI overrides.
pub fn load_config(global: &GlobalOptions) -> Result<ZoektConfig> {
    let mut loader = ConfigLoader::new();
    let overrides = global.to_config_overrides();

    loader
        .load(global.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")
}

/// Logging settings, or defaults when the configuration cannot be loaded.
pub fn peek_logging_config(global: &GlobalOptions) -> LoggingConfig {
    load_config(global)
        .map(|c| c.logging)
        .unwrap_or_default()
}

/// Build a client from the loaded configuration.
pub fn create_client(global: &GlobalOptions) -> Result<ZoektClient> {
    let config = load_config(global)?;
    ZoektClient::from_config(&config).context("Failed to create search client")
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    /// Request made through the API
    Api,
    /// Request made from the web UI
    Web,
}

impl From<SourceArg> for SearchSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Api => SearchSource::Api,
            SourceArg::Web => SearchSource::Web,
        }
    }
}

/// Query options shared by `search` and `proxy`.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Search query
    pub query: String,

    /// Maximum number of matches to return
    #[arg(long, short = 'n', default_value = "20")]
    pub num: usize,

    /// Treat the query as a regular expression
    #[arg(long, conflicts_with = "exact")]
    pub regex: bool,

    /// Match the query literally
    #[arg(long)]
    pub exact: bool,

    /// Where the request originates; decides the default mode
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Output format
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    pub output: OutputFormat,
}

impl QueryArgs {
    pub fn to_query(&self) -> SearchQuery {
        let regex = match (self.regex, self.exact) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        let source = self.source.map(SearchSource::from);

        let query = SearchQuery::new(self.query.clone())
            .with_mode(SearchMode::resolve(regex, source));
        match source {
            Some(source) => query.with_source(source),
            None => query,
        }
    }
}

/// Run a search request behind a spinner.
pub async fn run_with_spinner<F>(message: &str, quiet: bool, request: F) -> Result<SearchResponse>
where
    F: std::future::Future<Output = zoekt_client::Result<SearchResponse>>,
{
    let pb = progress::spinner(message, quiet);
    match request.await {
        Ok(response) => {
            progress::finish_spinner(pb, "Search complete");
            Ok(response)
        }
        Err(e) => {
            progress::finish_spinner_error(pb, "Search failed");
            Err(e).context("Search request failed")
        }
    }
}

/// Print a response; a backend-reported failure is an error.
pub fn print_response(
    response: &SearchResponse,
    args: &QueryArgs,
    quiet: bool,
) -> Result<()> {
    if let Some(message) = response.error_message() {
        anyhow::bail!(
            "Zoekt returned an error (HTTP {}): {}",
            response.status(),
            message
        );
    }

    let result = response.result()?;

    match args.output {
        OutputFormat::Json => {
            let files: Vec<&Value> = result.files().collect();
            let output = json!({
                "file_count": result.file_count(),
                "match_count": result.match_count(),
                "files": files,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize results")?
            );
        }
        OutputFormat::Text => {
            if result.file_count() == 0 {
                print_info(&format!("No results found for: {}", args.query), quiet);
                return Ok(());
            }

            if !quiet {
                println!(
                    "Found {} matches in {} files for \"{}\":\n",
                    result.match_count(),
                    result.file_count(),
                    args.query
                );
            }

            for file in result.files() {
                let name = field(file, "FileName")
                    .and_then(Value::as_str)
                    .unwrap_or("<unknown>");
                let matches = field(file, "LineMatches")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);

                match field(file, "Repository").and_then(Value::as_str) {
                    Some(repo) => println!("{}:{} ({} matches)", repo, name, matches),
                    None => println!("{} ({} matches)", name, matches),
                }
            }
        }
    }

    Ok(())
}

fn field<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    let object = record.as_object()?;
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
