//! Nodes command - List configured Zoekt nodes

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use zoekt_client::StaticNodeRegistry;

use super::{load_config, print_info, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the nodes command
#[derive(Args, Debug)]
pub struct NodesArgs {
    /// Output format
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Debug, Serialize)]
struct NodeRow {
    id: u64,
    name: String,
    index_url: String,
    search_url: String,
}

/// Execute the nodes command
pub async fn execute(args: NodesArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let registry = StaticNodeRegistry::from_config(&config);

    let rows: Vec<NodeRow> = registry
        .list()
        .await
        .into_iter()
        .map(|n| NodeRow {
            id: n.id.0,
            search_url: n.search_base_url().to_string(),
            name: n.name,
            index_url: n.index_base_url,
        })
        .collect();

    match args.output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("Failed to serialize nodes")?
            );
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                print_info("No nodes configured", global.quiet);
                return Ok(());
            }

            for row in &rows {
                if row.search_url == row.index_url.trim_end_matches('/') {
                    println!("{:>4}  {:<20} {}", row.id, row.name, row.index_url);
                } else {
                    println!(
                        "{:>4}  {:<20} {} (search: {})",
                        row.id, row.name, row.index_url, row.search_url
                    );
                }
            }
        }
    }

    Ok(())
}
