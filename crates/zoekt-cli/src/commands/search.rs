//! Search command - Search projects on a single node

use anyhow::Result;
use clap::Args;
use zoekt_client::{NodeId, ProjectId, ProjectScope};

use super::{create_client, print_response, run_with_spinner, OutputFormat, QueryArgs};
use crate::GlobalOptions;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Node to search
    #[arg(long, short = 'N')]
    node: u64,

    /// Project ids to search (repeatable or comma separated)
    #[arg(long, short = 'p', value_delimiter = ',')]
    project: Vec<ProjectId>,

    /// Search every project (rejected by the dispatcher)
    #[arg(long, conflicts_with = "project")]
    all_projects: bool,
}

/// Execute the search command
pub async fn execute(args: SearchArgs, global: GlobalOptions) -> Result<()> {
    let client = create_client(&global)?;

    let scope = if args.all_projects {
        ProjectScope::All
    } else {
        ProjectScope::Projects(args.project.clone())
    };
    let query = args.query.to_query();
    let quiet = global.quiet || matches!(args.query.output, OutputFormat::Json);

    let response = run_with_spinner(
        &format!("Searching node {}...", args.node),
        quiet,
        client.search(&query, args.query.num, &scope, NodeId(args.node)),
    )
    .await?;

    print_response(&response, &args.query, global.quiet)
}
