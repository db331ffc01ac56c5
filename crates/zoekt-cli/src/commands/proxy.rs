//! Proxy command - Fan a search out across nodes

use anyhow::Result;
use clap::Args;
use zoekt_client::{CurrentUser, NodeId, ProjectId, Targets};

use super::{create_client, print_response, run_with_spinner, OutputFormat, QueryArgs};
use crate::GlobalOptions;

/// One `--target NODE=ID,ID,...` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub node: NodeId,
    pub projects: Vec<ProjectId>,
}

fn parse_target(s: &str) -> Result<TargetSpec, String> {
    let (node, projects) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NODE=ID,ID,... but got '{}'", s))?;

    let node = node
        .parse::<NodeId>()
        .map_err(|e| format!("invalid node id '{}': {}", node, e))?;

    let projects = projects
        .split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            p.trim()
                .parse::<ProjectId>()
                .map_err(|e| format!("invalid project id '{}': {}", p, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TargetSpec { node, projects })
}

/// Arguments for the proxy command
#[derive(Args, Debug)]
pub struct ProxyArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Node and its projects, as NODE=ID,ID,... (repeatable)
    #[arg(long, short = 't', required = true, value_parser = parse_target)]
    target: Vec<TargetSpec>,

    /// Node that receives the request (defaults to the node with most projects)
    #[arg(long)]
    proxy_node: Option<u64>,

    /// User id the request is made for; selects the payload style
    #[arg(long)]
    user: Option<u64>,

    /// Username reported with --user
    #[arg(long, default_value = "zoekt-dispatch", requires = "user")]
    username: String,
}

impl ProxyArgs {
    fn targets(&self) -> Targets {
        let targets: Targets = self
            .target
            .iter()
            .map(|t| (t.node, t.projects.clone()))
            .collect();

        match self.proxy_node {
            Some(id) => targets.prefer_proxy_node(NodeId(id)),
            None => targets,
        }
    }
}

/// Execute the proxy command
pub async fn execute(args: ProxyArgs, global: GlobalOptions) -> Result<()> {
    let client = create_client(&global)?;

    let targets = args.targets();
    let user = args
        .user
        .map(|id| CurrentUser::new(id, args.username.clone()));
    let query = args.query.to_query();
    let quiet = global.quiet || matches!(args.query.output, OutputFormat::Json);

    let response = run_with_spinner(
        &format!("Searching {} nodes...", targets.len()),
        quiet,
        client.search_zoekt_proxy(&query, args.query.num, &targets, user.as_ref()),
    )
    .await?;

    print_response(&response, &args.query, global.quiet)
}
