//! Shared types for search requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

/// Project (repository) identifier as known to the Zoekt index.
pub type ProjectId = u64;

/// Identifier of a Zoekt node in the node registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Query language dialect the backend should apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Literal match; regex metacharacters in the query are escaped
    #[default]
    Exact,
    /// Query is passed through as a regular expression
    Regex,
}

impl SearchMode {
    /// Pick the mode for a request.
    ///
    /// An explicit choice always wins. Without one, API callers get regex
    /// semantics and everything else gets exact matching.
    pub fn resolve(regex: Option<bool>, source: Option<SearchSource>) -> Self {
        match (regex, source) {
            (Some(true), _) => Self::Regex,
            (Some(false), _) => Self::Exact,
            (None, Some(SearchSource::Api)) => Self::Regex,
            (None, _) => Self::Exact,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Regex => write!(f, "regex"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "regex" => Ok(Self::Regex),
            _ => Err(ClientError::unsupported(format!(
                "unknown search mode '{}'. Valid values: exact, regex",
                s
            ))),
        }
    }
}

/// Where a search request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Api,
    Web,
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Web => write!(f, "web"),
        }
    }
}

impl FromStr for SearchSource {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "web" => Ok(Self::Web),
            _ => Err(ClientError::unsupported(format!(
                "unknown search source '{}'. Valid values: api, web",
                s
            ))),
        }
    }
}

/// A user-facing search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    source: Option<SearchSource>,
    mode: SearchMode,
}

impl SearchQuery {
    /// Create an exact-mode query with no source.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
            mode: SearchMode::Exact,
        }
    }

    pub fn with_source(mut self, source: SearchSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> Option<SearchSource> {
        self.source
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// The query rendered in the backend's query language.
    pub fn formatted(&self) -> String {
        crate::query::format(&self.text, self.source, self.mode)
    }
}

/// Which projects a single-node search covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    /// Every project on the instance. Never accepted by the dispatcher.
    All,
    /// An explicit list of project ids
    Projects(Vec<ProjectId>),
}

impl From<Vec<ProjectId>> for ProjectScope {
    fn from(ids: Vec<ProjectId>) -> Self {
        Self::Projects(ids)
    }
}

/// Fan-out plan: which projects each node should search.
///
/// Entries keep insertion order, which decides ties when picking the
/// proxy node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    entries: Vec<(NodeId, Vec<ProjectId>)>,
    proxy_node: Option<NodeId>,
}

impl Targets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projects for a node, replacing any previous entry for it.
    pub fn insert(&mut self, node: NodeId, project_ids: Vec<ProjectId>) {
        match self.entries.iter_mut().find(|(id, _)| *id == node) {
            Some(entry) => entry.1 = project_ids,
            None => self.entries.push((node, project_ids)),
        }
    }

    /// Builder form of [`Targets::insert`].
    pub fn with(mut self, node: NodeId, project_ids: Vec<ProjectId>) -> Self {
        self.insert(node, project_ids);
        self
    }

    /// Route the top-level request through this node instead of the
    /// heuristic choice.
    pub fn prefer_proxy_node(mut self, node: NodeId) -> Self {
        self.proxy_node = Some(node);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[ProjectId])> + '_ {
        self.entries.iter().map(|(id, ids)| (*id, ids.as_slice()))
    }

    /// Node that receives the request and forwards it to the others.
    ///
    /// The preferred node when one was set, otherwise the node with the most
    /// projects. Ties go to the earliest entry.
    pub fn proxy_node(&self) -> Option<NodeId> {
        if self.proxy_node.is_some() {
            return self.proxy_node;
        }

        self.entries
            .iter()
            .fold(None::<&(NodeId, Vec<ProjectId>)>, |best, entry| match best {
                Some(b) if b.1.len() >= entry.1.len() => Some(b),
                _ => Some(entry),
            })
            .map(|(id, _)| *id)
    }
}

impl FromIterator<(NodeId, Vec<ProjectId>)> for Targets {
    fn from_iter<I: IntoIterator<Item = (NodeId, Vec<ProjectId>)>>(iter: I) -> Self {
        let mut targets = Targets::new();
        for (node, ids) in iter {
            targets.insert(node, ids);
        }
        targets
    }
}

/// The user a request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: u64,
    pub username: String,
}

impl CurrentUser {
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}
