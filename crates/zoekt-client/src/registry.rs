//! Node registry.
//!
//! Resolves node ids to the base URLs of Zoekt nodes. The dispatcher queries
//! the registry on every call and never caches the answer.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zoekt_config::{NodeConfig, ZoektConfig};

use crate::types::NodeId;

/// A resolved Zoekt node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendNode {
    /// Registry id
    pub id: NodeId,

    /// Human readable name
    pub name: String,

    /// Base URL used for indexing
    pub index_base_url: String,

    /// Base URL used for search, when it differs from the indexing URL
    search_url: Option<String>,
}

impl BackendNode {
    pub fn new(id: NodeId, index_base_url: impl Into<String>) -> Self {
        Self {
            id,
            name: format!("zoekt-{}", id),
            index_base_url: index_base_url.into(),
            search_url: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = Some(url.into());
        self
    }

    /// Base URL for search requests, without a trailing slash.
    pub fn search_base_url(&self) -> &str {
        self.search_url
            .as_deref()
            .unwrap_or(&self.index_base_url)
            .trim_end_matches('/')
    }
}

impl From<&NodeConfig> for BackendNode {
    fn from(config: &NodeConfig) -> Self {
        let node = BackendNode::new(NodeId(config.id), config.url.clone());
        let node = match config.name {
            Some(ref name) => node.with_name(name.clone()),
            None => node,
        };
        match config.search_url {
            Some(ref url) => node.with_search_url(url.clone()),
            None => node,
        }
    }
}

/// Lookup of nodes by id.
#[async_trait]
pub trait NodeRegistry: Send + Sync {
    /// Resolve a node id. `None` when the id is unknown.
    async fn find(&self, id: NodeId) -> Option<BackendNode>;
}

/// In-memory node registry.
///
/// Seeded from configuration and updatable at runtime when nodes come and go.
#[derive(Debug, Default, Clone)]
pub struct StaticNodeRegistry {
    nodes: Arc<RwLock<BTreeMap<NodeId, BackendNode>>>,
}

impl StaticNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding every node in the configuration.
    pub fn from_config(config: &ZoektConfig) -> Self {
        let nodes = config
            .nodes
            .iter()
            .map(|n| (NodeId(n.id), BackendNode::from(n)))
            .collect();

        debug!("Node registry seeded with {} nodes", config.nodes.len());

        Self {
            nodes: Arc::new(RwLock::new(nodes)),
        }
    }

    /// Build a registry from already resolved nodes.
    pub fn from_nodes(nodes: impl IntoIterator<Item = BackendNode>) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.id, n)).collect();
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
        }
    }

    /// Register a node, replacing any node with the same id.
    pub async fn register(&self, node: BackendNode) {
        info!("Registering node {} at {}", node.id, node.search_base_url());
        self.nodes.write().await.insert(node.id, node);
    }

    /// Remove a node. Returns whether it was present.
    pub async fn unregister(&self, id: NodeId) -> bool {
        let removed = self.nodes.write().await.remove(&id).is_some();
        if removed {
            info!("Unregistered node {}", id);
        } else {
            warn!("Node {} not found in registry", id);
        }
        removed
    }

    /// All nodes, ordered by id.
    pub async fn list(&self) -> Vec<BackendNode> {
        self.nodes.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl NodeRegistry for StaticNodeRegistry {
    async fn find(&self, id: NodeId) -> Option<BackendNode> {
        self.nodes.read().await.get(&id).cloned()
    }
}
