//! Zoekt Client - Search dispatch for Zoekt code-search nodes
//!
//! This crate provides:
//! - Query formatting into the Zoekt query language
//! - Single-node search and fan-out search through a proxying node
//! - Normalized access to node replies
//!
//! ## Components
//!
//! - [`ZoektClient`]: resolves nodes, signs and sends requests
//! - [`NodeRegistry`]: node id to base URL lookup ([`StaticNodeRegistry`] in memory)
//! - [`SearchResponse`]: case-insensitive view over a node reply
//! - [`RequestStore`]: request-scoped call instrumentation
//!
//! ## Example
//!
//! ```ignore
//! use zoekt_client::{NodeId, ProjectScope, SearchQuery, Targets, ZoektClient};
//! use zoekt_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().load(None, None)?;
//!     let client = ZoektClient::from_config(&config)?;
//!
//!     let query = SearchQuery::new("fn main");
//!     let response = client
//!         .search(&query, 50, &ProjectScope::Projects(vec![1, 2]), NodeId(1))
//!         .await?;
//!     println!("{} matches", response.match_count()?);
//!
//!     // Fan-out across two nodes
//!     let targets = Targets::new()
//!         .with(NodeId(1), vec![1, 2])
//!         .with(NodeId(2), vec![3]);
//!     let response = client.search_zoekt_proxy(&query, 50, &targets, None).await?;
//!     for file in response.files()? {
//!         println!("{}", file);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod auth;
mod client;
mod error;
mod instrumentation;
mod payload;
mod query;
mod registry;
mod response;
mod transport;
mod types;

pub use auth::{
    BasicCredentials, JwtTokenIssuer, RequestClaims, TokenIssuer, AUTH_HEADER, JWT_AUDIENCE,
    JWT_ISSUER, TOKEN_EXPIRE_SECS,
};
pub use client::{ZoektClient, ZoektClientBuilder, DEBUG_ENV, PROXY_SEARCH_PATH, SEARCH_PATH};
pub use error::ClientError;
pub use instrumentation::{CallDetails, RequestStore};
pub use payload::{
    AstForwardTarget, AstSearchRequest, FeatureTogglePolicy, ForwardTarget, LegacySearchRequest,
    PayloadPolicy, PayloadStyle, SearchOptions, AST_PAYLOAD_VERSION, NUM_CONTEXT_LINES,
};
pub use query::format as format_query;
pub use registry::{BackendNode, NodeRegistry, StaticNodeRegistry};
pub use response::{SearchResponse, SearchResult};
pub use transport::{BasicAuth, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use types::*;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
