//! Client error types.

use thiserror::Error;

use crate::transport::TransportError;
use crate::types::NodeId;

/// Errors raised by the search dispatcher.
///
/// Backend-reported failures (an `Error` field in the reply) are *not*
/// errors at this level; they come back as a [`SearchResponse`] whose
/// `is_failure()` is true.
///
/// [`SearchResponse`]: crate::SearchResponse
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request named no projects to search
    #[error("invalid search target: {0}")]
    InvalidTarget(String),

    /// The request asked for something the backend cannot do
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Node id could not be resolved through the registry
    #[error("node can't be found: {id}")]
    NodeNotFound { id: NodeId },

    /// Transport failure or undecodable reply
    #[error("{0}")]
    Connection(String),

    /// Reply decoded but lacks the fields a success reply must carry
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Request aborted through its cancellation token
    #[error("search request cancelled")]
    Cancelled,

    /// Signing the auth token failed
    #[error("failed to sign request: {0}")]
    Auth(String),

    /// Client could not be assembled from configuration
    #[error("configuration error: {0}")]
    Config(#[from] zoekt_config::ConfigError),
}

impl ClientError {
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    pub fn node_not_found(id: NodeId) -> Self {
        Self::NodeNotFound { id }
    }

    /// Create a Connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Whether the failure happened on the wire rather than in the request.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ClientError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(err.to_string())
    }
}
