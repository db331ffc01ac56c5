//! Search request dispatch.
//!
//! [`ZoektClient`] resolves target nodes, builds the request body, signs the
//! request and performs the POST. Transport and decode failures become
//! [`ClientError::Connection`]; failures reported by the node come back as a
//! [`SearchResponse`] whose `is_failure()` is true.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use zoekt_config::{ConfigError, ZoektConfig};

use crate::auth::{BasicCredentials, JwtTokenIssuer, TokenIssuer, AUTH_HEADER};
use crate::error::ClientError;
use crate::instrumentation::CallGuard;
use crate::payload::{
    AstForwardTarget, AstSearchRequest, FeatureTogglePolicy, ForwardTarget, LegacySearchRequest,
    PayloadPolicy, PayloadStyle,
};
use crate::registry::{BackendNode, NodeRegistry, StaticNodeRegistry};
use crate::response::SearchResponse;
use crate::transport::{HttpRequest, ReqwestTransport, Transport};
use crate::types::{CurrentUser, NodeId, ProjectId, ProjectScope, SearchQuery, Targets};

/// Path of the single-node search endpoint.
pub const SEARCH_PATH: &str = "/api/search";

/// Path of the fan-out search endpoint.
pub const PROXY_SEARCH_PATH: &str = "/webserver/api/v2/search";

/// Environment flag enabling body logging in debug builds.
pub const DEBUG_ENV: &str = "ZOEKT_CLIENT_DEBUG";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

struct Inner {
    registry: Arc<dyn NodeRegistry>,
    transport: Arc<dyn Transport>,
    token_issuer: Arc<dyn TokenIssuer>,
    credentials: BasicCredentials,
    payload_policy: Arc<dyn PayloadPolicy>,
    timeout: Duration,
    debug: bool,
}

/// Client for Zoekt search nodes.
///
/// Build once and share; clones are cheap and share credentials and the
/// HTTP connection pool.
#[derive(Clone)]
pub struct ZoektClient {
    inner: Arc<Inner>,
    cancel: Option<CancellationToken>,
}

impl fmt::Debug for ZoektClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoektClient")
            .field("timeout", &self.inner.timeout)
            .field("debug", &self.inner.debug)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

impl ZoektClient {
    pub fn builder() -> ZoektClientBuilder {
        ZoektClientBuilder::default()
    }

    /// Assemble a client from validated configuration, talking to nodes
    /// over HTTP.
    pub fn from_config(config: &ZoektConfig) -> Result<Self, ClientError> {
        config.validate()?;

        Self::builder()
            .registry(StaticNodeRegistry::from_config(config))
            .token_issuer(JwtTokenIssuer::from_config(&config.auth)?)
            .credentials(BasicCredentials::from_config(&config.auth))
            .payload_policy(FeatureTogglePolicy::new(config.features.clone()))
            .timeout(Duration::from_secs(config.client.timeout_secs))
            .debug(config.client.debug)
            .build()
    }

    /// A clone whose requests abort with [`ClientError::Cancelled`] once
    /// `token` fires.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: Some(token),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Search the given projects on a single node.
    ///
    /// Fails before any request when the scope is global or names no
    /// projects, and when the node is unknown.
    pub async fn search(
        &self,
        query: &SearchQuery,
        num: usize,
        scope: &ProjectScope,
        node_id: NodeId,
    ) -> Result<SearchResponse, ClientError> {
        let mut call = CallGuard::start(SEARCH_PATH);
        let response = self
            .search_inner(query, num, scope, node_id, &mut call.body)
            .await;
        response
    }

    async fn search_inner(
        &self,
        query: &SearchQuery,
        num: usize,
        scope: &ProjectScope,
        node_id: NodeId,
        body: &mut String,
    ) -> Result<SearchResponse, ClientError> {
        let project_ids = match scope {
            ProjectScope::All => {
                return Err(ClientError::unsupported("global search is not supported"))
            }
            ProjectScope::Projects(ids) if ids.is_empty() => {
                return Err(ClientError::invalid_target(
                    "not possible to search without at least one project specified",
                ))
            }
            ProjectScope::Projects(ids) => ids.clone(),
        };

        let node = self.resolve(node_id).await?;
        let payload = LegacySearchRequest::new(query.formatted(), num, project_ids);
        *body = encode(&payload)?;

        self.post(&node, SEARCH_PATH, body).await
    }

    /// Search across several nodes through one proxying node.
    ///
    /// The proxying node is the preferred node of `targets` when set,
    /// otherwise the node with the most projects. Every target node is
    /// resolved before the request is sent.
    pub async fn search_zoekt_proxy(
        &self,
        query: &SearchQuery,
        num: usize,
        targets: &Targets,
        current_user: Option<&CurrentUser>,
    ) -> Result<SearchResponse, ClientError> {
        let mut call = CallGuard::start(PROXY_SEARCH_PATH);
        let response = self
            .search_zoekt_proxy_inner(query, num, targets, current_user, &mut call.body)
            .await;
        response
    }

    async fn search_zoekt_proxy_inner(
        &self,
        query: &SearchQuery,
        num: usize,
        targets: &Targets,
        current_user: Option<&CurrentUser>,
        body: &mut String,
    ) -> Result<SearchResponse, ClientError> {
        if let Some((id, _)) = targets.iter().find(|(_, ids)| ids.is_empty()) {
            return Err(ClientError::invalid_target(format!(
                "node {} has no projects to search",
                id
            )));
        }

        let proxy_id = targets.proxy_node().ok_or_else(|| {
            ClientError::invalid_target("not possible to search without at least one node specified")
        })?;
        let proxy = self.resolve(proxy_id).await?;

        let mut forward_to: Vec<(String, Vec<ProjectId>)> = Vec::with_capacity(targets.len());
        for (id, project_ids) in targets.iter() {
            let endpoint = if id == proxy.id {
                proxy.search_base_url().to_string()
            } else {
                self.resolve(id).await?.search_base_url().to_string()
            };
            forward_to.push((endpoint, project_ids.to_vec()));
        }

        let style = self.inner.payload_policy.style_for(current_user);
        debug!(
            "Proxy search via node {} to {} nodes ({:?} payload)",
            proxy.id,
            forward_to.len(),
            style
        );

        *body = match style {
            PayloadStyle::Legacy => encode(
                &LegacySearchRequest::new(query.formatted(), num, Vec::new()).with_forward_to(
                    forward_to
                        .into_iter()
                        .map(|(endpoint, repo_ids)| ForwardTarget { endpoint, repo_ids })
                        .collect(),
                ),
            )?,
            PayloadStyle::Ast => encode(&AstSearchRequest::new(
                query.formatted(),
                num,
                query.mode(),
                self.inner.timeout,
                forward_to
                    .into_iter()
                    .map(|(endpoint, repo_ids)| AstForwardTarget { endpoint, repo_ids })
                    .collect(),
            ))?,
        };

        self.post(&proxy, PROXY_SEARCH_PATH, body).await
    }

    async fn resolve(&self, id: NodeId) -> Result<BackendNode, ClientError> {
        self.inner
            .registry
            .find(id)
            .await
            .ok_or_else(|| ClientError::node_not_found(id))
    }

    async fn post(
        &self,
        node: &BackendNode,
        path: &str,
        body: &str,
    ) -> Result<SearchResponse, ClientError> {
        let url = format!("{}{}", node.search_base_url(), path);

        let request = HttpRequest {
            url: url.clone(),
            headers: vec![(
                AUTH_HEADER.to_string(),
                self.inner.token_issuer.authorization_header()?,
            )],
            basic_auth: self.inner.credentials.get().cloned(),
            body: body.to_string(),
            timeout: self.inner.timeout,
        };

        if self.inner.debug {
            debug!("Zoekt request to {}: {}", url, body);
        }

        let sent = self.inner.transport.post(request);
        let outcome = match self.cancel {
            Some(ref token) => tokio::select! {
                _ = token.cancelled() => {
                    warn!("Zoekt request to {} cancelled", url);
                    return Err(ClientError::Cancelled);
                }
                outcome = sent => outcome,
            },
            None => sent.await,
        };

        let http = match outcome {
            Ok(http) => http,
            Err(e) => {
                error!("Zoekt request to {} failed: {}", url, e);
                return Err(e.into());
            }
        };

        if self.inner.debug {
            debug!("Zoekt response from {} ({}): {}", url, http.status, http.body);
        }

        let response = match SearchResponse::from_http(http.status, &http.body) {
            Ok(response) => response,
            Err(e) => {
                error!("Zoekt response from {} could not be decoded: {}", url, e);
                return Err(e);
            }
        };

        if !http.is_success() {
            error!(
                "Zoekt node {} returned HTTP {}: {}",
                node.id, http.status, http.body
            );
        }

        Ok(response)
    }
}

fn encode<T: Serialize>(payload: &T) -> Result<String, ClientError> {
    serde_json::to_string(payload)
        .map_err(|e| ClientError::connection(format!("failed to encode request: {}", e)))
}

/// Whether the environment asks for body logging. Release builds ignore it.
fn debug_env_enabled() -> bool {
    cfg!(debug_assertions)
        && std::env::var(DEBUG_ENV)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
}

/// Builder for [`ZoektClient`].
pub struct ZoektClientBuilder {
    registry: Option<Arc<dyn NodeRegistry>>,
    transport: Option<Arc<dyn Transport>>,
    token_issuer: Option<Arc<dyn TokenIssuer>>,
    credentials: BasicCredentials,
    payload_policy: Arc<dyn PayloadPolicy>,
    timeout: Duration,
    debug: bool,
}

impl Default for ZoektClientBuilder {
    fn default() -> Self {
        Self {
            registry: None,
            transport: None,
            token_issuer: None,
            credentials: BasicCredentials::none(),
            payload_policy: Arc::new(PayloadStyle::Legacy),
            timeout: DEFAULT_TIMEOUT,
            debug: false,
        }
    }
}

impl ZoektClientBuilder {
    pub fn registry(mut self, registry: impl NodeRegistry + 'static) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Defaults to [`ReqwestTransport`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn token_issuer(mut self, issuer: impl TokenIssuer + 'static) -> Self {
        self.token_issuer = Some(Arc::new(issuer));
        self
    }

    pub fn credentials(mut self, credentials: BasicCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Defaults to always sending the legacy body.
    pub fn payload_policy(mut self, policy: impl PayloadPolicy + 'static) -> Self {
        self.payload_policy = Arc::new(policy);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Log request and response bodies at debug level.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn build(self) -> Result<ZoektClient, ClientError> {
        let token_issuer = self
            .token_issuer
            .ok_or_else(|| ClientError::Auth("no token issuer configured".to_string()))?;

        if self.timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "client.timeout_secs",
                "must be greater than zero",
            )
            .into());
        }

        // Read credential files now, not on the first request.
        self.credentials.get();

        let inner = Inner {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(StaticNodeRegistry::new()) as Arc<dyn NodeRegistry>),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(ReqwestTransport::new()) as Arc<dyn Transport>),
            token_issuer,
            credentials: self.credentials,
            payload_policy: self.payload_policy,
            timeout: self.timeout,
            debug: self.debug || debug_env_enabled(),
        };

        Ok(ZoektClient {
            inner: Arc::new(inner),
            cancel: None,
        })
    }
}
