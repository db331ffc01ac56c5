//! HTTP transport.
//!
//! The dispatcher talks to nodes through the [`Transport`] trait so tests can
//! count or fail calls without a network. [`ReqwestTransport`] is the real one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::trace;

/// HTTP basic auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A JSON POST to a node.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<BasicAuth>,
    /// Serialized JSON body
    pub body: String,
    pub timeout: Duration,
}

/// Status and raw body of a node reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure to complete an HTTP exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect(message.into())
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Sends requests to nodes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST the request and return whatever the node answered, including
    /// non-2xx replies. Only failures to complete the exchange are errors.
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).post(request).await
    }
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a pre-configured client (proxies, TLS roots, pools).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        trace!("POST {}", request.url);

        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .header("Content-Type", "application/json")
            .body(request.body);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(auth) = request.basic_auth {
            builder = builder.basic_auth(auth.username, auth.password);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(url: String) -> HttpRequest {
        HttpRequest {
            url,
            headers: vec![("X-Test".to_string(), "yes".to_string())],
            basic_auth: None,
            body: r#"{"Q":"foo"}"#.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_post_sends_body_and_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/search"))
            .and(header("Content-Type", "application/json"))
            .and(header("X-Test", "yes"))
            .and(body_string(r#"{"Q":"foo"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Result":{}}"#))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new();
        let response = transport
            .post(request(format!("{}/api/search", server.uri())))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.body, r#"{"Result":{}}"#);
    }

    #[tokio::test]
    async fn test_post_basic_auth() {
        let server = MockServer::start().await;

        // base64("user:secret")
        Mock::given(method("POST"))
            .and(header("Authorization", "Basic dXNlcjpzZWNyZXQ="))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut req = request(format!("{}/api/search", server.uri()));
        req.basic_auth = Some(BasicAuth {
            username: "user".to_string(),
            password: Some("secret".to_string()),
        });

        let response = ReqwestTransport::new().post(req).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header_exists("X-Test"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let response = ReqwestTransport::new()
            .post(request(format!("{}/api/search", server.uri())))
            .await
            .unwrap();

        assert_eq!(response, HttpResponse::new(500, "boom"));
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_timeout_is_classified() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let mut req = request(format!("{}/api/search", server.uri()));
        req.timeout = Duration::from_millis(100);

        let err = ReqwestTransport::new().post(req).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "{:?}", err);
    }

    #[test]
    fn test_basic_auth_debug_redacts_password() {
        let auth = BasicAuth {
            username: "user".to_string(),
            password: Some("hunter2".to_string()),
        };
        let debug = format!("{:?}", auth);
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }
}
