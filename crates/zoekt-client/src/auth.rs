//! Request authentication.
//!
//! Every node request carries a short-lived JWT in the
//! `Gitlab-Zoekt-Api-Request` header and, when credential files are present,
//! HTTP basic auth.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zoekt_config::AuthConfig;

use crate::error::ClientError;
use crate::transport::BasicAuth;

/// Header carrying the signed request token.
pub const AUTH_HEADER: &str = "Gitlab-Zoekt-Api-Request";

pub const JWT_ISSUER: &str = "gitlab";
pub const JWT_AUDIENCE: &str = "gitlab-zoekt";

/// Lifetime of an issued token, in seconds.
pub const TOKEN_EXPIRE_SECS: i64 = 5 * 60;

/// Produces the value of the [`AUTH_HEADER`] header.
pub trait TokenIssuer: Send + Sync {
    fn authorization_header(&self) -> Result<String, ClientError>;
}

/// Claims of a node request token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestClaims {
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl RequestClaims {
    fn issue_now() -> Self {
        let iat = Utc::now().timestamp();
        Self {
            iss: JWT_ISSUER.to_string(),
            aud: JWT_AUDIENCE.to_string(),
            iat,
            exp: iat + TOKEN_EXPIRE_SECS,
        }
    }
}

/// HS256 token issuer sharing a secret with the nodes.
pub struct JwtTokenIssuer {
    key: EncodingKey,
}

impl JwtTokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
        }
    }

    /// Load the secret from the configured file, falling back to the
    /// configured environment variable.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ClientError> {
        if let Some(ref path) = config.jwt_secret_file {
            match read_trimmed(path) {
                Some(secret) => return Ok(Self::new(secret.as_bytes())),
                None => warn!("JWT secret file {:?} is missing or empty", path),
            }
        }

        if let Some(ref var) = config.jwt_secret_env {
            if let Ok(secret) = std::env::var(var) {
                if !secret.is_empty() {
                    return Ok(Self::new(secret.as_bytes()));
                }
            }
        }

        Err(ClientError::Auth(
            "no JWT secret configured (set auth.jwt_secret_file or auth.jwt_secret_env)"
                .to_string(),
        ))
    }
}

impl fmt::Debug for JwtTokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtTokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn authorization_header(&self) -> Result<String, ClientError> {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &RequestClaims::issue_now(),
            &self.key,
        )?;
        Ok(format!("Bearer {}", token))
    }
}

/// Basic auth credentials read from files.
///
/// Files are read at most once per instance, when the client is built;
/// later changes on disk are not picked up.
#[derive(Default)]
pub struct BasicCredentials {
    username_file: Option<PathBuf>,
    password_file: Option<PathBuf>,
    cached: OnceCell<Option<BasicAuth>>,
}

impl BasicCredentials {
    pub fn new(username_file: Option<PathBuf>, password_file: Option<PathBuf>) -> Self {
        Self {
            username_file,
            password_file,
            cached: OnceCell::new(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.username_file.clone(), config.password_file.clone())
    }

    /// Credentials that never send basic auth.
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolved credentials; `None` when no username is available.
    pub fn get(&self) -> Option<&BasicAuth> {
        self.cached
            .get_or_init(|| {
                let username = self.username_file.as_deref().and_then(read_trimmed)?;
                let password = self.password_file.as_deref().and_then(read_trimmed);
                debug!("Loaded basic auth credentials for '{}'", username);
                Some(BasicAuth { username, password })
            })
            .as_ref()
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username_file", &self.username_file)
            .field("password_file", &self.password_file)
            .finish()
    }
}

/// File contents without the trailing newline; `None` if unreadable.
fn read_trimmed(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let value = content.trim_end_matches(['\n', '\r']).to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
