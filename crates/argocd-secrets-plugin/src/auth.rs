//! Bearer token gate
//!
//! Every generator call must carry `Authorization: Bearer <token>` where
//! `<token>` is the value the plugin was started with. The gate runs as a
//! route layer, before the body is read.

use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::error::{Error, Result};

/// Shared credential every caller must present
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(Arc<str>);

impl AuthToken {
    /// Wrap a configured token; empty tokens are rejected
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::Config("ARGOCD_PLUGIN_TOKEN is empty".to_string()));
        }
        Ok(Self(Arc::from(token)))
    }

    /// Whether the presented header bytes are this token
    pub fn matches(&self, presented: &[u8]) -> bool {
        self.0.as_bytes() == presented
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Extract bearer token from Authorization header
///
/// Works on raw header bytes, so tokens outside visible ASCII still match.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&[u8]> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.as_bytes().strip_prefix(b"Bearer "))
}

/// Check the request carries exactly `Bearer <token>`
pub fn authorize(token: &AuthToken, headers: &HeaderMap) -> Result<()> {
    match extract_bearer_token(headers) {
        Some(presented) if token.matches(presented) => Ok(()),
        Some(_) => {
            warn!("Rejected generator call with wrong bearer token");
            Err(Error::Unauthorized)
        }
        None => {
            warn!("Rejected generator call without bearer token");
            Err(Error::Unauthorized)
        }
    }
}

/// Middleware rejecting requests that fail [`authorize`] with 403
pub async fn require_token(
    State(token): State<AuthToken>,
    request: Request<Body>,
    next: Next,
) -> Result<Response> {
    authorize(&token, request.headers())?;
    Ok(next.run(request).await)
}
