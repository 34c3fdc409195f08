//! Error types for the plugin
//!
//! Request-path errors render as the `{"error": "..."}` bodies the
//! ApplicationSet controller expects. The messages are fixed strings so no
//! store detail or credential leaks to the caller.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::store::StoreError;

/// Result type for plugin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Body message for rejected credentials
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or missing token";

/// Body message for undecodable generator calls
pub const INVALID_PAYLOAD_MESSAGE: &str = "Invalid request payload";

/// Body message for store failures in strict mode
pub const STORE_FAILURE_MESSAGE: &str = "Failed to read secret";

/// Error type for plugin operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Authorization header missing or not the configured Bearer token
    #[error("invalid or missing token")]
    Unauthorized,

    /// Request body is not a valid generator call
    #[error("invalid request payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Request body could not be buffered, e.g. over the body size limit
    #[error("failed to read request body: {0}")]
    Body(#[from] BytesRejection),

    /// Secret fetch failed and the failure policy is strict
    #[error("secret store error: {0}")]
    Store(#[from] StoreError),

    /// Startup configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Listener bind or serve failure
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

impl Error {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Unauthorized => StatusCode::FORBIDDEN,
            Error::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Error::Body(rejection) => rejection.status(),
            Error::Store(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Error::Unauthorized => INVALID_TOKEN_MESSAGE,
            Error::InvalidPayload(_) | Error::Body(_) => INVALID_PAYLOAD_MESSAGE,
            Error::Store(_) => STORE_FAILURE_MESSAGE,
            Error::Config(_) | Error::Server(_) => "Internal server error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.public_message() });
        (self.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: Error) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn unauthorized_renders_403_with_fixed_message() {
        let (status, body) = body_json(Error::Unauthorized).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, serde_json::json!({"error": "Invalid or missing token"}));
    }

    #[tokio::test]
    async fn invalid_payload_hides_decoder_detail() {
        let decode_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let (status, body) = body_json(Error::InvalidPayload(decode_err)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "Invalid request payload"}));
    }

    #[tokio::test]
    async fn store_error_renders_bad_gateway() {
        let err = Error::Store(StoreError::Timeout {
            namespace: "argocd".to_string(),
            name: "db".to_string(),
            after: std::time::Duration::from_secs(1),
        });
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Failed to read secret");
    }

    #[test]
    fn config_error_display_includes_reason() {
        let err = Error::Config("token is empty".to_string());
        assert_eq!(err.to_string(), "configuration error: token is empty");
    }
}
