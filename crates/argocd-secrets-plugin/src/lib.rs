//! Argo CD ApplicationSet generator plugin backed by Kubernetes Secrets
//!
//! The ApplicationSet controller calls this plugin to resolve generator
//! parameters at reconcile time. Each call names a Secret; the plugin reads it
//! and returns its entries as one flat parameter row, optionally rewriting the
//! key names into template-safe identifiers.
//!
//! # Architecture
//!
//! ```text
//! ApplicationSet ──► Auth Gate ──► Payload ──► SecretStore ──► Key policy ──► JSON
//! controller         (Bearer)      (serde)     (kube, bounded)  (sanitize)
//! ```
//!
//! # Endpoints
//!
//! - `POST /api/v1/getparams.execute` - Generator call (requires Bearer token)
//! - `GET /healthz` - Health check

#![deny(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod payload;
pub mod sanitize;
pub mod server;
pub mod store;

/// Default port the plugin listens on
pub const DEFAULT_PLUGIN_PORT: u16 = 8080;

/// Namespace used when a request does not name one
pub const DEFAULT_NAMESPACE: &str = "argocd";

/// Route the ApplicationSet controller calls for generator parameters
pub const GETPARAMS_PATH: &str = "/api/v1/getparams.execute";

pub use config::{Cli, PluginConfig};
pub use error::{Error, Result};
pub use server::{plugin_routes, start_server, AppState};
pub use store::{KubeSecretStore, SecretStore, StoreError};
