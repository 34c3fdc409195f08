//! Kubernetes Secret store client
//!
//! The handler only needs one operation: read every entry of a named Secret.
//! [`SecretStore`] is the seam, [`KubeSecretStore`] the kube-rs implementation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

/// Default connection timeout for the kube client
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for the kube client
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw Secret entries, key to undecoded bytes
pub type SecretEntries = BTreeMap<String, Vec<u8>>;

/// Errors from reading a Secret
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The Secret does not exist
    #[error("secret {namespace}/{name} not found")]
    NotFound {
        /// Secret namespace
        namespace: String,
        /// Secret name
        name: String,
    },

    /// The fetch did not finish within the configured bound
    #[error("timed out after {after:?} reading secret {namespace}/{name}")]
    Timeout {
        /// Secret namespace
        namespace: String,
        /// Secret name
        name: String,
        /// Configured bound
        after: Duration,
    },

    /// Any other Kubernetes API or transport failure
    #[error("failed to read secret {namespace}/{name}: {source}")]
    Kube {
        /// Secret namespace
        namespace: String,
        /// Secret name
        name: String,
        /// Underlying kube-rs error
        #[source]
        source: kube::Error,
    },
}

impl StoreError {
    /// Classify a kube error from a Secret `get`
    pub fn from_kube(namespace: &str, name: &str, source: kube::Error) -> Self {
        match &source {
            kube::Error::Api(response) if response.code == 404 => StoreError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            _ => StoreError::Kube {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            },
        }
    }

    /// Whether the Secret simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Read access to namespaced Secrets
///
/// Abstracts the cluster so the handler can be tested without one.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch every entry of the Secret `name` in `namespace`
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretEntries, StoreError>;
}

/// How the plugin reaches the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConnection {
    /// Explicit kubeconfig file (local testing)
    Kubeconfig(PathBuf),
    /// Service account credentials mounted into the pod
    InCluster,
}

/// [`SecretStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client for `connection` and wrap it
    pub async fn connect(connection: &StoreConnection) -> Result<Self, crate::Error> {
        let client = match connection {
            StoreConnection::Kubeconfig(path) => create_client(Some(path)).await?,
            StoreConnection::InCluster => create_client(None).await?,
        };
        Ok(Self::new(client))
    }
}

#[async_trait::async_trait]
impl SecretStore for KubeSecretStore {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretEntries, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        let secret = api
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(namespace, name, e))?;

        let entries = secret_entries(secret);
        debug!(namespace = %namespace, secret = %name, entries = entries.len(), "Read secret");
        Ok(entries)
    }
}

/// Raw entries of a Secret's `data`
fn secret_entries(secret: Secret) -> SecretEntries {
    secret
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.0))
        .collect()
}

/// Create a kube client from a kubeconfig path, or from in-cluster config when `None`
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, crate::Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                crate::Error::Config(format!(
                    "failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| crate::Error::Config(format!("failed to load kubeconfig: {}", e)))?
        }
        None => Config::incluster().map_err(|e| {
            crate::Error::Config(format!("failed to create in-cluster config: {}", e))
        })?,
    };
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

    Client::try_from(config)
        .map_err(|e| crate::Error::Config(format!("failed to create kubernetes client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "secrets \"db\" is forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code,
        })
    }

    #[test]
    fn api_404_is_not_found() {
        let err = StoreError::from_kube("argocd", "db", api_error(404));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "secret argocd/db not found");
    }

    #[test]
    fn other_api_errors_keep_source() {
        let err = StoreError::from_kube("argocd", "db", api_error(403));
        assert!(!err.is_not_found());
        assert!(matches!(err, StoreError::Kube { .. }));
        assert!(err.to_string().starts_with("failed to read secret argocd/db"));
    }

    #[test]
    fn entries_from_data_keep_raw_bytes() {
        let secret = Secret {
            data: Some(BTreeMap::from([
                ("user".to_string(), ByteString(b"admin".to_vec())),
                ("blob".to_string(), ByteString(vec![0xde, 0xad])),
            ])),
            ..Default::default()
        };
        let entries = secret_entries(secret);
        assert_eq!(entries["user"], b"admin");
        assert_eq!(entries["blob"], vec![0xde, 0xad]);
    }

    #[test]
    fn string_data_is_not_read() {
        let secret = Secret {
            data: Some(BTreeMap::from([(
                "user".to_string(),
                ByteString(b"stored".to_vec()),
            )])),
            string_data: Some(BTreeMap::from([
                ("user".to_string(), "ignored".to_string()),
                ("extra".to_string(), "ignored".to_string()),
            ])),
            ..Default::default()
        };
        let entries = secret_entries(secret);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["user"], b"stored");
    }

    #[test]
    fn empty_secret_has_no_entries() {
        assert!(secret_entries(Secret::default()).is_empty());
    }

    #[tokio::test]
    async fn missing_kubeconfig_is_config_error() {
        let result = create_client(Some(Path::new("/nonexistent/kubeconfig"))).await;
        match result {
            Err(crate::Error::Config(msg)) => assert!(msg.contains("failed to read kubeconfig")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected error"),
        }
    }
}
