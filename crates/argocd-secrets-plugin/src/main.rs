//! argocd-secrets-plugin - ApplicationSet generator plugin for Kubernetes Secrets

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use argocd_secrets_plugin::store::StoreConnection;
use argocd_secrets_plugin::{start_server, Cli, KubeSecretStore, PluginConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The kube client needs a process-wide rustls provider before it builds TLS configs
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install rustls crypto provider: {:?}", e);
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = PluginConfig::try_from(cli)
        .map_err(|e| anyhow::anyhow!("Invalid plugin configuration: {}", e))?;

    match &config.connection {
        StoreConnection::Kubeconfig(path) => tracing::info!(
            kubeconfig = %path.display(),
            "LOCAL_KUBECONFIG is set, using kubeconfig file instead of in-cluster config"
        ),
        StoreConnection::InCluster => tracing::info!("Using in-cluster Kubernetes config"),
    }

    let store = KubeSecretStore::connect(&config.connection)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to Kubernetes: {}", e))?;

    start_server(&config, Arc::new(store))
        .await
        .map_err(|e| anyhow::anyhow!("Plugin server failed: {}", e))?;

    Ok(())
}
