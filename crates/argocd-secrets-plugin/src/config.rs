//! Startup configuration
//!
//! Everything is read once from flags or environment. [`Cli`] is the raw
//! clap surface, [`PluginConfig`] the validated form the server runs on.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::auth::AuthToken;
use crate::error::Error;
use crate::handler::{FetchFailurePolicy, HandlerSettings};
use crate::sanitize::KeyPolicy;
use crate::store::StoreConnection;

/// Argo CD ApplicationSet generator plugin serving Kubernetes Secret entries
#[derive(Parser, Debug, Clone)]
#[command(name = "argocd-secrets-plugin", version, about, long_about = None)]
pub struct Cli {
    /// Bearer token the ApplicationSet controller must present
    #[arg(long, env = "ARGOCD_PLUGIN_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Kubeconfig file to use instead of in-cluster credentials
    #[arg(long, env = "LOCAL_KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Address to listen on
    #[arg(
        long,
        env = "PLUGIN_LISTEN_ADDR",
        default_value_t = SocketAddr::from(([0, 0, 0, 0], crate::DEFAULT_PLUGIN_PORT))
    )]
    pub listen_addr: SocketAddr,

    /// Namespace for requests that do not set `namespaceName`
    #[arg(long, env = "PLUGIN_DEFAULT_NAMESPACE", default_value = crate::DEFAULT_NAMESPACE)]
    pub default_namespace: String,

    /// Seconds to wait for a Secret read before giving up
    #[arg(long, env = "PLUGIN_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Key policy when the caller does not set `convertToGoVars`
    #[arg(
        long,
        env = "PLUGIN_UNCONVERTED_KEYS",
        value_enum,
        default_value_t = KeyPolicy::Passthrough
    )]
    pub unconverted_keys: KeyPolicy,

    /// Answer 502 instead of an empty row when a Secret read fails
    #[arg(long, env = "PLUGIN_STRICT_FETCH_ERRORS")]
    pub strict_fetch_errors: bool,
}

/// Validated plugin configuration
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Address to bind
    pub listen_addr: SocketAddr,
    /// Expected bearer token
    pub token: AuthToken,
    /// How to reach the cluster
    pub connection: StoreConnection,
    /// Namespace for requests that do not name one
    pub default_namespace: String,
    /// Upper bound on one Secret read
    pub fetch_timeout: Duration,
    /// Key policy without `convertToGoVars`
    pub unconverted_keys: KeyPolicy,
    /// Behavior on store failures
    pub fetch_failure: FetchFailurePolicy,
}

impl PluginConfig {
    /// Handler settings derived from this config
    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            default_namespace: self.default_namespace.clone(),
            fetch_timeout: self.fetch_timeout,
            unconverted_keys: self.unconverted_keys,
            fetch_failure: self.fetch_failure,
        }
    }
}

impl TryFrom<Cli> for PluginConfig {
    type Error = Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let token = AuthToken::new(cli.token)?;

        if cli.fetch_timeout_secs == 0 {
            return Err(Error::Config(
                "fetch timeout must be at least one second".to_string(),
            ));
        }
        if cli.default_namespace.is_empty() {
            return Err(Error::Config("default namespace is empty".to_string()));
        }

        // An empty LOCAL_KUBECONFIG means in-cluster, same as unset
        let connection = match cli.kubeconfig {
            Some(path) if !path.is_empty() => StoreConnection::Kubeconfig(PathBuf::from(path)),
            _ => StoreConnection::InCluster,
        };

        let fetch_failure = if cli.strict_fetch_errors {
            FetchFailurePolicy::Strict
        } else {
            FetchFailurePolicy::Lenient
        };

        Ok(Self {
            listen_addr: cli.listen_addr,
            token,
            connection,
            default_namespace: cli.default_namespace,
            fetch_timeout: Duration::from_secs(cli.fetch_timeout_secs),
            unconverted_keys: cli.unconverted_keys,
            fetch_failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<PluginConfig, Error> {
        let argv = std::iter::once("argocd-secrets-plugin").chain(args.iter().copied());
        PluginConfig::try_from(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults() {
        let config = parse(&["--token", "t"]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.listen_addr.port(), crate::DEFAULT_PLUGIN_PORT);
        assert_eq!(config.default_namespace, "argocd");
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.unconverted_keys, KeyPolicy::Passthrough);
        assert_eq!(config.fetch_failure, FetchFailurePolicy::Lenient);
        assert!(config.token.matches(b"t"));
    }

    #[test]
    fn listen_addr_overrides_default_port() {
        let config = parse(&["--token", "t", "--listen-addr", "127.0.0.1:9090"]).unwrap();
        assert_eq!(config.listen_addr, SocketAddr::from(([127, 0, 0, 1], 9090)));
    }

    #[test]
    fn kubeconfig_selects_file_mode() {
        let config = parse(&["--token", "t", "--kubeconfig", "/tmp/kc"]).unwrap();
        assert_eq!(
            config.connection,
            StoreConnection::Kubeconfig(PathBuf::from("/tmp/kc"))
        );
    }

    #[test]
    fn no_kubeconfig_means_in_cluster() {
        let config = parse(&["--token", "t"]).unwrap();
        assert_eq!(config.connection, StoreConnection::InCluster);
        let config = parse(&["--token", "t", "--kubeconfig", ""]).unwrap();
        assert_eq!(config.connection, StoreConnection::InCluster);
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(parse(&["--token", ""]), Err(Error::Config(_))));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = parse(&["--token", "t", "--fetch-timeout-secs", "0"]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn policies_from_flags() {
        let config = parse(&[
            "--token",
            "t",
            "--unconverted-keys",
            "dots-to-underscores",
            "--strict-fetch-errors",
        ])
        .unwrap();
        assert_eq!(config.unconverted_keys, KeyPolicy::DotsToUnderscores);
        assert_eq!(config.fetch_failure, FetchFailurePolicy::Strict);
        assert_eq!(config.handler_settings().fetch_failure, FetchFailurePolicy::Strict);
    }

    #[test]
    fn debug_output_hides_token() {
        let config = parse(&["--token", "very-secret"]).unwrap();
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
