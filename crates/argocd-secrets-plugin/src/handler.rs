//! `getparams.execute` handler
//!
//! Decodes the generator call, reads the Secret within the fetch bound, rewrites
//! the keys, and answers with a single parameter row.

use std::collections::BTreeSet;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::Json;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::payload::{
    parse_request, GeneratorResponse, ParameterRow, SecretReference, SECRET_NAME_PARAM,
};
use crate::sanitize::KeyPolicy;
use crate::server::AppState;
use crate::store::{SecretEntries, SecretStore, StoreError};

/// What to answer when a fetch fails for a reason other than a missing Secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchFailurePolicy {
    /// Log and answer 200 with only `secretName`
    #[default]
    Lenient,
    /// Answer 502
    Strict,
}

/// Per-process handler settings
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    /// Namespace for requests that do not name one
    pub default_namespace: String,
    /// Upper bound on one store fetch
    pub fetch_timeout: Duration,
    /// Key policy when the caller does not ask for conversion
    pub unconverted_keys: KeyPolicy,
    /// Behavior on store failures
    pub fetch_failure: FetchFailurePolicy,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            default_namespace: crate::DEFAULT_NAMESPACE.to_string(),
            fetch_timeout: Duration::from_secs(10),
            unconverted_keys: KeyPolicy::Passthrough,
            fetch_failure: FetchFailurePolicy::Lenient,
        }
    }
}

impl HandlerSettings {
    /// Key policy for a request, given its convert flag
    pub fn key_policy(&self, convert_keys: bool) -> KeyPolicy {
        if convert_keys {
            KeyPolicy::Sanitize
        } else {
            self.unconverted_keys
        }
    }
}

/// Handle `POST /api/v1/getparams.execute`
///
/// Bodies over axum's default limit (2 MiB) answer 413 with the payload error.
pub async fn getparams(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<GeneratorResponse>> {
    let body = body.map_err(|e| {
        warn!(error = %e, "Failed to read generator call body");
        Error::Body(e)
    })?;
    let request = parse_request(&body)?;
    let settings = &state.settings;

    let secret = request.secret_ref(&settings.default_namespace);
    let convert_keys = request.convert_keys();

    info!(
        application_set = %request.application_set_name,
        namespace = %secret.namespace,
        secret = %secret.name,
        convert_keys,
        "Generator call received"
    );

    let fetched = fetch_entries(state.store.as_ref(), &secret, settings.fetch_timeout).await;
    let entries = match fetched {
        Ok(entries) => entries,
        Err(e) if e.is_not_found() => {
            warn!(error = %e, "Secret not found, returning only secretName");
            SecretEntries::new()
        }
        Err(e) => match settings.fetch_failure {
            FetchFailurePolicy::Lenient => {
                error!(error = %e, "Failed to read secret, returning only secretName");
                SecretEntries::new()
            }
            FetchFailurePolicy::Strict => {
                error!(error = %e, "Failed to read secret");
                return Err(Error::Store(e));
            }
        },
    };

    let row = build_parameters(&secret.name, entries, settings.key_policy(convert_keys));
    Ok(Json(GeneratorResponse::single(row)))
}

/// Fetch a Secret, treating an expired `timeout` as a store failure
pub async fn fetch_entries(
    store: &dyn SecretStore,
    secret: &SecretReference,
    timeout: Duration,
) -> std::result::Result<SecretEntries, StoreError> {
    match tokio::time::timeout(timeout, store.fetch(&secret.namespace, &secret.name)).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            namespace: secret.namespace.clone(),
            name: secret.name.clone(),
            after: timeout,
        }),
    }
}

/// Build the parameter row: `secretName` first, then every entry under `policy`.
///
/// Entries overwrite the seed, so a Secret holding a `secretName` key wins.
/// When two keys collide after rewriting, the later key in sorted order wins.
pub fn build_parameters(
    secret_name: &str,
    entries: SecretEntries,
    policy: KeyPolicy,
) -> ParameterRow {
    let mut row = ParameterRow::new();
    row.insert(SECRET_NAME_PARAM.to_string(), secret_name.to_string());

    let mut seen = BTreeSet::new();
    for (key, value) in entries {
        let name = policy.apply(&key);
        if !seen.insert(name.clone()) {
            warn!(key = %key, parameter = %name, "Secret keys collide after rewriting");
        }
        debug!(key = %key, parameter = %name, "Value read for key");
        row.insert(name, String::from_utf8_lossy(&value).into_owned());
    }

    row
}
