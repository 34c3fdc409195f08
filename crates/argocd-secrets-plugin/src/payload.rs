//! Generator plugin wire types
//!
//! The ApplicationSet controller sends:
//!
//! ```json
//! { "applicationSetName": "apps",
//!   "input": { "parameters": {
//!       "secretName": "db-creds",
//!       "namespaceName": "team-a",
//!       "convertToGoVars": "true" } } }
//! ```
//!
//! and expects `{"output": {"parameters": [ {...} ]}}` back. This plugin always
//! returns exactly one parameter row.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// One flat parameter row
pub type ParameterRow = BTreeMap<String, String>;

/// Key under which the requested secret name is echoed back
pub const SECRET_NAME_PARAM: &str = "secretName";

/// Inbound generator call
///
/// Fields are read in camelCase, with PascalCase accepted as an alias.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorRequest {
    /// Name of the calling ApplicationSet
    #[serde(default, alias = "ApplicationSetName", deserialize_with = "null_as_default")]
    pub application_set_name: String,
    /// Generator input block
    #[serde(default, alias = "Input", deserialize_with = "null_as_default")]
    pub input: GeneratorInput,
}

/// `input` block of a generator call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratorInput {
    /// Parameters configured on the plugin generator
    #[serde(default, alias = "Parameters", deserialize_with = "null_as_default")]
    pub parameters: InputParameters,
}

/// Parameters configured on the plugin generator
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputParameters {
    /// Secret to read
    #[serde(default, alias = "SecretName", deserialize_with = "null_as_default")]
    pub secret_name: String,
    /// Namespace of the secret; empty means the default namespace
    #[serde(default, alias = "NamespaceName", deserialize_with = "null_as_default")]
    pub namespace_name: String,
    /// Bool or string flag requesting key sanitization
    #[serde(default, alias = "ConvertToGoVars")]
    pub convert_to_go_vars: Option<serde_json::Value>,
}

impl GeneratorRequest {
    /// Whether the caller asked for sanitized key names
    pub fn convert_keys(&self) -> bool {
        self.input
            .parameters
            .convert_to_go_vars
            .as_ref()
            .is_some_and(convert_to_boolean)
    }

    /// Secret named by this request, resolving an empty namespace to `default_namespace`
    pub fn secret_ref(&self, default_namespace: &str) -> SecretReference {
        let params = &self.input.parameters;
        let namespace = if params.namespace_name.is_empty() {
            default_namespace.to_string()
        } else {
            params.namespace_name.clone()
        };
        SecretReference {
            namespace,
            name: params.secret_name.clone(),
        }
    }
}

/// JSON `null` decodes to the field's default, like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Decode a generator call from a raw request body
pub fn parse_request(body: &[u8]) -> Result<GeneratorRequest> {
    serde_json::from_slice(body).map_err(Error::InvalidPayload)
}

/// Interpret a bool-like JSON value.
///
/// Native booleans are taken as-is, strings are true when they equal `"true"`
/// ignoring case, and every other type is false.
pub fn convert_to_boolean(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Namespace and name of the Secret to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    /// Secret namespace
    pub namespace: String,
    /// Secret name
    pub name: String,
}

/// Outbound generator response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorResponse {
    /// Output block
    pub output: GeneratorOutput,
}

/// `output` block of a generator response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorOutput {
    /// Parameter rows; always exactly one
    pub parameters: Vec<ParameterRow>,
}

impl GeneratorResponse {
    /// Wrap a single parameter row
    pub fn single(row: ParameterRow) -> Self {
        Self {
            output: GeneratorOutput {
                parameters: vec![row],
            },
        }
    }
}
