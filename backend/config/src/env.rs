//! Environment handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside string values, resolved at load time.
//!   Only uppercase `[A-Z_][A-Z0-9_]*` names are matched; `$${VAR}` escapes
//!   to a literal `${VAR}`.
//! - Well-known variables (`OPENROUTER_API_KEY`, `ROOMSCRIBE_PORT`, ...) that
//!   override individual fields after the file is parsed.

use std::collections::HashMap;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::schema::{LoggingConfig, ModelConfig, RoomscribeConfig, ServerConfig};

/// Matches `${VAR}` and its escaped form `$${VAR}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Snapshot of the process environment.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Substitute `${VAR}` references in a config value tree.
///
/// Only string leaves are processed. Fails if a referenced variable is unset or empty.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Overlay well-known environment variables onto the parsed config.
///
/// Values that are set and non-empty win over the file.
pub fn apply_env_overrides(
    mut config: RoomscribeConfig,
    env: &HashMap<String, String>,
) -> RoomscribeConfig {
    let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    let model = config.model.get_or_insert_with(ModelConfig::default);
    if let Some(provider) = get("ROOMSCRIBE_PROVIDER") {
        model.provider = Some(provider.to_string());
    }
    let key_var = match model.provider.as_deref() {
        Some("openai") => "OPENAI_API_KEY",
        _ => "OPENROUTER_API_KEY",
    };
    if let Some(key) = get(key_var) {
        model.api_key = Some(key.to_string());
    }
    if let Some(name) = get("ROOMSCRIBE_MODEL") {
        model.model = Some(name.to_string());
    }
    if let Some(url) = get("ROOMSCRIBE_BASE_URL") {
        model.base_url = Some(url.to_string());
    }

    let server = config.server.get_or_insert_with(ServerConfig::default);
    if let Some(bind) = get("ROOMSCRIBE_BIND") {
        server.bind = Some(bind.to_string());
    }
    if let Some(port) = get("ROOMSCRIBE_PORT") {
        match port.parse() {
            Ok(port) => server.port = Some(port),
            Err(_) => warn!(value = %port, "Ignoring invalid ROOMSCRIBE_PORT"),
        }
    }

    if let Some(level) = get("RUST_LOG") {
        config
            .logging
            .get_or_insert_with(LoggingConfig::default)
            .level = Some(level.to_string());
    }

    config
}
