//! `roomscribe-config`: runtime configuration for the captioning service.
//!
//! Provides:
//! - Typed config schema (model endpoint, pipeline, server, logging)
//! - YAML loading with file discovery
//! - `${ENV_VAR}` substitution and well-known env overrides
//! - Default value application
//! - Validation and redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, process_env, resolve_env_vars_with, MissingEnvVarError};
pub use io::{load_raw, resolve_config_path};
pub use redact::redact;
pub use schema::{
    CaptionConfig, LoggingConfig, ModelConfig, PipelineConfig, RetryConfig, RoomscribeConfig,
    ServerConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Turn a raw value tree into a typed config with env overrides and defaults applied.
///
/// Order: `${VAR}` substitution, typed parse, env overrides, defaults. Not validated.
pub fn resolve(raw: Value, env: &HashMap<String, String>) -> Result<RoomscribeConfig> {
    let value = resolve_env_vars_with(&raw, env).context("Failed to resolve env vars in config")?;

    let config: RoomscribeConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    let config = apply_env_overrides(config, env);
    Ok(apply_all_defaults(config))
}

/// Validate a resolved config. Errors are fatal; warnings are logged.
pub fn check(config: &RoomscribeConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        let messages: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid configuration:\n  {}", messages.join("\n  "));
    }
    Ok(())
}

/// Discover and load the config file, then resolve it against the process environment.
///
/// This is the main entry point for loading a config at runtime; pair it with
/// [`check`] once logging is up.
pub async fn load_resolved(explicit: Option<&Path>) -> Result<RoomscribeConfig> {
    let raw = match resolve_config_path(explicit) {
        Some(path) => load_raw(&path).await?,
        None => Value::Object(Default::default()),
    };
    resolve(raw, &process_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomscribe_core::{CaptionLengthPolicy, ProcessingMode};
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn prepare(raw: Value, env: &HashMap<String, String>) -> Result<RoomscribeConfig> {
        let config = resolve(raw, env)?;
        check(&config)?;
        Ok(config)
    }

    #[test]
    fn env_key_alone_is_enough() {
        let config = prepare(json!({}), &env(&[("OPENROUTER_API_KEY", "sk-or-1")])).unwrap();
        let model = config.model();
        assert_eq!(model.api_key.as_deref(), Some("sk-or-1"));
        assert_eq!(model.base_url.as_deref(), Some(defaults::OPENROUTER_BASE_URL));
        assert_eq!(config.pipeline().default_mode, Some(ProcessingMode::Concurrent));
        assert_eq!(config.server().port, Some(defaults::DEFAULT_PORT));
    }

    #[test]
    fn missing_key_fails_with_hint() {
        let err = prepare(json!({}), &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("model.apiKey"), "{err}");
    }

    #[test]
    fn file_values_substituted_and_typed() {
        let yaml = "\
model:
  apiKey: ${ROUTER_KEY}
  model: openai/gpt-4o
pipeline:
  defaultMode: sequential
  caption:
    lengthPolicy: truncate
";
        let raw = io::parse_yaml(yaml).unwrap();
        let config = prepare(raw, &env(&[("ROUTER_KEY", "sk-file")])).unwrap();
        assert_eq!(config.model().api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.model().model.as_deref(), Some("openai/gpt-4o"));
        let pipeline = config.pipeline();
        assert_eq!(pipeline.default_mode, Some(ProcessingMode::Sequential));
        assert_eq!(
            pipeline.caption.and_then(|c| c.length_policy),
            Some(CaptionLengthPolicy::Truncate)
        );
    }

    #[test]
    fn resolve_skips_validation() {
        let config = resolve(json!({}), &HashMap::new()).unwrap();
        assert!(config.model().api_key.is_none());
        assert!(check(&config).is_err());
    }

    #[test]
    fn env_override_beats_file() {
        let raw = json!({"model": {"apiKey": "sk-file", "model": "file-model"}});
        let config = prepare(raw, &env(&[("ROOMSCRIBE_MODEL", "env-model")])).unwrap();
        assert_eq!(config.model().model.as_deref(), Some("env-model"));
    }
}
