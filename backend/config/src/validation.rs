//! Config validation: checks run once at start-up, after defaults are applied.

use thiserror::Error;

use crate::defaults::provider_base_url;
use crate::schema::RoomscribeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &RoomscribeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_model(config, &mut report);
    validate_pipeline(config, &mut report);
    validate_server(config, &mut report);
    validate_logging(config, &mut report);
    report
}

/// The credential must be present; everything else about the endpoint must be usable.
fn validate_model(config: &RoomscribeConfig, report: &mut ValidationReport) {
    let model = config.model();

    if model.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
        let hint = match model.provider.as_deref() {
            Some("openai") => "OPENAI_API_KEY",
            _ => "OPENROUTER_API_KEY",
        };
        report.error(
            "model.apiKey",
            format!("No API key configured; set {hint} or model.apiKey"),
        );
    }

    match model.base_url.as_deref() {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
        Some(url) => report.error("model.baseUrl", format!("'{url}' is not an http(s) URL")),
        None => {
            let provider = model.provider.as_deref().unwrap_or_default();
            if provider_base_url(provider).is_none() {
                report.error(
                    "model.baseUrl",
                    format!("Unknown provider '{provider}' requires an explicit baseUrl"),
                );
            }
        }
    }

    if model.model.as_deref().map(str::trim).unwrap_or("").is_empty() {
        report.error("model.model", "Model identifier cannot be empty");
    }
    if model.timeout_secs == Some(0) {
        report.error("model.timeoutSecs", "timeoutSecs must be > 0");
    }
    if let Some(t) = model.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.warn("model.temperature", format!("Temperature {t} is outside 0.0-2.0"));
        }
    }
    if let Some(retry) = &model.retry {
        if retry.max_attempts == Some(0) {
            report.error("model.retry.maxAttempts", "maxAttempts must be >= 1");
        }
        if retry.backoff_factor.is_some_and(|f| f < 1.0) {
            report.warn("model.retry.backoffFactor", "backoffFactor below 1.0 shrinks delays");
        }
    }
}

fn validate_pipeline(config: &RoomscribeConfig, report: &mut ValidationReport) {
    let pipeline = config.pipeline();
    if pipeline.max_concurrency == Some(0) {
        report.error("pipeline.maxConcurrency", "maxConcurrency must be >= 1");
    }
    if pipeline.max_batch_size == Some(0) {
        report.error("pipeline.maxBatchSize", "maxBatchSize must be >= 1");
    }
    if let Some(caption) = &pipeline.caption {
        if caption.max_chars == Some(0) {
            report.error("pipeline.caption.maxChars", "maxChars must be > 0");
        }
        if let (Some(min), Some(max)) = (caption.min_chars, caption.max_chars) {
            if min > max {
                report.error(
                    "pipeline.caption",
                    format!("minChars ({min}) must not exceed maxChars ({max})"),
                );
            }
        }
    }
}

fn validate_server(config: &RoomscribeConfig, report: &mut ValidationReport) {
    if let Some(port) = config.server().port {
        if port < 1024 && port != 80 && port != 443 {
            report.warn(
                "server.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
}

fn validate_logging(config: &RoomscribeConfig, report: &mut ValidationReport) {
    if let Some(level) = config.logging().level {
        // RUST_LOG-style directives (e.g. "roomscribe=debug") are passed through as-is.
        if !level.contains('=') && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            report.warn("logging.level", format!("Unknown log level '{level}'"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::{CaptionConfig, ModelConfig, PipelineConfig};

    fn with_key() -> RoomscribeConfig {
        let mut cfg = RoomscribeConfig::default();
        cfg.model = Some(ModelConfig { api_key: Some("sk-or-test".into()), ..Default::default() });
        apply_all_defaults(cfg)
    }

    #[test]
    fn defaults_with_key_are_valid() {
        let report = validate(&with_key());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn missing_api_key_is_error() {
        let report = validate(&apply_all_defaults(RoomscribeConfig::default()));
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "model.apiKey");
        assert!(report.errors[0].message.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn unknown_provider_needs_base_url() {
        let mut cfg = RoomscribeConfig::default();
        cfg.model = Some(ModelConfig {
            provider: Some("acme".into()),
            api_key: Some("k".into()),
            ..Default::default()
        });
        let report = validate(&apply_all_defaults(cfg));
        assert!(report.errors.iter().any(|e| e.path == "model.baseUrl"));
    }

    #[test]
    fn inverted_caption_band_is_error() {
        let mut cfg = with_key();
        cfg.pipeline = Some(PipelineConfig {
            caption: Some(CaptionConfig {
                min_chars: Some(90),
                max_chars: Some(80),
                length_policy: None,
            }),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert!(report.errors.iter().any(|e| e.path == "pipeline.caption"));
    }

    #[test]
    fn zero_concurrency_is_error() {
        let mut cfg = with_key();
        if let Some(pipeline) = cfg.pipeline.as_mut() {
            pipeline.max_concurrency = Some(0);
        }
        assert!(!validate(&cfg).is_valid());
    }
}
