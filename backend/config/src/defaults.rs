//! Config defaults: fills every unset field with its runtime default.
//!
//! Values owned by the client, pipeline and caption policy are re-exported
//! from those crates rather than restated here.

use roomscribe_core::{CaptionLengthPolicy, ImageMode, ProcessingMode};
use roomscribe_providers::RetryPolicy;

use crate::schema::{
    CaptionConfig, LoggingConfig, ModelConfig, PipelineConfig, RetryConfig, RoomscribeConfig,
    ServerConfig,
};

pub const DEFAULT_PROVIDER: &str = "openrouter";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub use roomscribe_providers::openrouter::{
    DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, OPENROUTER_BASE_URL,
};

pub use roomscribe_understanding::batch::DEFAULT_MAX_CONCURRENCY;
pub use roomscribe_understanding::caption::{
    DEFAULT_MAX_CHARS as DEFAULT_CAPTION_MAX_CHARS, DEFAULT_MIN_CHARS as DEFAULT_CAPTION_MIN_CHARS,
};

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: RoomscribeConfig) -> RoomscribeConfig {
    let config = apply_model_defaults(config);
    let config = apply_pipeline_defaults(config);
    apply_server_defaults(config)
}

/// Default base URL for a known provider name.
pub fn provider_base_url(provider: &str) -> Option<&'static str> {
    match provider {
        "openrouter" => Some(OPENROUTER_BASE_URL),
        "openai" => Some(OPENAI_BASE_URL),
        _ => None,
    }
}

fn apply_model_defaults(mut config: RoomscribeConfig) -> RoomscribeConfig {
    let model = config.model.get_or_insert_with(ModelConfig::default);
    let provider = model
        .provider
        .get_or_insert_with(|| DEFAULT_PROVIDER.to_string())
        .clone();
    if model.base_url.is_none() {
        model.base_url = provider_base_url(&provider).map(str::to_string);
    }
    model.model.get_or_insert_with(|| DEFAULT_MODEL.to_string());
    model.image_mode.get_or_insert(ImageMode::default());
    model.timeout_secs.get_or_insert(DEFAULT_TIMEOUT_SECS);

    let defaults = RetryPolicy::default();
    let retry = model.retry.get_or_insert_with(RetryConfig::default);
    retry.max_attempts.get_or_insert(defaults.max_attempts);
    retry.base_delay_ms.get_or_insert(defaults.base_delay_ms);
    retry.backoff_factor.get_or_insert(defaults.backoff_factor);
    retry.max_delay_ms.get_or_insert(defaults.max_delay_ms);
    retry.jitter.get_or_insert(defaults.jitter);

    config
}

fn apply_pipeline_defaults(mut config: RoomscribeConfig) -> RoomscribeConfig {
    let pipeline = config.pipeline.get_or_insert_with(PipelineConfig::default);
    pipeline.default_mode.get_or_insert(ProcessingMode::default());
    pipeline.max_concurrency.get_or_insert(DEFAULT_MAX_CONCURRENCY);
    // max_batch_size stays unset: batches are unbounded unless a cap is configured.

    let caption = pipeline.caption.get_or_insert_with(CaptionConfig::default);
    caption.min_chars.get_or_insert(DEFAULT_CAPTION_MIN_CHARS);
    caption.max_chars.get_or_insert(DEFAULT_CAPTION_MAX_CHARS);
    caption.length_policy.get_or_insert(CaptionLengthPolicy::default());

    config
}

fn apply_server_defaults(mut config: RoomscribeConfig) -> RoomscribeConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    server.port.get_or_insert(DEFAULT_PORT);

    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gets_openrouter_defaults() {
        let config = apply_all_defaults(RoomscribeConfig::default());
        let model = config.model();
        assert_eq!(model.provider.as_deref(), Some("openrouter"));
        assert_eq!(model.base_url.as_deref(), Some(OPENROUTER_BASE_URL));
        assert_eq!(model.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(model.retry.unwrap().max_attempts, Some(1));

        let caption = config.pipeline().caption.unwrap();
        assert_eq!(caption.min_chars, Some(50));
        assert_eq!(caption.max_chars, Some(80));
        assert_eq!(caption.length_policy, Some(CaptionLengthPolicy::Warn));
        assert_eq!(config.server().port, Some(8080));
    }

    #[test]
    fn batch_size_is_left_uncapped() {
        let config = apply_all_defaults(RoomscribeConfig::default());
        assert_eq!(config.pipeline().max_batch_size, None);
        assert_eq!(config.pipeline().max_concurrency, Some(DEFAULT_MAX_CONCURRENCY));
    }

    #[test]
    fn filled_values_match_the_runtime_types() {
        let config = apply_all_defaults(RoomscribeConfig::default());
        let model = config.model();
        let client = roomscribe_providers::ClientConfig::new("k");
        assert_eq!(model.model.as_deref(), Some(client.model.as_str()));
        assert_eq!(model.base_url.as_deref(), Some(client.base_url.as_str()));
        assert_eq!(model.timeout_secs, Some(client.timeout.as_secs()));

        let retry = model.retry.unwrap();
        let policy = RetryPolicy::default();
        assert_eq!(retry.max_attempts, Some(policy.max_attempts));
        assert_eq!(retry.max_delay_ms, Some(policy.max_delay_ms));

        let caption = config.pipeline().caption.unwrap();
        let runtime = roomscribe_understanding::CaptionPolicy::default();
        assert_eq!(caption.min_chars, Some(runtime.min_chars));
        assert_eq!(caption.max_chars, Some(runtime.max_chars));
        assert_eq!(caption.length_policy, Some(runtime.on_violation));
    }

    #[test]
    fn openai_provider_gets_openai_base_url() {
        let mut config = RoomscribeConfig::default();
        config.model = Some(ModelConfig { provider: Some("openai".into()), ..Default::default() });
        let config = apply_all_defaults(config);
        assert_eq!(config.model().base_url.as_deref(), Some(OPENAI_BASE_URL));
    }

    #[test]
    fn explicit_values_are_kept() {
        let mut config = RoomscribeConfig::default();
        config.pipeline = Some(PipelineConfig {
            max_concurrency: Some(9),
            default_mode: Some(ProcessingMode::Sequential),
            ..Default::default()
        });
        let config = apply_all_defaults(config);
        assert_eq!(config.pipeline().max_concurrency, Some(9));
        assert_eq!(config.pipeline().default_mode, Some(ProcessingMode::Sequential));
    }
}
