use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use roomscribe_core::{ModelCallError, ModelClient, ModelRequest};
use roomscribe_logging::redact_sensitive_data;

pub use roomscribe_core::ImageMode;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection and request settings for an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Name used in logs (e.g., "openrouter", "openai").
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout: Duration,
    pub image_mode: ImageMode,
    /// Sent as `HTTP-Referer` (OpenRouter app attribution).
    pub referer: Option<String>,
    /// Sent as `X-Title` (OpenRouter app attribution).
    pub title: Option<String>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "openrouter".to_string(),
            base_url: OPENROUTER_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            image_mode: ImageMode::default(),
            referer: None,
            title: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_image_mode(mut self, mode: ImageMode) -> Self {
        self.image_mode = mode;
        self
    }
}

/// Chat-completion client for OpenRouter and other OpenAI-compatible endpoints.
pub struct OpenRouterClient {
    client: Client,
    config: ClientConfig,
}

impl OpenRouterClient {
    /// Build a client. Fails immediately when no API key is configured.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            bail!("no API key configured for model provider '{}'", config.name);
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_body<'a>(&'a self, request: &'a ModelRequest) -> ChatRequest<'a> {
        let user_content = match (&request.image, self.config.image_mode) {
            (None, _) => MessageContent::Text(request.user_prompt.clone()),
            (Some(url), ImageMode::Inline) => {
                MessageContent::Text(format!("{}\n\nImage: {}", request.user_prompt, url))
            }
            (Some(url), ImageMode::Attachment) => MessageContent::Parts(vec![
                ContentPart::Text {
                    text: &request.user_prompt,
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url },
                },
            ]),
        };

        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(request.system_prompt.clone()),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user_content,
        });

        ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(String),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[async_trait]
impl ModelClient for OpenRouterClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn invoke(&self, request: &ModelRequest) -> Result<String, ModelCallError> {
        let start = Instant::now();
        let body = self.build_body(request);

        debug!(
            provider = %self.config.name,
            model = %self.config.model,
            stage = ?request.stage,
            has_image = request.image.is_some(),
            "Sending chat completion request"
        );

        let mut http = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body);
        if let Some(referer) = &self.config.referer {
            http = http.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.config.title {
            http = http.header("X-Title", title);
        }

        let response = http
            .send()
            .await
            .map_err(|e| ModelCallError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelCallError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body = redact_sensitive_data(&text);
            warn!(
                provider = %self.config.name,
                status = status.as_u16(),
                body = %body,
                "Model endpoint returned an error"
            );
            return Err(ModelCallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ModelCallError::MalformedResponse(format!("invalid JSON body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| {
                ModelCallError::MalformedResponse(
                    "response has no choices[0].message.content".to_string(),
                )
            })?;

        debug!(
            provider = %self.config.name,
            stage = ?request.stage,
            latency_ms = start.elapsed().as_millis() as u64,
            chars = content.len(),
            "Model replied"
        );

        Ok(content)
    }
}
