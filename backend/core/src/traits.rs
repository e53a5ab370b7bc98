use async_trait::async_trait;

use crate::error::ModelCallError;
use crate::types::Stage;

/// A single-turn chat completion backend with vision support.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Client name (e.g., "openrouter", "mock").
    fn name(&self) -> &str;

    /// Send one request and return the raw reply text.
    async fn invoke(&self, request: &ModelRequest) -> Result<String, ModelCallError>;
}

/// One model invocation: a system instruction, a user question and an optional image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    /// Stage issuing the call, if any. Used for logging and by scripted clients.
    pub stage: Option<Stage>,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Image URL to show the model. How it is rendered is up to the client.
    pub image: Option<String>,
}

impl ModelRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            stage: None,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            image: None,
        }
    }

    pub fn for_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }
}
