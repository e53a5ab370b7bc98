use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use roomscribe_core::{ModelCallError, ModelClient, ModelRequest, Stage};

type Handler = dyn Fn(&ModelRequest) -> Result<String, ModelCallError> + Send + Sync;
type Latency = dyn Fn(&ModelRequest) -> Duration + Send + Sync;

/// A scripted model client that answers from a closure instead of the network.
pub struct MockModel {
    name: String,
    handler: Box<Handler>,
    latency: Option<Box<Latency>>,
    calls: AtomicUsize,
}

impl MockModel {
    pub fn new(
        handler: impl Fn(&ModelRequest) -> Result<String, ModelCallError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: "mock".to_string(),
            handler: Box::new(handler),
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always reply with the same text.
    pub fn with_response(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::new(move |_| Ok(response.clone()))
    }

    /// Fail the first `failures` calls with `error`, then reply with `response`.
    pub fn failing_then(
        failures: usize,
        error: ModelCallError,
        response: impl Into<String>,
    ) -> Self {
        let response = response.into();
        let seen = AtomicUsize::new(0);
        Self::new(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) < failures {
                Err(error.clone())
            } else {
                Ok(response.clone())
            }
        })
    }

    /// Plausible per-stage replies for offline runs.
    pub fn listing() -> Self {
        Self::new(|request| {
            let reply = match request.stage {
                Some(Stage::RoomId) => "Room/Area: Living Room",
                Some(Stage::DetailedDescription) => {
                    "Visual Description: Open living room with light oak flooring, a sectional \
                     sofa facing a brick fireplace, and two tall windows on the east wall."
                }
                Some(Stage::CaptionSynthesis) => {
                    "\"Open Living Room with Brick Fireplace and Oak Floors\""
                }
                None => "ok",
            };
            Ok(reply.to_string())
        })
        .named("mock-listing")
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sleep before answering; the delay may depend on the request.
    pub fn with_latency(
        mut self,
        latency: impl Fn(&ModelRequest) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.latency = Some(Box::new(latency));
        self
    }

    /// Number of `invoke` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: &ModelRequest) -> Result<String, ModelCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = &self.latency {
            let delay = latency(request);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        (self.handler)(request)
    }
}
