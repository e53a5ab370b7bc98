//! Batch coordination: validate a list of image URLs, run the pipeline over
//! them with the selected executor, and aggregate the outcomes.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use roomscribe_core::{
    AnalysisOutcome, AnalysisRequest, BatchResult, ProcessingMode, ValidationError,
};

use crate::pipeline::ImagePipeline;

/// Default number of images analyzed at once in concurrent mode.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// A strategy for running the pipeline over a validated batch.
///
/// Implementations must return exactly one outcome per request, in input order.
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    fn mode(&self) -> ProcessingMode;

    async fn execute(
        &self,
        pipeline: Arc<ImagePipeline>,
        requests: Vec<AnalysisRequest>,
    ) -> Vec<AnalysisOutcome>;
}

/// Processes images one at a time, in input order.
pub struct SequentialExecutor;

#[async_trait]
impl BatchExecutor for SequentialExecutor {
    fn mode(&self) -> ProcessingMode {
        ProcessingMode::Sequential
    }

    async fn execute(
        &self,
        pipeline: Arc<ImagePipeline>,
        requests: Vec<AnalysisRequest>,
    ) -> Vec<AnalysisOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in &requests {
            outcomes.push(pipeline.process(request).await);
        }
        outcomes
    }
}

/// Runs each image's pipeline in its own task, bounded by a semaphore.
pub struct ConcurrentExecutor {
    max_in_flight: usize,
}

impl ConcurrentExecutor {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
        }
    }
}

impl Default for ConcurrentExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

#[async_trait]
impl BatchExecutor for ConcurrentExecutor {
    fn mode(&self) -> ProcessingMode {
        ProcessingMode::Concurrent
    }

    async fn execute(
        &self,
        pipeline: Arc<ImagePipeline>,
        requests: Vec<AnalysisRequest>,
    ) -> Vec<AnalysisOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let urls: Vec<String> = requests.iter().map(|r| r.submitted().to_string()).collect();

        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let pipeline = Arc::clone(&pipeline);
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(
                    async move {
                        // The semaphore is never closed, so acquire cannot fail.
                        let _permit = semaphore.acquire_owned().await.ok();
                        pipeline.process(&request).await
                    }
                    .in_current_span(),
                )
            })
            .collect();

        // join_all keeps handle order, so slot i always belongs to input i.
        join_all(handles)
            .await
            .into_iter()
            .zip(urls)
            .map(|(joined, url)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(url = %url, error = %e, "Image task panicked");
                    AnalysisOutcome::failure(url, format!("image task failed: {e}"))
                }
            })
            .collect()
    }
}

/// Entry point for batches: validation, executor selection, aggregation.
pub struct BatchCoordinator {
    pipeline: Arc<ImagePipeline>,
    sequential: Arc<dyn BatchExecutor>,
    concurrent: Arc<dyn BatchExecutor>,
    /// Upper bound on images per batch; unbounded unless configured.
    max_batch_size: Option<usize>,
}

impl BatchCoordinator {
    pub fn new(pipeline: ImagePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            sequential: Arc::new(SequentialExecutor),
            concurrent: Arc::new(ConcurrentExecutor::default()),
            max_batch_size: None,
        }
    }

    pub fn with_max_concurrency(mut self, max_in_flight: usize) -> Self {
        self.concurrent = Arc::new(ConcurrentExecutor::new(max_in_flight));
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size);
        self
    }

    pub fn pipeline(&self) -> &Arc<ImagePipeline> {
        &self.pipeline
    }

    fn executor(&self, mode: ProcessingMode) -> &Arc<dyn BatchExecutor> {
        match mode {
            ProcessingMode::Sequential => &self.sequential,
            ProcessingMode::Concurrent => &self.concurrent,
        }
    }

    /// Check shape and URLs before any image is processed.
    pub fn validate(&self, image_urls: &[String]) -> Result<Vec<AnalysisRequest>, ValidationError> {
        if image_urls.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        if let Some(limit) = self.max_batch_size.filter(|&limit| image_urls.len() > limit) {
            return Err(ValidationError::TooManyImages {
                count: image_urls.len(),
                limit,
            });
        }
        image_urls
            .iter()
            .enumerate()
            .map(|(index, url)| {
                AnalysisRequest::parse(url).map_err(|reason| ValidationError::InvalidUrl {
                    index,
                    url: url.clone(),
                    reason,
                })
            })
            .collect()
    }

    /// Analyze every image in the batch. Only validation can fail the call;
    /// per-image failures are recorded in the outcomes.
    pub async fn process_batch(
        &self,
        image_urls: &[String],
        mode: ProcessingMode,
    ) -> Result<BatchResult, ValidationError> {
        let requests = self.validate(image_urls)?;
        let executor = Arc::clone(self.executor(mode));
        let batch_id = Uuid::new_v4();
        let span = info_span!("batch", id = %batch_id, mode = %mode, images = requests.len());

        async {
            let start = Instant::now();
            info!("Batch started");

            let outcomes = executor.execute(Arc::clone(&self.pipeline), requests).await;
            let result = BatchResult::from_outcomes(outcomes, executor.mode());

            info!(
                total = result.metadata().total,
                successful = result.metadata().successful,
                failed = result.metadata().failed,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Batch complete"
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use roomscribe_core::{ModelCallError, ModelClient, Stage};
    use roomscribe_providers::{ClientConfig, MockModel, OpenRouterClient};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::stage::StageRunner;

    fn coordinator(client: Arc<dyn ModelClient>) -> BatchCoordinator {
        BatchCoordinator::new(ImagePipeline::new(StageRunner::new(client)))
    }

    fn urls(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("https://img.test/photo-{i}.jpg")).collect()
    }

    /// Deterministic replies keyed on the image, failing for `bad` images.
    fn scripted(bad: &'static [&'static str]) -> MockModel {
        MockModel::new(move |req| {
            let image = req.image.clone().unwrap_or_default();
            if bad.iter().any(|b| image.ends_with(b)) {
                return Err(ModelCallError::Status { status: 500, body: "internal error".into() });
            }
            Ok(match req.stage {
                Some(Stage::RoomId) => format!("Room/Area: Room for {image}"),
                Some(Stage::DetailedDescription) => {
                    "Visual Description: Hardwood floors and a large window.".to_string()
                }
                _ => "\"Bright Room with Hardwood Floors and a Large Picture Window\"".to_string(),
            })
        })
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let coordinator = coordinator(Arc::new(MockModel::listing()));
        let err = coordinator.process_batch(&[], ProcessingMode::Sequential).await.unwrap_err();
        assert_eq!(err, ValidationError::EmptyBatch);
    }

    #[tokio::test]
    async fn malformed_url_is_rejected_before_any_call() {
        let mock = Arc::new(MockModel::listing());
        let coordinator = coordinator(mock.clone());
        let input = vec!["https://img.test/ok.jpg".to_string(), "not a url".to_string()];

        let err = coordinator.process_batch(&input, ProcessingMode::Concurrent).await.unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUrl { index: 1, .. }));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let coordinator = coordinator(Arc::new(MockModel::listing())).with_max_batch_size(2);
        let err = coordinator
            .process_batch(&urls(3), ProcessingMode::Sequential)
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::TooManyImages { count: 3, limit: 2 });
    }

    #[tokio::test]
    async fn large_batch_is_accepted_without_a_cap() {
        let coordinator = coordinator(Arc::new(MockModel::listing()));
        let result = coordinator
            .process_batch(&urls(21), ProcessingMode::Sequential)
            .await
            .unwrap();
        assert_eq!(result.outcomes().len(), 21);
        assert_eq!(result.metadata().successful, 21);
    }

    #[tokio::test]
    async fn padded_url_is_echoed_as_sent() {
        let padded = vec![" https://img.test/porch.jpg\n".to_string()];
        for mode in [ProcessingMode::Sequential, ProcessingMode::Concurrent] {
            let coordinator = coordinator(Arc::new(MockModel::listing()));
            let result = coordinator.process_batch(&padded, mode).await.unwrap();
            assert!(result.outcomes()[0].is_success());
            assert_eq!(result.outcomes()[0].image_url(), padded[0]);
        }
    }

    #[tokio::test]
    async fn middle_failure_is_isolated() {
        for mode in [ProcessingMode::Sequential, ProcessingMode::Concurrent] {
            let coordinator = coordinator(Arc::new(scripted(&["photo-2.jpg"])));
            let result = coordinator.process_batch(&urls(3), mode).await.unwrap();

            let outcomes = result.outcomes();
            assert_eq!(outcomes.len(), 3);
            assert!(outcomes[0].is_success());
            assert!(!outcomes[1].is_success());
            assert!(outcomes[1].error().unwrap().contains("500"));
            assert!(outcomes[2].is_success());
            assert_eq!(result.metadata().total, 3);
            assert_eq!(result.metadata().successful, 2);
            assert_eq!(result.metadata().mode, mode);
        }
    }

    #[tokio::test]
    async fn all_failures_still_produce_every_outcome() {
        let mock = MockModel::new(|_| Err(ModelCallError::Transport("connection refused".into())));
        let coordinator = coordinator(Arc::new(mock));
        let result = coordinator.process_batch(&urls(4), ProcessingMode::Concurrent).await.unwrap();

        assert_eq!(result.metadata().total, 4);
        assert_eq!(result.metadata().successful, 0);
        assert!(result.outcomes().iter().all(|o| !o.is_success() && o.error().is_some()));
    }

    #[tokio::test]
    async fn concurrent_output_keeps_input_order() {
        // Earlier images answer slower, so tasks finish in reverse order.
        let mock = scripted(&[]).with_latency(|req| {
            let image = req.image.clone().unwrap_or_default();
            let n: u64 = image
                .trim_start_matches("https://img.test/photo-")
                .trim_end_matches(".jpg")
                .parse()
                .unwrap_or(0);
            Duration::from_millis(60u64.saturating_sub(n * 10))
        });
        let coordinator = coordinator(Arc::new(mock)).with_max_concurrency(5);
        let input = urls(5);
        let result = coordinator.process_batch(&input, ProcessingMode::Concurrent).await.unwrap();

        let got: Vec<&str> = result.outcomes().iter().map(|o| o.image_url()).collect();
        assert_eq!(got, input.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(result.outcomes().iter().all(|o| o.is_success()));
    }

    #[tokio::test]
    async fn sequential_and_concurrent_agree() {
        let input = urls(4);
        let sequential = coordinator(Arc::new(scripted(&["photo-3.jpg"])))
            .process_batch(&input, ProcessingMode::Sequential)
            .await
            .unwrap();
        let concurrent = coordinator(Arc::new(scripted(&["photo-3.jpg"])))
            .process_batch(&input, ProcessingMode::Concurrent)
            .await
            .unwrap();

        assert_eq!(sequential.outcomes(), concurrent.outcomes());
        assert_eq!(sequential.metadata().total, concurrent.metadata().total);
        assert_eq!(sequential.metadata().successful, concurrent.metadata().successful);
    }

    #[tokio::test]
    async fn http_500_for_one_image_over_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("photo-2.jpg"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("Room/Area: [room type]"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "Room/Area: Kitchen" } }]
            })))
            .with_priority(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("Visual Description: [description]"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": {
                    "content": "Visual Description: Marble island and pendant lights."
                } }]
            })))
            .with_priority(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": {
                    "content": "\"Modern Kitchen with Marble Island and Pendant Lighting\""
                } }]
            })))
            .with_priority(3)
            .mount(&server)
            .await;

        let client =
            OpenRouterClient::new(ClientConfig::new("test-key").with_base_url(server.uri()))
                .unwrap();
        let coordinator = coordinator(Arc::new(client));
        let result = coordinator.process_batch(&urls(3), ProcessingMode::Sequential).await.unwrap();

        let outcomes = result.outcomes();
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[0].room(), "Kitchen");
        assert_eq!(outcomes[0].caption(), "Modern Kitchen with Marble Island and Pendant Lighting");
        assert!(!outcomes[1].is_success());
        assert!(outcomes[1].error().unwrap().contains("room identification"));
        assert!(outcomes[2].is_success());
        assert_eq!(result.metadata().successful, 2);
    }
}
