use std::time::Instant;

use tracing::{info, info_span, warn, Instrument};

use roomscribe_core::{AnalysisOutcome, AnalysisRequest, Stage, StageError, StageResult};

use crate::stage::StageRunner;

/// Runs the three stages for one image and turns the result into an outcome.
pub struct ImagePipeline {
    runner: StageRunner,
}

impl ImagePipeline {
    pub fn new(runner: StageRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &StageRunner {
        &self.runner
    }

    /// Analyze one image. Never fails: stage errors become a failed outcome.
    pub async fn process(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let span = info_span!("image", url = %request.image_url());
        async {
            let start = Instant::now();
            match self.run_stages(request).await {
                Ok(result) => {
                    info!(
                        room = %result.room,
                        caption_len = result.caption.chars().count(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Image analyzed"
                    );
                    AnalysisOutcome::success(request.submitted(), result)
                }
                Err(e) => {
                    warn!(
                        stage = %e.stage,
                        error = %e,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Image analysis failed"
                    );
                    AnalysisOutcome::failure(request.submitted(), e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Thread the context through every stage in dependency order; the first error stops the chain.
    async fn run_stages(&self, request: &AnalysisRequest) -> Result<StageResult, StageError> {
        let mut context = StageResult::default();
        for stage in Stage::ORDER {
            context = self.runner.run(stage, request, context).await?;
        }
        Ok(context)
    }
}
