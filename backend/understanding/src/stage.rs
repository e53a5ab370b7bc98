use std::sync::Arc;

use tracing::debug;

use roomscribe_core::{
    AnalysisRequest, ModelClient, ModelRequest, Stage, StageError, StageResult,
};

use crate::caption::CaptionPolicy;
use crate::{parser, prompts};

/// Executes one analysis stage: build the prompt, call the model, parse the reply.
pub struct StageRunner {
    client: Arc<dyn ModelClient>,
    captions: CaptionPolicy,
}

impl StageRunner {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            captions: CaptionPolicy::default(),
        }
    }

    pub fn with_caption_policy(mut self, policy: CaptionPolicy) -> Self {
        self.captions = policy;
        self
    }

    pub fn caption_policy(&self) -> &CaptionPolicy {
        &self.captions
    }

    /// Run `stage` for one image and return the context with that stage's field filled.
    pub async fn run(
        &self,
        stage: Stage,
        request: &AnalysisRequest,
        mut context: StageResult,
    ) -> Result<StageResult, StageError> {
        let image_url = request.image_url();
        match stage {
            Stage::RoomId => {
                let reply = self.call(stage, &prompts::room_identification(image_url)).await?;
                context.room = parser::extract_room(&reply).map_err(|e| StageError::new(stage, e))?;
            }
            Stage::DetailedDescription => {
                let model_request = prompts::detailed_description(image_url, &context.room);
                let reply = self.call(stage, &model_request).await?;
                context.visual_description =
                    parser::extract_description(&reply).map_err(|e| StageError::new(stage, e))?;
            }
            Stage::CaptionSynthesis => {
                let model_request = prompts::caption_synthesis(
                    &context.room,
                    &context.visual_description,
                    self.captions.min_chars,
                    self.captions.max_chars,
                );
                let reply = self.call(stage, &model_request).await?;
                let caption =
                    parser::extract_caption(&reply).map_err(|e| StageError::new(stage, e))?;
                context.caption = self
                    .captions
                    .apply(caption)
                    .map_err(|e| StageError::new(stage, e))?;
            }
        }

        debug!(stage = %stage, image = %image_url, "Stage complete");
        Ok(context)
    }

    async fn call(&self, stage: Stage, request: &ModelRequest) -> Result<String, StageError> {
        self.client
            .invoke(request)
            .await
            .map_err(|e| StageError::new(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomscribe_core::{CaptionLengthPolicy, ModelCallError, ParseError, StageCause};
    use roomscribe_providers::MockModel;

    fn request() -> AnalysisRequest {
        AnalysisRequest::parse("https://img.test/kitchen.jpg").unwrap()
    }

    fn runner(mock: MockModel) -> StageRunner {
        StageRunner::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn room_stage_fills_room() {
        let runner = runner(MockModel::with_response("Room/Area: Kitchen"));
        let ctx = runner
            .run(Stage::RoomId, &request(), StageResult::default())
            .await
            .unwrap();
        assert_eq!(ctx.room, "Kitchen");
        assert!(ctx.visual_description.is_empty());
    }

    #[tokio::test]
    async fn empty_reply_fails_room_stage_with_parse_error() {
        let runner = runner(MockModel::with_response(""));
        let err = runner
            .run(Stage::RoomId, &request(), StageResult::default())
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::RoomId);
        assert_eq!(err.cause, StageCause::Parse(ParseError::Empty { field: "room" }));
    }

    #[tokio::test]
    async fn description_stage_sees_room_from_context() {
        let mock = MockModel::new(|req| {
            assert!(req.system_prompt.contains("Bathroom"));
            assert_eq!(req.image.as_deref(), Some("https://img.test/kitchen.jpg"));
            Ok("Visual Description: Double vanity and walk-in shower.".to_string())
        });
        let context = StageResult { room: "Bathroom".into(), ..Default::default() };
        let ctx = runner(mock)
            .run(Stage::DetailedDescription, &request(), context)
            .await
            .unwrap();
        assert_eq!(ctx.room, "Bathroom");
        assert_eq!(ctx.visual_description, "Double vanity and walk-in shower.");
    }

    #[tokio::test]
    async fn caption_stage_strips_quotes() {
        let mock = MockModel::new(|req| {
            assert!(req.user_prompt.contains("Kitchen"));
            assert!(req.user_prompt.contains("Marble island."));
            assert!(req.image.is_none());
            Ok("\"Modern Kitchen with Island\"".to_string())
        });
        let context = StageResult {
            room: "Kitchen".into(),
            visual_description: "Marble island.".into(),
            ..Default::default()
        };
        let ctx = runner(mock)
            .run(Stage::CaptionSynthesis, &request(), context)
            .await
            .unwrap();
        assert_eq!(ctx.caption, "Modern Kitchen with Island");
    }

    #[tokio::test]
    async fn reject_policy_fails_caption_stage() {
        let runner = runner(MockModel::with_response("Cozy Den"))
            .with_caption_policy(CaptionPolicy {
                on_violation: CaptionLengthPolicy::Reject,
                ..Default::default()
            });
        let context = StageResult {
            room: "Den".into(),
            visual_description: "Sofa.".into(),
            ..Default::default()
        };
        let err = runner
            .run(Stage::CaptionSynthesis, &request(), context)
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::CaptionSynthesis);
        assert!(matches!(err.cause, StageCause::Parse(ParseError::CaptionLength { .. })));
    }

    #[tokio::test]
    async fn model_errors_are_tagged_with_stage() {
        let mock = MockModel::new(|_| {
            Err(ModelCallError::Status { status: 500, body: "oops".into() })
        });
        let err = runner(mock)
            .run(Stage::DetailedDescription, &request(), StageResult::default())
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::DetailedDescription);
        assert!(matches!(err.cause, StageCause::Model(ModelCallError::Status { status: 500, .. })));
    }
}
