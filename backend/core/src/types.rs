use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// URL schemes the model endpoint can fetch or decode.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "data"];

/// One discrete model-invocation step of an image pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Identify the room or area shown.
    RoomId,
    /// Describe the visible features of the identified room.
    DetailedDescription,
    /// Write a short marketing caption from room and description.
    CaptionSynthesis,
}

impl Stage {
    /// Dependency order: description needs the room, caption needs both.
    pub const ORDER: [Stage; 3] = [
        Stage::RoomId,
        Stage::DetailedDescription,
        Stage::CaptionSynthesis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::RoomId => "room identification",
            Stage::DetailedDescription => "detailed description",
            Stage::CaptionSynthesis => "caption synthesis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a batch is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// One image at a time, in input order.
    Sequential,
    /// Each image's pipeline runs in its own task.
    #[default]
    Concurrent,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingMode::Sequential => f.write_str("sequential"),
            ProcessingMode::Concurrent => f.write_str("concurrent"),
        }
    }
}

impl FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" | "parallel" => Ok(Self::Concurrent),
            other => Err(format!(
                "unknown processing mode '{other}'; use 'sequential' or 'concurrent'"
            )),
        }
    }
}

/// What to do with a caption outside the target character band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionLengthPolicy {
    /// Keep the caption, log a warning.
    #[default]
    Warn,
    /// Cut over-long captions down to the maximum; warn on short ones.
    Truncate,
    /// Fail the caption stage.
    Reject,
}

/// How an image reference is presented to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMode {
    /// Structured `image_url` content part next to the prompt text.
    #[default]
    Attachment,
    /// URL appended to the user prompt text.
    Inline,
}

/// A validated image reference, the input to one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Exactly as the caller sent it; echoed back in the outcome.
    submitted: String,
    image_url: String,
}

impl AnalysisRequest {
    /// Validate `raw` as an absolute http(s) or data URL.
    ///
    /// Returns the rejection reason on failure.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("URL is empty".to_string());
        }
        let parsed = Url::parse(trimmed).map_err(|e| e.to_string())?;
        if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
            return Err(format!("unsupported scheme '{}'", parsed.scheme()));
        }
        if parsed.scheme() != "data" && parsed.host_str().is_none() {
            return Err("URL has no host".to_string());
        }
        Ok(Self {
            submitted: raw.to_string(),
            image_url: trimmed.to_string(),
        })
    }

    /// The trimmed URL sent to the model.
    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn submitted(&self) -> &str {
        &self.submitted
    }
}

/// Accumulating per-image context threaded through the stages.
///
/// `room` is written by room identification and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageResult {
    pub room: String,
    pub visual_description: String,
    pub caption: String,
}

/// Terminal record for one image.
///
/// Either a success with all three text fields populated, or a failure
/// carrying an error and empty text fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    image_url: String,
    room: String,
    visual_description: String,
    caption: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AnalysisOutcome {
    pub fn success(image_url: impl Into<String>, result: StageResult) -> Self {
        Self {
            image_url: image_url.into(),
            room: result.room,
            visual_description: result.visual_description,
            caption: result.caption,
            success: true,
            error: None,
        }
    }

    pub fn failure(image_url: impl Into<String>, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "image analysis failed".to_string();
        }
        Self {
            image_url: image_url.into(),
            room: String::new(),
            visual_description: String::new(),
            caption: String::new(),
            success: false,
            error: Some(error),
        }
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn visual_description(&self) -> &str {
        &self.visual_description
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Aggregate counts for a batch, always derived from its outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub mode: ProcessingMode,
}

/// Ordered outcomes for a batch; `results[i]` belongs to input URL `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    results: Vec<AnalysisOutcome>,
    metadata: BatchMetadata,
}

impl BatchResult {
    pub fn from_outcomes(results: Vec<AnalysisOutcome>, mode: ProcessingMode) -> Self {
        let successful = results.iter().filter(|o| o.is_success()).count();
        let metadata = BatchMetadata {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            mode,
        };
        Self { results, metadata }
    }

    pub fn outcomes(&self) -> &[AnalysisOutcome] {
        &self.results
    }

    pub fn metadata(&self) -> &BatchMetadata {
        &self.metadata
    }

    pub fn into_outcomes(self) -> Vec<AnalysisOutcome> {
        self.results
    }
}
