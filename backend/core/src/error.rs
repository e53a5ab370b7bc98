use thiserror::Error;

use crate::types::Stage;

/// Malformed batch request. Fatal to the whole call; no image is processed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("imageUrls is required and must be a non-empty array")]
    EmptyBatch,

    #[error("imageUrls must be an array of strings")]
    NotAnArray,

    #[error("too many images in one batch: {count} (limit {limit})")]
    TooManyImages { count: usize, limit: usize },

    #[error("invalid image URL at index {index} ({url:?}): {reason}")]
    InvalidUrl {
        index: usize,
        url: String,
        reason: String,
    },
}

/// Failure of a single call to the model endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelCallError {
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model request failed: {0}")]
    Transport(String),

    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

impl ModelCallError {
    /// Transport failures, rate limiting and server-side errors may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::MalformedResponse(_) => false,
        }
    }
}

/// The model replied but the expected field could not be extracted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no {field} could be extracted from model reply")]
    Empty { field: &'static str },

    #[error("caption is {len} characters, outside the {min}-{max} character band")]
    CaptionLength { len: usize, min: usize, max: usize },
}

/// Underlying cause of a stage failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StageCause {
    #[error(transparent)]
    Model(#[from] ModelCallError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A model call or parse failure tagged with the stage it came from.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{stage} stage failed: {cause}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub cause: StageCause,
}

impl StageError {
    pub fn new(stage: Stage, cause: impl Into<StageCause>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

/// Top-level error type at the service boundary.
#[derive(Debug, Error)]
pub enum ScribeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
