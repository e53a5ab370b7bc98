pub mod error;
pub mod traits;
pub mod types;

pub use error::{ModelCallError, ParseError, ScribeError, StageCause, StageError, ValidationError};
pub use traits::{ModelClient, ModelRequest};
pub use types::{
    AnalysisOutcome, AnalysisRequest, BatchMetadata, BatchResult, CaptionLengthPolicy,
    ImageMode, ProcessingMode, Stage, StageResult,
};
