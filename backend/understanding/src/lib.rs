//! Listing photo analysis.
//!
//! Turns an image URL into `{room, visualDescription, caption}` through three
//! chained model calls, and runs that pipeline over batches of images.

pub mod batch;
pub mod caption;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod stage;

pub use batch::{BatchCoordinator, BatchExecutor, ConcurrentExecutor, SequentialExecutor};
pub use caption::CaptionPolicy;
pub use parser::{extract_caption, extract_description, extract_room};
pub use pipeline::ImagePipeline;
pub use stage::StageRunner;
