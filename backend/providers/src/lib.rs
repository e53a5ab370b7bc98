pub mod mock;
pub mod openrouter;
pub mod retry;

pub use mock::MockModel;
pub use openrouter::{ClientConfig, ImageMode, OpenRouterClient};
pub use retry::{RetryPolicy, RetryingClient};
