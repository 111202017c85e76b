//! Completion capability and the machinery around it

pub mod client;
pub mod completion;
pub mod error;
pub mod invoker;
pub mod limiter;
pub mod questions;
pub mod resources;
pub mod retry;

pub use client::GeminiClient;
pub use completion::{CompletionClient, GenerationParams, SafetyLevel};
pub use error::{AiError, AiErrorKind};
pub use invoker::AiInvoker;
pub use limiter::OutboundLimiter;
pub use resources::{LookupError, PubMedLookup, ResourceLookup};
pub use retry::RetryPolicy;
