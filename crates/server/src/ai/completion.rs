//! The text-completion capability the pipeline depends on

use async_trait::async_trait;

use super::error::AiError;

/// Content-safety threshold applied by the completion service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyLevel {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

impl SafetyLevel {
    /// Threshold name on the Gemini wire format
    pub fn threshold(&self) -> &'static str {
        match self {
            Self::BlockNone => "BLOCK_NONE",
            Self::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
            Self::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
            Self::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub safety: SafetyLevel,
}

impl Default for GenerationParams {
    /// Low randomness, room for a full analysis, filtering only high-risk content
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 4096,
            safety: SafetyLevel::BlockOnlyHigh,
        }
    }
}

/// Accept a prompt and generation parameters, return completion text or fail
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, AiError>;
}
