//! Completion failure taxonomy

use thiserror::Error;
use whichdoctor_core::{ContractViolation, ErrorCode};

/// Failure of a completion call or of the retry sequence around it
#[derive(Debug, Error)]
pub enum AiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("completion service is rate limited")]
    RateLimited,

    #[error("completion timed out")]
    Timeout,

    #[error("completion broke the output contract: {0}")]
    ContractInvalid(#[from] ContractViolation),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<AiError> },
}

/// Label-friendly discriminant of [`AiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiErrorKind {
    Network,
    RateLimited,
    Timeout,
    ContractInvalid,
    Exhausted,
}

impl AiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::ContractInvalid => "contract_invalid",
            Self::Exhausted => "exhausted",
        }
    }
}

impl AiError {
    pub fn kind(&self) -> AiErrorKind {
        match self {
            Self::Network(_) => AiErrorKind::Network,
            Self::RateLimited => AiErrorKind::RateLimited,
            Self::Timeout => AiErrorKind::Timeout,
            Self::ContractInvalid(_) => AiErrorKind::ContractInvalid,
            Self::Exhausted { .. } => AiErrorKind::Exhausted,
        }
    }

    /// Code reported on the fallback result for this failure
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Timeout => ErrorCode::AiTimeout,
            _ => ErrorCode::AiExhausted,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AiError::Timeout
        } else {
            AiError::Network(err.to_string())
        }
    }
}
