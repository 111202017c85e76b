//! Bounded, validated completion calls

use std::sync::Arc;

use tokio::time::Instant;
use whichdoctor_core::ContractViolation;

use super::completion::{CompletionClient, GenerationParams};
use super::error::AiError;
use super::limiter::OutboundLimiter;
use super::retry::{retry_with_backoff, RetryPolicy};

/// Calls the completion capability under the retry policy, the outbound
/// limiter, and a wall-clock deadline. Each attempt is only a success once
/// `validate` accepts the completion text.
#[derive(Clone)]
pub struct AiInvoker {
    client: Arc<dyn CompletionClient>,
    limiter: Arc<OutboundLimiter>,
    policy: RetryPolicy,
    params: GenerationParams,
}

impl AiInvoker {
    pub fn new(client: Arc<dyn CompletionClient>, limiter: Arc<OutboundLimiter>) -> Self {
        Self {
            client,
            limiter,
            policy: RetryPolicy::default(),
            params: GenerationParams::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Invoke until `validate` accepts a completion. Hitting `deadline`
    /// drops the in-flight call and any remaining attempts.
    pub async fn invoke<T, V>(
        &self,
        purpose: &'static str,
        prompt: &str,
        deadline: Instant,
        validate: V,
    ) -> Result<T, AiError>
    where
        V: Fn(&str) -> Result<T, ContractViolation> + Sync,
        T: Send,
    {
        let validate = &validate;
        let attempts = retry_with_backoff(&self.policy, purpose, move |_| {
            self.attempt(prompt, validate)
        });

        match tokio::time::timeout_at(deadline, attempts).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(purpose, "Completion deadline reached");
                Err(AiError::Timeout)
            }
        }
    }

    async fn attempt<T, V>(&self, prompt: &str, validate: &V) -> Result<T, AiError>
    where
        V: Fn(&str) -> Result<T, ContractViolation>,
    {
        let _permit = self.limiter.try_acquire().ok_or(AiError::RateLimited)?;
        let text = self.client.complete(prompt, &self.params).await?;
        Ok(validate(&text)?)
    }
}
