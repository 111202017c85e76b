//! Gemini client for the `generateContent` API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use whichdoctor_core::ContractViolation;

use super::completion::{CompletionClient, GenerationParams};
use super::error::AiError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Client for the Google Gemini API
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

/// Request body for `generateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    contents: Vec<ApiContent<'a>>,
    generation_config: ApiGenerationConfig,
    safety_settings: Vec<ApiSafetySetting>,
}

#[derive(Debug, Serialize)]
struct ApiContent<'a> {
    role: &'static str,
    parts: Vec<ApiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ApiSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

/// Response from `generateContent`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Error detail from the API
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GeminiClient {
    /// Create a new client with the given API key
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, AiError> {
        let request = build_request(prompt, params);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(api_err) = serde_json::from_str::<ApiError>(&body) {
                return Err(AiError::Network(format!(
                    "Gemini API error ({}): {}",
                    status, api_err.error.message
                )));
            }
            return Err(AiError::Network(format!("Gemini API error ({})", status)));
        }

        let body = response
            .json::<ApiResponse>()
            .await
            .map_err(|e| AiError::Network(format!("Failed to parse response: {}", e)))?;

        extract_text(body)
    }
}

fn build_request<'a>(prompt: &'a str, params: &GenerationParams) -> ApiRequest<'a> {
    ApiRequest {
        contents: vec![ApiContent {
            role: "user",
            parts: vec![ApiPart { text: prompt }],
        }],
        generation_config: ApiGenerationConfig {
            temperature: params.temperature,
            max_output_tokens: params.max_output_tokens,
        },
        safety_settings: HARM_CATEGORIES
            .iter()
            .map(|&category| ApiSafetySetting {
                category,
                threshold: params.safety.threshold(),
            })
            .collect(),
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: ApiResponse) -> Result<String, AiError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ContractViolation::Blocked(reason).into());
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(ContractViolation::EmptyCompletion.into());
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some("SAFETY") => Err(ContractViolation::Blocked("SAFETY".into()).into()),
            _ => Err(ContractViolation::EmptyCompletion.into()),
        };
    }
    Ok(text)
}
