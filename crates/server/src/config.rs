//! Server configuration

use std::fmt;
use std::time::Duration;

use crate::ai::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Server configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    pub bind_address: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    pub max_concurrent_ai_calls: usize,
    pub analysis_timeout: Duration,
    pub retry_base_delay: Duration,
    pub enable_pubmed_lookup: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: parsed("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            max_concurrent_ai_calls: parsed("MAX_CONCURRENT_AI_CALLS")
                .unwrap_or(defaults.max_concurrent_ai_calls),
            analysis_timeout: parsed("ANALYSIS_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.analysis_timeout),
            retry_base_delay: parsed("AI_RETRY_BASE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            enable_pubmed_lookup: parsed("ENABLE_PUBMED_LOOKUP")
                .unwrap_or(defaults.enable_pubmed_lookup),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.into(),
            gemini_base_url: DEFAULT_BASE_URL.into(),
            cors_origins: vec!["*".into()],
            rate_limit_rps: 5,
            max_concurrent_ai_calls: 8,
            analysis_timeout: Duration::from_secs(30),
            retry_base_delay: Duration::from_millis(1000),
            enable_pubmed_lookup: false,
        }
    }
}

// The API key stays out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("cors_origins", &self.cors_origins)
            .field("rate_limit_rps", &self.rate_limit_rps)
            .field("max_concurrent_ai_calls", &self.max_concurrent_ai_calls)
            .field("analysis_timeout", &self.analysis_timeout)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("enable_pubmed_lookup", &self.enable_pubmed_lookup)
            .finish()
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_list_is_split_and_trimmed() {
        assert_eq!(
            parse_list("https://a.example, https://b.example ,,"),
            ["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = Config {
            gemini_api_key: Some("secret-key".into()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }
}
