//! Educational-resource lookup against PubMed E-utilities

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use whichdoctor_core::EducationalResource;

pub const DEFAULT_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Review articles fetched per lookup
const MAX_ARTICLES: usize = 3;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected lookup response: {0}")]
    Malformed(&'static str),
}

/// Best-effort source of extra educational resources for a topic
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    async fn lookup(&self, topic: &str) -> Result<Vec<EducationalResource>, LookupError>;
}

/// Review-article search via `esearch` then `esummary`
#[derive(Clone)]
pub struct PubMedLookup {
    http: reqwest::Client,
    base_url: String,
}

impl PubMedLookup {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_EUTILS_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<JsonValue, LookupError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);
        let value = self
            .http
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<JsonValue>()
            .await?;
        Ok(value)
    }
}

impl Default for PubMedLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceLookup for PubMedLookup {
    async fn lookup(&self, topic: &str) -> Result<Vec<EducationalResource>, LookupError> {
        let term = search_term(topic);
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let retmax = MAX_ARTICLES.to_string();
        let search = self
            .get_json(
                "esearch.fcgi",
                &[
                    ("db", "pubmed"),
                    ("term", term.as_str()),
                    ("retmode", "json"),
                    ("retmax", retmax.as_str()),
                    ("sort", "relevance"),
                ],
            )
            .await?;
        let ids = parse_search_ids(&search)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids.join(",");
        let summary = self
            .get_json(
                "esummary.fcgi",
                &[("db", "pubmed"), ("id", joined.as_str()), ("retmode", "json")],
            )
            .await?;
        Ok(parse_summaries(&summary, topic))
    }
}

/// Review-only search term built from a root-cause category
fn search_term(topic: &str) -> String {
    let words: Vec<&str> = topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return String::new();
    }
    format!("{} AND review[pt]", words.join(" "))
}

fn parse_search_ids(value: &JsonValue) -> Result<Vec<String>, LookupError> {
    let ids = value
        .pointer("/esearchresult/idlist")
        .and_then(JsonValue::as_array)
        .ok_or(LookupError::Malformed("missing esearchresult.idlist"))?;
    Ok(ids
        .iter()
        .filter_map(JsonValue::as_str)
        .take(MAX_ARTICLES)
        .map(str::to_string)
        .collect())
}

fn parse_summaries(value: &JsonValue, topic: &str) -> Vec<EducationalResource> {
    let Some(result) = value.get("result") else {
        return Vec::new();
    };
    let uids = result
        .get("uids")
        .and_then(JsonValue::as_array)
        .map(|u| u.iter().filter_map(JsonValue::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    uids.into_iter()
        .filter_map(|uid| {
            let doc = result.get(uid)?;
            let title = doc.get("title")?.as_str()?.trim();
            if title.is_empty() {
                return None;
            }
            let source = match doc.get("source").and_then(JsonValue::as_str) {
                Some(journal) if !journal.is_empty() => format!("PubMed ({journal})"),
                _ => "PubMed".to_string(),
            };
            Some(EducationalResource {
                title: title.to_string(),
                source,
                url: Some(format!("https://pubmed.ncbi.nlm.nih.gov/{uid}/")),
                relevance: format!("Peer-reviewed review related to {topic}"),
            })
        })
        .take(MAX_ARTICLES)
        .collect()
}

/// Append lookup results after the existing resources, skipping titles
/// already present.
pub fn merge_resources(existing: &mut Vec<EducationalResource>, extra: Vec<EducationalResource>) {
    for resource in extra {
        let title = resource.title.to_lowercase();
        if !existing.iter().any(|r| r.title.to_lowercase() == title) {
            existing.push(resource);
        }
    }
}
