use serde::{Deserialize, Serialize};

use crate::result::AnalysisResult;

/// Self-reported severity of a symptom
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Parse the wire form (`mild`, `moderate`, `severe`), case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mild" => Some(Self::Mild),
            "moderate" => Some(Self::Moderate),
            "severe" => Some(Self::Severe),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

/// A single user-reported symptom, already sanitized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomEntry {
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

impl SymptomEntry {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            duration: None,
            severity: None,
            frequency: None,
        }
    }
}

/// A user's answer to one follow-up question from a prior result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowupAnswer {
    pub question_id: String,
    #[serde(default)]
    pub question: String,
    pub answer: String,
}

/// Context carried only by refinement requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Refinement {
    pub initial_analysis: AnalysisResult,
    pub followup_answers: Vec<FollowupAnswer>,
}

/// A validated analysis request.
///
/// Only the validator constructs these from wire input, so every instance
/// satisfies the length and refinement rules. Serializes to the same flat
/// body the endpoint accepts, so a stored request can be posted again.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(into = "WireRequest", try_from = "WireRequest")]
pub struct AnalysisRequest {
    pub symptoms: Vec<SymptomEntry>,
    pub age_range: Option<String>,
    pub existing_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub additional_context: Option<String>,
    pub refinement: Option<Refinement>,
}

/// Request body as it appears on the wire
#[derive(Serialize, Deserialize)]
struct WireRequest {
    symptoms: Vec<SymptomEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    age_range: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    existing_conditions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    medications: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    additional_context: Option<String>,

    #[serde(default)]
    is_refinement: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    initial_analysis: Option<AnalysisResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    followup_answers: Option<Vec<FollowupAnswer>>,
}

impl From<AnalysisRequest> for WireRequest {
    fn from(request: AnalysisRequest) -> Self {
        let (initial_analysis, followup_answers) = match request.refinement {
            Some(r) => (Some(r.initial_analysis), Some(r.followup_answers)),
            None => (None, None),
        };
        Self {
            symptoms: request.symptoms,
            age_range: request.age_range,
            existing_conditions: request.existing_conditions,
            medications: request.medications,
            additional_context: request.additional_context,
            is_refinement: initial_analysis.is_some(),
            initial_analysis,
            followup_answers,
        }
    }
}

impl TryFrom<WireRequest> for AnalysisRequest {
    type Error = String;

    fn try_from(wire: WireRequest) -> Result<Self, Self::Error> {
        let refinement = match (wire.is_refinement, wire.initial_analysis, wire.followup_answers) {
            (false, _, _) => None,
            (true, Some(initial_analysis), Some(followup_answers)) => Some(Refinement {
                initial_analysis,
                followup_answers,
            }),
            (true, _, _) => {
                return Err(
                    "refinement requests need initial_analysis and followup_answers".to_string(),
                );
            }
        };
        Ok(Self {
            symptoms: wire.symptoms,
            age_range: wire.age_range,
            existing_conditions: wire.existing_conditions,
            medications: wire.medications,
            additional_context: wire.additional_context,
            refinement,
        })
    }
}

impl AnalysisRequest {
    pub fn is_refinement(&self) -> bool {
        self.refinement.is_some()
    }

    /// All user-authored free text that the emergency screen must see
    pub fn screenable_text(&self) -> Vec<&str> {
        let mut texts: Vec<&str> = self
            .symptoms
            .iter()
            .map(|s| s.description.as_str())
            .collect();
        if let Some(ctx) = &self.additional_context {
            texts.push(ctx);
        }
        if let Some(refinement) = &self.refinement {
            texts.extend(refinement.followup_answers.iter().map(|a| a.answer.as_str()));
        }
        texts
    }
}
