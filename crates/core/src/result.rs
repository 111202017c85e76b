use serde::{Deserialize, Serialize};

/// Legal disclaimer attached to every result
pub const DISCLAIMER: &str = "MEDICAL DISCLAIMER\n\
This tool provides educational information only and is not a substitute for professional \
medical advice, diagnosis, or treatment. Always seek the advice of a qualified health provider \
with any questions you may have regarding a medical condition. Never disregard professional \
medical advice or delay in seeking it because of something you have read here.\n\n\
If you think you may have a medical emergency, call 911 or go to the nearest emergency room immediately.";

/// User-facing message for degraded results
pub const FALLBACK_ERROR: &str =
    "We are experiencing technical difficulties. Please try again or consult a medical professional.";

/// Fixed summary used when a refinement pass is cut short by the emergency screen
pub const EMERGENCY_REFINEMENT_SUMMARY: &str =
    "Emergency symptoms detected - immediate medical attention required";

/// Recommendation priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Primary,
    #[serde(alias = "consider")]
    Secondary,
}

/// Follow-up question input kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Select,
}

/// Category of a degraded result, safe to show to users
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AiExhausted,
    AiTimeout,
    AiUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomCluster {
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub possible_connections: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_involvement: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootCause {
    pub category: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_symptoms: Vec<String>,
    pub confidence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systemic_explanation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    #[serde(default)]
    pub symptom_clusters: Vec<SymptomCluster>,
    #[serde(default)]
    pub potential_root_causes: Vec<RootCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialistRecommendation {
    pub specialist_type: String,
    pub priority: Priority,
    pub reason: String,
    pub what_they_treat: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EducationalResource {
    pub title: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub relevance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowupQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// The response object handed back to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    #[serde(default = "default_disclaimer")]
    pub disclaimer: String,

    #[serde(default)]
    pub analysis: Analysis,

    #[serde(default)]
    pub specialist_recommendations: Vec<SpecialistRecommendation>,

    #[serde(default)]
    pub next_steps: Vec<String>,

    #[serde(default)]
    pub educational_resources: Vec<EducationalResource>,

    #[serde(default)]
    pub followup_questions: Vec<FollowupQuestion>,

    #[serde(default)]
    pub is_refined: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_warning: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

fn default_disclaimer() -> String {
    DISCLAIMER.to_string()
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            disclaimer: default_disclaimer(),
            analysis: Analysis::default(),
            specialist_recommendations: Vec::new(),
            next_steps: Vec::new(),
            educational_resources: Vec::new(),
            followup_questions: Vec::new(),
            is_refined: false,
            emergency_warning: None,
            error: None,
            error_code: None,
        }
    }
}

impl AnalysisResult {
    /// Short-circuit result for an emergency match. Carries no AI-derived content.
    pub fn emergency(warning: String, is_refined: bool) -> Self {
        let analysis = Analysis {
            refinement_summary: is_refined.then(|| EMERGENCY_REFINEMENT_SUMMARY.to_string()),
            ..Analysis::default()
        };
        Self {
            analysis,
            is_refined,
            emergency_warning: Some(warning),
            ..Self::default()
        }
    }

    /// Degraded result returned when the completion service is unusable
    pub fn fallback(code: ErrorCode) -> Self {
        Self {
            specialist_recommendations: vec![SpecialistRecommendation {
                specialist_type: crate::specialty::FALLBACK_SPECIALIST.to_string(),
                priority: Priority::Primary,
                reason: "An internal medicine specialist can evaluate complex symptom patterns \
                         and coordinate care across multiple systems"
                    .to_string(),
                what_they_treat:
                    "Complex multi-system conditions requiring comprehensive evaluation"
                        .to_string(),
            }],
            next_steps: vec![
                "We're sorry, a detailed analysis could not be completed right now. Please try again shortly.".to_string(),
                "Keep a detailed symptom diary noting patterns and triggers".to_string(),
                "Note any changes in symptoms or connections between them".to_string(),
            ],
            error: Some(FALLBACK_ERROR.to_string()),
            error_code: Some(code),
            ..Self::default()
        }
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency_warning.is_some()
    }

    /// Ids of the follow-up questions, in order
    pub fn question_ids(&self) -> Vec<&str> {
        self.followup_questions.iter().map(|q| q.id.as_str()).collect()
    }
}
