//! Output contract for model completions.
//!
//! Completions are free text that should contain one JSON object. This
//! module extracts that object, parses it into result types, and runs the
//! quality gate that decides whether a parsed result may reach a user.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::ContractViolation;
use crate::prompt::MAX_SPECIALISTS;
use crate::result::{
    Analysis, AnalysisResult, EducationalResource, FollowupQuestion, QuestionType,
    SpecialistRecommendation,
};
use crate::specialty;

/// Phrases that read as a diagnosis or as false certainty
pub const FORBIDDEN_PHRASES: &[&str] = &[
    "you have",
    "diagnosed with",
    "you need",
    "this is",
    "definitely",
    "certainly",
    "undoubtedly",
    "without a doubt",
    "guaranteed",
    "100%",
];

/// Maximum number of follow-up questions kept from one completion
pub const MAX_QUESTIONS: usize = 5;

/// Shortest root-cause description that can carry a mechanism
const MIN_ROOT_CAUSE_CHARS: usize = 40;

/// Words that show a root cause explains a link rather than naming a label
const LINKAGE_MARKERS: &[&str] = &[
    "affect",
    "across",
    "cascade",
    "caus",
    "connect",
    "contribut",
    "drive",
    "impact",
    "influenc",
    "interact",
    "lead",
    "link",
    "multiple",
    "relat",
    "result",
    "system",
    "through",
    "trigger",
];

static FORBIDDEN: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    FORBIDDEN_PHRASES
        .iter()
        .map(|phrase| {
            let trailing = if phrase.ends_with(|c: char| c.is_alphanumeric()) {
                r"\b"
            } else {
                ""
            };
            let pattern = format!(r"(?i)\b{}{}", regex::escape(phrase), trailing);
            (
                *phrase,
                Regex::new(&pattern).expect("Invalid forbidden phrase pattern"),
            )
        })
        .collect()
});

/// Analysis fields as the model returns them, before gating
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisPayload {
    pub analysis: Analysis,
    pub specialist_recommendations: Vec<SpecialistRecommendation>,
    #[serde(default)]
    pub educational_resources: Vec<EducationalResource>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

impl AnalysisPayload {
    /// Number of specialist entries beyond the allowed maximum
    pub fn excess_specialists(&self) -> usize {
        self.specialist_recommendations
            .len()
            .saturating_sub(MAX_SPECIALISTS)
    }

    /// Assemble a result, truncating specialists to the allowed maximum
    pub fn into_result(mut self, is_refined: bool) -> AnalysisResult {
        self.specialist_recommendations.truncate(MAX_SPECIALISTS);
        self.next_steps.retain(|s| !s.trim().is_empty());
        if !is_refined {
            self.analysis.refinement_summary = None;
        }
        AnalysisResult {
            analysis: self.analysis,
            specialist_recommendations: self.specialist_recommendations,
            next_steps: self.next_steps,
            educational_resources: self.educational_resources,
            is_refined,
            ..AnalysisResult::default()
        }
    }
}

/// Pull the JSON object out of a completion, tolerating code fences and
/// surrounding prose. The outermost `{ ... }` span wins.
pub fn extract_json_object(text: &str) -> Result<&str, ContractViolation> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ContractViolation::EmptyCompletion);
    }

    let unfenced = strip_code_fence(trimmed);
    let start = unfenced.find('{').ok_or(ContractViolation::NoJson)?;
    let end = unfenced.rfind('}').ok_or(ContractViolation::NoJson)?;
    if end < start {
        return Err(ContractViolation::NoJson);
    }
    Ok(&unfenced[start..=end])
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the language tag line
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse an analysis completion into its payload
pub fn parse_analysis(text: &str) -> Result<AnalysisPayload, ContractViolation> {
    let json = extract_json_object(text)?;
    serde_json::from_str(json).map_err(|e| ContractViolation::Malformed(e.to_string()))
}

/// Parse a question completion. Invalid entries are skipped; a completion
/// with no usable question at all is a contract failure.
pub fn parse_questions(text: &str) -> Result<Vec<FollowupQuestion>, ContractViolation> {
    let json = extract_json_object(text)?;
    let value: JsonValue =
        serde_json::from_str(json).map_err(|e| ContractViolation::Malformed(e.to_string()))?;
    let items = value
        .get("questions")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| ContractViolation::Malformed("missing questions array".into()))?;

    let mut seen = HashSet::new();
    let mut questions = Vec::new();
    for item in items {
        let Some(question) = parse_question(item) else {
            continue;
        };
        if !seen.insert(question.id.clone()) {
            continue;
        }
        questions.push(question);
        if questions.len() == MAX_QUESTIONS {
            break;
        }
    }

    if questions.is_empty() {
        return Err(ContractViolation::NoQuestions);
    }
    Ok(questions)
}

fn parse_question(item: &JsonValue) -> Option<FollowupQuestion> {
    let id = item.get("id")?.as_str()?.trim();
    let text = item.get("question")?.as_str()?.trim();
    if id.is_empty() || text.is_empty() {
        return None;
    }

    let question_type = match item.get("type").and_then(JsonValue::as_str) {
        None | Some("text") => QuestionType::Text,
        Some("select") => QuestionType::Select,
        Some(_) => return None,
    };

    let options = match question_type {
        QuestionType::Text => None,
        QuestionType::Select => {
            let options: Vec<String> = item
                .get("options")?
                .as_array()?
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
            if options.is_empty() {
                return None;
            }
            Some(options)
        }
    };

    let context = item
        .get("context")
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Some(FollowupQuestion {
        id: id.to_string(),
        question: text.to_string(),
        question_type,
        context,
        options,
    })
}

/// Decide whether an assembled result may be returned
pub fn quality_gate(result: &AnalysisResult, refinement: bool) -> Result<(), ContractViolation> {
    if result.disclaimer.trim().is_empty() {
        return Err(ContractViolation::MissingDisclaimer);
    }

    if result.specialist_recommendations.is_empty() {
        return Err(ContractViolation::NoSpecialists);
    }
    for rec in &result.specialist_recommendations {
        if specialty::is_generic_provider(&rec.specialist_type) {
            return Err(ContractViolation::GenericSpecialist(rec.specialist_type.clone()));
        }
        if !specialty::is_known_specialty(&rec.specialist_type) {
            return Err(ContractViolation::UnknownSpecialty(rec.specialist_type.clone()));
        }
    }

    if result.analysis.potential_root_causes.is_empty() {
        return Err(ContractViolation::NoRootCauses);
    }
    for cause in &result.analysis.potential_root_causes {
        if !explains_linkage(&cause.description) {
            return Err(ContractViolation::ShallowRootCause(cause.category.clone()));
        }
    }

    if refinement {
        let has_summary = result
            .analysis
            .refinement_summary
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if !has_summary {
            return Err(ContractViolation::MissingRefinementSummary);
        }
    }

    for (field, text) in prose_fields(result) {
        if let Some(marker) = forbidden_phrase(text) {
            return Err(ContractViolation::DiagnosticLanguage {
                field,
                marker: marker.to_string(),
            });
        }
    }

    Ok(())
}

/// First forbidden phrase found in the text
pub fn forbidden_phrase(text: &str) -> Option<&'static str> {
    FORBIDDEN
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(phrase, _)| *phrase)
}

fn explains_linkage(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.trim().chars().count() >= MIN_ROOT_CAUSE_CHARS
        && LINKAGE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Every model-authored prose field, labelled with its path
fn prose_fields(result: &AnalysisResult) -> Vec<(String, &str)> {
    let mut fields = Vec::new();
    let analysis = &result.analysis;

    if let Some(summary) = &analysis.refinement_summary {
        fields.push(("analysis.refinement_summary".to_string(), summary.as_str()));
    }
    for (i, cluster) in analysis.symptom_clusters.iter().enumerate() {
        fields.push((
            format!("analysis.symptom_clusters[{i}].possible_connections"),
            cluster.possible_connections.as_str(),
        ));
        if let Some(sys) = &cluster.system_involvement {
            fields.push((format!("analysis.symptom_clusters[{i}].system_involvement"), sys));
        }
    }
    for (i, cause) in analysis.potential_root_causes.iter().enumerate() {
        fields.push((
            format!("analysis.potential_root_causes[{i}].description"),
            cause.description.as_str(),
        ));
        if let Some(expl) = &cause.systemic_explanation {
            fields.push((
                format!("analysis.potential_root_causes[{i}].systemic_explanation"),
                expl,
            ));
        }
    }
    for (i, rec) in result.specialist_recommendations.iter().enumerate() {
        fields.push((format!("specialist_recommendations[{i}].reason"), rec.reason.as_str()));
        fields.push((
            format!("specialist_recommendations[{i}].what_they_treat"),
            rec.what_they_treat.as_str(),
        ));
    }
    for (i, step) in result.next_steps.iter().enumerate() {
        fields.push((format!("next_steps[{i}]"), step.as_str()));
    }
    for (i, res) in result.educational_resources.iter().enumerate() {
        fields.push((format!("educational_resources[{i}].relevance"), res.relevance.as_str()));
    }
    fields
}
