//! Input validation for analysis requests.
//!
//! Works on the raw JSON body rather than a typed struct so that every
//! violation can be collected and reported together, including type errors.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value as JsonValue};

use crate::error::{FieldViolation, ValidationError};
use crate::request::{AnalysisRequest, FollowupAnswer, Refinement, Severity, SymptomEntry};
use crate::result::AnalysisResult;

pub const MIN_DESCRIPTION_CHARS: usize = 10;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_SYMPTOMS: usize = 20;
pub const MAX_SHORT_FIELD_CHARS: usize = 100;
pub const MAX_CONTEXT_CHARS: usize = 1000;
pub const MAX_LIST_ITEMS: usize = 20;
pub const MAX_ANSWER_CHARS: usize = 1000;

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]*>").expect("markup pattern is valid")
});

/// Strip markup tags and control characters, collapse whitespace, trim.
pub fn sanitize_text(raw: &str) -> String {
    let without_markup = MARKUP.replace_all(raw, " ");
    let cleaned: String = without_markup
        .chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate a raw request body.
///
/// The mode comes from the body's `is_refinement` flag. On failure the error
/// lists every violation found, in a stable order.
pub fn validate_request(body: &JsonValue) -> Result<AnalysisRequest, ValidationError> {
    let mut v = Violations::default();

    let Some(obj) = body.as_object() else {
        v.push("request", "must be a JSON object");
        return Err(v.into_error());
    };

    let symptoms = validate_symptoms(obj, &mut v);
    let age_range = optional_text(obj, "age_range", "age_range", MAX_SHORT_FIELD_CHARS, &mut v);
    let existing_conditions = text_list(obj, "existing_conditions", &mut v);
    let medications = text_list(obj, "medications", &mut v);
    let additional_context = optional_text(
        obj,
        "additional_context",
        "additional_context",
        MAX_CONTEXT_CHARS,
        &mut v,
    );

    let is_refinement = match obj.get("is_refinement") {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Bool(flag)) => *flag,
        Some(_) => {
            v.push("is_refinement", "must be a boolean");
            false
        }
    };

    let refinement = if is_refinement {
        validate_refinement(obj, &mut v)
    } else {
        None
    };

    if !v.is_empty() {
        return Err(v.into_error());
    }

    Ok(AnalysisRequest {
        symptoms,
        age_range,
        existing_conditions,
        medications,
        additional_context,
        refinement,
    })
}

#[derive(Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldViolation::new(field, message));
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_error(self) -> ValidationError {
        ValidationError { violations: self.0 }
    }
}

fn validate_symptoms(obj: &Map<String, JsonValue>, v: &mut Violations) -> Vec<SymptomEntry> {
    let items = match obj.get("symptoms") {
        None | Some(JsonValue::Null) => {
            v.push("symptoms", "is required");
            return Vec::new();
        }
        Some(JsonValue::Array(items)) => items,
        Some(_) => {
            v.push("symptoms", "must be an array");
            return Vec::new();
        }
    };

    if items.is_empty() {
        v.push("symptoms", "at least one symptom is required");
    }
    if items.len() > MAX_SYMPTOMS {
        v.push("symptoms", format!("at most {MAX_SYMPTOMS} symptoms are allowed"));
    }

    let mut symptoms = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = format!("symptoms[{i}]");
        let Some(entry) = item.as_object() else {
            v.push(path, "must be an object");
            continue;
        };

        let description = match entry.get("description") {
            Some(JsonValue::String(raw)) => {
                let text = sanitize_text(raw);
                let len = text.chars().count();
                if len < MIN_DESCRIPTION_CHARS {
                    v.push(
                        format!("{path}.description"),
                        format!("too short (minimum {MIN_DESCRIPTION_CHARS} characters)"),
                    );
                } else if len > MAX_DESCRIPTION_CHARS {
                    v.push(
                        format!("{path}.description"),
                        format!("too long (maximum {MAX_DESCRIPTION_CHARS} characters)"),
                    );
                }
                text
            }
            None | Some(JsonValue::Null) => {
                v.push(format!("{path}.description"), "is required");
                String::new()
            }
            Some(_) => {
                v.push(format!("{path}.description"), "must be a string");
                String::new()
            }
        };

        let duration = optional_text(
            entry,
            "duration",
            &format!("{path}.duration"),
            MAX_SHORT_FIELD_CHARS,
            v,
        );
        let frequency = optional_text(
            entry,
            "frequency",
            &format!("{path}.frequency"),
            MAX_SHORT_FIELD_CHARS,
            v,
        );

        let severity = match entry.get("severity") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(raw)) if raw.trim().is_empty() => None,
            Some(JsonValue::String(raw)) => {
                let parsed = Severity::parse(raw);
                if parsed.is_none() {
                    v.push(
                        format!("{path}.severity"),
                        "must be one of: mild, moderate, severe",
                    );
                }
                parsed
            }
            Some(_) => {
                v.push(format!("{path}.severity"), "must be a string");
                None
            }
        };

        symptoms.push(SymptomEntry {
            description,
            duration,
            severity,
            frequency,
        });
    }
    symptoms
}

fn optional_text(
    obj: &Map<String, JsonValue>,
    key: &str,
    field: &str,
    max_chars: usize,
    v: &mut Violations,
) -> Option<String> {
    match obj.get(key) {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(raw)) => {
            let text = sanitize_text(raw);
            if text.is_empty() {
                None
            } else if text.chars().count() > max_chars {
                v.push(field, format!("too long (maximum {max_chars} characters)"));
                None
            } else {
                Some(text)
            }
        }
        Some(_) => {
            v.push(field, "must be a string");
            None
        }
    }
}

fn text_list(obj: &Map<String, JsonValue>, key: &str, v: &mut Violations) -> Vec<String> {
    let items = match obj.get(key) {
        None | Some(JsonValue::Null) => return Vec::new(),
        Some(JsonValue::Array(items)) => items,
        Some(_) => {
            v.push(key, "must be an array of strings");
            return Vec::new();
        }
    };

    if items.len() > MAX_LIST_ITEMS {
        v.push(key, format!("at most {MAX_LIST_ITEMS} entries are allowed"));
    }

    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match item {
            JsonValue::String(raw) => {
                let text = sanitize_text(raw);
                if text.chars().count() > MAX_SHORT_FIELD_CHARS {
                    v.push(
                        format!("{key}[{i}]"),
                        format!("too long (maximum {MAX_SHORT_FIELD_CHARS} characters)"),
                    );
                } else if !text.is_empty() && !out.contains(&text) {
                    out.push(text);
                }
            }
            _ => v.push(format!("{key}[{i}]"), "must be a string"),
        }
    }
    out
}

fn validate_refinement(obj: &Map<String, JsonValue>, v: &mut Violations) -> Option<Refinement> {
    let initial = match obj.get("initial_analysis") {
        None | Some(JsonValue::Null) => {
            v.push("initial_analysis", "is required in refinement mode");
            None
        }
        Some(raw) => match serde_json::from_value::<AnalysisResult>(raw.clone()) {
            Ok(result) => Some(result),
            Err(e) => {
                v.push(
                    "initial_analysis",
                    format!("is not a valid analysis result ({e})"),
                );
                None
            }
        },
    };

    let answers = validate_answers(obj, v);

    let (Some(mut initial), Some(mut answers)) = (initial, answers) else {
        return None;
    };

    if initial.followup_questions.is_empty() {
        v.push(
            "initial_analysis.followup_questions",
            "contains no questions to answer",
        );
        return None;
    }

    let expected: BTreeSet<&str> = initial.question_ids().into_iter().collect();
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for answer in &answers {
        if !seen.insert(answer.question_id.as_str()) {
            duplicates.insert(answer.question_id.as_str());
        }
    }
    let missing: Vec<&str> = expected.difference(&seen).copied().collect();
    let unknown: Vec<&str> = seen.difference(&expected).copied().collect();

    if !duplicates.is_empty() {
        v.push(
            "followup_answers",
            format!(
                "duplicate answers for: {}",
                duplicates.into_iter().collect::<Vec<_>>().join(", ")
            ),
        );
    }
    if !missing.is_empty() {
        v.push(
            "followup_answers",
            format!("missing answers for: {}", missing.join(", ")),
        );
    }
    if !unknown.is_empty() {
        v.push(
            "followup_answers",
            format!("unknown question ids: {}", unknown.join(", ")),
        );
    }
    if !v.is_empty() {
        return None;
    }

    let question_text: HashMap<&str, &str> = initial
        .followup_questions
        .iter()
        .map(|q| (q.id.as_str(), q.question.as_str()))
        .collect();
    for answer in &mut answers {
        if answer.question.is_empty() {
            if let Some(text) = question_text.get(answer.question_id.as_str()) {
                answer.question = (*text).to_string();
            }
        }
    }

    // The prior result is context only; drop any error flag it carried.
    initial.error = None;
    initial.error_code = None;

    Some(Refinement {
        initial_analysis: initial,
        followup_answers: answers,
    })
}

fn validate_answers(obj: &Map<String, JsonValue>, v: &mut Violations) -> Option<Vec<FollowupAnswer>> {
    let items = match obj.get("followup_answers") {
        None | Some(JsonValue::Null) => {
            v.push("followup_answers", "is required in refinement mode");
            return None;
        }
        Some(JsonValue::Array(items)) => items,
        Some(_) => {
            v.push("followup_answers", "must be an array");
            return None;
        }
    };

    // Answers with a bad answer field stay in the list so their ids are still checked.
    let mut answers = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = format!("followup_answers[{i}]");
        let Some(entry) = item.as_object() else {
            v.push(path, "must be an object");
            continue;
        };

        let question_id = match entry.get("question_id") {
            Some(JsonValue::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
            Some(JsonValue::Number(n)) => n.to_string(),
            None | Some(JsonValue::Null) => {
                v.push(format!("{path}.question_id"), "is required");
                continue;
            }
            Some(_) => {
                v.push(format!("{path}.question_id"), "must be a non-empty string");
                continue;
            }
        };

        let answer = match entry.get("answer") {
            Some(JsonValue::String(raw)) => {
                let text = sanitize_text(raw);
                if text.is_empty() {
                    v.push(format!("{path}.answer"), "cannot be empty");
                } else if text.chars().count() > MAX_ANSWER_CHARS {
                    v.push(
                        format!("{path}.answer"),
                        format!("too long (maximum {MAX_ANSWER_CHARS} characters)"),
                    );
                }
                text
            }
            None | Some(JsonValue::Null) => {
                v.push(format!("{path}.answer"), "is required");
                String::new()
            }
            Some(_) => {
                v.push(format!("{path}.answer"), "must be a string");
                String::new()
            }
        };

        let question = match entry.get("question") {
            Some(JsonValue::String(raw)) => sanitize_text(raw),
            _ => String::new(),
        };

        answers.push(FollowupAnswer {
            question_id,
            question,
            answer,
        });
    }

    Some(answers)
}
