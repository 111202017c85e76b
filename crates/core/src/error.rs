use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single rule violation on one request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found in a request, in discovery order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Ways a completion can fail the output contract or the quality gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("completion was empty")]
    EmptyCompletion,

    #[error("completion was blocked: {0}")]
    Blocked(String),

    #[error("no JSON object found in completion")]
    NoJson,

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("disclaimer is missing")]
    MissingDisclaimer,

    #[error("diagnostic language {marker:?} in {field}")]
    DiagnosticLanguage { field: String, marker: String },

    #[error("no specialist recommendations")]
    NoSpecialists,

    #[error("generic provider recommended: {0}")]
    GenericSpecialist(String),

    #[error("not a recognised specialty: {0}")]
    UnknownSpecialty(String),

    #[error("no potential root causes")]
    NoRootCauses,

    #[error("root cause {0:?} lacks a cross-system explanation")]
    ShallowRootCause(String),

    #[error("refinement summary is missing")]
    MissingRefinementSummary,

    #[error("no usable follow-up questions")]
    NoQuestions,
}
