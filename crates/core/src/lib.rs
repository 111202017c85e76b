//! whichdoctor-core: data model and pure pipeline stages
//!
//! Everything here is free of I/O: request validation, the emergency
//! screen, prompt construction, the completion contract and quality gate,
//! and the caller-owned interaction history.

pub mod contract;
pub mod error;
pub mod history;
pub mod prompt;
pub mod request;
pub mod result;
pub mod screening;
pub mod specialty;
pub mod validation;

pub use contract::{parse_analysis, parse_questions, quality_gate, AnalysisPayload};
pub use error::{ContractViolation, FieldViolation, ValidationError};
pub use history::{HistoryEntry, InteractionHistory};
pub use prompt::{build_prompt, build_question_prompt};
pub use request::{AnalysisRequest, FollowupAnswer, Refinement, Severity, SymptomEntry};
pub use result::{
    Analysis, AnalysisResult, EducationalResource, ErrorCode, FollowupQuestion, Priority,
    QuestionType, RootCause, SpecialistRecommendation, SymptomCluster,
};
pub use screening::{screen_request, EmergencyCategory, EmergencyMatch};
pub use validation::{sanitize_text, validate_request};
