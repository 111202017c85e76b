//! Symptom analysis orchestration

mod orchestrator;

pub use orchestrator::{Outcome, SymptomAnalyzer};
