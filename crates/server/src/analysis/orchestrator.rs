//! Per-request pipeline: validate, screen, prompt, invoke, gate, ask, assemble.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::time::Instant;
use whichdoctor_core::{
    build_prompt, parse_analysis, quality_gate, screen_request, validate_request,
    AnalysisRequest, AnalysisResult, ErrorCode, ValidationError,
};

use crate::ai::questions::generate_questions;
use crate::ai::resources::{merge_resources, ResourceLookup};
use crate::ai::{AiError, AiInvoker};

/// Budget for the optional resource lookup
const LOOKUP_BUDGET: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Initial,
    Refinement,
}

impl Mode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Refinement => "refinement",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    ScreeningEmergency,
    BuildingPrompt,
    Invoking,
    LookingUpResources,
    GeneratingQuestions,
    Assembling,
}

/// Terminal states of one analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rejected,
    EmergencyReturned,
    Returned,
    FallbackReturned,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::EmergencyReturned => "emergency",
            Self::Returned => "returned",
            Self::FallbackReturned => "fallback",
        }
    }
}

fn enter(stage: Stage, mode: Mode) {
    tracing::debug!(stage = ?stage, mode = mode.as_str(), "Analysis stage");
}

fn finish(outcome: Outcome, mode: Option<Mode>) {
    metrics::counter!("analysis_outcomes_total", "outcome" => outcome.as_str()).increment(1);
    tracing::info!(
        outcome = outcome.as_str(),
        mode = mode.map(|m| m.as_str()).unwrap_or("unknown"),
        "Analysis finished"
    );
}

/// Runs the analysis pipeline for one request.
///
/// Holds only read-only collaborators, so one instance is shared by every
/// request.
#[derive(Clone)]
pub struct SymptomAnalyzer {
    invoker: Option<AiInvoker>,
    resources: Option<Arc<dyn ResourceLookup>>,
    timeout: Duration,
}

impl SymptomAnalyzer {
    /// `invoker` is `None` when no completion service is configured; every
    /// non-emergency request then receives the fallback result.
    pub fn new(invoker: Option<AiInvoker>, timeout: Duration) -> Self {
        Self {
            invoker,
            resources: None,
            timeout,
        }
    }

    pub fn with_resource_lookup(mut self, lookup: Arc<dyn ResourceLookup>) -> Self {
        self.resources = Some(lookup);
        self
    }

    pub fn ai_configured(&self) -> bool {
        self.invoker.is_some()
    }

    /// Analyze a raw request body. Only validation failures are errors;
    /// upstream failures produce the fallback result.
    pub async fn analyze(&self, body: &JsonValue) -> Result<AnalysisResult, ValidationError> {
        let request = match validate_request(body) {
            Ok(request) => request,
            Err(err) => {
                tracing::info!(violations = err.violations.len(), "Request failed validation");
                finish(Outcome::Rejected, None);
                return Err(err);
            }
        };
        let mode = if request.is_refinement() {
            Mode::Refinement
        } else {
            Mode::Initial
        };
        tracing::debug!(
            mode = mode.as_str(),
            symptoms = request.symptoms.len(),
            "Request validated"
        );

        let (result, outcome) = self.run(&request, mode).await;
        finish(outcome, Some(mode));
        Ok(result)
    }

    async fn run(&self, request: &AnalysisRequest, mode: Mode) -> (AnalysisResult, Outcome) {
        let refinement = mode == Mode::Refinement;

        enter(Stage::ScreeningEmergency, mode);
        if let Some(matched) = screen_request(request) {
            metrics::counter!("emergency_screen_matches_total", "category" => matched.category.code())
                .increment(1);
            tracing::warn!(category = matched.category.code(), "Emergency pattern matched, skipping AI stages");
            return (
                AnalysisResult::emergency(matched.warning(), refinement),
                Outcome::EmergencyReturned,
            );
        }

        let Some(invoker) = &self.invoker else {
            tracing::warn!("No completion service configured, returning fallback");
            return (
                AnalysisResult::fallback(ErrorCode::AiUnavailable),
                Outcome::FallbackReturned,
            );
        };
        let deadline = Instant::now() + self.timeout;

        enter(Stage::BuildingPrompt, mode);
        let prompt = build_prompt(request);

        enter(Stage::Invoking, mode);
        let analysed = invoker
            .invoke("analysis", &prompt, deadline, |text| {
                let payload = parse_analysis(text)?;
                let excess = payload.excess_specialists();
                let result = payload.into_result(refinement);
                quality_gate(&result, refinement)?;
                Ok((result, excess))
            })
            .await;

        let mut result = match analysed {
            Ok((result, excess)) => {
                if excess > 0 {
                    tracing::warn!(dropped = excess, "Dropped specialist recommendations beyond the limit");
                }
                result
            }
            Err(err) => return (fallback_for(&err), Outcome::FallbackReturned),
        };

        if let Some(lookup) = &self.resources {
            enter(Stage::LookingUpResources, mode);
            self.add_resources(lookup.as_ref(), &mut result, deadline).await;
        }

        if mode == Mode::Initial {
            enter(Stage::GeneratingQuestions, mode);
            result.followup_questions = generate_questions(invoker, request, &result, deadline).await;
        }

        enter(Stage::Assembling, mode);
        if refinement {
            result.followup_questions.clear();
        }
        (result, Outcome::Returned)
    }

    async fn add_resources(
        &self,
        lookup: &dyn ResourceLookup,
        result: &mut AnalysisResult,
        deadline: Instant,
    ) {
        let Some(topic) = result
            .analysis
            .potential_root_causes
            .first()
            .map(|c| c.category.clone())
        else {
            return;
        };

        let budget = deadline.min(Instant::now() + LOOKUP_BUDGET);
        match tokio::time::timeout_at(budget, lookup.lookup(&topic)).await {
            Ok(Ok(extra)) => {
                tracing::debug!(found = extra.len(), "Resource lookup finished");
                merge_resources(&mut result.educational_resources, extra);
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "Resource lookup failed"),
            Err(_) => tracing::warn!("Resource lookup timed out"),
        }
    }
}

fn fallback_for(err: &AiError) -> AnalysisResult {
    tracing::warn!(error_kind = err.kind().as_str(), error = %err, "Analysis failed, returning fallback");
    AnalysisResult::fallback(err.error_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{CompletionClient, GenerationParams, LookupError, OutboundLimiter, RetryPolicy};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use whichdoctor_core::{EducationalResource, Priority};

    /// Replies in order; prompts are recorded for inspection
    struct Scripted {
        replies: Mutex<Vec<Result<String, AiError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, AiError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for Scripted {
        async fn complete(&self, prompt: &str, _params: &GenerationParams) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(AiError::Network("script exhausted".into())))
        }
    }

    struct StaticLookup;

    #[async_trait]
    impl ResourceLookup for StaticLookup {
        async fn lookup(&self, _topic: &str) -> Result<Vec<EducationalResource>, LookupError> {
            Ok(vec![EducationalResource {
                title: "Thyroid review".into(),
                source: "PubMed".into(),
                url: Some("https://pubmed.ncbi.nlm.nih.gov/1/".into()),
                relevance: "Background".into(),
            }])
        }
    }

    fn analyzer(client: Arc<Scripted>) -> SymptomAnalyzer {
        let invoker = AiInvoker::new(client, Arc::new(OutboundLimiter::new(4))).with_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        });
        SymptomAnalyzer::new(Some(invoker), Duration::from_secs(5))
    }

    fn analysis_reply(specialist: &str, summary: Option<&str>) -> Result<String, AiError> {
        let mut analysis = json!({
            "symptom_clusters": [{
                "symptoms": ["fatigue", "dry skin"],
                "possible_connections": "Both may relate to a slowed metabolic rate",
                "system_involvement": "Endocrine"
            }],
            "potential_root_causes": [{
                "category": "Endocrine - Thyroid",
                "description": "Low thyroid output could slow metabolism and affect energy, skin, and digestion together",
                "confidence": "possible"
            }]
        });
        if let Some(summary) = summary {
            analysis["refinement_summary"] = json!(summary);
        }
        Ok(json!({
            "analysis": analysis,
            "specialist_recommendations": [{
                "specialist_type": specialist,
                "priority": "primary",
                "reason": "Consider an evaluation of thyroid function",
                "what_they_treat": "Hormone disorders"
            }],
            "educational_resources": [],
            "next_steps": ["Consider booking a specialist visit"]
        })
        .to_string())
    }

    fn questions_reply() -> Result<String, AiError> {
        Ok(json!({"questions": [
            {"id": "q1", "question": "When did the fatigue start?", "type": "text"},
            {"id": "q2", "question": "Do you feel cold often?", "type": "select", "options": ["Yes", "No"]},
            {"id": "q3", "question": "Any digestive changes?", "type": "text"}
        ]})
        .to_string())
    }

    fn initial_body() -> JsonValue {
        json!({"symptoms": [{"description": "Fatigue for 3 months, worse after meals, also dry skin",
                             "duration": "3 months"}]})
    }

    #[tokio::test]
    async fn initial_request_returns_analysis_with_questions() {
        let client = Scripted::new(vec![analysis_reply("Endocrinologist", None), questions_reply()]);
        let result = analyzer(client.clone()).analyze(&initial_body()).await.unwrap();

        assert!(!result.is_refined);
        assert_eq!(result.specialist_recommendations[0].priority, Priority::Primary);
        assert_eq!(result.question_ids(), ["q1", "q2", "q3"]);
        assert!(result.error.is_none());
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn emergency_skips_every_ai_call() {
        let client = Scripted::new(vec![]);
        let body = json!({"symptoms": [{"description": "Sudden crushing chest pain radiating to left arm",
                                        "severity": "severe"}]});
        let result = analyzer(client.clone()).analyze(&body).await.unwrap();

        assert!(result.is_emergency());
        assert!(result.specialist_recommendations.is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn generic_specialist_is_retried() {
        let client = Scripted::new(vec![
            analysis_reply("Primary Care Physician", None),
            analysis_reply("Endocrinologist", None),
            questions_reply(),
        ]);
        let result = analyzer(client.clone()).analyze(&initial_body()).await.unwrap();

        assert_eq!(result.specialist_recommendations[0].specialist_type, "Endocrinologist");
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn persistent_failure_returns_fallback() {
        let client = Scripted::new(vec![
            Err(AiError::Network("down".into())),
            Err(AiError::Network("down".into())),
            Err(AiError::Network("down".into())),
        ]);
        let result = analyzer(client.clone()).analyze(&initial_body()).await.unwrap();

        assert_eq!(result.error_code, Some(ErrorCode::AiExhausted));
        assert_eq!(result.specialist_recommendations.len(), 1);
        assert!(result.followup_questions.is_empty());
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn question_failure_keeps_the_analysis() {
        let client = Scripted::new(vec![
            analysis_reply("Endocrinologist", None),
            Ok("no json".into()),
            Ok("{\"questions\": []}".into()),
            Ok("still nothing".into()),
        ]);
        let result = analyzer(client.clone()).analyze(&initial_body()).await.unwrap();

        assert!(result.error.is_none());
        assert!(result.followup_questions.is_empty());
        assert_eq!(result.specialist_recommendations.len(), 1);
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn refinement_returns_summary_and_no_questions() {
        let client = Scripted::new(vec![analysis_reply(
            "Endocrinologist",
            Some("The cold intolerance answer strengthens the hormonal pattern"),
        )]);
        let mut body = initial_body();
        body["is_refinement"] = json!(true);
        body["initial_analysis"] = json!({
            "specialist_recommendations": [{
                "specialist_type": "Endocrinologist",
                "priority": "primary",
                "reason": "Hormonal pattern",
                "what_they_treat": "Hormone disorders"
            }],
            "followup_questions": [{"id": "q1", "question": "Do you feel cold often?", "type": "text"}]
        });
        body["followup_answers"] = json!([{"question_id": "q1", "answer": "Yes, even in summer"}]);

        let result = analyzer(client.clone()).analyze(&body).await.unwrap();

        assert!(result.is_refined);
        assert!(result.followup_questions.is_empty());
        assert!(result.analysis.refinement_summary.is_some());
        assert_eq!(client.calls(), 1);
        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains("Q1: Do you feel cold often?\nA1: Yes, even in summer"));
    }

    #[tokio::test]
    async fn unconfigured_ai_returns_unavailable_fallback() {
        let analyzer = SymptomAnalyzer::new(None, Duration::from_secs(5));
        let result = analyzer.analyze(&initial_body()).await.unwrap();
        assert_eq!(result.error_code, Some(ErrorCode::AiUnavailable));
    }

    #[tokio::test]
    async fn invalid_body_is_rejected() {
        let client = Scripted::new(vec![]);
        let err = analyzer(client.clone())
            .analyze(&json!({"symptoms": []}))
            .await
            .unwrap_err();
        assert!(!err.violations.is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn lookup_resources_are_appended() {
        let client = Scripted::new(vec![analysis_reply("Endocrinologist", None), questions_reply()]);
        let analyzer = analyzer(client).with_resource_lookup(Arc::new(StaticLookup));
        let result = analyzer.analyze(&initial_body()).await.unwrap();

        assert_eq!(result.educational_resources.len(), 1);
        assert_eq!(result.educational_resources[0].title, "Thyroid review");
    }
}
