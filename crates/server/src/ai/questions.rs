//! Follow-up question generation

use tokio::time::Instant;
use whichdoctor_core::{
    build_question_prompt, parse_questions, AnalysisRequest, AnalysisResult, FollowupQuestion,
};

use super::invoker::AiInvoker;

/// Generate follow-up questions for an initial analysis.
///
/// Never fails: any error degrades to no questions so the analysis itself
/// is still returned.
pub async fn generate_questions(
    invoker: &AiInvoker,
    request: &AnalysisRequest,
    initial: &AnalysisResult,
    deadline: Instant,
) -> Vec<FollowupQuestion> {
    let prompt = build_question_prompt(request, initial);

    match invoker.invoke("questions", &prompt, deadline, parse_questions).await {
        Ok(questions) => {
            tracing::debug!(count = questions.len(), "Follow-up questions generated");
            questions
        }
        Err(e) => {
            tracing::warn!(error_kind = e.kind().as_str(), error = %e, "Question generation failed, continuing without questions");
            metrics::counter!("question_generation_failures_total").increment(1);
            Vec::new()
        }
    }
}
