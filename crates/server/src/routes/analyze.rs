//! Symptom analysis endpoint

use axum::{Extension, Json, extract::rejection::JsonRejection};
use serde_json::Value as JsonValue;
use whichdoctor_core::AnalysisResult;

use crate::analysis::SymptomAnalyzer;
use crate::error::AppError;

/// POST /api/analyze - Run the analysis pipeline on a request body
///
/// Validation failures are 400s. Everything else, including upstream
/// failures that end in the fallback result, is a 200.
pub async fn analyze(
    Extension(analyzer): Extension<SymptomAnalyzer>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    let Json(body) = body?;
    let result = analyzer.analyze(&body).await?;
    Ok(Json(result))
}
