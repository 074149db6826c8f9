//! Axum route handlers for the Application Evaluation API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::report::EvaluationReport;
use crate::models::submission::ApplicationSubmission;
use crate::pipeline::stage::EvaluationStage;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub application_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResultResponse {
    pub success: bool,
    pub message: String,
    pub application_id: i64,
    pub evaluation_result: Option<EvaluationReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub application_id: i64,
    pub stage: EvaluationStage,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/applications/submit
///
/// Accepts a submission and evaluates it in the background. Returns immediately.
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(submission): Json<ApplicationSubmission>,
) -> Result<Json<SubmitResponse>, AppError> {
    validate(&submission)?;

    let application_id = submission.application_id;
    let stage = state.tracker.register(application_id).await;
    let service = state.service.clone();

    tokio::spawn(async move {
        service.process(submission, stage).await;
    });

    info!(application_id, "Evaluation queued");
    Ok(Json(SubmitResponse {
        success: true,
        message: "Application received; evaluation started".to_string(),
        application_id,
    }))
}

/// GET /api/applications/:id/evaluation-result
///
/// Latest stored report, or `success: false` while none exists yet.
pub async fn handle_get_result(
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
) -> Result<Json<EvaluationResultResponse>, AppError> {
    let report = state.store.latest(application_id).await?;

    let (success, message) = match &report {
        Some(_) => (true, "Evaluation result found"),
        None => (false, "Evaluation result not available yet"),
    };

    Ok(Json(EvaluationResultResponse {
        success,
        message: message.to_string(),
        application_id,
        evaluation_result: report,
    }))
}

/// GET /api/applications/:id/status
pub async fn handle_get_status(
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
) -> Result<Json<StatusResponse>, AppError> {
    let stage = state.tracker.get(application_id).await.ok_or_else(|| {
        AppError::NotFound(format!("No evaluation submitted for application {application_id}"))
    })?;

    Ok(Json(StatusResponse {
        application_id,
        stage,
    }))
}

fn validate(submission: &ApplicationSubmission) -> Result<(), AppError> {
    if submission.applicant_name.trim().is_empty() {
        return Err(AppError::Validation(
            "applicantName cannot be empty".to_string(),
        ));
    }
    if submission.resume_item_answers.is_empty()
        && submission.cover_letter_question_answers.is_empty()
    {
        return Err(AppError::Validation(
            "submission contains no answers".to_string(),
        ));
    }
    if let Some(blank) = submission
        .resume_item_answers
        .iter()
        .find(|answer| answer.item_name.trim().is_empty())
    {
        return Err(AppError::Validation(format!(
            "resume item {} has no name",
            blank.item_id
        )));
    }
    Ok(())
}
