//! Pipeline orchestrator: quantitative scoring, then qualitative review, then one
//! assembled report handed to persistence and forwarding.
//!
//! The orchestrator has no retries of its own. `EvaluationService::process` is the
//! unit spawned per submission.
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::report::{EvaluationReport, ResumeEvaluation};
use crate::models::submission::ApplicationSubmission;
use crate::qualitative::{QualitativeEvaluator, QualitativeOutcome};
use crate::quantitative::{QuantitativeEvaluator, ScoreMap};

pub mod forward;
pub mod handlers;
pub mod stage;
pub mod store;

use forward::ReportForwarder;
use stage::{EvaluationStage, StageHandle};
use store::ReportStore;

#[derive(Clone)]
pub struct EvaluationPipeline {
    quantitative: QuantitativeEvaluator,
    qualitative: QualitativeEvaluator,
}

impl EvaluationPipeline {
    pub fn new(quantitative: QuantitativeEvaluator, qualitative: QualitativeEvaluator) -> Self {
        Self {
            quantitative,
            qualitative,
        }
    }

    pub async fn run(
        &self,
        submission: &ApplicationSubmission,
        stage: &StageHandle,
    ) -> EvaluationReport {
        info!(
            application_id = submission.application_id,
            applicant = %submission.applicant_name,
            "Evaluation started"
        );

        stage.enter(EvaluationStage::QuantScoring).await;
        let scores = self
            .quantitative
            .evaluate(&submission.resume_item_answers)
            .await;

        let qualitative = self
            .qualitative
            .evaluate(&submission.cover_letter_question_answers, &scores, stage)
            .await;

        let report = assemble_report(submission, &scores, qualitative);
        stage.enter(EvaluationStage::Done).await;

        info!(
            application_id = submission.application_id,
            total_score = report.total_score,
            "Evaluation finished"
        );
        report
    }
}

/// Zips each resume answer with its rule score (unmatched ⇒ 0) and attaches the
/// qualitative results. Every call yields a fresh evaluation id.
pub fn assemble_report(
    submission: &ApplicationSubmission,
    scores: &ScoreMap,
    qualitative: QualitativeOutcome,
) -> EvaluationReport {
    let resume_evaluations: Vec<ResumeEvaluation> = submission
        .resume_item_answers
        .iter()
        .map(|answer| ResumeEvaluation {
            item_id: answer.item_id,
            item_name: answer.item_name.clone(),
            content: answer.display_content().to_string(),
            score: scores.get(&answer.item_name).copied().unwrap_or(0),
        })
        .collect();

    let total_score = resume_evaluations
        .iter()
        .map(|evaluation| i64::from(evaluation.score))
        .sum();

    EvaluationReport {
        evaluation_id: Uuid::new_v4(),
        evaluated_at: Utc::now(),
        applicant_id: submission.applicant_id,
        applicant_name: submission.applicant_name.clone(),
        applicant_email: submission.applicant_email.clone(),
        application_id: submission.application_id,
        job_posting_id: submission.job_posting_id,
        total_score,
        resume_evaluations,
        cover_letter_question_evaluations: qualitative.questions,
        overall_analysis: qualitative.overall,
    }
}

/// Pipeline plus its output sinks.
#[derive(Clone)]
pub struct EvaluationService {
    pipeline: EvaluationPipeline,
    store: Arc<dyn ReportStore>,
    forwarder: Arc<dyn ReportForwarder>,
}

impl EvaluationService {
    pub fn new(
        pipeline: EvaluationPipeline,
        store: Arc<dyn ReportStore>,
        forwarder: Arc<dyn ReportForwarder>,
    ) -> Self {
        Self {
            pipeline,
            store,
            forwarder,
        }
    }

    /// Runs the pipeline, persists the report and forwards it. Sink failures are
    /// logged; the report is returned regardless.
    pub async fn process(
        &self,
        submission: ApplicationSubmission,
        stage: StageHandle,
    ) -> EvaluationReport {
        let report = self.pipeline.run(&submission, &stage).await;

        if let Err(e) = self.store.save(&report).await {
            error!(
                application_id = report.application_id,
                "Failed to persist evaluation report: {e}"
            );
        }
        self.forwarder.forward(&report).await;

        report
    }
}
