//! Fakes for the collaborator traits, shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::knowledge::corpus::CorpusRecord;
use crate::knowledge::{KnowledgeBases, RuleCatalog, ScoringRule};
use crate::llm_client::{LlmError, TextGenerator};
use crate::models::report::{EvaluationReport, OverallAnalysis};
use crate::pipeline::forward::ReportForwarder;
use crate::pipeline::store::{ReportStore, StoreError};
use crate::pipeline::{EvaluationPipeline, EvaluationService};
use crate::qualitative::criteria::CriteriaIndex;
use crate::qualitative::{QualitativeEvaluator, DEFAULT_TOP_K};
use crate::quantitative::QuantitativeEvaluator;
use crate::retrieval::{EmbeddingError, ExampleRetriever, HashEmbedder};

/// Replies with canned outputs in order; fails with `EmptyContent` once exhausted.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(str::to_string).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn initialize(&self) -> Result<(), LlmError> {
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(LlmError::EmptyContent)
    }

    async fn shutdown(&self) {}
}

/// Returns the same snippets for every query.
pub struct StaticRetriever {
    examples: Vec<String>,
}

impl StaticRetriever {
    pub fn new(examples: Vec<String>) -> Self {
        Self { examples }
    }
}

#[async_trait]
impl ExampleRetriever for StaticRetriever {
    async fn similar_examples(
        &self,
        _bucket: i64,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<String>, EmbeddingError> {
        Ok(self.examples.iter().take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub struct MemoryReportStore {
    reports: Mutex<HashMap<i64, Vec<EvaluationReport>>>,
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn save(&self, report: &EvaluationReport) -> Result<(), StoreError> {
        self.reports
            .lock()
            .unwrap()
            .entry(report.application_id)
            .or_default()
            .push(report.clone());
        Ok(())
    }

    async fn latest(&self, application_id: i64) -> Result<Option<EvaluationReport>, StoreError> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .get(&application_id)
            .and_then(|reports| reports.last().cloned()))
    }
}

#[derive(Default)]
pub struct RecordingForwarder {
    forwarded: Mutex<Vec<Uuid>>,
}

impl RecordingForwarder {
    pub fn forwarded(&self) -> Vec<Uuid> {
        self.forwarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportForwarder for RecordingForwarder {
    async fn forward(&self, report: &EvaluationReport) {
        self.forwarded.lock().unwrap().push(report.evaluation_id);
    }
}

/// Two rules (`학력` CATEGORY, `학점` NUMERIC_RANGE) and one criterion per bucket.
pub fn evaluation_service(
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn ReportStore>,
    forwarder: Arc<dyn ReportForwarder>,
) -> EvaluationService {
    let rules: Vec<ScoringRule> = serde_json::from_value(serde_json::json!([
        {"name": "학력", "type": "CATEGORY", "criteria": [
            {"description": "SKY", "score_per_grade": 20}
        ]},
        {"name": "학점", "type": "NUMERIC_RANGE", "criteria": [
            {"description": "이공≥3.5", "score_per_grade": 10},
            {"description": "이공<3.5", "score_per_grade": 3}
        ]}
    ]))
    .unwrap();
    let catalog = RuleCatalog::new(rules, None).unwrap();

    let records: Vec<CorpusRecord> = serde_json::from_value(serde_json::json!([
        {"type": "criterion", "question_id": 1, "content": {"name": "지원동기", "details": []}},
        {"type": "criterion", "question_id": 2, "content": {"name": "문제해결", "details": []}}
    ]))
    .unwrap();

    let quantitative = QuantitativeEvaluator::new(
        Arc::new(catalog),
        Arc::new(KnowledgeBases::default()),
        Arc::new(HashEmbedder::default()),
    );
    let qualitative = QualitativeEvaluator::new(
        Arc::new(CriteriaIndex::from_records(&records)),
        Arc::new(StaticRetriever::new(Vec::new())),
        generator,
        DEFAULT_TOP_K,
    );

    EvaluationService::new(
        EvaluationPipeline::new(quantitative, qualitative),
        store,
        forwarder,
    )
}

pub fn sample_report(application_id: i64) -> EvaluationReport {
    EvaluationReport {
        evaluation_id: Uuid::new_v4(),
        evaluated_at: Utc::now(),
        applicant_id: 1,
        applicant_name: "Kim".to_string(),
        applicant_email: "kim@example.com".to_string(),
        application_id,
        job_posting_id: 3,
        total_score: 12,
        resume_evaluations: Vec::new(),
        cover_letter_question_evaluations: Vec::new(),
        overall_analysis: OverallAnalysis::fallback(),
    }
}
