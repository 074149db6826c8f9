//! Qualitative evaluator: retrieval-augmented grading of cover-letter answers.
//!
//! Per answer: retrieve reference snippets for the answer's bucket, grade it against
//! every criterion of that bucket, then summarize it. After all answers, one overall
//! analysis over the quantitative scores and the per-question results.
//!
//! Every generation call degrades at the smallest scope: a failed grading drops that
//! one criterion, a failed summary or overall analysis becomes its placeholder.
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::llm_client::{parse_first_object, TextGenerator};
use crate::models::report::{AnswerEvaluation, OverallAnalysis, QuestionEvaluation};
use crate::models::submission::CoverLetterAnswer;
use crate::pipeline::stage::{EvaluationStage, StageHandle};
use crate::quantitative::ScoreMap;
use crate::retrieval::ExampleRetriever;

pub mod criteria;
pub mod prompts;

use criteria::{map_question_id, CriteriaIndex, Criterion};

pub const DEFAULT_TOP_K: usize = 3;
pub const SUMMARY_FAILED: &str = "summary generation failed";

/// Model output for one criterion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GradedExcerpt {
    grade: String,
    #[serde(default)]
    evaluated_content: String,
    #[serde(default)]
    evaluation_reason: String,
}

/// Model output for one answer's summary.
#[derive(Debug, Clone, Deserialize)]
struct QuestionSummary {
    #[serde(default, deserialize_with = "deserialize_keywords")]
    keywords: Vec<String>,
    #[serde(default)]
    summary: String,
}

impl QuestionSummary {
    fn fallback() -> Self {
        Self {
            keywords: Vec::new(),
            summary: SUMMARY_FAILED.to_string(),
        }
    }
}

/// Keywords as a list, or as one comma-separated string.
fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Text(String),
    }

    let keywords = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::List(list)) => list,
        Some(Raw::Text(text)) => text.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    };
    Ok(keywords
        .into_iter()
        .map(|keyword| keyword.trim().to_string())
        .filter(|keyword| !keyword.is_empty())
        .collect())
}

/// Input to the overall analysis prompt.
#[derive(Serialize)]
struct AnalysisInput<'a> {
    #[serde(rename = "quantitativeScores")]
    scores: &'a ScoreMap,
    #[serde(rename = "questionEvaluations")]
    questions: &'a [QuestionEvaluation],
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualitativeOutcome {
    pub questions: Vec<QuestionEvaluation>,
    pub overall: OverallAnalysis,
}

#[derive(Clone)]
pub struct QualitativeEvaluator {
    criteria: Arc<CriteriaIndex>,
    retriever: Arc<dyn ExampleRetriever>,
    generator: Arc<dyn TextGenerator>,
    top_k: usize,
}

impl QualitativeEvaluator {
    pub fn new(
        criteria: Arc<CriteriaIndex>,
        retriever: Arc<dyn ExampleRetriever>,
        generator: Arc<dyn TextGenerator>,
        top_k: usize,
    ) -> Self {
        Self {
            criteria,
            retriever,
            generator,
            top_k,
        }
    }

    pub async fn evaluate(
        &self,
        answers: &[CoverLetterAnswer],
        scores: &ScoreMap,
        stage: &StageHandle,
    ) -> QualitativeOutcome {
        let mut questions = Vec::with_capacity(answers.len());
        for answer in answers {
            questions.push(self.evaluate_answer(answer, stage).await);
        }

        stage.enter(EvaluationStage::OverallAnalyzing).await;
        let overall = self.analyze_overall(scores, &questions).await;

        info!(
            application_id = stage.application_id(),
            questions = questions.len(),
            graded = questions.iter().map(|q| q.answer_evaluations.len()).sum::<usize>(),
            "Qualitative evaluation finished"
        );
        QualitativeOutcome { questions, overall }
    }

    async fn evaluate_answer(
        &self,
        answer: &CoverLetterAnswer,
        stage: &StageHandle,
    ) -> QuestionEvaluation {
        let bucket = map_question_id(answer.question_id);
        let criteria = self.criteria.for_question(bucket);
        debug!(
            question_id = answer.question_id,
            bucket,
            criteria = criteria.len(),
            "Evaluating cover-letter answer"
        );

        stage.enter(EvaluationStage::QualRetrieval).await;
        let examples = match self
            .retriever
            .similar_examples(bucket, &answer.content, self.top_k)
            .await
        {
            Ok(examples) => examples,
            Err(e) => {
                warn!(question_id = answer.question_id, "Example retrieval failed: {e}");
                Vec::new()
            }
        };

        stage.enter(EvaluationStage::QualGrading).await;
        let mut answer_evaluations = Vec::with_capacity(criteria.len());
        for criterion in criteria {
            if let Some(evaluation) = self.grade(answer, criterion, &examples).await {
                answer_evaluations.push(evaluation);
            }
        }

        stage.enter(EvaluationStage::QualSummarizing).await;
        let summary = self
            .ask::<QuestionSummary>(&prompts::question_summary_prompt(&answer.content), "summary")
            .await
            .unwrap_or_else(QuestionSummary::fallback);

        QuestionEvaluation {
            question_id: answer.question_id,
            keywords: summary.keywords,
            summary: summary.summary,
            answer_evaluations,
        }
    }

    async fn grade(
        &self,
        answer: &CoverLetterAnswer,
        criterion: &Criterion,
        examples: &[String],
    ) -> Option<AnswerEvaluation> {
        let prompt = prompts::item_evaluation_prompt(
            &answer.content,
            &criterion.name,
            criterion.top_grade_description(),
            examples,
        );
        debug!(criterion = %criterion.id, "Grading answer");
        let excerpt = self.ask::<GradedExcerpt>(&prompt, &criterion.name).await?;

        Some(AnswerEvaluation {
            criterion_name: criterion.name.clone(),
            grade: excerpt.grade,
            evaluated_content: excerpt.evaluated_content,
            evaluation_reason: excerpt.evaluation_reason,
        })
    }

    async fn analyze_overall(
        &self,
        scores: &ScoreMap,
        questions: &[QuestionEvaluation],
    ) -> OverallAnalysis {
        let input = AnalysisInput { scores, questions };
        let report = match serde_json::to_string_pretty(&input) {
            Ok(report) => report,
            Err(e) => {
                warn!("Failed to serialize analysis input: {e}");
                json!({}).to_string()
            }
        };

        self.ask::<OverallAnalysis>(&prompts::overall_analysis_prompt(&report), "overall analysis")
            .await
            .unwrap_or_else(OverallAnalysis::fallback)
    }

    /// One generation call parsed into `T`; `None` (with a warning) on any failure.
    async fn ask<T: DeserializeOwned>(&self, prompt: &str, purpose: &str) -> Option<T> {
        let output = match self.generator.generate(prompt).await {
            Ok(output) => output,
            Err(e) => {
                warn!(purpose, "Generation failed: {e}");
                return None;
            }
        };

        match parse_first_object::<T>(&output) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(purpose, "Unparseable generation output: {e}");
                None
            }
        }
    }
}
