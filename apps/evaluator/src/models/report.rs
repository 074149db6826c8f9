use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// The final evaluation report for one submission.
///
/// A report is never edited after assembly. Re-evaluating an application produces a
/// new report with a new `evaluation_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub evaluation_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub applicant_id: i64,
    pub applicant_name: String,
    pub applicant_email: String,
    pub application_id: i64,
    pub job_posting_id: i64,
    /// Sum of all resume item scores.
    pub total_score: i64,
    pub resume_evaluations: Vec<ResumeEvaluation>,
    pub cover_letter_question_evaluations: Vec<QuestionEvaluation>,
    pub overall_analysis: OverallAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeEvaluation {
    #[serde(rename = "resumeItemId")]
    pub item_id: i64,
    #[serde(rename = "resumeItemName")]
    pub item_name: String,
    #[serde(rename = "resumeContent")]
    pub content: String,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionEvaluation {
    #[serde(rename = "coverLetterQuestionId")]
    pub question_id: i64,
    pub keywords: Vec<String>,
    pub summary: String,
    pub answer_evaluations: Vec<AnswerEvaluation>,
}

/// One criterion's grade for one cover-letter answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvaluation {
    #[serde(rename = "evaluationCriteriaName")]
    pub criterion_name: String,
    pub grade: String,
    pub evaluated_content: String,
    pub evaluation_reason: String,
}

/// Cross-cutting analysis of the whole application.
///
/// Deserializes directly from model output, so every list defaults to empty and
/// `reliability` is coerced into `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallAnalysis {
    pub overall_evaluation: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(rename = "aiRecommendation", alias = "recommendation", default = "undetermined")]
    pub recommendation: String,
    #[serde(
        rename = "aiReliability",
        alias = "reliability",
        default,
        deserialize_with = "deserialize_reliability"
    )]
    pub reliability: f64,
}

pub const UNDETERMINED_RECOMMENDATION: &str = "undetermined";

fn undetermined() -> String {
    UNDETERMINED_RECOMMENDATION.to_string()
}

impl OverallAnalysis {
    /// Placeholder used when the overall analysis cannot be generated or parsed.
    pub fn fallback() -> Self {
        Self {
            overall_evaluation: "analysis failed".to_string(),
            strengths: Vec::new(),
            improvements: Vec::new(),
            recommendation: undetermined(),
            reliability: 0.0,
        }
    }
}

/// Clamps a reliability value into `[0.0, 1.0]`; non-finite values become 0.0.
pub fn clamp_reliability(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn deserialize_reliability<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
    };
    Ok(clamp_reliability(value))
}
