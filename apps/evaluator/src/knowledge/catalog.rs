//! Scoring rule catalog: the ordered rule definitions the quantitative evaluator applies.
//!
//! Unlike the knowledge bases, the catalog is required: without it no resume item
//! can be scored, so every load failure is a `CatalogError`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_JOB_ROLE: &str = "Software Engineer";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("scoring rule catalog not found at {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read scoring rule catalog {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("scoring rule catalog {} is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("duplicate scoring rule name '{0}'")]
    DuplicateRule(String),
}

/// The declared kind of a resume item, as written by the hiring backend.
///
/// Accepts the upper-snake names and the backend's localized labels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RuleType {
    Category,
    NumericRange,
    HoursRange,
    DurationBased,
    RuleBasedCount,
    ScoreRange,
    CareerSimilarity,
    Text,
    Number,
    Date,
    File,
    Select,
    Other(String),
}

impl From<String> for RuleType {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "카테고리" => return RuleType::Category,
            "숫자 범위" => return RuleType::NumericRange,
            "시간 범위" => return RuleType::HoursRange,
            "기간 기반" => return RuleType::DurationBased,
            "규칙 기반 개수" => return RuleType::RuleBasedCount,
            "점수 범위" => return RuleType::ScoreRange,
            "경력 유사도" => return RuleType::CareerSimilarity,
            "텍스트" => return RuleType::Text,
            "숫자" => return RuleType::Number,
            "날짜" => return RuleType::Date,
            "파일" => return RuleType::File,
            _ => {}
        }

        match trimmed.to_uppercase().replace(['_', ' ', '-'], "").as_str() {
            "CATEGORY" => RuleType::Category,
            "NUMERICRANGE" => RuleType::NumericRange,
            "HOURSRANGE" => RuleType::HoursRange,
            "DURATIONBASED" => RuleType::DurationBased,
            "RULEBASEDCOUNT" => RuleType::RuleBasedCount,
            "SCORERANGE" => RuleType::ScoreRange,
            "CAREERSIMILARITY" => RuleType::CareerSimilarity,
            "TEXT" => RuleType::Text,
            "NUMBER" => RuleType::Number,
            "DATE" => RuleType::Date,
            "FILE" => RuleType::File,
            "SELECT" => RuleType::Select,
            _ => RuleType::Other(trimmed.to_string()),
        }
    }
}

/// One gradeable description/score pair within a rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleCriterion {
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "scorePerGrade")]
    pub score_per_grade: i32,
    /// Only meaningful for RULE_BASED_COUNT sub-rules.
    #[serde(default, alias = "maxItems")]
    pub max_items: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringRule {
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default)]
    pub criteria: Vec<RuleCriterion>,
    #[serde(default, alias = "scoreWeight")]
    pub score_weight: Option<i32>,
    #[serde(default, alias = "targetJobRole")]
    pub target_job_role: Option<String>,
    #[serde(default, alias = "similarityThreshold")]
    pub similarity_threshold: Option<f64>,
}

impl ScoringRule {
    /// Whether the rule grades an educational institution (e.g. "학력", "Education").
    pub fn concerns_education(&self) -> bool {
        let lowered = self.name.to_lowercase();
        ["학력", "학교", "education", "university"]
            .iter()
            .any(|marker| lowered.contains(marker))
    }

    pub fn strategy(&self) -> RuleStrategy {
        RuleStrategy::for_rule(self)
    }
}

/// The closed set of scoring strategies. Every rule maps to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStrategy {
    Category,
    NumericRange,
    HoursRange,
    DurationBased,
    RuleBasedCount,
    ScoreRange,
    CareerSimilarity,
    TextMatch,
}

impl RuleStrategy {
    pub fn for_rule(rule: &ScoringRule) -> Self {
        let has_target_role = rule
            .target_job_role
            .as_deref()
            .is_some_and(|role| !role.trim().is_empty());
        if has_target_role {
            return RuleStrategy::CareerSimilarity;
        }

        match rule.rule_type {
            RuleType::Category => RuleStrategy::Category,
            RuleType::NumericRange => RuleStrategy::NumericRange,
            RuleType::HoursRange => RuleStrategy::HoursRange,
            RuleType::DurationBased => RuleStrategy::DurationBased,
            RuleType::RuleBasedCount => RuleStrategy::RuleBasedCount,
            RuleType::ScoreRange => RuleStrategy::ScoreRange,
            RuleType::CareerSimilarity => RuleStrategy::CareerSimilarity,
            RuleType::Text
            | RuleType::Number
            | RuleType::Date
            | RuleType::File
            | RuleType::Select
            | RuleType::Other(_) => RuleStrategy::TextMatch,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CommonRules {
    #[serde(default)]
    job_role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    common_rules: CommonRules,
    resume_items: Vec<ScoringRule>,
}

/// Ordered, name-unique set of scoring rules.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: Vec<ScoringRule>,
    default_job_role: String,
}

impl RuleCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CatalogError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                CatalogError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let document: CatalogDocument =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        let catalog = Self::from_document(document)?;
        info!(
            rules = catalog.rules.len(),
            job_role = %catalog.default_job_role,
            "Scoring rule catalog loaded from {}",
            path.display()
        );
        Ok(catalog)
    }

    pub fn new(rules: Vec<ScoringRule>, default_job_role: Option<String>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(CatalogError::DuplicateRule(rule.name.clone()));
            }
        }

        Ok(Self {
            rules,
            default_job_role: default_job_role
                .filter(|role| !role.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_JOB_ROLE.to_string()),
        })
    }

    fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
        Self::new(document.resume_items, document.common_rules.job_role)
    }

    pub fn rules(&self) -> &[ScoringRule] {
        &self.rules
    }

    /// Target role for career-similarity rules that do not name one.
    pub fn default_job_role(&self) -> &str {
        &self.default_job_role
    }

    /// Names of the rules scored by job-title similarity.
    pub fn career_rules(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.strategy() == RuleStrategy::CareerSimilarity)
            .map(|rule| rule.name.as_str())
            .collect()
    }
}
