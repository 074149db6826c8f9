//! Quantitative evaluator: applies the rule catalog to one applicant's resume answers.
//!
//! Scores are produced per rule name. A rule with no matching answer, or whose
//! strategy hits a data gap, scores 0 and evaluation moves on. The generation
//! service is never consulted here; only career-similarity rules touch the embedder.
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::knowledge::{KnowledgeBases, RuleCatalog, RuleStrategy, ScoringRule};
use crate::models::submission::ResumeAnswer;
use crate::retrieval::{cosine_similarity, Embedder};

pub mod extract;
pub mod strategies;

use extract::CareerEntry;
use strategies::{highest_qualifying_tier, ScoreGap, StrategyResult};

/// Rule name → score.
pub type ScoreMap = BTreeMap<String, i32>;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
pub const CAREER_PENALTY_CEILING: i32 = 8;

#[derive(Clone)]
pub struct QuantitativeEvaluator {
    catalog: Arc<RuleCatalog>,
    knowledge: Arc<KnowledgeBases>,
    embedder: Arc<dyn Embedder>,
}

impl QuantitativeEvaluator {
    pub fn new(
        catalog: Arc<RuleCatalog>,
        knowledge: Arc<KnowledgeBases>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            catalog,
            knowledge,
            embedder,
        }
    }

    /// Scores every catalog rule against the answers. Never fails.
    pub async fn evaluate(&self, answers: &[ResumeAnswer]) -> ScoreMap {
        let mut scores = ScoreMap::new();

        for rule in self.catalog.rules() {
            let Some(answer) = answers.iter().find(|a| a.item_name == rule.name) else {
                debug!(rule = %rule.name, "No answer for rule; scoring 0");
                scores.insert(rule.name.clone(), 0);
                continue;
            };

            let score = match self.score_rule(rule, answer).await {
                Ok(score) => score,
                Err(gap) => {
                    debug!(rule = %rule.name, item_id = answer.item_id, "Scoring 0: {gap}");
                    0
                }
            };
            scores.insert(rule.name.clone(), score);
        }

        scores
    }

    async fn score_rule(&self, rule: &ScoringRule, answer: &ResumeAnswer) -> StrategyResult {
        match rule.strategy() {
            RuleStrategy::Category => {
                strategies::score_category(rule, answer, &self.knowledge.universities)
            }
            RuleStrategy::NumericRange => strategies::score_numeric_range(rule, answer),
            RuleStrategy::HoursRange => strategies::score_hours_range(rule, answer),
            RuleStrategy::DurationBased => strategies::score_duration(rule, answer),
            RuleStrategy::RuleBasedCount => {
                strategies::score_rule_based_count(rule, answer, &self.knowledge.certifications)
            }
            RuleStrategy::ScoreRange => strategies::score_score_range(rule, answer),
            RuleStrategy::CareerSimilarity => self.score_career(rule, answer).await,
            RuleStrategy::TextMatch => strategies::score_text_match(rule, answer),
        }
    }

    /// Duration tier of a "company, title, duration" entry, halved and capped when the
    /// title is not similar enough to the target role.
    async fn score_career(&self, rule: &ScoringRule, answer: &ResumeAnswer) -> StrategyResult {
        let text = answer.text().trim();
        if text.is_empty() {
            return Err(ScoreGap::EmptyAnswer);
        }

        let entry = CareerEntry::parse(text);
        let target_role = rule
            .target_job_role
            .as_deref()
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .unwrap_or_else(|| self.catalog.default_job_role());

        let tier = highest_qualifying_tier(entry.duration_months, &rule.criteria).unwrap_or(0);
        let similarity = self.job_similarity(&entry.title, target_role).await;
        let threshold = rule
            .similarity_threshold
            .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);

        debug!(
            rule = %rule.name,
            company = %entry.company,
            title = %entry.title,
            target_role,
            similarity,
            months = entry.duration_months,
            "Career similarity computed"
        );

        if similarity < threshold {
            Ok(penalized(tier))
        } else {
            Ok(tier)
        }
    }

    async fn job_similarity(&self, title: &str, target_role: &str) -> f64 {
        if title.trim().is_empty() || target_role.trim().is_empty() {
            return 0.0;
        }

        match self
            .embedder
            .embed(&[title.to_string(), target_role.to_string()])
            .await
        {
            Ok(vectors) if vectors.len() == 2 => cosine_similarity(&vectors[0], &vectors[1]),
            Ok(vectors) => {
                warn!("Embedder returned {} vectors for 2 inputs", vectors.len());
                0.0
            }
            Err(e) => {
                warn!("Job title embedding failed, treating as dissimilar: {e}");
                0.0
            }
        }
    }
}

/// Half the tier score, never above the ceiling.
pub fn penalized(tier: i32) -> i32 {
    (tier / 2).min(CAREER_PENALTY_CEILING)
}
