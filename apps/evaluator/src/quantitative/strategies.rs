//! One scoring function per rule strategy.
//!
//! Each function returns either a score or the `ScoreGap` explaining why the answer
//! could not be scored. Gaps never escape the evaluator; they become 0.

use thiserror::Error;

use crate::knowledge::{CertificationKb, RuleCriterion, ScoringRule, UniversityKb};
use crate::models::submission::ResumeAnswer;
use crate::quantitative::extract::{
    first_integer, institution_name, major_and_score, major_threshold, months, split_items,
    tokens,
};

/// Separator between alternative category labels in a criterion description.
const CATEGORY_SEPARATOR: char = '·';

/// Why an answer produced no score for a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreGap {
    #[error("answer is empty")]
    EmptyAnswer,

    #[error("no institution name found in answer")]
    NoInstitution,

    #[error("institution '{0}' is not in the university knowledge base")]
    UnknownInstitution(String),

    #[error("category '{0}' matches no criterion")]
    UnmatchedCategory(String),

    #[error("no major/score pair found in answer")]
    NoMajorScore,

    #[error("no number found in answer")]
    NoNumber,

    #[error("no criterion matched")]
    NoCriterionMatch,
}

pub type StrategyResult = Result<i32, ScoreGap>;

/// CATEGORY: explicit category, else institution → group, else description containment.
pub fn score_category(
    rule: &ScoringRule,
    answer: &ResumeAnswer,
    universities: &UniversityKb,
) -> StrategyResult {
    let text = answer.text();

    let resolved = match answer.category() {
        Some(category) => Ok(category.to_string()),
        None if rule.concerns_education() => resolve_institution_group(text, universities),
        None => Err(ScoreGap::NoCriterionMatch),
    };

    match resolved {
        Ok(category) => match_category(&category, &rule.criteria)
            .ok_or(ScoreGap::UnmatchedCategory(category)),
        Err(gap) => match_contained_description(text, &rule.criteria).ok_or(gap),
    }
}

fn resolve_institution_group(text: &str, universities: &UniversityKb) -> Result<String, ScoreGap> {
    let name = institution_name(text).ok_or(ScoreGap::NoInstitution)?;
    universities
        .group_of(name)
        .map(str::to_string)
        .ok_or_else(|| ScoreGap::UnknownInstitution(name.to_string()))
}

/// Verbatim match, or membership in a "·"-delimited list of alternatives.
fn match_category(category: &str, criteria: &[RuleCriterion]) -> Option<i32> {
    criteria
        .iter()
        .find(|c| {
            c.description == category
                || c.description
                    .split(CATEGORY_SEPARATOR)
                    .any(|alternative| alternative.trim() == category)
        })
        .map(|c| c.score_per_grade)
}

fn match_contained_description(text: &str, criteria: &[RuleCriterion]) -> Option<i32> {
    criteria
        .iter()
        .find(|c| {
            let description = c.description.trim();
            !description.is_empty() && text.contains(description)
        })
        .map(|c| c.score_per_grade)
}

/// NUMERIC_RANGE: first criterion whose `<major> <op> <threshold>` holds for the answer.
pub fn score_numeric_range(rule: &ScoringRule, answer: &ResumeAnswer) -> StrategyResult {
    let (major, score) = major_and_score(answer.text()).ok_or(ScoreGap::NoMajorScore)?;

    rule.criteria
        .iter()
        .find(|c| major_threshold(&c.description, major).is_some_and(|cmp| cmp.holds(score)))
        .map(|c| c.score_per_grade)
        .ok_or(ScoreGap::NoCriterionMatch)
}

/// HOURS_RANGE: first integer in the answer against the threshold tiers.
pub fn score_hours_range(rule: &ScoringRule, answer: &ResumeAnswer) -> StrategyResult {
    let hours = first_integer(answer.text()).ok_or(ScoreGap::NoNumber)?;
    highest_qualifying_tier(hours, &rule.criteria).ok_or(ScoreGap::NoCriterionMatch)
}

/// DURATION_BASED: month count in the answer against the threshold tiers.
pub fn score_duration(rule: &ScoringRule, answer: &ResumeAnswer) -> StrategyResult {
    let text = answer.text().trim();
    if text.is_empty() {
        return Err(ScoreGap::EmptyAnswer);
    }
    let months = months(text).ok_or(ScoreGap::NoNumber)?;
    highest_qualifying_tier(months, &rule.criteria).ok_or(ScoreGap::NoCriterionMatch)
}

/// Score of the highest threshold not exceeding `value`.
///
/// Thresholds are the first integer of each criterion description; criteria without
/// one are not tiers. Equal thresholds keep catalog order.
pub fn highest_qualifying_tier(value: i64, criteria: &[RuleCriterion]) -> Option<i32> {
    let mut tiers: Vec<(i64, i32)> = criteria
        .iter()
        .filter_map(|c| first_integer(&c.description).map(|t| (t, c.score_per_grade)))
        .collect();
    tiers.sort_by(|a, b| b.0.cmp(&a.0));

    tiers
        .into_iter()
        .find(|(threshold, _)| value >= *threshold)
        .map(|(_, score)| score)
}

/// RULE_BASED_COUNT: per sub-rule, count recognised items of the target type, capped,
/// then cap the sum at the rule's weight.
pub fn score_rule_based_count(
    rule: &ScoringRule,
    answer: &ResumeAnswer,
    certifications: &CertificationKb,
) -> StrategyResult {
    let items = split_items(answer.text());
    if items.is_empty() {
        return Err(ScoreGap::EmptyAnswer);
    }

    let mut total: i64 = 0;
    for sub_rule in &rule.criteria {
        let count = items
            .iter()
            .filter(|item| {
                certifications
                    .type_of(item)
                    .is_some_and(|cert_type| sub_rule.description.contains(cert_type))
            })
            .count();
        let counted = match sub_rule.max_items {
            Some(max) => count.min(max as usize),
            None => count,
        };
        total += counted as i64 * i64::from(sub_rule.score_per_grade);
    }

    if let Some(weight) = rule.score_weight {
        total = total.min(i64::from(weight));
    }
    Ok(total.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

/// SCORE_RANGE: every applicant token must appear among the criterion's tokens.
pub fn score_score_range(rule: &ScoringRule, answer: &ResumeAnswer) -> StrategyResult {
    let applicant_tokens = tokens(answer.text());
    if applicant_tokens.is_empty() {
        return Err(ScoreGap::EmptyAnswer);
    }

    rule.criteria
        .iter()
        .find(|c| {
            let criterion_tokens = tokens(&c.description);
            applicant_tokens
                .iter()
                .all(|token| criterion_tokens.contains(token))
        })
        .map(|c| c.score_per_grade)
        .ok_or(ScoreGap::NoCriterionMatch)
}

/// Generic fallback: description containment, else the first criterion as a baseline.
pub fn score_text_match(rule: &ScoringRule, answer: &ResumeAnswer) -> StrategyResult {
    let content = answer.display_content();
    if content.is_empty() {
        return Err(ScoreGap::EmptyAnswer);
    }

    let lowered = content.to_lowercase();
    let matched = rule.criteria.iter().find(|c| {
        let description = c.description.trim();
        !description.is_empty() && lowered.contains(&description.to_lowercase())
    });

    Ok(matched
        .or_else(|| rule.criteria.first())
        .map(|c| c.score_per_grade)
        .unwrap_or(0))
}
