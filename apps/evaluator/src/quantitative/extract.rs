//! Free-text extraction heuristics used by the rule strategies.
//!
//! Every function here is pure. These patterns are where silent mis-scoring comes
//! from, so each one is pinned down by its own tests.

use std::sync::OnceLock;

use regex::Regex;

fn institution_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+대학교|\w+대)").expect("valid institution regex"))
}

fn major_score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(이공|인문)\s*(\d+(?:\.\d+)?)").expect("valid major score regex")
    })
}

fn major_threshold_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(이공|인문)\s*(>=|<=|≥|≤|<|>)\s*(\d+(?:\.\d+)?)")
            .expect("valid major threshold regex")
    })
}

fn integer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid integer regex"))
}

fn months_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*(?:개월|months?\b)").expect("valid months regex"))
}

/// First institution name with a university-style suffix, e.g. "서울대학교" or "연세대".
pub fn institution_name(text: &str) -> Option<&str> {
    institution_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `(major, score)` from text such as "이공 3.8" or "인문4.1".
pub fn major_and_score(text: &str) -> Option<(&str, f64)> {
    let caps = major_score_regex().captures(text)?;
    let major = caps.get(1)?.as_str();
    let score = caps.get(2)?.as_str().parse::<f64>().ok()?;
    Some((major, score))
}

/// A comparison parsed out of a criterion description such as "이공≥3.5".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    AtLeast(f64),
    Above(f64),
    AtMost(f64),
    Below(f64),
}

impl Comparison {
    pub fn holds(&self, value: f64) -> bool {
        match *self {
            Comparison::AtLeast(t) => value >= t,
            Comparison::Above(t) => value > t,
            Comparison::AtMost(t) => value <= t,
            Comparison::Below(t) => value < t,
        }
    }
}

/// Parses `<major> <op> <threshold>` out of a criterion description. Returns `None`
/// when the description does not mention `major` followed by an operator.
pub fn major_threshold(description: &str, major: &str) -> Option<Comparison> {
    let caps = major_threshold_regex()
        .captures_iter(description)
        .find(|caps| caps.get(1).is_some_and(|m| m.as_str() == major))?;
    let threshold = caps.get(3)?.as_str().parse::<f64>().ok()?;
    match caps.get(2)?.as_str() {
        "≥" | ">=" => Some(Comparison::AtLeast(threshold)),
        ">" => Some(Comparison::Above(threshold)),
        "≤" | "<=" => Some(Comparison::AtMost(threshold)),
        "<" => Some(Comparison::Below(threshold)),
        _ => None,
    }
}

/// First run of digits in the text.
pub fn first_integer(text: &str) -> Option<i64> {
    integer_regex().find(text)?.as_str().parse().ok()
}

/// Number immediately preceding a month unit, e.g. "14개월" or "14 months".
pub fn months(text: &str) -> Option<i64> {
    months_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Comma-separated item names, lower-cased and trimmed. Blank items are dropped.
pub fn split_items(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-insensitive whitespace tokens.
pub fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// A career entry written as "company, title, duration".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareerEntry {
    pub company: String,
    pub title: String,
    pub duration_months: i64,
}

impl CareerEntry {
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split(',').map(str::trim);
        let company = parts.next().unwrap_or_default().to_string();
        let title = parts.next().unwrap_or_default().to_string();
        let duration_months = parts.next().and_then(first_integer).unwrap_or(0);
        Self {
            company,
            title,
            duration_months,
        }
    }
}
