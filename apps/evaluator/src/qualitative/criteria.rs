//! Qualitative criteria index, keyed by grading bucket.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::knowledge::corpus::CorpusRecord;

/// Number of grading buckets. Cover-letter question ids are folded onto `1..=QUESTION_BUCKETS`.
pub const QUESTION_BUCKETS: i64 = 2;

pub const TOP_GRADE: &str = "EXCELLENT";
const MISSING_DESCRIPTION: &str = "N/A";

/// Folds a cover-letter question id onto a grading bucket: `id mod 2`, with 0
/// remapped to the highest bucket.
pub fn map_question_id(question_id: i64) -> i64 {
    match question_id.rem_euclid(QUESTION_BUCKETS) {
        0 => QUESTION_BUCKETS,
        bucket => bucket,
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GradeDetail {
    pub grade: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct CriterionContent {
    name: String,
    #[serde(default)]
    details: Vec<GradeDetail>,
}

/// One evaluation dimension for a grading bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    /// Stable identity; the record's `packet_id`, else `Q{question_id}_{name}`.
    pub id: String,
    pub name: String,
    pub details: Vec<GradeDetail>,
}

impl Criterion {
    pub fn top_grade_description(&self) -> &str {
        self.details
            .iter()
            .find(|d| d.grade == TOP_GRADE)
            .map(|d| d.description.as_str())
            .unwrap_or(MISSING_DESCRIPTION)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CriteriaIndex {
    buckets: BTreeMap<i64, Vec<Criterion>>,
}

impl CriteriaIndex {
    /// Builds the index from corpus records. Example records are ignored, records
    /// whose content is not a criterion are skipped, and duplicate identities keep
    /// the first occurrence.
    pub fn from_records(records: &[CorpusRecord]) -> Self {
        let mut buckets: BTreeMap<i64, Vec<Criterion>> = BTreeMap::new();
        let mut seen: HashSet<(i64, String)> = HashSet::new();

        for record in records.iter().filter(|r| r.is_criterion()) {
            let content: CriterionContent = match serde_json::from_value(record.content.clone()) {
                Ok(content) => content,
                Err(e) => {
                    warn!(question_id = record.question_id, "Skipping malformed criterion: {e}");
                    continue;
                }
            };

            let bucket = map_question_id(record.question_id);
            let id = record
                .packet_id
                .clone()
                .unwrap_or_else(|| format!("Q{}_{}", record.question_id, content.name));

            if !seen.insert((bucket, id.clone())) {
                debug!(criterion = %id, "Duplicate criterion skipped");
                continue;
            }

            buckets.entry(bucket).or_default().push(Criterion {
                id,
                name: content.name,
                details: content.details,
            });
        }

        Self { buckets }
    }

    pub fn for_question(&self, bucket: i64) -> &[Criterion] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}
