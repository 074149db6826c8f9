//! Criteria/example corpus: the records behind qualitative grading.
//!
//! One JSON array holds two kinds of record, told apart by `type`:
//! `criterion` (an evaluation dimension for a question bucket) and
//! `example_sentence` (a reference snippet for retrieval).

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::load_lenient;

pub const CRITERION_RECORD: &str = "criterion";
pub const EXAMPLE_RECORD: &str = "example_sentence";

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub question_id: i64,
    #[serde(default)]
    pub packet_id: Option<String>,
    #[serde(default)]
    pub content: Value,
}

impl CorpusRecord {
    pub fn is_criterion(&self) -> bool {
        self.kind == CRITERION_RECORD
    }

    /// Reference text of an example record, from either `content` or `content.text`.
    pub fn example_text(&self) -> Option<&str> {
        if self.kind != EXAMPLE_RECORD {
            return None;
        }
        let text = match &self.content {
            Value::String(s) => s.as_str(),
            Value::Object(map) => map.get("text").and_then(Value::as_str)?,
            _ => return None,
        };
        let text = text.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Loads the corpus; a missing or malformed file yields no records.
pub fn load_corpus(path: &Path) -> Vec<CorpusRecord> {
    let records: Vec<CorpusRecord> = load_lenient(path);
    info!(
        records = records.len(),
        "Criteria corpus loaded from {}",
        path.display()
    );
    records
}
