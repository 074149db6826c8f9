// Knowledge bases: static lookup tables consumed by the quantitative evaluator.
// Loaded once at startup and shared read-only afterwards.

pub mod catalog;
pub mod corpus;

use std::collections::HashMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, info, warn};

pub use catalog::{RuleCatalog, RuleCriterion, RuleStrategy, ScoringRule};

#[derive(Debug, Deserialize)]
struct UniversityRecord {
    name: String,
    group: String,
}

#[derive(Debug, Deserialize)]
struct CertificationRecord {
    name: String,
    #[serde(rename = "type", default)]
    cert_type: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
}

/// University name → prestige group. Keys are matched exactly.
#[derive(Debug, Clone, Default)]
pub struct UniversityKb {
    groups: HashMap<String, String>,
}

impl UniversityKb {
    fn from_records(records: Vec<UniversityRecord>) -> Self {
        let groups = records
            .into_iter()
            .map(|record| (record.name, record.group))
            .collect();
        Self { groups }
    }

    pub fn group_of(&self, university: &str) -> Option<&str> {
        self.groups.get(university).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[cfg(test)]
    pub(crate) fn from_json(raw: &str) -> Self {
        Self::from_records(serde_json::from_str(raw).expect("valid university fixture"))
    }
}

/// Certification name or alias → certification type. Keys are case-folded on
/// insert and on lookup.
#[derive(Debug, Clone, Default)]
pub struct CertificationKb {
    types: HashMap<String, String>,
}

impl CertificationKb {
    fn from_records(records: Vec<CertificationRecord>) -> Self {
        let mut types = HashMap::new();
        for record in records {
            // Certifications without a type can never satisfy a counting rule.
            let Some(cert_type) = record.cert_type.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            types.insert(record.name.trim().to_lowercase(), cert_type.clone());
            for alias in record.aliases {
                types.insert(alias.trim().to_lowercase(), cert_type.clone());
            }
        }
        Self { types }
    }

    pub fn type_of(&self, certification: &str) -> Option<&str> {
        self.types
            .get(&certification.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[cfg(test)]
    pub(crate) fn from_json(raw: &str) -> Self {
        Self::from_records(serde_json::from_str(raw).expect("valid certification fixture"))
    }
}

/// Both lookup tables used by the rule strategies.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBases {
    pub universities: UniversityKb,
    pub certifications: CertificationKb,
}

impl KnowledgeBases {
    /// Loads both tables. A missing or malformed file yields an empty table.
    pub fn load(universities_path: &Path, certifications_path: &Path) -> Self {
        let universities = UniversityKb::from_records(load_lenient(universities_path));
        let certifications = CertificationKb::from_records(load_lenient(certifications_path));
        info!(
            universities = universities.len(),
            certification_aliases = certifications.len(),
            "Knowledge bases loaded"
        );
        Self {
            universities,
            certifications,
        }
    }
}

/// Reads a JSON document, returning `T::default()` when the file is missing or
/// cannot be parsed.
pub(crate) fn load_lenient<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} not found; using an empty table", path.display());
            return T::default();
        }
        Err(e) => {
            error!("Failed to read {}: {e}", path.display());
            return T::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        error!("Failed to parse {}: {e}", path.display());
        T::default()
    })
}
