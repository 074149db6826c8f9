//! Report persistence.
//!
//! Reports are append-only: saving a re-evaluation adds a new revision and moves the
//! "latest" pointer, it never rewrites an earlier revision.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::report::EvaluationReport;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to publish latest report: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save(&self, report: &EvaluationReport) -> Result<(), StoreError>;

    async fn latest(&self, application_id: i64) -> Result<Option<EvaluationReport>, StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// File store
// ────────────────────────────────────────────────────────────────────────────

/// `application_{id}_{unix_ts}.json` revisions plus an `application_{id}_latest.json`
/// copy of the newest one by `evaluated_at`.
#[derive(Debug, Clone)]
pub struct FileReportStore {
    dir: PathBuf,
    /// Serializes the compare-and-replace of latest files.
    publish: Arc<Mutex<()>>,
}

impl FileReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            publish: Arc::new(Mutex::new(())),
        }
    }

    fn latest_path(&self, application_id: i64) -> PathBuf {
        self.dir
            .join(format!("application_{application_id}_latest.json"))
    }

    fn revision_path(&self, application_id: i64, timestamp: i64) -> PathBuf {
        self.dir
            .join(format!("application_{application_id}_{timestamp}.json"))
    }

    fn write_blocking(&self, report: &EvaluationReport, body: &[u8]) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let revision = self.unused_revision_path(report);
        std::fs::write(&revision, body)?;

        let latest_path = self.latest_path(report.application_id);
        let _guard = self.publish.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // An unreadable latest file is replaced.
        if let Ok(Some(current)) = read_report(&latest_path) {
            if current.evaluated_at > report.evaluated_at {
                warn!(
                    application_id = report.application_id,
                    evaluation_id = %report.evaluation_id,
                    "Newer report already published; keeping it as latest"
                );
                return Ok(revision);
            }
        }

        // Readers never observe a half-written latest file.
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(body)?;
        temp.as_file().sync_all()?;
        temp.persist(latest_path)?;

        Ok(revision)
    }

    /// Two evaluations finishing within the same second get distinct revision files.
    fn unused_revision_path(&self, report: &EvaluationReport) -> PathBuf {
        let mut timestamp = report.evaluated_at.timestamp();
        loop {
            let path = self.revision_path(report.application_id, timestamp);
            if !path.exists() {
                return path;
            }
            timestamp += 1;
        }
    }
}

fn read_report(path: &Path) -> Result<Option<EvaluationReport>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn save(&self, report: &EvaluationReport) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(report)?;
        let store = self.clone();
        let report = report.clone();

        let revision =
            tokio::task::spawn_blocking(move || store.write_blocking(&report, &body)).await??;

        info!("Evaluation report saved to {}", revision.display());
        Ok(())
    }

    async fn latest(&self, application_id: i64) -> Result<Option<EvaluationReport>, StoreError> {
        let path = self.latest_path(application_id);
        tokio::task::spawn_blocking(move || read_report(&path)).await?
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres store
// ────────────────────────────────────────────────────────────────────────────

/// Append-only `evaluation_results` table; the newest row per application is the latest.
#[derive(Debug, Clone)]
pub struct PgReportStore {
    db: PgPool,
}

impl PgReportStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn save(&self, report: &EvaluationReport) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO evaluation_results (id, application_id, applicant_id, report, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(report.evaluation_id)
        .bind(report.application_id)
        .bind(report.applicant_id)
        .bind(Json(report))
        .bind(report.evaluated_at)
        .execute(&self.db)
        .await?;

        info!(
            application_id = report.application_id,
            evaluation_id = %report.evaluation_id,
            "Evaluation report stored"
        );
        Ok(())
    }

    async fn latest(&self, application_id: i64) -> Result<Option<EvaluationReport>, StoreError> {
        let row: Option<(Json<EvaluationReport>,)> = sqlx::query_as(
            "SELECT report FROM evaluation_results
             WHERE application_id = $1
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(application_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(Json(report),)| report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_report;

    #[tokio::test]
    async fn test_latest_is_none_before_first_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReportStore::new(dir.path());
        assert!(store.latest(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_writes_revision_and_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReportStore::new(dir.path().join("results"));
        let report = sample_report(42);

        store.save(&report).await.unwrap();

        let revision = dir
            .path()
            .join("results")
            .join(format!("application_42_{}.json", report.evaluated_at.timestamp()));
        assert!(revision.exists());
        assert_eq!(store.latest(42).await.unwrap(), Some(report));
    }

    #[tokio::test]
    async fn test_revisions_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReportStore::new(dir.path());
        let first = sample_report(42);
        let mut second = sample_report(42);
        second.evaluated_at = first.evaluated_at;
        second.total_score = first.total_score + 1;

        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        let revisions = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| !entry.file_name().to_string_lossy().ends_with("_latest.json"))
            .count();
        assert_eq!(revisions, 2);
        assert_eq!(store.latest(42).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_late_older_report_does_not_replace_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReportStore::new(dir.path());
        let newer = sample_report(42);
        let mut older = sample_report(42);
        older.evaluated_at = newer.evaluated_at - chrono::Duration::seconds(30);

        store.save(&newer).await.unwrap();
        store.save(&older).await.unwrap();

        let latest = store.latest(42).await.unwrap().unwrap();
        assert_eq!(latest.evaluation_id, newer.evaluation_id);
        assert!(
            dir.path()
                .join(format!("application_42_{}.json", older.evaluated_at.timestamp()))
                .exists(),
            "the older revision is still recorded"
        );
    }

    #[tokio::test]
    async fn test_corrupt_latest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReportStore::new(dir.path());
        std::fs::write(dir.path().join("application_9_latest.json"), "{broken").unwrap();
        assert!(matches!(store.latest(9).await, Err(StoreError::Serde(_))));
    }
}
