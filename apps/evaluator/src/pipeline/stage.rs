//! Per-application evaluation stage registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Where an application's evaluation currently is. Stages only move forward; a
/// failing stage substitutes its fallback output and still advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStage {
    Idle,
    QuantScoring,
    QualRetrieval,
    QualGrading,
    QualSummarizing,
    OverallAnalyzing,
    Done,
}

/// Most applications kept before finished ones are evicted.
pub const DEFAULT_TRACKER_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct StageEntry {
    run: u64,
    stage: EvaluationStage,
}

/// Shared map of application id → current stage of its most recent run.
///
/// Once the map reaches capacity, registering an unseen application first drops
/// every `Done` entry. In-flight runs are never evicted.
#[derive(Debug, Clone)]
pub struct StageTracker {
    stages: Arc<RwLock<HashMap<i64, StageEntry>>>,
    next_run: Arc<AtomicU64>,
    capacity: usize,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRACKER_CAPACITY)
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stages: Arc::new(RwLock::new(HashMap::new())),
            next_run: Arc::new(AtomicU64::new(1)),
            capacity,
        }
    }

    /// Starts a new run for an application at `Idle`. Handles from earlier runs of
    /// the same application stop recording.
    pub async fn register(&self, application_id: i64) -> StageHandle {
        let run = self.next_run.fetch_add(1, Ordering::Relaxed);
        let mut stages = self.stages.write().await;

        if stages.len() >= self.capacity && !stages.contains_key(&application_id) {
            let before = stages.len();
            stages.retain(|_, entry| entry.stage != EvaluationStage::Done);
            debug!(evicted = before - stages.len(), "Evicted finished applications");
        }

        stages.insert(
            application_id,
            StageEntry {
                run,
                stage: EvaluationStage::Idle,
            },
        );

        StageHandle {
            application_id,
            run,
            tracker: Some(self.clone()),
        }
    }

    pub async fn get(&self, application_id: i64) -> Option<EvaluationStage> {
        self.stages
            .read()
            .await
            .get(&application_id)
            .map(|entry| entry.stage)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.stages.read().await.len()
    }
}

/// Write side of the tracker for one run of one application.
#[derive(Debug, Clone)]
pub struct StageHandle {
    application_id: i64,
    run: u64,
    tracker: Option<StageTracker>,
}

impl StageHandle {
    /// A handle that records nothing.
    #[cfg(test)]
    pub fn detached(application_id: i64) -> Self {
        Self {
            application_id,
            run: 0,
            tracker: None,
        }
    }

    pub fn application_id(&self) -> i64 {
        self.application_id
    }

    pub async fn enter(&self, stage: EvaluationStage) {
        debug!(application_id = self.application_id, run = self.run, ?stage, "Entering stage");
        let Some(tracker) = &self.tracker else {
            return;
        };
        let mut stages = tracker.stages.write().await;
        // A newer run of the same application supersedes this handle.
        if let Some(entry) = stages
            .get_mut(&self.application_id)
            .filter(|entry| entry.run == self.run)
        {
            if stage > entry.stage {
                entry.stage = stage;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_starts_idle() {
        let tracker = StageTracker::new();
        tracker.register(7).await;
        assert_eq!(tracker.get(7).await, Some(EvaluationStage::Idle));
        assert_eq!(tracker.get(8).await, None);
    }

    #[tokio::test]
    async fn test_stages_only_move_forward() {
        let tracker = StageTracker::new();
        let handle = tracker.register(7).await;

        handle.enter(EvaluationStage::QualGrading).await;
        handle.enter(EvaluationStage::QualRetrieval).await;
        assert_eq!(tracker.get(7).await, Some(EvaluationStage::QualGrading));

        handle.enter(EvaluationStage::Done).await;
        assert_eq!(tracker.get(7).await, Some(EvaluationStage::Done));
    }

    #[tokio::test]
    async fn test_register_resets_a_finished_application() {
        let tracker = StageTracker::new();
        tracker.register(7).await.enter(EvaluationStage::Done).await;
        tracker.register(7).await;
        assert_eq!(tracker.get(7).await, Some(EvaluationStage::Idle));
    }

    #[tokio::test]
    async fn test_superseded_run_does_not_overwrite_resubmission() {
        let tracker = StageTracker::new();
        let first = tracker.register(7).await;
        first.enter(EvaluationStage::QualGrading).await;

        let second = tracker.register(7).await;
        second.enter(EvaluationStage::QuantScoring).await;
        first.enter(EvaluationStage::Done).await;

        assert_eq!(tracker.get(7).await, Some(EvaluationStage::QuantScoring));

        second.enter(EvaluationStage::QualRetrieval).await;
        assert_eq!(tracker.get(7).await, Some(EvaluationStage::QualRetrieval));
    }

    #[tokio::test]
    async fn test_full_tracker_evicts_only_finished_applications() {
        let tracker = StageTracker::with_capacity(2);
        tracker.register(1).await.enter(EvaluationStage::Done).await;
        tracker.register(2).await.enter(EvaluationStage::QualGrading).await;

        tracker.register(3).await;

        assert_eq!(tracker.len().await, 2);
        assert_eq!(tracker.get(1).await, None, "finished run is evicted");
        assert_eq!(tracker.get(2).await, Some(EvaluationStage::QualGrading));
        assert_eq!(tracker.get(3).await, Some(EvaluationStage::Idle));
    }

    #[tokio::test]
    async fn test_resubmission_at_capacity_keeps_other_entries() {
        let tracker = StageTracker::with_capacity(2);
        tracker.register(1).await.enter(EvaluationStage::Done).await;
        tracker.register(2).await.enter(EvaluationStage::Done).await;

        tracker.register(2).await;

        assert_eq!(tracker.get(1).await, Some(EvaluationStage::Done));
        assert_eq!(tracker.get(2).await, Some(EvaluationStage::Idle));
    }

    #[tokio::test]
    async fn test_detached_handle_records_nothing() {
        let handle = StageHandle::detached(3);
        handle.enter(EvaluationStage::Done).await;
        assert_eq!(handle.application_id(), 3);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let value = serde_json::to_value(EvaluationStage::OverallAnalyzing).unwrap();
        assert_eq!(value, "overall_analyzing");
    }
}
