use std::sync::Arc;

use crate::pipeline::stage::StageTracker;
use crate::pipeline::store::ReportStore;
use crate::pipeline::EvaluationService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub service: EvaluationService,
    pub tracker: StageTracker,
    /// Same store the service writes to; read by the result endpoint.
    pub store: Arc<dyn ReportStore>,
}
