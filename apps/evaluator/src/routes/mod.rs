pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/applications/submit", post(handlers::handle_submit))
        .route(
            "/api/applications/:id/evaluation-result",
            get(handlers::handle_get_result),
        )
        .route(
            "/api/applications/:id/status",
            get(handlers::handle_get_status),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::pipeline::stage::{EvaluationStage, StageTracker};
    use crate::pipeline::store::ReportStore;
    use crate::testing::{
        evaluation_service, sample_report, MemoryReportStore, RecordingForwarder,
        ScriptedGenerator,
    };

    fn app_with(store: Arc<MemoryReportStore>, tracker: StageTracker) -> Router {
        let service = evaluation_service(
            Arc::new(ScriptedGenerator::new(Vec::new())),
            store.clone(),
            Arc::new(RecordingForwarder::default()),
        );
        build_router(AppState {
            service,
            tracker,
            store,
        })
    }

    fn app() -> Router {
        app_with(Arc::new(MemoryReportStore::default()), StageTracker::new())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    fn submit_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/applications/submit")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_submit_accepts_and_registers() {
        let tracker = StageTracker::new();
        let app = app_with(Arc::new(MemoryReportStore::default()), tracker.clone());

        let response = app
            .oneshot(submit_request(json!({
                "applicantId": 1,
                "applicantName": "Kim",
                "applicationId": 77,
                "jobPostingId": 3,
                "resumeItemAnswers": [
                    {"resumeItemId": 1, "resumeItemName": "학점", "resumeContent": "이공 3.8"}
                ],
                "coverLetterQuestionAnswers": []
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["applicationId"], 77);
        assert!(tracker.get(77).await.is_some());
    }

    #[tokio::test]
    async fn test_submit_without_answers_is_rejected() {
        let response = app()
            .oneshot(submit_request(json!({
                "applicantId": 1,
                "applicantName": "Kim",
                "applicationId": 77,
                "jobPostingId": 3
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_result_before_evaluation() {
        let response = app()
            .oneshot(
                Request::get("/api/applications/5/evaluation-result")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["evaluationResult"].is_null());
    }

    #[tokio::test]
    async fn test_result_returns_latest_report() {
        let store = Arc::new(MemoryReportStore::default());
        store.save(&sample_report(5)).await.unwrap();
        let latest = sample_report(5);
        store.save(&latest).await.unwrap();

        let response = app_with(store, StageTracker::new())
            .oneshot(
                Request::get("/api/applications/5/evaluation-result")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(
            body["evaluationResult"]["evaluationId"],
            latest.evaluation_id.to_string()
        );
        assert_eq!(body["evaluationResult"]["overallAnalysis"]["aiReliability"], 0.0);
    }

    #[tokio::test]
    async fn test_status_unknown_application_is_not_found() {
        let response = app()
            .oneshot(
                Request::get("/api/applications/404/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_reports_stage() {
        let tracker = StageTracker::new();
        tracker
            .register(9)
            .await
            .enter(EvaluationStage::QualGrading)
            .await;

        let response = app_with(Arc::new(MemoryReportStore::default()), tracker)
            .oneshot(
                Request::get("/api/applications/9/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["stage"], "qual_grading");
    }
}
