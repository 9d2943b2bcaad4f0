//! Operational HTTP surface.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use statement_service::services::{init_metrics, InMemoryStore, StatementStore};
use statement_service::startup::{operational_router, Application};
use std::sync::Arc;
use tower::ServiceExt;

fn router() -> axum::Router {
    let store: Arc<dyn StatementStore> = Arc::new(InMemoryStore::new());
    operational_router(store)
}

#[tokio::test]
async fn health_reports_ok_with_reachable_store() {
    common::init_tracing();

    let response = router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "statement-service");
}

#[tokio::test]
async fn readiness_and_metrics_are_served() {
    init_metrics();

    let ready = router()
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);

    let metrics = router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    let body = to_bytes(metrics.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("statement_reports_generated_total"));
}

#[tokio::test]
async fn application_binds_an_ephemeral_port() {
    let app = Application::with_store(
        0,
        Arc::new(InMemoryStore::new()),
        Default::default(),
    )
    .await
    .unwrap();

    assert_ne!(app.http_port(), 0);
    assert!(app.service().store().health_check().await.is_ok());
}
