//! API endpoint tests

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use kiosk_gateway::api::ApiServer;

mod common;
use common::{fast_tuning, make_orchestrator, FixedIdentity, RecordingReply, ScriptedSpeech};

/// Build a router over inert engines
fn build_router() -> axum::Router {
    let orchestrator = make_orchestrator(
        FixedIdentity(None),
        Arc::new(ScriptedSpeech::new(vec![])),
        Arc::new(RecordingReply::new("unused")),
        fast_tuning(),
    );
    ApiServer::new(orchestrator, 0).router()
}

#[tokio::test]
async fn health_reports_ok() {
    let router = build_router();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn ws_route_rejects_plain_requests() {
    let router = build_router();

    // No upgrade headers: the websocket extractor must refuse
    let response = router
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let router = build_router();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/nonsense")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
