//! Integration tests for the HTTP API surface.


use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use muster::admission::AdmissionQueue;
use muster::api::{router, ApiState};
use muster::batch::BatchOrchestrator;
use muster::store::{ExecutionStatus, MemoryStore};
use test_harness::{drive_execution, seeded_inventory};

/// Build the API app over a fresh store and the seeded inventory.
async fn create_test_app(limit: usize, max_queue_size: usize) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = Arc::new(BatchOrchestrator::new(
        Arc::new(AdmissionQueue::new(limit, max_queue_size)),
        store.clone(),
        Arc::new(seeded_inventory().await),
    ));
    (router(ApiState { orchestrator }), store)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn submit_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/batches")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_create_batch_returns_created() {
    let (app, _store) = create_test_app(10, 10).await;

    let response = app
        .oneshot(submit_request(json!({
            "kind": "command",
            "action": "uptime",
            "target_node_ids": ["web-01", "db-01"],
            "user_id": "ops"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["target_count"], 2);
    assert_eq!(body["expanded_node_ids"], json!(["web-01", "db-01"]));
    assert!(body["batch_id"].as_str().is_some());
}

#[tokio::test]
async fn test_create_batch_invalid_nodes_is_bad_request() {
    let (app, _store) = create_test_app(10, 10).await;

    let response = app
        .oneshot(submit_request(json!({
            "kind": "command",
            "action": "uptime",
            "target_node_ids": ["ghost-1"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("ghost-1"), "error should name the node: {}", message);
}

#[tokio::test]
async fn test_create_batch_queue_full_is_service_unavailable() {
    let (app, _store) = create_test_app(1, 0).await;

    let first = app
        .clone()
        .oneshot(submit_request(json!({
            "kind": "command",
            "action": "uptime",
            "target_node_ids": ["web-01"]
        })))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(submit_request(json!({
            "kind": "command",
            "action": "uptime",
            "target_node_ids": ["web-02"]
        })))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_batch_status_roundtrip_with_filter() {
    let (app, store) = create_test_app(10, 10).await;

    let created = app
        .clone()
        .oneshot(submit_request(json!({
            "kind": "command",
            "action": "uptime",
            "target_node_ids": ["web-01", "web-02"]
        })))
        .await
        .unwrap();
    let created = json_body(created).await;
    let batch_id = created["batch_id"].as_str().unwrap().to_string();
    let execution_ids: Vec<uuid::Uuid> = created["execution_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().parse().unwrap())
        .collect();

    drive_execution(&store, execution_ids[0], ExecutionStatus::Success).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/batches/{}?status=success", batch_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    // Filter narrows the execution list, stats still cover everything.
    assert_eq!(body["executions"].as_array().unwrap().len(), 1);
    assert_eq!(body["batch"]["stats"]["total"], 2);
    assert_eq!(body["batch"]["stats"]["queued"], 1);
    assert_eq!(body["progress"], 50);
    assert_eq!(
        body["executions"][0]["node_name"],
        json!("web-01.example.com")
    );
}

#[tokio::test]
async fn test_batch_status_rejects_bad_filter() {
    let (app, _store) = create_test_app(10, 10).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/batches/{}?status=bogus", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_batch_is_not_found() {
    let (app, _store) = create_test_app(10, 10).await;
    let missing = uuid::Uuid::new_v4();

    let status_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/batches/{}", missing))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(status_response.status(), StatusCode::NOT_FOUND);

    let cancel_response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/batches/{}/cancel", missing))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(cancel_response.status(), StatusCode::NOT_FOUND);
    let body = json_body(cancel_response).await;
    assert!(body["error"].as_str().unwrap().contains(&missing.to_string()));
}

#[tokio::test]
async fn test_cancel_batch_reports_count() {
    let (app, store) = create_test_app(10, 10).await;

    let created = app
        .clone()
        .oneshot(submit_request(json!({
            "kind": "task",
            "action": "deploy",
            "target_group_ids": ["db"]
        })))
        .await
        .unwrap();
    let created = json_body(created).await;
    let batch_id = created["batch_id"].as_str().unwrap().to_string();
    let execution_ids: Vec<uuid::Uuid> = created["execution_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().parse().unwrap())
        .collect();

    drive_execution(&store, execution_ids[0], ExecutionStatus::Running).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/batches/{}/cancel", batch_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["cancelled_count"], 1);
}

#[tokio::test]
async fn test_queue_status_snapshot() {
    let (app, _store) = create_test_app(4, 8).await;

    let _ = app
        .clone()
        .oneshot(submit_request(json!({
            "kind": "command",
            "action": "uptime",
            "target_node_ids": ["web-01", "web-02"]
        })))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/queue")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["running"], 2);
    assert_eq!(body["queued"], 0);
    assert_eq!(body["limit"], 4);
}
