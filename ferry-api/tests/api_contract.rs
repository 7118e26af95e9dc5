//! API contract tests
//!
//! Verify the HTTP surface: request shapes, response schemas, and the
//! error-kind to status-code mapping. No network, no external cluster; the
//! router is driven directly with `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use ferry_api::{router, AppState};
use ferry_coordinator::{
    LeaseCoordinator, Result as CoordinatorResult, ShardFilter, ShardStateStore,
    ShardStatusDeriver,
};
use ferry_storage::{MemorySessionStore, MemoryWorkItemStore, SessionStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app_with_deriver(deriver: Option<Arc<ShardStatusDeriver>>) -> Router {
    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let coordinator = Arc::new(LeaseCoordinator::new(
        sessions.clone(),
        Arc::new(MemoryWorkItemStore::new()),
    ));
    router(AppState {
        coordinator,
        sessions,
        deriver,
    })
}

fn app() -> Router {
    app_with_deriver(None)
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_session(app: &Router, name: &str) {
    let (status, _) = send(
        app,
        request("POST", "/sessions", Some(json!({ "name": name }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

fn shard_body(id: &str, docs: u64) -> Value {
    json!({
        "work_item_id": id,
        "index_name": "logs",
        "shard_number": 0,
        "document_count": docs,
        "total_size_bytes": docs * 100
    })
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_session_lifecycle_and_error_codes() {
    let app = app();
    create_session(&app, "s1").await;

    // Duplicate registration conflicts
    let (status, body) = send(
        &app,
        request("POST", "/sessions", Some(json!({ "name": "s1" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_exists");

    // Invalid name is a validation error, not a generic failure
    let (status, body) = send(
        &app,
        request("POST", "/sessions", Some(json!({ "name": "bad name!" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send(&app, request("GET", "/sessions/s1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "s1");

    let (status, _) = send(&app, request("GET", "/sessions/ghost", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, request("DELETE", "/sessions/s1", None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, request("DELETE", "/sessions/s1", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_work_item_and_duplicate_conflict() {
    let app = app();
    create_session(&app, "s1").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/backfill/work-items?session_name=s1",
            Some(shard_body("logs__0", 10)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["work_item_id"], "logs__0");
    assert_eq!(body["status"], "pending");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/backfill/work-items?session_name=s1",
            Some(shard_body("logs__0", 10)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_exists");
}

#[tokio::test]
async fn test_unknown_session_is_404_on_every_route() {
    let app = app();

    let cases = [
        request(
            "POST",
            "/backfill/work-items?session_name=ghost",
            Some(shard_body("a", 1)),
        ),
        request(
            "GET",
            "/backfill/work-items/acquire?session_name=ghost&worker_id=w1",
            None,
        ),
        request("GET", "/backfill/work-items/status?session_name=ghost", None),
        request("GET", "/backfill/work-items?session_name=ghost", None),
        request("POST", "/backfill/work-items/cleanup?session_name=ghost", None),
    ];
    for req in cases {
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }
}

#[tokio::test]
async fn test_batch_create_reports_partial_failures() {
    let app = app();
    create_session(&app, "s1").await;

    let batch = json!([shard_body("a", 1), shard_body("a", 1), shard_body("b", 2)]);
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/backfill/work-items/batch?session_name=s1",
            Some(batch),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"].as_array().unwrap().len(), 2);
    let failed = body["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["work_item_id"], "a");
}

#[tokio::test]
async fn test_acquire_returns_lease_and_404_when_drained() {
    let app = app();
    create_session(&app, "s1").await;
    send(
        &app,
        request(
            "POST",
            "/backfill/work-items?session_name=s1",
            Some(shard_body("a", 10)),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        request(
            "GET",
            "/backfill/work-items/acquire?session_name=s1&worker_id=w1",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lease_duration_seconds"], 300);
    assert_eq!(body["work_item"]["status"], "assigned");
    assert_eq!(body["work_item"]["worker_id"], "w1");

    // Queue drained: a distinct 404, not an empty 200
    let (status, body) = send(
        &app,
        request(
            "GET",
            "/backfill/work-items/acquire?session_name=s1&worker_id=w2",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_renew_ownership_and_expiry_mapping() {
    let app = app();
    create_session(&app, "s1").await;
    send(
        &app,
        request(
            "POST",
            "/backfill/work-items?session_name=s1",
            Some(shard_body("a", 10)),
        ),
    )
    .await;
    send(
        &app,
        request(
            "GET",
            "/backfill/work-items/acquire?session_name=s1&worker_id=w1",
            None,
        ),
    )
    .await;

    // Wrong worker: 409
    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/backfill/work-items/a/lease?session_name=s1",
            Some(json!({ "worker_id": "w2" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "lease_not_owned");

    // Right worker with progress: 200 and counters recorded
    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/backfill/work-items/a/lease?session_name=s1",
            Some(json!({
                "worker_id": "w1",
                "progress": { "documents_processed": 4, "bytes_processed": 400 }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents_processed"], 4);

    // Missing item: 404
    let (status, _) = send(
        &app,
        request(
            "PUT",
            "/backfill/work-items/ghost/lease?session_name=s1",
            Some(json!({ "worker_id": "w1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expired_lease_renewal_is_410_gone() {
    let app = app();
    create_session(&app, "s1").await;
    send(
        &app,
        request(
            "POST",
            "/backfill/work-items?session_name=s1",
            Some(shard_body("a", 10)),
        ),
    )
    .await;
    send(
        &app,
        request(
            "GET",
            "/backfill/work-items/acquire?session_name=s1&worker_id=w1&lease_duration_seconds=0",
            None,
        ),
    )
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/backfill/work-items/a/lease?session_name=s1",
            Some(json!({ "worker_id": "w1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "lease_expired");
}

#[tokio::test]
async fn test_complete_then_renew_conflicts() {
    let app = app();
    create_session(&app, "s1").await;
    send(
        &app,
        request(
            "POST",
            "/backfill/work-items?session_name=s1",
            Some(shard_body("a", 10)),
        ),
    )
    .await;
    send(
        &app,
        request(
            "GET",
            "/backfill/work-items/acquire?session_name=s1&worker_id=w1",
            None,
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/backfill/work-items/a/complete?session_name=s1",
            Some(json!({ "worker_id": "w1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/backfill/work-items/a/lease?session_name=s1",
            Some(json!({ "worker_id": "w1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "lease_not_owned");
}

#[tokio::test]
async fn test_queue_status_zero_valued_for_empty_session() {
    let app = app();
    create_session(&app, "s1").await;

    let (status, body) = send(
        &app,
        request("GET", "/backfill/work-items/status?session_name=s1", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_work_items"], 0);
    assert_eq!(body["total_documents"], 0);
    assert!(body["started_at"].is_null());
}

#[tokio::test]
async fn test_cleanup_route_returns_reclaimed_count() {
    let app = app();
    create_session(&app, "s1").await;
    for id in ["a", "b"] {
        send(
            &app,
            request(
                "POST",
                "/backfill/work-items?session_name=s1",
                Some(shard_body(id, 10)),
            ),
        )
        .await;
        send(
            &app,
            request(
                "GET",
                "/backfill/work-items/acquire?session_name=s1&worker_id=w1&lease_duration_seconds=0",
                None,
            ),
        )
        .await;
    }
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let (status, body) = send(
        &app,
        request("POST", "/backfill/work-items/cleanup?session_name=s1", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = send(
        &app,
        request("POST", "/backfill/work-items/cleanup?session_name=s1", None),
    )
    .await;
    assert_eq!(body["count"], 0);
}

/// Query store that has not materialized its index yet.
struct AbsentIndexStore;

#[async_trait]
impl ShardStateStore for AbsentIndexStore {
    async fn index_exists(&self, _index: &str) -> CoordinatorResult<bool> {
        Ok(false)
    }
    async fn count_unique_shards(
        &self,
        _index: &str,
        _filter: ShardFilter,
    ) -> CoordinatorResult<u64> {
        Ok(0)
    }
    async fn setup_marker_completed_epoch(&self, _index: &str) -> CoordinatorResult<Option<i64>> {
        Ok(None)
    }
    async fn max_completed_epoch(&self, _index: &str) -> CoordinatorResult<Option<i64>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_deep_status_not_ready_is_503_not_500() {
    let deriver = Arc::new(ShardStatusDeriver::new(Arc::new(AbsentIndexStore)));
    let app = app_with_deriver(Some(deriver));

    let (status, body) = send(
        &app,
        request("GET", "/backfill/status?session_name=s1", None),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "status_not_yet_available");
}

#[tokio::test]
async fn test_deep_status_without_query_backend_is_503() {
    let app = app();
    let (status, body) = send(
        &app,
        request("GET", "/backfill/status?session_name=s1", None),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "status_not_yet_available");
}
