//! Work-item and status handlers

use crate::error::ApiError;
use crate::types::{
    AcquireQuery, AcquireResponse, CompleteRequest, CountResponse, DeepStatusQuery,
    LeaseRenewalRequest, SessionQuery,
};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Duration;
use ferry_coordinator::{
    BackfillOverallStatus, BatchCreateOutcome, Error as CoordinatorError, WorkQueueStatus,
    DEFAULT_LEASE_DURATION_SECS,
};
use ferry_storage::{NewWorkItem, WorkItem};
use serde_json::{json, Value};
use tracing::info;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn create_work_item(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    Json(request): Json<NewWorkItem>,
) -> Result<(StatusCode, Json<WorkItem>), ApiError> {
    let item = state
        .coordinator
        .create_work_item(&query.session_name, request)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn create_work_items_batch(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    Json(requests): Json<Vec<NewWorkItem>>,
) -> Result<(StatusCode, Json<BatchCreateOutcome>), ApiError> {
    let outcome = state
        .coordinator
        .create_work_items(&query.session_name, requests)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn acquire_work_item(
    State(state): State<AppState>,
    Query(query): Query<AcquireQuery>,
) -> Result<Json<AcquireResponse>, ApiError> {
    let lease_seconds = query
        .lease_duration_seconds
        .unwrap_or(DEFAULT_LEASE_DURATION_SECS);

    // Surface reclaimable work before selecting; acquisition itself also
    // treats lapsed leases as eligible, so this is an optimization plus a
    // log line, not a correctness requirement.
    let reclaimed = state
        .coordinator
        .cleanup_expired_leases(&query.session_name)
        .await?;
    if reclaimed > 0 {
        info!(
            session = %query.session_name,
            reclaimed,
            "reclaimed expired leases before acquisition"
        );
    }

    let item = state
        .coordinator
        .acquire_next_work_item(
            &query.session_name,
            &query.worker_id,
            Duration::seconds(lease_seconds),
        )
        .await?
        .ok_or_else(|| CoordinatorError::NotFound("no available work items".into()))?;

    Ok(Json(AcquireResponse {
        work_item: item,
        lease_duration_seconds: lease_seconds,
    }))
}

pub async fn renew_lease(
    State(state): State<AppState>,
    Path(work_item_id): Path<String>,
    Query(query): Query<SessionQuery>,
    Json(request): Json<LeaseRenewalRequest>,
) -> Result<Json<WorkItem>, ApiError> {
    let lease_seconds = request
        .lease_duration_seconds
        .unwrap_or(DEFAULT_LEASE_DURATION_SECS);
    let item = state
        .coordinator
        .renew_lease(
            &query.session_name,
            &work_item_id,
            &request.worker_id,
            Duration::seconds(lease_seconds),
            request.progress,
        )
        .await?;
    Ok(Json(item))
}

pub async fn complete_work_item(
    State(state): State<AppState>,
    Path(work_item_id): Path<String>,
    Query(query): Query<SessionQuery>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<WorkItem>, ApiError> {
    let item = state
        .coordinator
        .complete_work_item(&query.session_name, &work_item_id, &request.worker_id)
        .await?;
    Ok(Json(item))
}

pub async fn get_work_item(
    State(state): State<AppState>,
    Path(work_item_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<WorkItem>, ApiError> {
    let item = state
        .coordinator
        .get_work_item(&query.session_name, &work_item_id)
        .await?;
    Ok(Json(item))
}

pub async fn list_work_items(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<WorkItem>>, ApiError> {
    let items = state
        .coordinator
        .list_work_items_by_session(&query.session_name)
        .await?;
    Ok(Json(items))
}

pub async fn delete_work_items(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .coordinator
        .delete_work_items_by_session(&query.session_name)
        .await?;
    Ok(Json(CountResponse { count }))
}

pub async fn cleanup_expired_leases(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .coordinator
        .cleanup_expired_leases(&query.session_name)
        .await?;
    Ok(Json(CountResponse { count }))
}

pub async fn queue_status(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<WorkQueueStatus>, ApiError> {
    let status = state
        .coordinator
        .get_work_queue_status(&query.session_name)
        .await?;
    Ok(Json(status))
}

/// Deep status check: consults the shard-level derivation engine instead of
/// the work-item table. Returns 503 while the working-state index has not
/// materialized yet.
pub async fn deep_status(
    State(state): State<AppState>,
    Query(query): Query<DeepStatusQuery>,
) -> Result<Json<BackfillOverallStatus>, ApiError> {
    let deriver = state.deriver.as_ref().ok_or_else(|| {
        CoordinatorError::StatusUnavailable("no query backend configured".into())
    })?;
    let status = deriver
        .derive_status(&query.session_name, query.active_workers.unwrap_or(true))
        .await?;
    Ok(Json(status))
}
