//! Request and response shapes for the work-item API

use ferry_storage::{ProgressUpdate, WorkItem};
use serde::{Deserialize, Serialize};

/// Session scoping for work-item routes.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_name: String,
}

/// Parameters for `GET /backfill/work-items/acquire`.
#[derive(Debug, Deserialize)]
pub struct AcquireQuery {
    pub session_name: String,
    pub worker_id: String,
    pub lease_duration_seconds: Option<i64>,
}

/// Body of `PUT /backfill/work-items/{id}/lease`.
#[derive(Debug, Deserialize)]
pub struct LeaseRenewalRequest {
    pub worker_id: String,
    pub lease_duration_seconds: Option<i64>,
    pub progress: Option<ProgressUpdate>,
}

/// Body of `POST /backfill/work-items/{id}/complete`.
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub worker_id: String,
}

/// Response of a successful acquisition.
#[derive(Debug, Serialize)]
pub struct AcquireResponse {
    pub work_item: WorkItem,
    pub lease_duration_seconds: i64,
}

/// Response of `POST /backfill/work-items/cleanup` and the bulk delete.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Parameters for `GET /backfill/status`.
#[derive(Debug, Deserialize)]
pub struct DeepStatusQuery {
    pub session_name: String,
    /// Worker-activity signal from the deployment backend; assumed active
    /// when the caller cannot tell.
    pub active_workers: Option<bool>,
}

/// Body of `POST /sessions`.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub name: String,
}
