//! Work-item models for backfill coordination

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a work item.
///
/// Lease fields only exist while a worker holds the item, so an item that is
/// not `Assigned` cannot carry a stale `worker_id` or `lease_expiry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkItemState {
    /// Available for acquisition
    Pending,

    /// Leased by a worker until `lease_expiry`
    Assigned {
        worker_id: String,
        lease_expiry: DateTime<Utc>,
    },

    /// Terminal; no further mutation is permitted
    Completed { completed_at: DateTime<Utc> },
}

impl WorkItemState {
    /// Whether this is an assigned state whose lease has lapsed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self, WorkItemState::Assigned { lease_expiry, .. } if *lease_expiry < now)
    }

    /// Stable lowercase label for display and filtering
    pub fn label(&self) -> &'static str {
        match self {
            WorkItemState::Pending => "pending",
            WorkItemState::Assigned { .. } => "assigned",
            WorkItemState::Completed { .. } => "completed",
        }
    }
}

/// One unit of assignable migration work, typically one shard of one index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique within the session
    pub work_item_id: String,
    pub session_name: String,

    // Shard descriptor, immutable once created
    pub index_name: String,
    pub shard_number: u32,
    pub document_count: u64,
    pub total_size_bytes: u64,

    #[serde(flatten)]
    pub state: WorkItemState,

    // Progress counters, reported by the owning worker
    pub documents_processed: u64,
    pub bytes_processed: u64,
    pub last_progress_update: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    /// Set once, on first acquisition
    pub started_at: Option<DateTime<Utc>>,
}

impl WorkItem {
    /// Progress through this shard, based on documents processed.
    pub fn progress_percentage(&self) -> f64 {
        if self.document_count == 0 {
            return if matches!(self.state, WorkItemState::Completed { .. }) {
                100.0
            } else {
                0.0
            };
        }
        ((self.documents_processed as f64 / self.document_count as f64) * 100.0).min(100.0)
    }

    pub fn is_lease_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state.is_expired_at(now)
    }
}

/// Shard descriptor for a work item about to be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkItem {
    pub work_item_id: String,
    pub index_name: String,
    pub shard_number: u32,
    pub document_count: u64,
    pub total_size_bytes: u64,
}

impl NewWorkItem {
    /// Materialize a pending work item in `session_name`.
    pub fn into_work_item(self, session_name: &str, now: DateTime<Utc>) -> WorkItem {
        WorkItem {
            work_item_id: self.work_item_id,
            session_name: session_name.to_string(),
            index_name: self.index_name,
            shard_number: self.shard_number,
            document_count: self.document_count,
            total_size_bytes: self.total_size_bytes,
            state: WorkItemState::Pending,
            documents_processed: 0,
            bytes_processed: 0,
            last_progress_update: None,
            created_at: now,
            started_at: None,
        }
    }
}

/// Progress delta reported by a worker alongside a lease renewal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub documents_processed: u64,
    pub bytes_processed: u64,
}
