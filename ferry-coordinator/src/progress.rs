//! Per-session aggregation over work items

use chrono::{DateTime, Utc};
use ferry_storage::{WorkItem, WorkItemState};
use serde::{Deserialize, Serialize};

/// Derived per-session counts and progress sums. Recomputed on demand from
/// work-item rows, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkQueueStatus {
    pub session_name: String,
    pub total_work_items: u64,
    pub pending_work_items: u64,
    pub assigned_work_items: u64,
    pub completed_work_items: u64,

    pub total_documents: u64,
    pub total_documents_processed: u64,
    pub total_size_bytes: u64,
    pub total_bytes_processed: u64,

    /// Earliest `started_at` across items in the session
    pub started_at: Option<DateTime<Utc>>,
}

impl WorkQueueStatus {
    pub fn empty(session_name: &str) -> Self {
        Self {
            session_name: session_name.to_string(),
            total_work_items: 0,
            pending_work_items: 0,
            assigned_work_items: 0,
            completed_work_items: 0,
            total_documents: 0,
            total_documents_processed: 0,
            total_size_bytes: 0,
            total_bytes_processed: 0,
            started_at: None,
        }
    }

    /// Overall progress, by documents processed.
    pub fn overall_progress_percentage(&self) -> f64 {
        if self.total_documents == 0 {
            return if self.total_work_items > 0
                && self.completed_work_items == self.total_work_items
            {
                100.0
            } else {
                0.0
            };
        }
        ((self.total_documents_processed as f64 / self.total_documents as f64) * 100.0).min(100.0)
    }
}

/// Classify and sum `items` as of `now`.
///
/// An `Assigned` item whose lease has already lapsed is counted as pending
/// for reporting purposes even though its row has not been reset yet;
/// classification here is decoupled from the reclamation path.
pub fn aggregate(session_name: &str, items: &[WorkItem], now: DateTime<Utc>) -> WorkQueueStatus {
    let mut status = WorkQueueStatus::empty(session_name);

    for item in items {
        status.total_work_items += 1;
        status.total_documents += item.document_count;
        status.total_documents_processed += item.documents_processed;
        status.total_size_bytes += item.total_size_bytes;
        status.total_bytes_processed += item.bytes_processed;

        if let Some(started) = item.started_at {
            if status.started_at.map_or(true, |earliest| started < earliest) {
                status.started_at = Some(started);
            }
        }

        match &item.state {
            WorkItemState::Completed { .. } => status.completed_work_items += 1,
            WorkItemState::Assigned { lease_expiry, .. } if *lease_expiry >= now => {
                status.assigned_work_items += 1
            }
            _ => status.pending_work_items += 1,
        }
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ferry_storage::NewWorkItem;

    fn item(id: &str, docs: u64, bytes: u64) -> WorkItem {
        NewWorkItem {
            work_item_id: id.to_string(),
            index_name: "logs".to_string(),
            shard_number: 0,
            document_count: docs,
            total_size_bytes: bytes,
        }
        .into_work_item("s1", Utc::now())
    }

    #[test]
    fn test_empty_session_is_zero_valued() {
        let status = aggregate("s1", &[], Utc::now());
        assert_eq!(status.total_work_items, 0);
        assert_eq!(status.total_documents, 0);
        assert!(status.started_at.is_none());
        assert_eq!(status.overall_progress_percentage(), 0.0);
    }

    #[test]
    fn test_sums_match_hand_computed_totals() {
        let now = Utc::now();

        let mut a = item("a", 10, 1000);
        a.state = WorkItemState::Completed { completed_at: now };
        a.documents_processed = 10;
        a.bytes_processed = 1000;
        a.started_at = Some(now - Duration::seconds(60));

        let mut b = item("b", 20, 2000);
        b.state = WorkItemState::Assigned {
            worker_id: "w1".to_string(),
            lease_expiry: now + Duration::seconds(300),
        };
        b.documents_processed = 5;
        b.bytes_processed = 500;
        b.started_at = Some(now - Duration::seconds(30));

        let c = item("c", 30, 3000);

        let status = aggregate("s1", &[a, b, c], now);
        assert_eq!(status.total_work_items, 3);
        assert_eq!(status.pending_work_items, 1);
        assert_eq!(status.assigned_work_items, 1);
        assert_eq!(status.completed_work_items, 1);
        assert_eq!(status.total_documents, 60);
        assert_eq!(status.total_documents_processed, 15);
        assert_eq!(status.total_size_bytes, 6000);
        assert_eq!(status.total_bytes_processed, 1500);
        assert!((status.overall_progress_percentage() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_expired_assignment_reported_as_pending() {
        let now = Utc::now();
        let mut a = item("a", 10, 1000);
        a.state = WorkItemState::Assigned {
            worker_id: "w1".to_string(),
            lease_expiry: now - Duration::seconds(1),
        };

        let status = aggregate("s1", &[a], now);
        assert_eq!(status.pending_work_items, 1);
        assert_eq!(status.assigned_work_items, 0);
    }

    #[test]
    fn test_earliest_started_at_wins() {
        let now = Utc::now();
        let early = now - Duration::seconds(120);

        let mut a = item("a", 1, 1);
        a.started_at = Some(now - Duration::seconds(10));
        let mut b = item("b", 1, 1);
        b.started_at = Some(early);
        let c = item("c", 1, 1);

        let status = aggregate("s1", &[a, b, c], now);
        assert_eq!(status.started_at, Some(early));
    }
}
