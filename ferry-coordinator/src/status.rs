//! Unified status capability across the two coordination backends

use crate::classify::{classify, StepState};
use crate::lease::LeaseCoordinator;
use crate::shard_status::{BackfillOverallStatus, ShardStatusDeriver};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use ferry_storage::WorkItemState;
use serde::{Deserialize, Serialize};

/// Snapshot of the worker deployment, as reported by whichever backend runs
/// the workers (container runtime, managed cluster, batch scheduler, ...).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub desired: u32,
    pub running: u32,
    pub pending: u32,
    pub terminating: u32,
}

impl DeploymentStatus {
    /// The worker-activity signal consumed by status classification.
    pub fn has_active_workers(&self) -> bool {
        self.desired != 0
    }

    /// Whether any worker could still be touching the working state,
    /// including ones that are only scheduled or shutting down.
    pub fn workers_in_progress(&self) -> bool {
        self.running > 0 || self.pending > 0 || self.desired > 0
    }
}

/// One capability interface over both coordination backends, so operator
/// tooling does not need to know whether a session uses the explicit lease
/// table or the query-derived engine. The two are mutually exclusive
/// deployment modes and are never reconciled with each other.
#[async_trait]
pub trait BackfillStatusSource: Send + Sync {
    async fn overall_status(
        &self,
        session_name: &str,
        active_workers: bool,
    ) -> Result<BackfillOverallStatus>;
}

#[async_trait]
impl BackfillStatusSource for ShardStatusDeriver {
    async fn overall_status(
        &self,
        session_name: &str,
        active_workers: bool,
    ) -> Result<BackfillOverallStatus> {
        self.derive_status(session_name, active_workers).await
    }
}

#[async_trait]
impl BackfillStatusSource for LeaseCoordinator {
    async fn overall_status(
        &self,
        session_name: &str,
        active_workers: bool,
    ) -> Result<BackfillOverallStatus> {
        let items = self.list_work_items_by_session(session_name).await?;
        let now = Utc::now();
        let status = crate::progress::aggregate(session_name, &items, now);

        let classification = classify(
            status.total_work_items,
            status.completed_work_items,
            status.started_at.map(|t| t.timestamp()),
            active_workers,
            now.timestamp() as f64,
        );

        let finished = if classification.state == StepState::Completed {
            let max_completed = items
                .iter()
                .filter_map(|item| match item.state {
                    WorkItemState::Completed { completed_at } => Some(completed_at),
                    _ => None,
                })
                .max();
            Some(max_completed.unwrap_or(now))
        } else {
            None
        };

        Ok(BackfillOverallStatus {
            status: classification.state,
            percentage_completed: classification.percentage,
            eta_ms: classification.eta_ms,
            started: status.started_at,
            finished,
            shard_total: status.total_work_items,
            shard_complete: status.completed_work_items,
            shard_in_progress: status.assigned_work_items,
            shard_waiting: status.pending_work_items,
        })
    }
}
