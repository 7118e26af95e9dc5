//! Lease-based work queue
//!
//! Implements acquire-next-available, renew, complete and expired-lease
//! reclamation on top of [`WorkItemStore`]. All compound read-modify-write
//! sequences serialize behind a single async mutex; the store itself only
//! guarantees per-call consistency. This guard is correct for a single
//! coordinator process. Running several coordinators against one store
//! needs the exclusion moved into the store's own transaction layer.

use crate::progress::{self, WorkQueueStatus};
use crate::{Error, Result};
use chrono::{Duration, Utc};
use ferry_storage::{
    NewWorkItem, ProgressUpdate, SessionStore, WorkItem, WorkItemState, WorkItemStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Default lease duration in seconds (5 minutes). Workers must renew more
/// frequently than this or their item becomes reclaimable.
pub const DEFAULT_LEASE_DURATION_SECS: i64 = 300;

/// Outcome of a batch creation. Individual failures are collected alongside
/// the items that did succeed instead of aborting the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCreateOutcome {
    pub created: Vec<WorkItem>,
    pub failed: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemFailure {
    pub work_item_id: String,
    pub reason: String,
}

/// Coordinator for the explicit work-item table.
pub struct LeaseCoordinator {
    sessions: Arc<dyn SessionStore>,
    store: Arc<dyn WorkItemStore>,
    // Serializes the check-then-act sequences of acquire/renew/complete/cleanup
    op_lock: Mutex<()>,
}

impl LeaseCoordinator {
    pub fn new(sessions: Arc<dyn SessionStore>, store: Arc<dyn WorkItemStore>) -> Self {
        Self {
            sessions,
            store,
            op_lock: Mutex::new(()),
        }
    }

    /// Every operation is scoped to a registered session; an unknown session
    /// fails `NotFound` distinctly from "session has no work items yet."
    async fn ensure_session(&self, session_name: &str) -> Result<()> {
        match self.sessions.find(session_name).await? {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("session {}", session_name))),
        }
    }

    /// Create a single work item. Fails `AlreadyExists` when the id is
    /// already present within the session.
    pub async fn create_work_item(
        &self,
        session_name: &str,
        new: NewWorkItem,
    ) -> Result<WorkItem> {
        self.ensure_session(session_name).await?;
        if new.work_item_id.is_empty() {
            return Err(Error::Validation("work_item_id must not be empty".into()));
        }

        let item = new.into_work_item(session_name, Utc::now());
        self.store.insert(item.clone()).await?;
        info!(
            session = session_name,
            work_item_id = %item.work_item_id,
            index = %item.index_name,
            shard = item.shard_number,
            "created work item"
        );
        Ok(item)
    }

    /// Create a batch of work items, tolerating per-item failures.
    pub async fn create_work_items(
        &self,
        session_name: &str,
        batch: Vec<NewWorkItem>,
    ) -> Result<BatchCreateOutcome> {
        self.ensure_session(session_name).await?;

        let mut outcome = BatchCreateOutcome {
            created: Vec::with_capacity(batch.len()),
            failed: Vec::new(),
        };
        for new in batch {
            let id = new.work_item_id.clone();
            match self.create_work_item(session_name, new).await {
                Ok(item) => outcome.created.push(item),
                Err(err) => outcome.failed.push(BatchItemFailure {
                    work_item_id: id,
                    reason: err.to_string(),
                }),
            }
        }
        if !outcome.failed.is_empty() {
            info!(
                session = session_name,
                created = outcome.created.len(),
                failed = outcome.failed.len(),
                "batch creation finished with failures"
            );
        }
        Ok(outcome)
    }

    /// Acquire the next available work item for `worker_id`.
    ///
    /// Eligible items are `Pending`, or `Assigned` with a lapsed lease (so
    /// correctness does not depend on [`Self::cleanup_expired_leases`] having
    /// run first). Selection order among eligible items is unspecified.
    /// Returns `Ok(None)` when no eligible item exists.
    #[instrument(skip(self), fields(session = session_name, worker = worker_id))]
    pub async fn acquire_next_work_item(
        &self,
        session_name: &str,
        worker_id: &str,
        lease_duration: Duration,
    ) -> Result<Option<WorkItem>> {
        let _guard = self.op_lock.lock().await;
        self.ensure_session(session_name).await?;

        let now = Utc::now();
        let session = session_name.to_string();
        let available = self
            .store
            .search(&move |item: &WorkItem| {
                item.session_name == session
                    && match &item.state {
                        WorkItemState::Pending => true,
                        WorkItemState::Assigned { lease_expiry, .. } => *lease_expiry < now,
                        WorkItemState::Completed { .. } => false,
                    }
            })
            .await?;

        let Some(mut item) = available.into_iter().next() else {
            debug!(session = session_name, "no available work items");
            return Ok(None);
        };

        item.state = WorkItemState::Assigned {
            worker_id: worker_id.to_string(),
            lease_expiry: now + lease_duration,
        };
        if item.started_at.is_none() {
            item.started_at = Some(now);
        }
        self.store.update(&item).await?;

        info!(
            work_item_id = %item.work_item_id,
            lease_secs = lease_duration.num_seconds(),
            "acquired work item"
        );
        Ok(Some(item))
    }

    /// Extend the lease on `work_item_id` and optionally record progress.
    ///
    /// A renewal received after expiry fails `LeaseExpired`: once the lease
    /// has lapsed the item may already have been reclaimed and handed to
    /// another worker, so the owner must go back through acquisition.
    pub async fn renew_lease(
        &self,
        session_name: &str,
        work_item_id: &str,
        worker_id: &str,
        lease_duration: Duration,
        progress: Option<ProgressUpdate>,
    ) -> Result<WorkItem> {
        let _guard = self.op_lock.lock().await;
        let mut item = self
            .checked_owned_item(session_name, work_item_id, worker_id)
            .await?;

        let now = Utc::now();
        item.state = WorkItemState::Assigned {
            worker_id: worker_id.to_string(),
            lease_expiry: now + lease_duration,
        };
        if let Some(progress) = progress {
            item.documents_processed = progress.documents_processed;
            item.bytes_processed = progress.bytes_processed;
            item.last_progress_update = Some(now);
        }
        self.store.update(&item).await?;

        debug!(
            session = session_name,
            work_item_id,
            worker = worker_id,
            docs = item.documents_processed,
            "renewed lease"
        );
        Ok(item)
    }

    /// Mark a work item completed. Same ownership and expiry checks as
    /// renewal; on success the item becomes terminal and the lease fields
    /// vanish with the state transition.
    pub async fn complete_work_item(
        &self,
        session_name: &str,
        work_item_id: &str,
        worker_id: &str,
    ) -> Result<WorkItem> {
        let _guard = self.op_lock.lock().await;
        let mut item = self
            .checked_owned_item(session_name, work_item_id, worker_id)
            .await?;

        item.state = WorkItemState::Completed {
            completed_at: Utc::now(),
        };
        self.store.update(&item).await?;

        info!(
            session = session_name,
            work_item_id,
            worker = worker_id,
            "completed work item"
        );
        Ok(item)
    }

    /// Fetch an item and verify the caller holds a live lease on it.
    /// Check order: existence, then ownership, then expiry.
    async fn checked_owned_item(
        &self,
        session_name: &str,
        work_item_id: &str,
        worker_id: &str,
    ) -> Result<WorkItem> {
        self.ensure_session(session_name).await?;
        let item = self
            .store
            .find(session_name, work_item_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "work item {} in session {}",
                    work_item_id, session_name
                ))
            })?;

        let (owner, lease_expiry) = match &item.state {
            WorkItemState::Assigned {
                worker_id: owner,
                lease_expiry,
            } => (owner.clone(), *lease_expiry),
            _ => {
                return Err(Error::LeaseNotOwned(format!(
                    "work item {} has no active lease",
                    work_item_id
                )))
            }
        };
        if owner != worker_id {
            return Err(Error::LeaseNotOwned(format!(
                "work item {} is not owned by worker {}",
                work_item_id, worker_id
            )));
        }
        if lease_expiry < Utc::now() {
            return Err(Error::LeaseExpired(format!(
                "lease for work item {} has expired",
                work_item_id
            )));
        }
        Ok(item)
    }

    /// Reset every expired `Assigned` item in the session back to `Pending`,
    /// returning the reclaimed count. This is the sole reclamation path from
    /// worker death; a second consecutive call reclaims zero.
    pub async fn cleanup_expired_leases(&self, session_name: &str) -> Result<usize> {
        let _guard = self.op_lock.lock().await;
        self.ensure_session(session_name).await?;

        let now = Utc::now();
        let session = session_name.to_string();
        let expired = self
            .store
            .search(&move |item: &WorkItem| {
                item.session_name == session && item.is_lease_expired_at(now)
            })
            .await?;

        let mut reclaimed = 0;
        for mut item in expired {
            item.state = WorkItemState::Pending;
            self.store.update(&item).await?;
            reclaimed += 1;
        }
        if reclaimed > 0 {
            info!(session = session_name, reclaimed, "reclaimed expired leases");
        }
        Ok(reclaimed)
    }

    /// Fetch a single work item. Fails `NotFound` when absent.
    pub async fn get_work_item(&self, session_name: &str, work_item_id: &str) -> Result<WorkItem> {
        self.ensure_session(session_name).await?;
        self.store
            .find(session_name, work_item_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "work item {} in session {}",
                    work_item_id, session_name
                ))
            })
    }

    pub async fn list_work_items_by_session(&self, session_name: &str) -> Result<Vec<WorkItem>> {
        self.ensure_session(session_name).await?;
        let session = session_name.to_string();
        let mut items = self
            .store
            .search(&move |item: &WorkItem| item.session_name == session)
            .await?;
        items.sort_by(|a, b| a.work_item_id.cmp(&b.work_item_id));
        Ok(items)
    }

    /// Delete every work item in the session, returning the removed count.
    pub async fn delete_work_items_by_session(&self, session_name: &str) -> Result<usize> {
        self.ensure_session(session_name).await?;
        let session = session_name.to_string();
        let removed = self
            .store
            .remove(&move |item: &WorkItem| item.session_name == session)
            .await?;
        info!(session = session_name, removed, "deleted session work items");
        Ok(removed)
    }

    /// Aggregate queue status for the session. Returns a zero-valued status
    /// (not an error) when the session has no items.
    pub async fn get_work_queue_status(&self, session_name: &str) -> Result<WorkQueueStatus> {
        self.ensure_session(session_name).await?;
        let session = session_name.to_string();
        let items = self
            .store
            .search(&move |item: &WorkItem| item.session_name == session)
            .await?;
        Ok(progress::aggregate(session_name, &items, Utc::now()))
    }
}
