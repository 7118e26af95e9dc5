//! Query-derived shard status
//!
//! Alternate backend for deployments with no explicit work-item table:
//! workers write claim/completion markers straight into a shared working
//! state index, and aggregate progress is reconstructed here by querying it.
//! A document carries a `completedAt` epoch once its shard is done and an
//! `expiration` epoch while claimed; expiry stands in for an explicit lease.

use crate::classify::{classify, Classification, StepState};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Shared index workers write shard state into.
pub const WORKING_STATE_INDEX: &str = ".migrations_working_state";

/// Sentinel document written once shard planning finished; excluded from all
/// shard counts, its `completedAt` doubles as the backfill start time.
pub const SHARD_SETUP_DOC_ID: &str = "shard_setup";

/// Name of the working-state index for a session. An empty session name maps
/// to the unsuffixed default index.
pub fn working_state_index(session_name: &str) -> String {
    if session_name.is_empty() {
        WORKING_STATE_INDEX.to_string()
    } else {
        format!("{}_{}", WORKING_STATE_INDEX, session_name)
    }
}

/// Unique shard identity for a composite document id.
///
/// Retries of the same shard share an id prefix and differ only in the
/// attempt suffix: `"idx__0__attempt2"` and `"idx__0__attempt7"` both
/// identify shard `"idx__0"`. Returns `None` when the id does not carry the
/// double-underscore pair.
pub fn shard_identity(doc_id: &str) -> Option<String> {
    let first = doc_id.find("__")?;
    let rest = &doc_id[first + 2..];
    let second = rest.find("__")?;
    Some(format!("{}__{}", &doc_id[..first], &rest[..second]))
}

/// Filter applied by each of the five counting queries. Every filter
/// excludes the setup sentinel and any document that was split into
/// successor items (a split shard must not be double-counted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardFilter {
    /// All non-setup, non-split documents
    All,
    /// Documents carrying a `completedAt` field
    Completed,
    /// Documents without `completedAt`
    Incomplete,
    /// Incomplete and claimed: `expiration >= now`
    InProgress { now_epoch: i64 },
    /// Incomplete and unclaimed or lapsed: `expiration < now`
    Unclaimed { now_epoch: i64 },
}

/// Shared query store the deriver runs against. Implementations must signal
/// "index not found" distinctly from "zero hits."
#[async_trait]
pub trait ShardStateStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Count unique shard identities matching `filter`.
    async fn count_unique_shards(&self, index: &str, filter: ShardFilter) -> Result<u64>;

    /// `completedAt` of the setup sentinel, if it has been written.
    async fn setup_marker_completed_epoch(&self, index: &str) -> Result<Option<i64>>;

    /// Maximum `completedAt` across all documents in the index.
    async fn max_completed_epoch(&self, index: &str) -> Result<Option<i64>>;
}

/// Unique-shard counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStatusCounts {
    pub total: u64,
    pub completed: u64,
    pub incomplete: u64,
    pub in_progress: u64,
    pub unclaimed: u64,
}

/// Operator-facing status of a backfill, produced by either backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillOverallStatus {
    pub status: StepState,
    pub percentage_completed: f64,
    pub eta_ms: Option<f64>,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub shard_total: u64,
    pub shard_complete: u64,
    pub shard_in_progress: u64,
    pub shard_waiting: u64,
}

/// Derives aggregate backfill state from the shared working-state index.
pub struct ShardStatusDeriver {
    store: Arc<dyn ShardStateStore>,
}

impl ShardStatusDeriver {
    pub fn new(store: Arc<dyn ShardStateStore>) -> Self {
        Self { store }
    }

    /// The five counting queries against the session's working-state index.
    ///
    /// Fails `StatusUnavailable` while the index does not exist yet, so
    /// callers can distinguish "not started" from "zero remaining work."
    pub async fn counts(&self, session_name: &str) -> Result<ShardStatusCounts> {
        let index = working_state_index(session_name);
        if !self.store.index_exists(&index).await? {
            return Err(Error::StatusUnavailable(format!(
                "working state index {} does not exist",
                index
            )));
        }

        let now_epoch = Utc::now().timestamp();
        let counts = ShardStatusCounts {
            total: self.store.count_unique_shards(&index, ShardFilter::All).await?,
            completed: self
                .store
                .count_unique_shards(&index, ShardFilter::Completed)
                .await?,
            incomplete: self
                .store
                .count_unique_shards(&index, ShardFilter::Incomplete)
                .await?,
            in_progress: self
                .store
                .count_unique_shards(&index, ShardFilter::InProgress { now_epoch })
                .await?,
            unclaimed: self
                .store
                .count_unique_shards(&index, ShardFilter::Unclaimed { now_epoch })
                .await?,
        };
        debug!(index = %index, ?counts, "derived shard counts");
        Ok(counts)
    }

    /// Full derived status: counts, start/finish times, classification and
    /// ETA. `active_workers` comes from the deployment backend; this
    /// component never inspects worker processes itself.
    pub async fn derive_status(
        &self,
        session_name: &str,
        active_workers: bool,
    ) -> Result<BackfillOverallStatus> {
        let counts = self.counts(session_name).await?;
        let index = working_state_index(session_name);

        let started_epoch = self.store.setup_marker_completed_epoch(&index).await?;
        let started = started_epoch.and_then(|epoch| Utc.timestamp_opt(epoch, 0).single());

        let now = Utc::now();
        let classification: Classification = classify(
            counts.total,
            counts.completed,
            started_epoch,
            active_workers,
            now.timestamp() as f64,
        );

        // Finish time is only meaningful once everything is done; take the
        // latest completion marker, falling back to now.
        let finished = if classification.state == StepState::Completed {
            let max_epoch = self.store.max_completed_epoch(&index).await?;
            Some(
                max_epoch
                    .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
                    .unwrap_or(now),
            )
        } else {
            None
        };

        Ok(BackfillOverallStatus {
            status: classification.state,
            percentage_completed: classification.percentage,
            eta_ms: classification.eta_ms,
            started,
            finished,
            shard_total: counts.total,
            shard_complete: counts.completed,
            shard_in_progress: counts.in_progress,
            shard_waiting: counts.unclaimed,
        })
    }

    /// Whether every shard has been processed and nothing is claimed or
    /// waiting. Used to gate archive of the working-state index.
    pub async fn all_shards_finished(&self, session_name: &str) -> Result<bool> {
        let counts = self.counts(session_name).await?;
        Ok(counts.total == counts.completed && counts.in_progress == 0 && counts.unclaimed == 0)
    }
}
