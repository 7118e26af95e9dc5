//! # Ferry Coordinator
//!
//! Distributed work coordination for shard-granular backfills.
//!
//! Two backends converge on the same derived outputs (shard counts, progress
//! percentage, ETA):
//!
//! - [`LeaseCoordinator`]: an explicit work-item table where each item is
//!   ownable by at most one worker at a time via a time-bounded lease.
//! - [`ShardStatusDeriver`]: reconstructs equivalent aggregate state by
//!   querying a shared index that workers write claim/completion markers
//!   into directly, with expiration timestamps in lieu of explicit leases.
//!
//! Workers pull; there is no push channel and no heartbeat. Absence of a
//! timely lease renewal is the only failure signal.

pub mod classify;
pub mod lease;
pub mod progress;
pub mod shard_status;
pub mod status;

// Re-export commonly used types
pub use classify::{classify, Classification, StepState};
pub use lease::{BatchCreateOutcome, LeaseCoordinator, DEFAULT_LEASE_DURATION_SECS};
pub use progress::WorkQueueStatus;
pub use shard_status::{
    shard_identity, working_state_index, BackfillOverallStatus, ShardFilter, ShardStateStore,
    ShardStatusCounts, ShardStatusDeriver,
};
pub use status::{BackfillStatusSource, DeploymentStatus};

/// Result type for coordinator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for coordinator operations.
///
/// Every variant is a recoverable-by-caller condition; callers are expected
/// to match on kinds rather than string contents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Item or session unknown
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate creation
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Caller is not the current lease holder
    #[error("lease not owned by worker: {0}")]
    LeaseNotOwned(String),

    /// Lease holder attempted an operation after expiry
    #[error("lease expired: {0}")]
    LeaseExpired(String),

    /// Malformed identifiers or parameters
    #[error("validation error: {0}")]
    Validation(String),

    /// Query-backend precondition not met (working-state index absent)
    #[error("status not yet available: {0}")]
    StatusUnavailable(String),

    /// Shared query store failure
    #[error("search store error: {0}")]
    Search(String),

    /// Backing store failure that is not one of the mapped kinds above
    #[error("storage error: {0}")]
    Storage(ferry_storage::Error),
}

impl From<ferry_storage::Error> for Error {
    fn from(err: ferry_storage::Error) -> Self {
        // Preserve the error kind across the storage boundary so callers
        // can keep pattern-matching on the coordinator taxonomy.
        match err {
            ferry_storage::Error::NotFound(msg) => Error::NotFound(msg),
            ferry_storage::Error::AlreadyExists(msg) => Error::AlreadyExists(msg),
            ferry_storage::Error::Validation(msg) => Error::Validation(msg),
            other => Error::Storage(other),
        }
    }
}
