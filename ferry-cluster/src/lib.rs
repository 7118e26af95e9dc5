//! # Ferry Cluster
//!
//! HTTP access to the target search cluster: existence probes and
//! aggregation queries over the shared working-state index, plus archive of
//! that index once a backfill has drained.
//!
//! This crate supplies the concrete [`ShardStateStore`] backend consumed by
//! `ferry_coordinator::ShardStatusDeriver`.
//!
//! [`ShardStateStore`]: ferry_coordinator::ShardStateStore

pub mod archive;
pub mod client;
pub mod queries;
mod shard_store;

pub use archive::{backup_path, fetch_all_documents, perform_archive};
pub use client::{ClusterClient, ClusterConfig};

/// Result type for cluster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cluster operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {path}: {body}")]
    UnexpectedStatus {
        status: u16,
        path: String,
        body: String,
    },

    #[error("index {0} does not exist")]
    IndexNotFound(String),

    #[error("workers are still in progress")]
    WorkersInProgress,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
