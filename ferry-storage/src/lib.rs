//! # Ferry Storage
//!
//! Durable storage for backfill work items and migration sessions.
//!
//! The store layer is pure mechanism: keyed insert/find/update plus
//! predicate-based search and removal. All leasing and reclamation policy
//! lives in `ferry-coordinator` on top of the [`WorkItemStore`] trait.

pub mod json_file;
pub mod models;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use json_file::{JsonFileSessionStore, JsonFileWorkItemStore};
pub use models::{NewWorkItem, ProgressUpdate, WorkItem, WorkItemState};
pub use session::{MemorySessionStore, Session, SessionStore};
pub use store::{MemoryWorkItemStore, WorkItemStore};

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for storage operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
