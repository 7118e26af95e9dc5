//! Migration session registry
//!
//! Every work-item and shard-status operation is scoped to a registered
//! session, so an unknown session fails distinctly from an empty queue.

use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MAX_SESSION_NAME_LEN: usize = 50;

/// A named migration run; the scoping key for all work items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Session {
    pub fn new(name: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            created: now,
            updated: now,
        }
    }
}

/// Session names end up in URLs and index names, so the accepted alphabet
/// is restricted to URL-safe characters.
pub fn validate_session_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_SESSION_NAME_LEN {
        return Err(Error::Validation(format!(
            "session name must be 1-{} characters, got {}",
            MAX_SESSION_NAME_LEN,
            name.len()
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::Validation(format!(
            "session name '{}' may only contain letters, digits, '_' and '-'",
            name
        )));
    }
    Ok(())
}

/// Registry of migration sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Register a session. Validates the name and fails with
    /// [`Error::AlreadyExists`] on a duplicate.
    async fn create(&self, session: Session) -> Result<()>;

    async fn find(&self, name: &str) -> Result<Option<Session>>;

    async fn list(&self) -> Result<Vec<Session>>;

    /// Remove a session. Fails with [`Error::NotFound`] when absent.
    async fn delete(&self, name: &str) -> Result<()>;
}

/// In-memory session registry.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: Session) -> Result<()> {
        validate_session_name(&session.name)?;
        // Existence check and insert under the same write guard
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session.name) {
            return Err(Error::AlreadyExists(format!("session {}", session.name)));
        }
        sessions.insert(session.name.clone(), session);
        Ok(())
    }

    async fn find(&self, name: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.sessions.read().values().cloned().collect();
        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sessions)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        match self.sessions.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("session {}", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemorySessionStore::new();
        store.create(Session::new("rfs-2026", Utc::now())).await.unwrap();

        assert!(store.find("rfs-2026").await.unwrap().is_some());
        assert!(store.find("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let store = MemorySessionStore::new();
        store.create(Session::new("s1", Utc::now())).await.unwrap();

        let err = store.create(Session::new("s1", Utc::now())).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_fails() {
        let store = MemorySessionStore::new();
        let err = store.delete("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_name_validation_rejects_bad_characters() {
        assert!(validate_session_name("ok_name-123").is_ok());
        assert!(matches!(
            validate_session_name("has space"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_session_name("slash/name"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_name_validation_rejects_bad_lengths() {
        assert!(matches!(
            validate_session_name(""),
            Err(Error::Validation(_))
        ));
        let long = "a".repeat(51);
        assert!(matches!(
            validate_session_name(&long),
            Err(Error::Validation(_))
        ));
        assert!(validate_session_name(&"a".repeat(50)).is_ok());
    }
}
