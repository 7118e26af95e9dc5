//! JSON-file-backed stores
//!
//! Persists the full table to a JSON array on every mutation and reloads it
//! on open. Suited to a single coordinator process working against a local
//! file; concurrent coordinator processes need a transactional backend
//! instead.

use crate::models::WorkItem;
use crate::session::{validate_session_name, Session, SessionStore};
use crate::store::{ItemPredicate, WorkItemStore};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

fn load_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn persist_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let bytes = serde_json::to_vec_pretty(rows)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Work-item store persisted to a single JSON file.
pub struct JsonFileWorkItemStore {
    path: PathBuf,
    items: RwLock<HashMap<(String, String), WorkItem>>,
}

impl JsonFileWorkItemStore {
    /// Open the store, loading any rows already persisted at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows: Vec<WorkItem> = load_rows(&path)?;
        debug!(path = %path.display(), rows = rows.len(), "loaded work-item table");
        let items = rows
            .into_iter()
            .map(|item| ((item.session_name.clone(), item.work_item_id.clone()), item))
            .collect();
        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    fn persist(&self, items: &HashMap<(String, String), WorkItem>) -> Result<()> {
        let mut rows: Vec<&WorkItem> = items.values().collect();
        rows.sort_by(|a, b| {
            (&a.session_name, &a.work_item_id).cmp(&(&b.session_name, &b.work_item_id))
        });
        persist_rows(&self.path, &rows)
    }
}

#[async_trait]
impl WorkItemStore for JsonFileWorkItemStore {
    async fn insert(&self, item: WorkItem) -> Result<()> {
        let mut items = self.items.write();
        let key = (item.session_name.clone(), item.work_item_id.clone());
        if items.contains_key(&key) {
            return Err(Error::AlreadyExists(format!(
                "work item {} in session {}",
                key.1, key.0
            )));
        }
        items.insert(key, item);
        self.persist(&items)
    }

    async fn find(&self, session_name: &str, work_item_id: &str) -> Result<Option<WorkItem>> {
        let key = (session_name.to_string(), work_item_id.to_string());
        Ok(self.items.read().get(&key).cloned())
    }

    async fn update(&self, item: &WorkItem) -> Result<()> {
        let mut items = self.items.write();
        let key = (item.session_name.clone(), item.work_item_id.clone());
        match items.get_mut(&key) {
            Some(slot) => {
                *slot = item.clone();
            }
            None => {
                return Err(Error::NotFound(format!(
                    "work item {} in session {}",
                    key.1, key.0
                )))
            }
        }
        self.persist(&items)
    }

    async fn search(&self, predicate: ItemPredicate<'_>) -> Result<Vec<WorkItem>> {
        Ok(self
            .items
            .read()
            .values()
            .filter(|item| predicate(item))
            .cloned()
            .collect())
    }

    async fn remove(&self, predicate: ItemPredicate<'_>) -> Result<usize> {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|_, item| !predicate(item));
        let removed = before - items.len();
        if removed > 0 {
            self.persist(&items)?;
        }
        Ok(removed)
    }
}

/// Session registry persisted to a single JSON file.
pub struct JsonFileSessionStore {
    path: PathBuf,
    sessions: RwLock<HashMap<String, Session>>,
}

impl JsonFileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows: Vec<Session> = load_rows(&path)?;
        debug!(path = %path.display(), rows = rows.len(), "loaded session table");
        let sessions = rows.into_iter().map(|s| (s.name.clone(), s)).collect();
        Ok(Self {
            path,
            sessions: RwLock::new(sessions),
        })
    }

    fn persist(&self, sessions: &HashMap<String, Session>) -> Result<()> {
        let mut rows: Vec<&Session> = sessions.values().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        persist_rows(&self.path, &rows)
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn create(&self, session: Session) -> Result<()> {
        validate_session_name(&session.name)?;
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session.name) {
            return Err(Error::AlreadyExists(format!("session {}", session.name)));
        }
        sessions.insert(session.name.clone(), session);
        self.persist(&sessions)
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
        let mut sessions = self.sessions.write();
        match sessions.remove(name) {
            Some(_) => self.persist(&sessions),
            None => Err(Error::NotFound(format!("session {}", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewWorkItem;
    use chrono::Utc;
    use uuid::Uuid;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ferry-{}-{}.json", name, Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_work_items_survive_reopen() {
        let path = temp_path("items");

        {
            let store = JsonFileWorkItemStore::open(&path).unwrap();
            store
                .insert(
                    NewWorkItem {
                        work_item_id: "logs__3".to_string(),
                        index_name: "logs".to_string(),
                        shard_number: 3,
                        document_count: 42,
                        total_size_bytes: 4200,
                    }
                    .into_work_item("s1", Utc::now()),
                )
                .await
                .unwrap();
        }

        let reopened = JsonFileWorkItemStore::open(&path).unwrap();
        let found = reopened.find("s1", "logs__3").await.unwrap().unwrap();
        assert_eq!(found.document_count, 42);
        assert_eq!(found.state.label(), "pending");

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_remove_persists() {
        let path = temp_path("remove");
        let store = JsonFileWorkItemStore::open(&path).unwrap();
        store
            .insert(
                NewWorkItem {
                    work_item_id: "a".to_string(),
                    index_name: "logs".to_string(),
                    shard_number: 0,
                    document_count: 1,
                    total_size_bytes: 1,
                }
                .into_work_item("s1", Utc::now()),
            )
            .await
            .unwrap();

        let removed = store
            .remove(&|it: &WorkItem| it.session_name == "s1")
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let reopened = JsonFileWorkItemStore::open(&path).unwrap();
        assert!(reopened.find("s1", "a").await.unwrap().is_none());

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_sessions_survive_reopen() {
        let path = temp_path("sessions");

        {
            let store = JsonFileSessionStore::open(&path).unwrap();
            store.create(Session::new("s1", Utc::now())).await.unwrap();
        }

        let reopened = JsonFileSessionStore::open(&path).unwrap();
        assert!(reopened.find("s1").await.unwrap().is_some());

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let store = JsonFileWorkItemStore::open(temp_path("missing")).unwrap();
        assert!(store.find("s1", "a").await.unwrap().is_none());
    }
}
