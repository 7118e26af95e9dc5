//! Work-item store abstraction and the in-memory reference backend

use crate::models::WorkItem;
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Predicate over work items, used for search and bulk removal.
pub type ItemPredicate<'a> = &'a (dyn Fn(&WorkItem) -> bool + Send + Sync);

/// Keyed collection of work-item records.
///
/// The store provides no atomicity across calls; compound read-modify-write
/// sequences (acquire, renew, complete, cleanup) are serialized by the
/// coordinator that owns the store handle.
#[async_trait]
pub trait WorkItemStore: Send + Sync {
    /// Insert a new item. Fails with [`Error::AlreadyExists`] when an item
    /// with the same `(session_name, work_item_id)` is already present.
    async fn insert(&self, item: WorkItem) -> Result<()>;

    /// Look up a single item by its composite key.
    async fn find(&self, session_name: &str, work_item_id: &str) -> Result<Option<WorkItem>>;

    /// Replace an existing item. Fails with [`Error::NotFound`] when no row
    /// matches the item's composite key.
    async fn update(&self, item: &WorkItem) -> Result<()>;

    /// Return all items matching `predicate`.
    async fn search(&self, predicate: ItemPredicate<'_>) -> Result<Vec<WorkItem>>;

    /// Remove all items matching `predicate`, returning the removed count.
    async fn remove(&self, predicate: ItemPredicate<'_>) -> Result<usize>;
}

type ItemKey = (String, String);

fn key_of(item: &WorkItem) -> ItemKey {
    (item.session_name.clone(), item.work_item_id.clone())
}

/// In-memory work-item store.
///
/// The reference backend for a single-process coordinator; also used
/// throughout the test suites.
#[derive(Default)]
pub struct MemoryWorkItemStore {
    items: RwLock<HashMap<ItemKey, WorkItem>>,
}

impl MemoryWorkItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items currently held, across all sessions.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait]
impl WorkItemStore for MemoryWorkItemStore {
    async fn insert(&self, item: WorkItem) -> Result<()> {
        let mut items = self.items.write();
        let key = key_of(&item);
        if items.contains_key(&key) {
            return Err(Error::AlreadyExists(format!(
                "work item {} in session {}",
                key.1, key.0
            )));
        }
        items.insert(key, item);
        Ok(())
    }

    async fn find(&self, session_name: &str, work_item_id: &str) -> Result<Option<WorkItem>> {
        let key = (session_name.to_string(), work_item_id.to_string());
        Ok(self.items.read().get(&key).cloned())
    }

    async fn update(&self, item: &WorkItem) -> Result<()> {
        let mut items = self.items.write();
        let key = key_of(item);
        match items.get_mut(&key) {
            Some(slot) => {
                *slot = item.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!(
                "work item {} in session {}",
                key.1, key.0
            ))),
        }
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
        Ok(before - items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewWorkItem;
    use chrono::Utc;

    fn item(session: &str, id: &str, docs: u64) -> WorkItem {
        NewWorkItem {
            work_item_id: id.to_string(),
            index_name: "logs".to_string(),
            shard_number: 0,
            document_count: docs,
            total_size_bytes: docs * 100,
        }
        .into_work_item(session, Utc::now())
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryWorkItemStore::new();
        store.insert(item("s1", "a", 10)).await.unwrap();

        let found = store.find("s1", "a").await.unwrap().unwrap();
        assert_eq!(found.document_count, 10);
        assert!(store.find("s1", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_fails() {
        let store = MemoryWorkItemStore::new();
        store.insert(item("s1", "a", 10)).await.unwrap();

        let err = store.insert(item("s1", "a", 10)).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));

        // Same id in a different session is a different key
        store.insert(item("s2", "a", 10)).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let store = MemoryWorkItemStore::new();
        let err = store.update(&item("s1", "a", 10)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_replaces_row() {
        let store = MemoryWorkItemStore::new();
        store.insert(item("s1", "a", 10)).await.unwrap();

        let mut updated = store.find("s1", "a").await.unwrap().unwrap();
        updated.documents_processed = 7;
        store.update(&updated).await.unwrap();

        let found = store.find("s1", "a").await.unwrap().unwrap();
        assert_eq!(found.documents_processed, 7);
    }

    #[tokio::test]
    async fn test_search_and_remove_by_predicate() {
        let store = MemoryWorkItemStore::new();
        store.insert(item("s1", "a", 10)).await.unwrap();
        store.insert(item("s1", "b", 20)).await.unwrap();
        store.insert(item("s2", "c", 30)).await.unwrap();

        let s1 = store
            .search(&|it: &WorkItem| it.session_name == "s1")
            .await
            .unwrap();
        assert_eq!(s1.len(), 2);

        let removed = store
            .remove(&|it: &WorkItem| it.session_name == "s1")
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
    }
}
