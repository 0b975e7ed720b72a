//! In-memory record store: useful for testing and ephemeral sessions.

use akyuu_core::error::StoreError;
use akyuu_core::store::{RecordKind, RecordStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Records = BTreeMap<(RecordKind, String), String>;

/// A record store held entirely in memory. Nothing survives the process.
#[derive(Clone)]
pub struct InMemoryStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of records across all kinds.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<String>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(&(kind, key.to_string())).cloned())
    }

    async fn put(&self, kind: RecordKind, key: &str, payload: String) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert((kind, key.to_string()), payload);
        Ok(())
    }

    async fn delete(&self, kind: RecordKind, key: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        Ok(records.remove(&(kind, key.to_string())).is_some())
    }

    async fn keys(&self, kind: RecordKind) -> Result<Vec<String>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, key)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_and_get() {
        let store = InMemoryStore::new();
        store
            .put(RecordKind::Story, "abc", "{\"title\":\"x\"}".into())
            .await
            .unwrap();
        let got = store.get(RecordKind::Story, "abc").await.unwrap();
        assert_eq!(got.as_deref(), Some("{\"title\":\"x\"}"));
    }

    #[tokio::test]
    async fn kinds_are_separate_namespaces() {
        let store = InMemoryStore::new();
        store.put(RecordKind::User, "1", "user".into()).await.unwrap();
        assert!(store.get(RecordKind::Story, "1").await.unwrap().is_none());
        assert_eq!(store.keys(RecordKind::User).await.unwrap(), ["1"]);
        assert!(store.keys(RecordKind::Story).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn put_replaces() {
        let store = InMemoryStore::new();
        store.put(RecordKind::User, "1", "old".into()).await.unwrap();
        store.put(RecordKind::User, "1", "new".into()).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get(RecordKind::User, "1").await.unwrap().as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = InMemoryStore::new();
        store.put(RecordKind::Story, "s", "x".into()).await.unwrap();
        assert!(store.delete(RecordKind::Story, "s").await.unwrap());
        assert!(!store.delete(RecordKind::Story, "s").await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn keys_are_sorted() {
        let store = InMemoryStore::new();
        for key in ["c", "a", "b"] {
            store.put(RecordKind::Story, key, String::new()).await.unwrap();
        }
        assert_eq!(store.keys(RecordKind::Story).await.unwrap(), ["a", "b", "c"]);
    }
}
