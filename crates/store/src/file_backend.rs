//! File-based record store: persistent JSON-lines storage.
//!
//! Each line of the file is one record: `{"kind", "key", "payload"}`.
//! Records are loaded into memory on creation and the whole file is
//! rewritten on every mutation.
//!
//! Storage location: `~/.akyuu/storage/records.jsonl` by default.

use akyuu_core::error::StoreError;
use akyuu_core::store::{RecordKind, RecordStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

type Records = BTreeMap<(RecordKind, String), String>;

#[derive(Serialize, Deserialize)]
struct RecordLine {
    kind: RecordKind,
    key: String,
    payload: String,
}

/// A file-backed record store using JSONL.
pub struct FileStore {
    path: PathBuf,
    records: Arc<RwLock<Records>>,
}

impl FileStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty and is created on first write.
    pub fn new(path: PathBuf) -> Self {
        let records = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = records.len(), "File record store loaded");
        Self {
            path,
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Open `records.jsonl` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("records.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Records {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Records::new(),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<RecordLine>(line) {
                Ok(record) => Some(((record.kind, record.key), record.payload)),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted record");
                    None
                }
            })
            .collect()
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let records = self.records.read().await;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("Failed to create store directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for ((kind, key), payload) in records.iter() {
            let line = serde_json::to_string(&RecordLine {
                kind: *kind,
                key: key.clone(),
                payload: payload.clone(),
            })
            .map_err(|e| StoreError::Storage(format!("Failed to serialize record: {e}")))?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| StoreError::Storage(format!("Failed to write store file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileStore {
    fn name(&self) -> &str {
        "file"
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
        self.flush().await
    }

    async fn delete(&self, kind: RecordKind, key: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let deleted = records.remove(&(kind, key.to_string())).is_some();
        drop(records);
        if deleted {
            self.flush().await?;
        }
        Ok(deleted)
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
