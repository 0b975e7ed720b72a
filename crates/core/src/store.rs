//! Record store trait: persistence of opaque serialized records.
//!
//! Users and stories are stored as serialized strings under a key. The store
//! never interprets the payload; decoding belongs to the story layer.
//!
//! Implementations: in-memory (for testing), file-backed JSON.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StoreError;

/// Which table a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    User,
    Story,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Story => "story",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The core RecordStore trait.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The backend name (e.g. "in_memory", "file").
    fn name(&self) -> &str;

    /// Fetch a record, `None` when absent.
    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<String>, StoreError>;

    /// Create or replace a record.
    async fn put(&self, kind: RecordKind, key: &str, payload: String) -> Result<(), StoreError>;

    /// Delete a record. Returns whether it existed.
    async fn delete(&self, kind: RecordKind, key: &str) -> Result<bool, StoreError>;

    /// All keys of a kind, sorted.
    async fn keys(&self, kind: RecordKind) -> Result<Vec<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_kind_names() {
        assert_eq!(RecordKind::User.to_string(), "user");
        assert_eq!(RecordKind::Story.as_str(), "story");
    }

    #[test]
    fn record_kind_serializes_snake_case() {
        let json = serde_json::to_string(&RecordKind::Story).unwrap();
        assert_eq!(json, "\"story\"");
    }
}
