//! Lorebook loading.
//!
//! A lorebook is a JSON document of keyword-triggered entries:
//!
//! ```json
//! {
//!   "entries": [{
//!     "displayName": "The Tower",
//!     "keys": ["tower"],
//!     "text": "The tower is older than the town.",
//!     "enabled": true,
//!     "forceActivation": false,
//!     "nonStoryActivatable": false,
//!     "contextConfig": {
//!       "prefix": "", "suffix": "\n",
//!       "tokenBudget": 2048, "reservedTokens": 0,
//!       "budgetPriority": 400, "insertionPosition": -1,
//!       "trimDirection": "trimBottom",
//!       "maximumTrimType": "sentence",
//!       "insertionType": "newline"
//!     }
//!   }]
//! }
//! ```
//!
//! Missing fields take entry defaults. Unknown fields are ignored, as is
//! `insertionType`. Disabled entries are skipped.

use std::path::Path;
use std::str::FromStr;

use akyuu_core::error::ContextError;
use akyuu_core::policy::{
    TrimDirection, TrimType, default_insertion_order, default_insertion_position, default_suffix,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::ContextEntry;

/// Anything that can contribute lore entries to a context pool.
pub trait LoreSource {
    fn entries(&self) -> Result<Vec<ContextEntry>, ContextError>;
}

impl LoreSource for [ContextEntry] {
    fn entries(&self) -> Result<Vec<ContextEntry>, ContextError> {
        Ok(self.to_vec())
    }
}

/// A parsed lorebook file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lorebook {
    #[serde(default)]
    pub entries: Vec<LoreRecord>,
}

/// One raw lorebook entry, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoreRecord {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub force_activation: bool,
    #[serde(default)]
    pub non_story_activatable: bool,
    #[serde(default)]
    pub context_config: LoreContextConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoreContextConfig {
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default = "default_lore_budget")]
    pub token_budget: i64,
    #[serde(default)]
    pub reserved_tokens: i64,
    #[serde(default = "default_insertion_order")]
    pub budget_priority: i32,
    #[serde(default = "default_insertion_position")]
    pub insertion_position: i32,
    #[serde(default = "default_trim_direction")]
    pub trim_direction: String,
    #[serde(default = "default_trim_type")]
    pub maximum_trim_type: String,
    #[serde(default)]
    pub insertion_type: Option<String>,
}

fn default_enabled() -> bool {
    true
}
fn default_lore_budget() -> i64 {
    2048
}
fn default_trim_direction() -> String {
    "trimBottom".into()
}
fn default_trim_type() -> String {
    "sentence".into()
}

impl Default for LoreContextConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: default_suffix(),
            token_budget: default_lore_budget(),
            reserved_tokens: 0,
            budget_priority: default_insertion_order(),
            insertion_position: default_insertion_position(),
            trim_direction: default_trim_direction(),
            maximum_trim_type: default_trim_type(),
            insertion_type: None,
        }
    }
}

impl Lorebook {
    /// Read and parse a lorebook file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ContextError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ContextError::InvalidLorebook(format!("failed to read {}: {e}", path.display()))
        })?;
        let book: Self = raw.parse()?;
        debug!(path = %path.display(), entries = book.entries.len(), "Lorebook loaded");
        Ok(book)
    }
}

impl FromStr for Lorebook {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|e| ContextError::InvalidLorebook(e.to_string()))
    }
}

impl LoreSource for Lorebook {
    fn entries(&self) -> Result<Vec<ContextEntry>, ContextError> {
        self.entries
            .iter()
            .filter(|record| record.enabled)
            .cloned()
            .map(ContextEntry::try_from)
            .collect()
    }
}

impl TryFrom<LoreRecord> for ContextEntry {
    type Error = ContextError;

    fn try_from(record: LoreRecord) -> Result<Self, Self::Error> {
        let name = record
            .display_name
            .clone()
            .or_else(|| record.keys.first().cloned())
            .unwrap_or_else(|| "lore".into());
        let invalid = |what: String| ContextError::InvalidEntry(format!("lore entry '{name}': {what}"));
        let config = record.context_config;

        let token_budget = usize::try_from(config.token_budget)
            .map_err(|_| invalid(format!("negative tokenBudget {}", config.token_budget)))?;
        let reserved_tokens = usize::try_from(config.reserved_tokens)
            .map_err(|_| invalid(format!("negative reservedTokens {}", config.reserved_tokens)))?;
        let trim_direction = match config.trim_direction.as_str() {
            "trimTop" => TrimDirection::Top,
            "trimBottom" => TrimDirection::Bottom,
            "doNotTrim" => TrimDirection::None,
            other => return Err(invalid(format!("unknown trimDirection '{other}'"))),
        };
        let trim_type = match config.maximum_trim_type.as_str() {
            "sentence" => TrimType::Sentence,
            "token" => TrimType::Token,
            "newline" => TrimType::Newline,
            other => return Err(invalid(format!("unknown maximumTrimType '{other}'"))),
        };

        ContextEntry::builder(record.text)
            .label(name.clone())
            .keys(record.keys)
            .prefix(config.prefix)
            .suffix(config.suffix)
            .token_budget(token_budget)
            .reserved_tokens(reserved_tokens)
            .insertion_order(config.budget_priority)
            .insertion_position(config.insertion_position)
            .trim_direction(trim_direction)
            .trim_type(trim_type)
            .forced(record.force_activation)
            .cascading(record.non_story_activatable)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BOOK: &str = r#"{
        "lorebookVersion": 4,
        "entries": [
            {
                "displayName": "The Tower",
                "keys": ["tower", "spire"],
                "text": "The tower is older than the town.",
                "contextConfig": {
                    "prefix": "",
                    "suffix": "\n",
                    "tokenBudget": 200,
                    "reservedTokens": 0,
                    "budgetPriority": 400,
                    "insertionPosition": 0,
                    "trimDirection": "trimTop",
                    "maximumTrimType": "newline",
                    "insertionType": "newline"
                },
                "enabled": true,
                "forceActivation": false,
                "nonStoryActivatable": true
            },
            {
                "displayName": "Hidden",
                "keys": ["hidden"],
                "text": "Never shown.",
                "enabled": false
            },
            {
                "keys": ["moat"],
                "text": "The moat is dry."
            }
        ]
    }"#;

    #[test]
    fn parses_records_and_skips_disabled() {
        let book: Lorebook = BOOK.parse().unwrap();
        assert_eq!(book.entries.len(), 3);
        let entries = book.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.label() != Some("Hidden")));
    }

    #[test]
    fn context_config_maps_onto_entry() {
        let book: Lorebook = BOOK.parse().unwrap();
        let tower = &book.entries().unwrap()[0];
        assert_eq!(tower.label(), Some("The Tower"));
        assert_eq!(tower.keys(), ["tower", "spire"]);
        assert_eq!(tower.text(), "The tower is older than the town.\n");
        assert_eq!(tower.token_budget(), 200);
        assert_eq!(tower.insertion_order(), 400);
        assert_eq!(tower.insertion_position(), 0);
        assert_eq!(tower.trim_direction(), TrimDirection::Top);
        assert_eq!(tower.trim_type(), TrimType::Newline);
        assert!(!tower.forced_activation());
        assert!(tower.cascading_activation());
    }

    #[test]
    fn missing_config_takes_defaults() {
        let book: Lorebook = BOOK.parse().unwrap();
        let moat = &book.entries().unwrap()[1];
        assert_eq!(moat.label(), Some("moat"));
        assert_eq!(moat.token_budget(), 2048);
        assert_eq!(moat.insertion_order(), 100);
        assert_eq!(moat.insertion_position(), -1);
        assert_eq!(moat.trim_direction(), TrimDirection::Bottom);
        assert_eq!(moat.trim_type(), TrimType::Sentence);
    }

    #[test]
    fn do_not_trim_maps_to_none() {
        let record: LoreRecord = serde_json::from_str(
            r#"{"keys": ["x"], "text": "x", "contextConfig": {"trimDirection": "doNotTrim"}}"#,
        )
        .unwrap();
        let entry = ContextEntry::try_from(record).unwrap();
        assert_eq!(entry.trim_direction(), TrimDirection::None);
    }

    #[test]
    fn negative_budget_is_rejected() {
        let record: LoreRecord = serde_json::from_str(
            r#"{"keys": ["x"], "text": "x", "contextConfig": {"tokenBudget": -5}}"#,
        )
        .unwrap();
        let err = ContextEntry::try_from(record).unwrap_err();
        assert!(matches!(err, ContextError::InvalidEntry(msg) if msg.contains("tokenBudget")));
    }

    #[test]
    fn negative_reservation_is_rejected() {
        let record: LoreRecord = serde_json::from_str(
            r#"{"keys": ["x"], "text": "x", "contextConfig": {"reservedTokens": -1}}"#,
        )
        .unwrap();
        assert!(ContextEntry::try_from(record).is_err());
    }

    #[test]
    fn reservation_above_budget_is_kept() {
        let record: LoreRecord = serde_json::from_str(
            r#"{"keys": ["x"], "text": "x", "contextConfig": {"tokenBudget": 8, "reservedTokens": 32}}"#,
        )
        .unwrap();
        let entry = ContextEntry::try_from(record).unwrap();
        assert_eq!(entry.token_budget(), 8);
        assert_eq!(entry.reserved_tokens(), 32);
    }

    #[test]
    fn unknown_trim_type_is_rejected() {
        let record: LoreRecord = serde_json::from_str(
            r#"{"keys": ["x"], "text": "x", "contextConfig": {"maximumTrimType": "paragraph"}}"#,
        )
        .unwrap();
        assert!(ContextEntry::try_from(record).is_err());
    }

    #[test]
    fn malformed_json_is_invalid_lorebook() {
        let err = "{ not json".parse::<Lorebook>().unwrap_err();
        assert!(matches!(err, ContextError::InvalidLorebook(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BOOK.as_bytes()).unwrap();
        let book = Lorebook::from_path(file.path()).unwrap();
        assert_eq!(book.entries().unwrap().len(), 2);
    }

    #[test]
    fn missing_file_is_invalid_lorebook() {
        let err = Lorebook::from_path("/nonexistent/book.lorebook").unwrap_err();
        assert!(matches!(err, ContextError::InvalidLorebook(_)));
    }

    #[test]
    fn entry_slices_are_lore_sources() {
        let entries = vec![ContextEntry::builder("x").build().unwrap()];
        assert_eq!(entries.entries().unwrap(), entries);
    }
}
