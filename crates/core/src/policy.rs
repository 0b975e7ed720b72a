//! Trim and placement policy for a context entry.
//!
//! These are plain data: the trim engine and the assembler in
//! `akyuu-context` give them meaning. They live here so configuration can
//! describe entry policies without depending on the assembler.

use serde::{Deserialize, Serialize};

/// Which end of an entry is discarded when it has to shrink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimDirection {
    /// Discard leading content, keep the tail.
    Top,
    /// Discard trailing content, keep the head.
    #[default]
    Bottom,
    /// Never trim.
    None,
}

/// The unit an entry is shortened by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimType {
    /// Whole `\n`-delimited lines. Never escalated to finer units.
    Newline,
    /// Whole sentences, falling back to tokens when that is not enough.
    #[default]
    Sentence,
    /// Individual tokens.
    Token,
}

/// The full budget and placement policy of an entry, minus its text and keys.
///
/// Used for configuring the built-in story, memory and author's note entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPolicy {
    /// Text placed before the body (skipped for empty bodies).
    #[serde(default)]
    pub prefix: String,

    /// Text placed after the body (skipped for empty bodies).
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Hard cap on tokens this entry may occupy.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Tokens guaranteed to this entry regardless of the shared budget.
    #[serde(default)]
    pub reserved_tokens: usize,

    /// Allocation priority; higher goes first.
    #[serde(default = "default_insertion_order")]
    pub insertion_order: i32,

    /// Line index the entry is spliced at; negative counts from the end.
    #[serde(default = "default_insertion_position")]
    pub insertion_position: i32,

    #[serde(default)]
    pub trim_direction: TrimDirection,

    #[serde(default)]
    pub trim_type: TrimType,

    #[serde(default)]
    pub forced_activation: bool,

    #[serde(default)]
    pub cascading_activation: bool,
}

pub fn default_suffix() -> String {
    "\n".into()
}
pub fn default_token_budget() -> usize {
    2048
}
pub fn default_insertion_order() -> i32 {
    100
}
pub fn default_insertion_position() -> i32 {
    -1
}

impl Default for EntryPolicy {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: default_suffix(),
            token_budget: default_token_budget(),
            reserved_tokens: 0,
            insertion_order: default_insertion_order(),
            insertion_position: default_insertion_position(),
            trim_direction: TrimDirection::default(),
            trim_type: TrimType::default(),
            forced_activation: false,
            cascading_activation: false,
        }
    }
}

impl EntryPolicy {
    /// Policy of the story text entry: the whole narrative, kept from the
    /// end, always last in the prompt.
    pub fn story() -> Self {
        Self {
            suffix: String::new(),
            reserved_tokens: 512,
            insertion_order: 0,
            insertion_position: -1,
            trim_direction: TrimDirection::Top,
            forced_activation: true,
            cascading_activation: true,
            ..Self::default()
        }
    }

    /// Policy of the memory entry: first in the prompt, allocated first.
    pub fn memory() -> Self {
        Self {
            insertion_order: 800,
            insertion_position: 0,
            forced_activation: true,
            cascading_activation: true,
            ..Self::default()
        }
    }

    /// Policy of the author's note: a few lines above the end, allocated last.
    pub fn authors_note() -> Self {
        Self {
            insertion_order: -400,
            insertion_position: -4,
            forced_activation: true,
            cascading_activation: true,
            ..Self::default()
        }
    }
}
