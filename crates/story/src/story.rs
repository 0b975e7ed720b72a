//! Stories: an append-only log of text with memory and an author's note.

use akyuu_config::EntryPolicies;
use akyuu_context::{AssembledContext, ContextEntry, ContextManager, LoreSource};
use akyuu_core::error::{Error, Result, StoreError, StoryError};
use akyuu_core::store::{RecordKind, RecordStore};
use akyuu_core::tokenizer::Tokenizer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Prepended to every prompt of a story with `context_preamble` set.
pub const PREAMBLE: &str = "***\n";

/// Who wrote a piece of story text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    User,
    Ai,
    /// Text that replaced an earlier action.
    Altered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryText {
    pub text: String,
    pub kind: TextKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryMetadata {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub authors_note: String,
    #[serde(default)]
    pub lorebook: Option<String>,
    #[serde(default = "default_true")]
    pub context_preamble: bool,
}

fn default_version() -> u32 {
    1
}
fn default_title() -> String {
    "New Story".into()
}
fn default_description() -> String {
    "A new beginning...".into()
}
fn default_true() -> bool {
    true
}

impl Default for StoryMetadata {
    fn default() -> Self {
        Self {
            version: default_version(),
            title: default_title(),
            description: default_description(),
            memory: String::new(),
            authors_note: String::new(),
            lorebook: None,
            context_preamble: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryContent {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<StoryText>,
}

impl Default for StoryContent {
    fn default() -> Self {
        Self {
            version: default_version(),
            entries: Vec::new(),
        }
    }
}

/// How [`Story::raw_text`] renders the log.
#[derive(Debug, Clone, Default)]
pub struct RawTextOptions {
    /// Wrap user text in `**``…``**` and other text in ``` ``…`` ```.
    pub format: bool,
    /// Render plainly except for a bold last entry. Overrides `format`.
    pub highlight_last_line: bool,
    /// Keep only the last `n` characters.
    pub char_limit: Option<usize>,
}

/// A story owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub owner_id: u64,
    #[serde(default)]
    pub metadata: StoryMetadata,
    #[serde(default)]
    pub content: StoryContent,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Story {
    pub fn new(owner_id: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            metadata: StoryMetadata::default(),
            content: StoryContent::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn entries(&self) -> &[StoryText] {
        &self.content.entries
    }

    pub fn is_empty(&self) -> bool {
        self.content.entries.is_empty()
    }

    /// Append text to the log.
    pub fn action(&mut self, text: impl Into<String>, kind: TextKind) {
        self.content.entries.push(StoryText {
            text: text.into(),
            kind,
        });
        self.touch();
    }

    /// Remove the last entry. No-op on an empty story.
    pub fn undo(&mut self) -> Option<StoryText> {
        let popped = self.content.entries.pop();
        if popped.is_some() {
            self.touch();
        }
        popped
    }

    /// Replace the last entry with `text` on a new line.
    pub fn alter(&mut self, text: &str) -> std::result::Result<(), StoryError> {
        if self.undo().is_none() {
            return Err(StoryError::EmptyStory);
        }
        self.action(format!("\n{text}"), TextKind::Altered);
        Ok(())
    }

    /// Replace the last entry with user text, starting a new line if the
    /// remaining log does not already end with one.
    pub fn add(&mut self, text: &str) -> std::result::Result<(), StoryError> {
        if self.undo().is_none() {
            return Err(StoryError::EmptyStory);
        }
        let prefix = match self.content.entries.last() {
            Some(last) if !last.text.ends_with('\n') => "\n",
            _ => "",
        };
        self.action(format!("{prefix}{text}\n"), TextKind::User);
        Ok(())
    }

    pub fn set_memory(&mut self, memory: impl Into<String>) {
        self.metadata.memory = memory.into();
        self.touch();
    }

    /// Set the author's note. An empty note clears it.
    pub fn set_authors_note(&mut self, note: &str) {
        self.metadata.authors_note = if note.is_empty() {
            String::new()
        } else {
            format!("[ A/N: {note} ]")
        };
        self.touch();
    }

    /// Change the title and/or description. `None` leaves a field as is.
    pub fn edit(&mut self, title: Option<String>, description: Option<String>) {
        if let Some(title) = title {
            self.metadata.title = title;
        }
        if let Some(description) = description {
            self.metadata.description = description;
        }
        self.touch();
    }

    /// The story log as one string.
    pub fn raw_text(&self, options: &RawTextOptions) -> String {
        let format = options.format && !options.highlight_last_line;
        let last = self.content.entries.len().saturating_sub(1);
        let mut out = String::new();

        for (i, entry) in self.content.entries.iter().enumerate() {
            if options.highlight_last_line && i == last {
                out.push_str(&format!("**{}**", entry.text));
            } else if format && entry.kind == TextKind::User {
                out.push_str(&format!("**``{}``**", entry.text));
            } else if format {
                out.push_str(&format!("``{}``", entry.text));
            } else {
                out.push_str(&entry.text);
            }
        }

        if let Some(limit) = options.char_limit {
            let len = out.chars().count();
            if len > limit {
                out = out.chars().skip(len - limit).collect();
                if format {
                    out.push_str("...");
                }
            }
        }
        out
    }

    /// The built-in entries (story, memory, author's note) under `policies`.
    pub fn builtin_entries(&self, policies: &EntryPolicies) -> Result<Vec<ContextEntry>> {
        let story = ContextEntry::builder(self.raw_text(&RawTextOptions::default()))
            .policy(policies.story.clone())
            .label("story")
            .build()?;
        let memory = ContextEntry::builder(self.metadata.memory.clone())
            .policy(policies.memory.clone())
            .label("memory")
            .build()?;
        let note = ContextEntry::builder(self.metadata.authors_note.clone())
            .policy(policies.authors_note.clone())
            .label("authors_note")
            .build()?;
        Ok(vec![story, memory, note])
    }

    /// Assemble the prompt for this story within `max_tokens`.
    pub fn context<L>(
        &self,
        tokenizer: Arc<dyn Tokenizer>,
        lore: &L,
        policies: &EntryPolicies,
        max_tokens: usize,
    ) -> Result<String>
    where
        L: LoreSource + ?Sized,
    {
        self.context_with_report(tokenizer, lore, policies, max_tokens)
            .map(|assembled| assembled.text)
    }

    /// [`context`](Self::context), with the assembly report. The report's
    /// budget excludes the preamble.
    pub fn context_with_report<L>(
        &self,
        tokenizer: Arc<dyn Tokenizer>,
        lore: &L,
        policies: &EntryPolicies,
        max_tokens: usize,
    ) -> Result<AssembledContext>
    where
        L: LoreSource + ?Sized,
    {
        let (preamble, budget) = if self.metadata.context_preamble {
            (PREAMBLE, max_tokens.saturating_sub(1))
        } else {
            ("", max_tokens)
        };

        let mut manager = ContextManager::new(tokenizer, budget);
        manager.add_entries(lore.entries()?);
        manager.add_entries(self.builtin_entries(policies)?);

        let mut assembled = manager.assemble_with_report(budget)?;
        debug!(story = %self.id, budget, pool = manager.entries().len(), "Story context built");
        assembled.text.insert_str(0, preamble);
        Ok(assembled)
    }

    // ── Persistence ────────────────────────────────────────────────────

    pub async fn save(&self, store: &dyn RecordStore) -> Result<()> {
        let payload = serde_json::to_string(self)?;
        store.put(RecordKind::Story, &self.id, payload).await?;
        Ok(())
    }

    pub async fn load(store: &dyn RecordStore, id: &str) -> Result<Self> {
        let payload = store
            .get(RecordKind::Story, id)
            .await?
            .ok_or_else(|| StoryError::UnknownStory(id.to_string()))?;
        serde_json::from_str(&payload).map_err(|e| {
            Error::Store(StoreError::Corrupted {
                key: id.to_string(),
                reason: e.to_string(),
            })
        })
    }

    pub async fn delete(&self, store: &dyn RecordStore) -> Result<bool> {
        Ok(store.delete(RecordKind::Story, &self.id).await?)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Display for Story {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}
