//! Context entries: one prompt fragment plus its budget and placement policy.
//!
//! Entries are built once at the boundary through [`ContextEntryBuilder`] (or
//! `TryFrom<LoreRecord>` for lorebook data) and are immutable afterwards.

use akyuu_core::error::{ContextError, TokenizerError};
use akyuu_core::policy::{EntryPolicy, TrimDirection, TrimType};
use akyuu_core::tokenizer::{TokenId, Tokenizer};

use crate::trim::{trim_newlines, trim_sentences, trim_tokens};

/// A single fragment of prompt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    label: Option<String>,
    keys: Vec<String>,
    text: String,
    token_budget: usize,
    reserved_tokens: usize,
    insertion_order: i32,
    insertion_position: i32,
    trim_direction: TrimDirection,
    trim_type: TrimType,
    forced_activation: bool,
    cascading_activation: bool,
}

impl ContextEntry {
    /// Start building an entry around `body`.
    pub fn builder(body: impl Into<String>) -> ContextEntryBuilder {
        ContextEntryBuilder::new(body)
    }

    /// Display name used in assembly reports.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Activation keys, deduplicated, in insertion order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The rendered text: prefix + body + suffix, or empty for an empty body.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    pub fn reserved_tokens(&self) -> usize {
        self.reserved_tokens
    }

    pub fn insertion_order(&self) -> i32 {
        self.insertion_order
    }

    pub fn insertion_position(&self) -> i32 {
        self.insertion_position
    }

    pub fn trim_direction(&self) -> TrimDirection {
        self.trim_direction
    }

    pub fn trim_type(&self) -> TrimType {
        self.trim_type
    }

    pub fn forced_activation(&self) -> bool {
        self.forced_activation
    }

    pub fn cascading_activation(&self) -> bool {
        self.cascading_activation
    }

    /// Whether any non-empty key occurs in `haystack_lower`.
    ///
    /// `haystack_lower` must already be lowercased.
    pub fn is_triggered_by(&self, haystack_lower: &str) -> bool {
        self.keys
            .iter()
            .filter(|key| !key.is_empty())
            .any(|key| haystack_lower.contains(&key.to_lowercase()))
    }

    /// The token length this entry may occupy, given `max_length` tokens of
    /// room and a per-entry cap of `token_budget`.
    ///
    /// Never negative: an exhausted budget yields 0.
    pub fn target_length(&self, num_tokens: usize, max_length: i64, token_budget: usize) -> usize {
        let n = num_tokens as i64;
        let cap = i64::try_from(token_budget).unwrap_or(i64::MAX);
        let projected = max_length - n;
        let target = if projected > cap {
            cap
        } else if projected >= 0 {
            n
        } else {
            max_length
        };
        usize::try_from(target).unwrap_or(0)
    }

    /// Encode and shorten this entry to fit `max_length`.
    ///
    /// Newline trimming is final once selected. Otherwise sentence trimming
    /// runs for sentence entries or whenever the text is over target, then
    /// token trimming runs for token entries or whenever it is still over.
    pub fn trim(
        &self,
        tokenizer: &dyn Tokenizer,
        max_length: i64,
        token_budget: usize,
    ) -> Result<Vec<TokenId>, TokenizerError> {
        let mut tokens = tokenizer.encode(&self.text)?;
        let target = self.target_length(tokens.len(), max_length, token_budget);
        let direction = self.trim_direction;

        if self.trim_type == TrimType::Newline {
            return trim_newlines(tokenizer, &tokens, direction, target);
        }
        if self.trim_type == TrimType::Sentence || tokens.len() > target {
            tokens = trim_sentences(tokenizer, &tokens, direction, target)?;
        }
        if self.trim_type == TrimType::Token || tokens.len() > target {
            tokens = trim_tokens(&tokens, direction, target);
        }
        Ok(tokens)
    }

    /// [`trim`](Self::trim), decoded back to text.
    pub fn text_within(
        &self,
        tokenizer: &dyn Tokenizer,
        max_length: i64,
        token_budget: usize,
    ) -> Result<String, TokenizerError> {
        let tokens = self.trim(tokenizer, max_length, token_budget)?;
        tokenizer.decode(&tokens)
    }
}

/// Builder for [`ContextEntry`]. Starts from [`EntryPolicy::default`].
#[derive(Debug, Clone)]
pub struct ContextEntryBuilder {
    body: String,
    label: Option<String>,
    keys: Vec<String>,
    policy: EntryPolicy,
}

impl ContextEntryBuilder {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            label: None,
            keys: Vec::new(),
            policy: EntryPolicy::default(),
        }
    }

    /// Replace every policy field at once.
    pub fn policy(mut self, policy: EntryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.policy.prefix = prefix.into();
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.policy.suffix = suffix.into();
        self
    }

    pub fn token_budget(mut self, token_budget: usize) -> Self {
        self.policy.token_budget = token_budget;
        self
    }

    pub fn reserved_tokens(mut self, reserved_tokens: usize) -> Self {
        self.policy.reserved_tokens = reserved_tokens;
        self
    }

    pub fn insertion_order(mut self, insertion_order: i32) -> Self {
        self.policy.insertion_order = insertion_order;
        self
    }

    pub fn insertion_position(mut self, insertion_position: i32) -> Self {
        self.policy.insertion_position = insertion_position;
        self
    }

    pub fn trim_direction(mut self, trim_direction: TrimDirection) -> Self {
        self.policy.trim_direction = trim_direction;
        self
    }

    pub fn trim_type(mut self, trim_type: TrimType) -> Self {
        self.policy.trim_type = trim_type;
        self
    }

    pub fn forced(mut self, forced: bool) -> Self {
        self.policy.forced_activation = forced;
        self
    }

    pub fn cascading(mut self, cascading: bool) -> Self {
        self.policy.cascading_activation = cascading;
        self
    }

    /// Render the entry.
    ///
    /// A reservation above the token budget is allowed; assembly charges
    /// the lesser of the reservation and the rendered length.
    pub fn build(self) -> Result<ContextEntry, ContextError> {
        let policy = self.policy;

        let text = if self.body.is_empty() {
            String::new()
        } else {
            format!("{}{}{}", policy.prefix, self.body, policy.suffix)
        };

        let mut keys: Vec<String> = Vec::with_capacity(self.keys.len());
        for key in self.keys {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        Ok(ContextEntry {
            label: self.label,
            keys,
            text,
            token_budget: policy.token_budget,
            reserved_tokens: policy.reserved_tokens,
            insertion_order: policy.insertion_order,
            insertion_position: policy.insertion_position,
            trim_direction: policy.trim_direction,
            trim_type: policy.trim_type,
            forced_activation: policy.forced_activation,
            cascading_activation: policy.cascading_activation,
        })
    }
}
