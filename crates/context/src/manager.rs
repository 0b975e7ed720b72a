//! Context assembly: turn a pool of entries into one bounded prompt.
//!
//! # Algorithm
//!
//! 1. Resolve activation (see [`crate::activation`]).
//! 2. Walk active entries by descending `insertion_order` with a running,
//!    signed budget. Each entry is charged its reservation up front, trimmed
//!    to the larger of the remaining room and that reservation, then charged
//!    for what it actually used.
//! 3. Splice the entry's lines into the output at its `insertion_position`,
//!    resolved against the lines already placed.
//! 4. Join with `\n` and strip surrounding whitespace.
//!
//! # Determinism
//!
//! Assembly is pure over its inputs: identical pools and budgets always
//! produce identical text.

use std::sync::Arc;

use akyuu_core::error::ContextError;
use akyuu_core::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::activation::{self, Activation};
use crate::entry::ContextEntry;

// ── Types ─────────────────────────────────────────────────────────────────

/// The assembled prompt plus a report of how it was built.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub text: String,
    pub metadata: AssemblyMetadata,
}

/// Detailed metadata about one assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Budget the assembly ran with.
    pub budget: usize,
    /// Tokens in the final text.
    pub total_tokens: usize,
    /// Budget left after the last entry. Negative when reservations overdrew it.
    pub remaining_budget: i64,
    /// `total_tokens / budget` as a percentage (0.0 for a zero budget).
    pub utilization_pct: f32,
    /// One record per active entry, in processing order.
    pub entries: Vec<EntryStats>,
    /// Labels of pool entries that were not activated.
    pub inactive: Vec<String>,
}

/// What happened to a single entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryStats {
    pub label: String,
    pub insertion_order: i32,
    /// Encoded length of the untrimmed entry.
    pub tokens_available: usize,
    /// Encoded length after trimming.
    pub tokens_used: usize,
    /// Reservation actually charged.
    pub reserved_tokens: usize,
    pub trimmed: bool,
    /// Resolved line index the entry was spliced at.
    pub splice_index: usize,
    pub lines_inserted: usize,
}

// ── Manager ───────────────────────────────────────────────────────────────

/// A pool of entries bound to a tokenizer and a default budget.
///
/// Created per assembly request; holds no state across requests.
pub struct ContextManager {
    tokenizer: Arc<dyn Tokenizer>,
    token_budget: usize,
    entries: Vec<ContextEntry>,
}

impl ContextManager {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, token_budget: usize) -> Self {
        Self {
            tokenizer,
            token_budget,
            entries: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, entry: ContextEntry) {
        self.entries.push(entry);
    }

    pub fn add_entries(&mut self, entries: impl IntoIterator<Item = ContextEntry>) {
        self.entries.extend(entries);
    }

    /// Remove the first entry equal to `entry`. Returns whether one was found.
    pub fn remove_entry(&mut self, entry: &ContextEntry) -> bool {
        match self.entries.iter().position(|e| e == entry) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    /// Assemble with the manager's own budget.
    pub fn context(&self) -> Result<String, ContextError> {
        self.assemble(self.token_budget)
    }

    pub fn assemble(&self, budget: usize) -> Result<String, ContextError> {
        assemble(self.tokenizer.as_ref(), &self.entries, budget)
    }

    pub fn assemble_with_report(&self, budget: usize) -> Result<AssembledContext, ContextError> {
        assemble_with_report(self.tokenizer.as_ref(), &self.entries, budget)
    }
}

// ── Assembly ──────────────────────────────────────────────────────────────

/// Assemble `entries` into a prompt of roughly `budget` tokens.
pub fn assemble(
    tokenizer: &dyn Tokenizer,
    entries: &[ContextEntry],
    budget: usize,
) -> Result<String, ContextError> {
    assemble_with_report(tokenizer, entries, budget).map(|assembled| assembled.text)
}

/// [`assemble`], also reporting per-entry statistics.
pub fn assemble_with_report(
    tokenizer: &dyn Tokenizer,
    entries: &[ContextEntry],
    budget: usize,
) -> Result<AssembledContext, ContextError> {
    let activation = activation::resolve(tokenizer, entries)?;
    let mut remaining = i64::try_from(budget).unwrap_or(i64::MAX);
    let mut lines: Vec<String> = Vec::new();
    let mut stats = Vec::with_capacity(activation.order().len());

    for &index in activation.order() {
        let entry = &entries[index];
        let (entry_lines, entry_stats) =
            place_entry(tokenizer, entry, &activation, index, &mut remaining, lines.len())?;

        debug!(
            entry = %entry_stats.label,
            order = entry.insertion_order(),
            available = entry_stats.tokens_available,
            used = entry_stats.tokens_used,
            reserved = entry_stats.reserved_tokens,
            at = entry_stats.splice_index,
            remaining,
            "Entry placed"
        );

        let at = entry_stats.splice_index;
        lines.splice(at..at, entry_lines);
        stats.push(entry_stats);
    }

    let text = lines.join("\n").trim().to_string();
    let total_tokens = tokenizer.count(&text)?;
    let utilization_pct = if budget == 0 {
        0.0
    } else {
        (total_tokens as f32 / budget as f32) * 100.0
    };
    let inactive = activation
        .inactive()
        .iter()
        .map(|&i| display_label(&entries[i]))
        .collect();

    info!(
        budget,
        total_tokens,
        active = stats.len(),
        pool = entries.len(),
        "Context assembled"
    );

    Ok(AssembledContext {
        text,
        metadata: AssemblyMetadata {
            budget,
            total_tokens,
            remaining_budget: remaining,
            utilization_pct,
            entries: stats,
            inactive,
        },
    })
}

/// Trim one entry against the running budget and work out where it goes.
fn place_entry(
    tokenizer: &dyn Tokenizer,
    entry: &ContextEntry,
    activation: &Activation,
    index: usize,
    remaining: &mut i64,
    placed: usize,
) -> Result<(Vec<String>, EntryStats), ContextError> {
    let full_len = tokenizer.count(entry.text())?;
    let reserved = activation.reserved(index).min(full_len);
    let reserved_i = reserved as i64;

    *remaining -= reserved_i;
    let allowed = (*remaining).max(0) + reserved_i;

    let text = entry.text_within(tokenizer, allowed, entry.token_budget())?;
    let used = tokenizer.count(&text)?;
    *remaining -= used as i64 - reserved_i;

    let entry_lines: Vec<String> = text.lines().map(str::to_string).collect();
    let stats = EntryStats {
        label: display_label(entry),
        insertion_order: entry.insertion_order(),
        tokens_available: full_len,
        tokens_used: used,
        reserved_tokens: reserved,
        trimmed: used < full_len,
        splice_index: splice_index(entry.insertion_position(), placed),
        lines_inserted: entry_lines.len(),
    };
    Ok((entry_lines, stats))
}

/// Resolve an insertion position against `len` lines already placed.
///
/// `0` is the front, `-1` appends after everything, `-k` leaves `k - 1`
/// lines after the insertion point. Out-of-range positions clamp to the
/// ends.
pub fn splice_index(position: i32, len: usize) -> usize {
    if position < 0 {
        let back = position.unsigned_abs() as usize - 1;
        len.saturating_sub(back)
    } else {
        (position as usize).min(len)
    }
}

fn display_label(entry: &ContextEntry) -> String {
    match entry.label() {
        Some(label) => label.to_string(),
        None => {
            let first = entry.text().lines().next().unwrap_or_default();
            let mut label: String = first.chars().take(32).collect();
            if label.len() < first.len() {
                label.push('…');
            }
            label
        }
    }
}
