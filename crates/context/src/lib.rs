//! Token-budgeted prompt assembly.
//!
//! A prompt is built from a pool of [`ContextEntry`] fragments (story text,
//! memory, author's note, lore):
//!
//! 1. **Activate** forced entries and the lore their text mentions
//! 2. **Allocate** the budget by descending `insertion_order`
//! 3. **Trim** each entry by lines, sentences or tokens to what it was given
//! 4. **Splice** its lines into the output at its `insertion_position`
//!
//! Assembly is synchronous, deterministic and free of I/O beyond the
//! tokenizer.

pub mod activation;
pub mod entry;
pub mod lorebook;
pub mod manager;
pub mod sentence;
pub mod token;
pub mod trim;

pub use activation::{Activation, resolve};
pub use entry::{ContextEntry, ContextEntryBuilder};
pub use lorebook::{LoreContextConfig, LoreRecord, LoreSource, Lorebook};
pub use manager::{
    AssembledContext, AssemblyMetadata, ContextManager, EntryStats, assemble,
    assemble_with_report, splice_index,
};
pub use token::{ByteTokenizer, estimate_tokens};

#[cfg(feature = "hf")]
pub use token::HfTokenizer;
