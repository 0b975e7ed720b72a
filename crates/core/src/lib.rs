//! # akyuu Core
//!
//! Domain types, traits, and error definitions for akyuu, a prompt
//! assembler for interactive storytelling with generative text models.
//! This crate has **zero framework dependencies**: it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping tokenizers, stores and providers via configuration
//! - Easy testing with deterministic stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod policy;
pub mod provider;
pub mod store;
pub mod tokenizer;

// Re-export key types at crate root for ergonomics
pub use error::{ContextError, Error, ProviderError, Result, StoreError, StoryError, TokenizerError};
pub use policy::{EntryPolicy, TrimDirection, TrimType};
pub use provider::{GenerationArgs, GenerationProvider, GenerationRequest, SamplingArgs};
pub use store::{RecordKind, RecordStore};
pub use tokenizer::{TokenId, Tokenizer};
