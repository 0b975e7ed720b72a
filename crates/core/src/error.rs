//! Error types for the akyuu domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all akyuu operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Tokenizer errors ---
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    // --- Context assembly errors ---
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Story errors ---
    #[error("Story error: {0}")]
    Story(#[from] StoryError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum TokenizerError {
    #[error("Failed to load tokenizer: {0}")]
    Load(String),

    #[error("Failed to encode text: {0}")]
    Encode(String),

    #[error("Failed to decode tokens: {0}")]
    Decode(String),

    #[error("Token id {0} is outside the vocabulary")]
    UnknownToken(u32),
}

#[derive(Debug, Clone, Error)]
pub enum ContextError {
    #[error("Invalid context entry: {0}")]
    InvalidEntry(String),

    #[error("Invalid lorebook: {0}")]
    InvalidLorebook(String),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
}

/// Failures of a [`GenerationProvider`](crate::provider::GenerationProvider).
///
/// Only `EmptyResponse` is raised inside akyuu; the other variants are for
/// provider implementations backed by a remote API.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Generation request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Provider returned no text")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupted record {key}: {reason}")]
    Corrupted { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("A story must be selected first")]
    NoStorySelected,

    #[error("Story {0} does not exist")]
    UnknownStory(String),

    #[error("User {0} does not exist")]
    UnknownUser(u64),

    #[error("User {0} already exists")]
    UserExists(u64),

    #[error("Generation quota exceeded")]
    QuotaExceeded,

    #[error("Story has no text to modify")]
    EmptyStory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_error_wraps_tokenizer_error() {
        let err: ContextError = TokenizerError::UnknownToken(70000).into();
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    fn top_level_error_displays_bounded_context() {
        let err = Error::Context(ContextError::InvalidEntry("negative token budget".into()));
        assert!(err.to_string().starts_with("Context error"));
        assert!(err.to_string().contains("negative token budget"));
    }

    #[test]
    fn corrupted_record_names_the_key() {
        let err = StoreError::Corrupted {
            key: "abc".into(),
            reason: "expected value".into(),
        };
        assert_eq!(err.to_string(), "Corrupted record abc: expected value");
    }
}
