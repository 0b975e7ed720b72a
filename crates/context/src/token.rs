//! Tokenizer adapters.
//!
//! - [`ByteTokenizer`]: one token per UTF-8 byte. Exact, dependency-free and
//!   deterministic, so budgets in tests are just byte counts.
//! - `HfTokenizer` (feature `hf`): a Hugging Face `tokenizer.json`, e.g. the
//!   GPT-2 vocabulary the storytelling models were trained with.
//! - [`estimate_tokens`]: a ~4 chars/token heuristic for diagnostics only.

use akyuu_core::error::TokenizerError;
use akyuu_core::tokenizer::{TokenId, Tokenizer};

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// A tokenizer whose vocabulary is the 256 byte values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteTokenizer;

impl ByteTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl Tokenizer for ByteTokenizer {
    fn name(&self) -> &str {
        "byte"
    }

    fn encode(&self, text: &str) -> Result<Vec<TokenId>, TokenizerError> {
        Ok(text.bytes().map(TokenId::from).collect())
    }

    fn decode(&self, tokens: &[TokenId]) -> Result<String, TokenizerError> {
        let bytes = tokens
            .iter()
            .map(|&t| u8::try_from(t).map_err(|_| TokenizerError::UnknownToken(t)))
            .collect::<Result<Vec<u8>, _>>()?;
        // A token-level cut may split a multi-byte character.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn count(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(text.len())
    }
}

#[cfg(feature = "hf")]
pub use hf::HfTokenizer;

#[cfg(feature = "hf")]
mod hf {
    use super::*;
    use hf_hub::api::sync::Api;
    use std::path::Path;
    use tracing::info;

    /// A Hugging Face tokenizer loaded from `tokenizer.json`.
    pub struct HfTokenizer {
        name: String,
        inner: tokenizers::Tokenizer,
    }

    impl HfTokenizer {
        /// Load from a local `tokenizer.json`.
        pub fn from_file(path: &Path) -> Result<Self, TokenizerError> {
            let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
                TokenizerError::Load(format!("{}: {e}", path.display()))
            })?;
            info!(path = %path.display(), "Tokenizer loaded");
            Ok(Self {
                name: path.display().to_string(),
                inner,
            })
        }

        /// Download `tokenizer.json` from a hub repository (e.g. "gpt2").
        pub fn from_pretrained(repo: &str) -> Result<Self, TokenizerError> {
            let api = Api::new()
                .map_err(|e| TokenizerError::Load(format!("HuggingFace Hub API error: {e}")))?;
            let path = api.model(repo.to_string()).get("tokenizer.json").map_err(|e| {
                TokenizerError::Load(format!("Failed to download tokenizer from '{repo}': {e}"))
            })?;
            let mut tokenizer = Self::from_file(&path)?;
            tokenizer.name = repo.to_string();
            Ok(tokenizer)
        }
    }

    impl Tokenizer for HfTokenizer {
        fn name(&self) -> &str {
            &self.name
        }

        fn encode(&self, text: &str) -> Result<Vec<TokenId>, TokenizerError> {
            self.inner
                .encode(text, false)
                .map(|encoding| encoding.get_ids().to_vec())
                .map_err(|e| TokenizerError::Encode(e.to_string()))
        }

        fn decode(&self, tokens: &[TokenId]) -> Result<String, TokenizerError> {
            self.inner
                .decode(tokens, false)
                .map_err(|e| TokenizerError::Decode(e.to_string()))
        }
    }
}
