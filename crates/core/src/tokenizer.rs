//! Tokenizer trait: the seam between prompt assembly and a model vocabulary.
//!
//! Every budget decision in the context pipeline is made in tokens of the
//! target model. Implementations live in `akyuu-context::token`.

use crate::error::TokenizerError;

/// A token id in the model vocabulary.
pub type TokenId = u32;

/// A deterministic, pure sub-word tokenizer.
///
/// `decode(encode(x)) == x` must hold for any text the context pipeline
/// itself produced.
pub trait Tokenizer: Send + Sync {
    /// A human-readable name (e.g. "byte", "gpt2").
    fn name(&self) -> &str;

    /// Encode text into token ids.
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, TokenizerError>;

    /// Decode token ids back into text.
    fn decode(&self, tokens: &[TokenId]) -> Result<String, TokenizerError>;

    /// Number of tokens `text` encodes to.
    fn count(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(self.encode(text)?.len())
    }
}
