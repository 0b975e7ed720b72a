pub mod config_cmd;
pub mod context;
pub mod lore;
pub mod onboard;
pub mod story;

use std::path::Path;
use std::sync::Arc;

use akyuu_config::{AppConfig, TokenizerConfig};
use akyuu_context::ByteTokenizer;
use akyuu_core::store::RecordStore;
use akyuu_core::tokenizer::Tokenizer;
use akyuu_store::{FileStore, InMemoryStore};
use tracing::debug;

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

/// Build the tokenizer budgets are counted in.
pub fn load_tokenizer(
    config: &TokenizerConfig,
) -> Result<Arc<dyn Tokenizer>, Box<dyn std::error::Error>> {
    debug!(kind = %config.kind, "Loading tokenizer");
    match config.kind.as_str() {
        "byte" => Ok(Arc::new(ByteTokenizer)),
        "huggingface" => load_hf_tokenizer(config),
        other => Err(format!("Unknown tokenizer kind: {other}").into()),
    }
}

#[cfg(feature = "hf")]
fn load_hf_tokenizer(
    config: &TokenizerConfig,
) -> Result<Arc<dyn Tokenizer>, Box<dyn std::error::Error>> {
    use akyuu_context::HfTokenizer;

    let tokenizer = match &config.path {
        Some(path) => HfTokenizer::from_file(path)?,
        None => HfTokenizer::from_pretrained(&config.repo)?,
    };
    Ok(Arc::new(tokenizer))
}

#[cfg(not(feature = "hf"))]
fn load_hf_tokenizer(
    _config: &TokenizerConfig,
) -> Result<Arc<dyn Tokenizer>, Box<dyn std::error::Error>> {
    Err("tokenizer.kind = \"huggingface\" requires building with `--features hf`".into())
}

/// Open the configured record store.
pub fn open_store(config: &AppConfig) -> Box<dyn RecordStore> {
    match config.store.backend.as_str() {
        "memory" => Box::new(InMemoryStore::new()),
        _ => Box::new(FileStore::in_dir(&config.store_dir())),
    }
}
