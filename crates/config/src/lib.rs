//! Configuration loading, validation, and management for akyuu.
//!
//! Loads configuration from `~/.akyuu/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use akyuu_core::{EntryPolicy, GenerationRequest, TrimDirection, TrimType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.akyuu/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prompt assembly settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Which tokenizer budgets are counted in
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// Policies of the built-in story, memory and author's note entries
    #[serde(default)]
    pub entries: EntryPolicies,

    /// Generation settings given to new users
    #[serde(default)]
    pub generation: GenerationRequest,

    /// Record store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Generation provider endpoint
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Token budget of an assembled prompt
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Model context window shared by the prompt and the generated text
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Prefix prompts with a `***` separator line
    #[serde(default = "default_true")]
    pub preamble: bool,

    /// Lorebook loaded for every story that does not name its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lorebook: Option<PathBuf>,
}

fn default_max_tokens() -> usize {
    2048
}
fn default_context_window() -> usize {
    1280
}
fn default_true() -> bool {
    true
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            context_window: default_context_window(),
            preamble: true,
            lorebook: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// "byte" or "huggingface"
    #[serde(default = "default_tokenizer_kind")]
    pub kind: String,

    /// Local `tokenizer.json`; takes precedence over `repo`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Hugging Face hub repository to download `tokenizer.json` from
    #[serde(default = "default_tokenizer_repo")]
    pub repo: String,
}

fn default_tokenizer_kind() -> String {
    "byte".into()
}
fn default_tokenizer_repo() -> String {
    "gpt2".into()
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            kind: default_tokenizer_kind(),
            path: None,
            repo: default_tokenizer_repo(),
        }
    }
}

/// Policies of the built-in story, memory and author's note entries.
///
/// A table in the config file only overrides the fields it names; every
/// other field keeps the built-in policy's value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "EntryPolicyOverrides")]
pub struct EntryPolicies {
    pub story: EntryPolicy,
    pub memory: EntryPolicy,
    pub authors_note: EntryPolicy,
}

impl Default for EntryPolicies {
    fn default() -> Self {
        Self {
            story: EntryPolicy::story(),
            memory: EntryPolicy::memory(),
            authors_note: EntryPolicy::authors_note(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct EntryPolicyOverrides {
    #[serde(default)]
    story: PolicyOverride,
    #[serde(default)]
    memory: PolicyOverride,
    #[serde(default)]
    authors_note: PolicyOverride,
}

impl From<EntryPolicyOverrides> for EntryPolicies {
    fn from(overrides: EntryPolicyOverrides) -> Self {
        Self {
            story: overrides.story.apply(EntryPolicy::story()),
            memory: overrides.memory.apply(EntryPolicy::memory()),
            authors_note: overrides.authors_note.apply(EntryPolicy::authors_note()),
        }
    }
}

/// The fields of an [`EntryPolicy`] a config table sets.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyOverride {
    prefix: Option<String>,
    suffix: Option<String>,
    token_budget: Option<usize>,
    reserved_tokens: Option<usize>,
    insertion_order: Option<i32>,
    insertion_position: Option<i32>,
    trim_direction: Option<TrimDirection>,
    trim_type: Option<TrimType>,
    forced_activation: Option<bool>,
    cascading_activation: Option<bool>,
}

impl PolicyOverride {
    fn apply(self, mut policy: EntryPolicy) -> EntryPolicy {
        if let Some(prefix) = self.prefix {
            policy.prefix = prefix;
        }
        if let Some(suffix) = self.suffix {
            policy.suffix = suffix;
        }
        if let Some(token_budget) = self.token_budget {
            policy.token_budget = token_budget;
        }
        if let Some(reserved_tokens) = self.reserved_tokens {
            policy.reserved_tokens = reserved_tokens;
        }
        if let Some(insertion_order) = self.insertion_order {
            policy.insertion_order = insertion_order;
        }
        if let Some(insertion_position) = self.insertion_position {
            policy.insertion_position = insertion_position;
        }
        if let Some(trim_direction) = self.trim_direction {
            policy.trim_direction = trim_direction;
        }
        if let Some(trim_type) = self.trim_type {
            policy.trim_type = trim_type;
        }
        if let Some(forced) = self.forced_activation {
            policy.forced_activation = forced;
        }
        if let Some(cascading) = self.cascading_activation {
            policy.cascading_activation = cascading;
        }
        policy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "file"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Directory of the file backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_store_backend() -> String {
    "file".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.akyuu/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `AKYUU_MAX_TOKENS`
    /// - `AKYUU_TOKENIZER`
    /// - `AKYUU_LOREBOOK`
    /// - `AKYUU_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(max_tokens) = std::env::var("AKYUU_MAX_TOKENS") {
            self.context.max_tokens = max_tokens.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "AKYUU_MAX_TOKENS must be a positive integer, got '{max_tokens}'"
                ))
            })?;
        }

        if let Ok(kind) = std::env::var("AKYUU_TOKENIZER") {
            self.tokenizer.kind = kind;
        }

        if let Ok(lorebook) = std::env::var("AKYUU_LOREBOOK") {
            self.context.lorebook = Some(PathBuf::from(lorebook));
        }

        if self.provider.api_key.is_none() {
            self.provider.api_key = std::env::var("AKYUU_API_KEY").ok();
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".akyuu")
    }

    /// Directory used by the file store when `store.path` is unset.
    pub fn store_dir(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("storage"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_tokens must be > 0".into(),
            ));
        }

        let max_length = self.generation.gen_args.max_length as usize;
        if max_length >= self.context.context_window {
            return Err(ConfigError::ValidationError(format!(
                "generation.gen_args.max_length ({max_length}) must be smaller than \
                 context.context_window ({})",
                self.context.context_window
            )));
        }

        if !matches!(self.tokenizer.kind.as_str(), "byte" | "huggingface") {
            return Err(ConfigError::ValidationError(format!(
                "tokenizer.kind must be \"byte\" or \"huggingface\", got \"{}\"",
                self.tokenizer.kind
            )));
        }

        if !matches!(self.store.backend.as_str(), "memory" | "file") {
            return Err(ConfigError::ValidationError(format!(
                "store.backend must be \"memory\" or \"file\", got \"{}\"",
                self.store.backend
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
