//! Provider trait: the abstraction over generative-text backends.
//!
//! A provider receives a fully assembled prompt plus sampling parameters and
//! returns continuation text. Transport, authentication and retries are the
//! implementation's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Generation length and stopping parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationArgs {
    /// Maximum number of tokens to generate.
    pub max_length: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eos_token_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,
}

impl Default for GenerationArgs {
    fn default() -> Self {
        Self {
            max_length: 40,
            max_time: None,
            min_length: None,
            eos_token_id: None,
            logprobs: None,
        }
    }
}

/// Sampling parameters. `None` leaves the provider default in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_a: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typical_p: Option<f32>,
    /// Tail-free sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfs: Option<f32>,
    /// Repetition penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep_p_range: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep_p_slope: Option<f32>,
    /// Sequences the model must not produce.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bad_words: Vec<String>,
}

/// A single generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to use (e.g. "lit-6b").
    pub model: String,

    /// The assembled prompt. Filled in right before the provider call.
    #[serde(default)]
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub softprompt: Option<String>,

    #[serde(default)]
    pub gen_args: GenerationArgs,

    #[serde(default)]
    pub sample_args: SamplingArgs,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            model: "lit-6b".into(),
            prompt: String::new(),
            softprompt: None,
            gen_args: GenerationArgs::default(),
            sample_args: SamplingArgs {
                temp: Some(0.51),
                tfs: Some(0.992),
                rep_p: Some(1.125),
                rep_p_range: Some(2048),
                bad_words: vec!["[".into(), " [".into()],
                ..SamplingArgs::default()
            },
        }
    }
}

/// The core GenerationProvider trait.
///
/// The story layer calls `generate()` without knowing which backend is
/// behind it.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// A human-readable name for this provider (e.g. "sukima", "gooseai").
    fn name(&self) -> &str;

    /// Generate continuation text for `request.prompt`.
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError>;
}
