//! Configuration types for document-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct holds every knob so a
//! single value can be built at startup and shared by every request.

use crate::error::Doc2MdError;
use crate::prompts::DEFAULT_CAPTION_PROMPT;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default ceiling on the size of a single document, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 25_000_000;

/// Configuration for the conversion orchestrator.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doc2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .max_file_size(10_000_000)
///     .concurrency(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_file_size, 10_000_000);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Largest accepted document in bytes. Default: 25 000 000.
    ///
    /// A document of exactly this size is accepted; one byte more is rejected
    /// before anything is written to disk.
    pub max_file_size: u64,

    /// Directory in which uploads are staged. Default: the OS temp directory.
    pub staging_dir: PathBuf,

    /// Files converted at once by [`crate::convert::Converter::convert_many`]. Default: 4.
    pub concurrency: usize,

    /// Optional vision model used to caption images. Default: none.
    pub enrichment: Option<Arc<dyn LLMProvider>>,

    /// Prompt sent with each image to the enrichment model.
    pub caption_prompt: String,

    /// Sampling temperature for caption requests. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens generated per caption. Default: 1024.
    pub max_tokens: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            staging_dir: std::env::temp_dir(),
            concurrency: 4,
            enrichment: None,
            caption_prompt: DEFAULT_CAPTION_PROMPT.to_string(),
            temperature: 0.1,
            max_tokens: 1024,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("max_file_size", &self.max_file_size)
            .field("staging_dir", &self.staging_dir)
            .field("concurrency", &self.concurrency)
            .field(
                "enrichment",
                &self.enrichment.as_ref().map(|_| "<dyn LLMProvider>"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = dir.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn enrichment(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.enrichment = Some(provider);
        self
    }

    /// Set or clear the enrichment provider.
    pub fn maybe_enrichment(mut self, provider: Option<Arc<dyn LLMProvider>>) -> Self {
        self.config.enrichment = provider;
        self
    }

    pub fn caption_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.caption_prompt = prompt.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Doc2MdError> {
        let c = &self.config;
        if c.max_file_size == 0 {
            return Err(Doc2MdError::InvalidConfig(
                "max_file_size must be ≥ 1 byte".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(Doc2MdError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.staging_dir.as_os_str().is_empty() {
            return Err(Doc2MdError::InvalidConfig(
                "staging_dir must not be empty".into(),
            ));
        }
        if c.caption_prompt.trim().is_empty() {
            return Err(Doc2MdError::InvalidConfig(
                "caption_prompt must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Doc2MdError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}
