//! Optional vision-model enrichment: image captions.
//!
//! The enrichment client is an `Arc<dyn LLMProvider>` handed in at
//! construction. Every extraction strategy receives it, but only the image
//! strategy calls it: one chat request carrying the base64 image and the
//! caption prompt. There are no retries and no internal timeout; a failed
//! call leaves the image rendered without a description.

use crate::config::ConversionConfig;
use crate::error::ExtractError;
use crate::pipeline::select::ConverterCategory;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{
    ChatMessage, CompletionOptions, ImageData, LLMProvider, OpenAIProvider, ProviderFactory,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Model used for an OpenAI-compatible endpoint configured by API key only.
pub const DEFAULT_COMPATIBLE_MODEL: &str = "gemini-1.5-flash";

/// Endpoint used when an API key is given without a base URL.
pub const DEFAULT_COMPATIBLE_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/";

/// Enrichment client plus the request options it is called with.
#[derive(Clone)]
pub struct Enrichment {
    pub provider: Arc<dyn LLMProvider>,
    pub prompt: Arc<str>,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl std::fmt::Debug for Enrichment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enrichment")
            .field("provider", &"<dyn LLMProvider>")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Enrichment {
    /// The enrichment configured in `config`, if any.
    pub fn from_config(config: &ConversionConfig) -> Option<Self> {
        config.enrichment.as_ref().map(|provider| Self {
            provider: Arc::clone(provider),
            prompt: Arc::from(config.caption_prompt.as_str()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }

    /// Ask the vision model to describe one image.
    pub async fn caption_image(&self, image: ImageData) -> Result<String, ExtractError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.prompt.as_ref()),
            ChatMessage::user_with_images("", vec![image]),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| ExtractError::failed(ConverterCategory::Image, format!("caption: {e}")))?;

        debug!(
            "Caption: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content.trim().to_string())
    }
}

/// Wrap raw image bytes as a base64 attachment for the vision API.
///
/// `detail: "high"` keeps small text in screenshots and scans legible.
pub fn encode_image(bytes: &[u8], mime_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, mime_type).with_detail("high")
}

/// Where the caption model comes from.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Named `edgequake-llm` provider (`openai`, `anthropic`, `gemini`, ...),
    /// which reads its own API key variable.
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Key for an OpenAI-compatible endpoint, used when no provider is named.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// The provider [`resolve_enrichment`] will build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderChoice {
    Named { name: String, model: String },
    Compatible { api_key: String, base_url: String, model: String },
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ProviderSettings {
    /// A named provider wins; otherwise an API key selects the
    /// OpenAI-compatible endpoint. `None` means captions are off.
    pub fn choice(&self) -> Option<ProviderChoice> {
        let model = non_blank(&self.model);
        if let Some(name) = non_blank(&self.provider) {
            return Some(ProviderChoice::Named {
                name: name.to_string(),
                model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            });
        }
        let api_key = non_blank(&self.api_key)?;
        Some(ProviderChoice::Compatible {
            api_key: api_key.to_string(),
            base_url: non_blank(&self.base_url)
                .unwrap_or(DEFAULT_COMPATIBLE_BASE_URL)
                .to_string(),
            model: model.unwrap_or(DEFAULT_COMPATIBLE_MODEL).to_string(),
        })
    }
}

/// Build the enrichment client described by `settings`.
///
/// Returns `None` when nothing is configured or the provider cannot be
/// constructed (missing API key, unknown provider). The service then runs
/// without captions rather than refusing to start.
pub fn resolve_enrichment(settings: &ProviderSettings) -> Option<Arc<dyn LLMProvider>> {
    match settings.choice()? {
        ProviderChoice::Named { name, model } => {
            match ProviderFactory::create_llm_provider(&name, &model) {
                Ok(provider) => {
                    info!(provider = %name, model = %model, "Image enrichment enabled");
                    Some(provider)
                }
                Err(e) => {
                    warn!(
                        provider = %name,
                        model = %model,
                        error = %e,
                        "Could not create enrichment provider; continuing without image captions"
                    );
                    None
                }
            }
        }
        ProviderChoice::Compatible {
            api_key,
            base_url,
            model,
        } => {
            info!(base_url = %base_url, model = %model, "Image enrichment enabled (OpenAI-compatible)");
            let provider: Arc<dyn LLMProvider> =
                Arc::new(OpenAIProvider::compatible(api_key, base_url).with_model(model));
            Some(provider)
        }
    }
}
