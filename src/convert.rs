//! Conversion orchestrator.
//!
//! [`Converter`] owns the configuration and the strategy table and is built
//! once at startup, then shared (`Arc<Converter>`) by every request. It holds
//! no mutable state, so concurrent conversions never interact except
//! through the staging directory, where names are unique.
//!
//! ## Steps of [`Converter::convert`]
//!
//! 1. Size check against `max_file_size`; nothing touches disk on rejection
//! 2. Stage the bytes in a scoped temporary file
//! 3. Dispatch to the category strategy; on any strategy error fall back to
//!    `# {filename}` + decoded text
//! 4. Release the staged file (also released by `Drop` on every other path)
//! 5. Normalise the Markdown, derive the title, build the envelope

use crate::config::ConversionConfig;
use crate::enrichment::Enrichment;
use crate::error::Doc2MdError;
use crate::extract::text::plain_text_markdown;
use crate::extract::{ExtractRequest, StrategyTable};
use crate::output::{ConversionFailure, ConversionMetadata, ConversionResult, FileOutcome};
use crate::pipeline::detect::identify;
use crate::pipeline::postprocess::{clean_markdown, extract_title};
use crate::pipeline::select::{select_converter, ConverterCategory};
use crate::pipeline::stage::StagedFile;
use crate::upload::UploadedFile;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// Message used when an upload carries no file name.
pub const NO_SELECTED_FILE: &str = "No selected file";

/// Turns uploads into [`ConversionResult`]s.
#[derive(Debug)]
pub struct Converter {
    config: ConversionConfig,
    strategies: StrategyTable,
    enrichment: Option<Enrichment>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConversionConfig::default())
    }
}

impl Converter {
    /// A converter with the built-in strategies.
    pub fn new(config: ConversionConfig) -> Self {
        Self::with_strategies(config, StrategyTable::builtin())
    }

    /// A converter with a custom strategy table.
    pub fn with_strategies(config: ConversionConfig, strategies: StrategyTable) -> Self {
        let enrichment = Enrichment::from_config(&config);
        Self {
            config,
            strategies,
            enrichment,
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    /// Convert `content` with the strategy for `category`.
    ///
    /// # Errors
    /// - [`Doc2MdError::SizeLimitExceeded`] when `content` is larger than
    ///   `max_file_size` (a file of exactly that size is accepted)
    /// - [`Doc2MdError::StagingFailed`] when the staging directory is unusable
    /// - [`Doc2MdError::ExtractionFailed`] when the strategy and the
    ///   plain-text fallback both fail
    pub async fn convert(
        &self,
        filename: &str,
        content: &[u8],
        category: ConverterCategory,
    ) -> Result<ConversionResult, Doc2MdError> {
        let start = Instant::now();
        let size = content.len() as u64;
        info!(filename, size, %category, "Converting upload");

        // ── Step 1: Size policy ──────────────────────────────────────────
        if size > self.config.max_file_size {
            warn!(
                filename,
                size,
                limit = self.config.max_file_size,
                "Upload exceeds size limit"
            );
            return Err(Doc2MdError::SizeLimitExceeded {
                limit: self.config.max_file_size,
                actual: size,
            });
        }

        // ── Step 2: Stage ────────────────────────────────────────────────
        let staged = StagedFile::create(&self.config.staging_dir, filename, content).map_err(
            |source| {
                error!(filename, error = %source, "Failed to stage upload");
                Doc2MdError::StagingFailed { source }
            },
        )?;

        // ── Step 3: Extract, or fall back ────────────────────────────────
        let request = ExtractRequest {
            path: staged.path().to_path_buf(),
            filename: filename.to_string(),
            enrichment: self.enrichment.clone(),
        };
        let raw = match self.strategies.extract(category, request).await {
            Ok(markdown) => markdown,
            Err(e) => {
                warn!(filename, %category, error = %e, "Extraction failed, using plain-text fallback");
                let fallback_result = fallback(&staged, filename).await;
                match fallback_result {
                    Ok(markdown) => markdown,
                    Err(detail) => {
                        error!(filename, %category, detail = %detail, "Plain-text fallback failed");
                        staged.release_logged();
                        return Err(Doc2MdError::ExtractionFailed {
                            filename: filename.to_string(),
                            detail,
                        });
                    }
                }
            }
        };

        // ── Step 4: Release ──────────────────────────────────────────────
        staged.release_logged();

        // ── Step 5: Normalise + envelope ─────────────────────────────────
        let markdown = clean_markdown(&raw);
        let title = extract_title(&markdown);
        info!(
            filename,
            %category,
            title = %title,
            chars = markdown.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Conversion complete"
        );

        Ok(ConversionResult {
            filename: filename.to_string(),
            title,
            markdown,
            metadata: ConversionMetadata {
                converter_type: category,
                file_size_bytes: size,
            },
        })
    }

    /// Identify, select and convert one upload.
    ///
    /// # Errors
    /// [`Doc2MdError::NoFileProvided`] for a blank file name,
    /// [`Doc2MdError::UnsupportedType`] when detection rejects the file, and
    /// everything [`Converter::convert`] returns.
    pub async fn convert_upload(&self, upload: &UploadedFile) -> Result<ConversionResult, Doc2MdError> {
        if upload.name.trim().is_empty() {
            return Err(Doc2MdError::NoFileProvided(NO_SELECTED_FILE.to_string()));
        }

        let detection = identify(&upload.name, &upload.content);
        if !detection.is_supported {
            warn!(
                filename = %upload.name,
                mime_type = ?detection.mime_type,
                "Rejected unsupported upload"
            );
            return Err(Doc2MdError::UnsupportedType {
                filename: upload.name.clone(),
                mime_type: detection.mime_type,
            });
        }

        let category = select_converter(&detection.extension, detection.mime_type.as_deref());
        self.convert(&upload.name, &upload.content, category).await
    }

    /// Convert several uploads independently.
    ///
    /// Up to `concurrency` files are in flight at once. The result has one
    /// record per upload, in input order; a failing file becomes a
    /// [`FileOutcome::Failed`] record and does not affect the others.
    pub async fn convert_many(&self, uploads: Vec<UploadedFile>) -> Vec<FileOutcome> {
        let total = uploads.len();
        let outcomes: Vec<FileOutcome> = stream::iter(uploads.into_iter().map(|upload| async move {
            match self.convert_upload(&upload).await {
                Ok(result) => FileOutcome::Converted(result),
                Err(e) => FileOutcome::Failed(ConversionFailure {
                    filename: upload.name,
                    error: e.to_string(),
                }),
            }
        }))
        .buffered(self.config.concurrency)
        .collect()
        .await;

        let converted = outcomes.iter().filter(|o| o.is_converted()).count();
        info!(total, converted, failed = total - converted, "Batch complete");
        outcomes
    }

    /// Convert a local file and write the Markdown next to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn convert_to_file(
        &self,
        input_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<ConversionResult, Doc2MdError> {
        let input_path = input_path.as_ref();
        let upload = UploadedFile::from_path(input_path)
            .await
            .map_err(|source| Doc2MdError::ReadFailed {
                path: input_path.to_path_buf(),
                source,
            })?;
        let result = self.convert_upload(&upload).await?;
        write_atomic(output_path.as_ref(), &result.markdown).await?;
        Ok(result)
    }
}

/// Degraded rendering of the staged bytes.
async fn fallback(staged: &StagedFile, filename: &str) -> Result<String, String> {
    let bytes = tokio::fs::read(staged.path())
        .await
        .map_err(|e| format!("could not read staged upload: {e}"))?;
    Ok(plain_text_markdown(filename, &bytes))
}

/// Write `contents` to `path` through a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), Doc2MdError> {
    let write_err = |source| Doc2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
