//! # edgequake-doc2md
//!
//! Convert uploaded documents to Markdown: PDF, Word, PowerPoint, Excel,
//! HTML, EPUB, images, ZIP archives and plain text.
//!
//! The crate is a library first. The HTTP service (`server` feature) and the
//! `doc2md` binary (`cli` feature) are thin shells around
//! [`Converter`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (name + bytes)
//!  │
//!  ├─ 1. Detect   extension + MIME from magic bytes / text sniff / name
//!  ├─ 2. Select   category (pdf, docx, html, …), `text` as the fallback
//!  ├─ 3. Size     reject over `max_file_size` before touching disk
//!  ├─ 4. Stage    uniquely named temp file, removed on every path
//!  ├─ 5. Extract  category strategy; plain text if it fails
//!  ├─ 6. Polish   normalise Markdown, derive the title
//!  └─ 7. Output   ConversionResult {filename, title, markdown, metadata}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2md::{ConversionConfig, Converter, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ConversionConfig::default());
//!     let upload = UploadedFile::from_path("report.docx").await?;
//!     let result = converter.convert_upload(&upload).await?;
//!     println!("{}", result.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum router for `POST /convert`, `POST /api/convert`, `GET /health` |
//! | `cli`    | on      | Enables the `doc2md` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## Image captions
//!
//! Pass an `Arc<dyn edgequake_llm::LLMProvider>` through
//! [`ConversionConfigBuilder::enrichment`] and images get a `## Description`
//! section written by the model. Without one, images report their size only.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod enrichment;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::Converter;
pub use error::{Doc2MdError, ExtractError};
pub use extract::{ExtractRequest, StrategyTable};
pub use output::{ConversionFailure, ConversionMetadata, ConversionResult, FileOutcome, SingleFileResponse};
pub use pipeline::detect::{identify, DetectionResult};
pub use pipeline::postprocess::{clean_markdown, extract_title};
pub use pipeline::select::{select_converter, ConverterCategory};
pub use upload::UploadedFile;
