//! Extraction strategies: staged file → raw Markdown, one per category.
//!
//! Every strategy has the same shape, [`ExtractFn`]: it receives an
//! [`ExtractRequest`] and resolves to Markdown or an [`ExtractError`]. The
//! orchestrator looks the category up in a [`StrategyTable`] and never
//! matches on the category itself, so a strategy can be swapped or removed
//! without touching the dispatch code.
//!
//! | Category | Module      | Backend |
//! |----------|-------------|---------|
//! | pdf      | [`pdf`]     | `lopdf` text layer |
//! | docx     | [`office`]  | `docx-rs` |
//! | pptx     | [`office`]  | `zip` + `quick-xml` |
//! | xlsx     | [`xlsx`]    | `calamine` |
//! | html     | [`html`]    | `scraper` |
//! | markdown | [`text`]    | `# {filename}` + decoded text |
//! | text     | [`text`]    | `# {filename}` + decoded text |
//! | epub     | [`epub`]    | `zip` + `quick-xml` OPF spine + [`html`] |
//! | image    | [`raster`]  | `image` + optional caption |
//! | archive  | [`archive`] | `zip` listing + inlined text members |
//!
//! `audio` has no built-in strategy and always takes the plain-text fallback.
//!
//! Parsers are synchronous and CPU-bound; [`blocking`] runs them on the
//! blocking thread pool so one large spreadsheet cannot stall the runtime.
//! A strategy that panics, inline or on the pool, resolves to
//! [`ExtractError::TaskPanicked`] like any other strategy failure.

pub mod archive;
pub mod epub;
pub mod html;
mod markup;
pub mod office;
pub mod pdf;
pub mod raster;
pub mod text;
pub mod xlsx;

use crate::enrichment::Enrichment;
use crate::error::ExtractError;
use crate::pipeline::select::ConverterCategory;
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Input handed to every strategy.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    /// Staged copy of the upload.
    pub path: PathBuf,
    /// Original client-supplied file name.
    pub filename: String,
    /// Vision model for captions, when configured.
    pub enrichment: Option<Enrichment>,
}

/// Future returned by an [`ExtractFn`].
pub type ExtractFuture = BoxFuture<'static, Result<String, ExtractError>>;

/// Uniform strategy signature.
pub type ExtractFn = Arc<dyn Fn(ExtractRequest) -> ExtractFuture + Send + Sync>;

/// Synchronous parser signature wrapped by [`blocking`].
pub type BlockingExtract = fn(&Path, &str) -> Result<String, ExtractError>;

/// Category → strategy mapping.
#[derive(Clone)]
pub struct StrategyTable {
    strategies: HashMap<ConverterCategory, ExtractFn>,
}

impl std::fmt::Debug for StrategyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut categories: Vec<&str> = self.strategies.keys().map(|c| c.as_str()).collect();
        categories.sort_unstable();
        f.debug_struct("StrategyTable")
            .field("categories", &categories)
            .finish()
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StrategyTable {
    /// A table with no strategies: every category takes the fallback.
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// The built-in strategies.
    pub fn builtin() -> Self {
        use ConverterCategory::*;
        let mut table = Self::empty();
        table.insert(Pdf, blocking(Pdf, pdf::extract));
        table.insert(Docx, blocking(Docx, office::extract_docx));
        table.insert(Pptx, blocking(Pptx, office::extract_pptx));
        table.insert(Xlsx, blocking(Xlsx, xlsx::extract));
        table.insert(Html, blocking(Html, html::extract));
        table.insert(Markdown, blocking(Markdown, text::extract_markdown));
        table.insert(Text, blocking(Text, text::extract_text));
        table.insert(Epub, blocking(Epub, epub::extract));
        table.insert(Archive, blocking(Archive, archive::extract));
        table.insert(
            Image,
            Arc::new(|req: ExtractRequest| raster::extract(req).boxed()),
        );
        table
    }

    fn insert(&mut self, category: ConverterCategory, strategy: ExtractFn) {
        self.strategies.insert(category, strategy);
    }

    /// Register or replace the strategy for `category`.
    pub fn with_strategy<F, Fut>(mut self, category: ConverterCategory, strategy: F) -> Self
    where
        F: Fn(ExtractRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ExtractError>> + Send + 'static,
    {
        self.insert(
            category,
            Arc::new(move |req: ExtractRequest| strategy(req).boxed()),
        );
        self
    }

    /// Remove the strategy for `category`, sending it to the fallback.
    pub fn without_strategy(mut self, category: ConverterCategory) -> Self {
        self.strategies.remove(&category);
        self
    }

    pub fn get(&self, category: ConverterCategory) -> Option<&ExtractFn> {
        self.strategies.get(&category)
    }

    pub fn contains(&self, category: ConverterCategory) -> bool {
        self.strategies.contains_key(&category)
    }

    /// Run the strategy for `category`. A panic inside the strategy is
    /// caught and reported as [`ExtractError::TaskPanicked`].
    pub async fn extract(
        &self,
        category: ConverterCategory,
        request: ExtractRequest,
    ) -> Result<String, ExtractError> {
        let Some(strategy) = self.get(category) else {
            return Err(ExtractError::Unavailable { category });
        };
        let run = AssertUnwindSafe(async move { strategy(request).await });
        match run.catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(ExtractError::TaskPanicked {
                category,
                detail: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "strategy panicked".to_string()
    }
}

/// Run a synchronous parser on the blocking pool.
pub fn blocking(category: ConverterCategory, parse: BlockingExtract) -> ExtractFn {
    Arc::new(move |req: ExtractRequest| {
        async move {
            tokio::task::spawn_blocking(move || parse(&req.path, &req.filename))
                .await
                .map_err(|e| ExtractError::TaskPanicked {
                    category,
                    detail: e.to_string(),
                })?
        }
        .boxed()
    })
}

/// Read a staged file, mapping I/O errors to the strategy's category.
pub(crate) fn read_staged(path: &Path, category: ConverterCategory) -> Result<Vec<u8>, ExtractError> {
    std::fs::read(path)
        .map_err(|e| ExtractError::failed(category, format!("read '{}': {e}", path.display())))
}

/// Render rows as a GFM table; the first row is the header.
pub(crate) fn gfm_table(rows: &[Vec<String>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let fmt_row = |row: &[String]| {
        let cells: Vec<String> = (0..width)
            .map(|i| {
                row.get(i)
                    .map(|c| c.replace('|', "\\|").replace('\n', " "))
                    .unwrap_or_default()
            })
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    if let Some((header, body)) = rows.split_first() {
        lines.push(fmt_row(header));
        lines.push(format!("|{}", " --- |".repeat(width)));
        lines.extend(body.iter().map(|r| fmt_row(r)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &Path) -> ExtractRequest {
        ExtractRequest {
            path: path.to_path_buf(),
            filename: "file".into(),
            enrichment: None,
        }
    }

    #[test]
    fn builtin_covers_everything_but_audio() {
        let table = StrategyTable::builtin();
        for category in ConverterCategory::ALL {
            assert_eq!(
                table.contains(category),
                category != ConverterCategory::Audio,
                "{category}"
            );
        }
    }

    #[tokio::test]
    async fn missing_strategy_is_unavailable() {
        let table = StrategyTable::builtin().without_strategy(ConverterCategory::Pdf);
        let err = table
            .extract(ConverterCategory::Pdf, request(Path::new("/nope")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Unavailable {
                category: ConverterCategory::Pdf
            }
        ));
    }

    #[tokio::test]
    async fn injected_strategy_replaces_builtin() {
        let table = StrategyTable::empty()
            .with_strategy(ConverterCategory::Text, |req: ExtractRequest| async move {
                Ok(format!("stub for {}", req.filename))
            });
        let out = table
            .extract(ConverterCategory::Text, request(Path::new("/nope")))
            .await
            .unwrap();
        assert_eq!(out, "stub for file");
    }

    #[tokio::test]
    async fn panicking_async_strategy_becomes_task_error() {
        let table = StrategyTable::empty().with_strategy(
            ConverterCategory::Image,
            |_req: ExtractRequest| async move {
                if true {
                    panic!("caption bug");
                }
                Ok(String::new())
            },
        );
        let err = table
            .extract(ConverterCategory::Image, request(Path::new("/nope")))
            .await
            .unwrap_err();
        match err {
            ExtractError::TaskPanicked { category, detail } => {
                assert_eq!(category, ConverterCategory::Image);
                assert_eq!(detail, "caption bug");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn panic_while_building_the_future_is_caught() {
        let table = StrategyTable::empty().with_strategy(
            ConverterCategory::Html,
            |req: ExtractRequest| -> futures::future::Ready<Result<String, ExtractError>> {
                panic!("no strategy for {}", req.filename)
            },
        );
        let err = table
            .extract(ConverterCategory::Html, request(Path::new("/nope")))
            .await
            .unwrap_err();
        assert!(
            matches!(&err, ExtractError::TaskPanicked { detail, .. } if detail == "no strategy for file"),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn panicking_parser_becomes_task_error() {
        fn boom(_: &Path, _: &str) -> Result<String, ExtractError> {
            panic!("parser bug")
        }
        let strategy = blocking(ConverterCategory::Xlsx, boom);
        let err = strategy(request(Path::new("/nope"))).await.unwrap_err();
        assert!(matches!(err, ExtractError::TaskPanicked { .. }), "{err:?}");
    }
}
