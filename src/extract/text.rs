//! Plain text and Markdown. Both render as `# {filename}` followed by the
//! decoded source.
//!
//! [`plain_text_markdown`] is also the orchestrator's degraded fallback, so
//! plain-text uploads and failed extractions share one rendering.

use super::read_staged;
use crate::error::ExtractError;
use crate::pipeline::select::ConverterCategory;
use std::path::Path;

/// Decode UTF-8, silently dropping byte sequences that are not valid UTF-8.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// `# {filename}` followed by the decoded content.
pub fn plain_text_markdown(filename: &str, bytes: &[u8]) -> String {
    format!("# {}\n\n{}", filename, decode_lossy(bytes))
}

pub fn extract_text(path: &Path, filename: &str) -> Result<String, ExtractError> {
    let bytes = read_staged(path, ConverterCategory::Text)?;
    Ok(plain_text_markdown(filename, &bytes))
}

/// Markdown uploads render like text: the file name heads the document and
/// the source follows verbatim, so the title is always the file name.
pub fn extract_markdown(path: &Path, filename: &str) -> Result<String, ExtractError> {
    let bytes = read_staged(path, ConverterCategory::Markdown)?;
    Ok(plain_text_markdown(filename, &bytes))
}
