//! PDF text layer via `lopdf`.
//!
//! One Markdown block per page, in page order. When the document Info
//! dictionary carries a `Title` it becomes the `#` heading. Pages whose text
//! cannot be decoded are skipped with a warning; a document that cannot be
//! parsed at all is a strategy failure.

use crate::error::ExtractError;
use crate::pipeline::select::ConverterCategory;
use lopdf::{Document, Object};
use std::path::Path;
use tracing::{debug, warn};

const CATEGORY: ConverterCategory = ConverterCategory::Pdf;

pub fn extract(path: &Path, _filename: &str) -> Result<String, ExtractError> {
    let document = Document::load(path)
        .map_err(|e| ExtractError::failed(CATEGORY, format!("failed reading pdf: {e}")))?;
    pdf_to_markdown(&document)
}

/// Render a loaded document.
pub fn pdf_to_markdown(document: &Document) -> Result<String, ExtractError> {
    let pages = document.get_pages();
    if pages.is_empty() {
        return Err(ExtractError::failed(CATEGORY, "document has no pages"));
    }
    debug!(pages = pages.len(), "Extracting PDF text layer");

    let mut blocks = Vec::with_capacity(pages.len() + 1);
    if let Some(title) = info_title(document) {
        blocks.push(format!("# {title}"));
    }

    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => {
                let text = tidy_page_text(&text);
                if !text.is_empty() {
                    blocks.push(text);
                }
            }
            Err(e) => warn!(page = page_number, error = %e, "Skipping undecodable PDF page"),
        }
    }

    Ok(blocks.join("\n\n"))
}

fn tidy_page_text(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// `Title` from the trailer's Info dictionary, if present and non-blank.
fn info_title(document: &Document) -> Option<String> {
    let info = match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_object(*id).ok()?,
        object => object,
    };
    let title = match info.as_dict().ok()?.get(b"Title").ok()? {
        Object::Reference(id) => document.get_object(*id).ok()?,
        object => object,
    };
    let decoded = match title {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => return None,
    };
    Some(decoded.trim().to_string()).filter(|t| !t.is_empty())
}

/// PDF text strings are UTF-16BE when they start with a BOM.
fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(rest) => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}
