//! Zip archives: a member listing, then each textual member inlined under
//! a `## File:` heading.
//!
//! Plain text and Markdown members are inlined as-is, HTML members go
//! through the HTML renderer. Other members appear only in the listing.

use super::html::html_to_markdown;
use super::text::decode_lossy;
use super::{gfm_table, read_staged};
use crate::error::ExtractError;
use crate::pipeline::detect::extension_of;
use crate::pipeline::select::ConverterCategory;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

const CATEGORY: ConverterCategory = ConverterCategory::Archive;

/// Members larger than this (uncompressed) are listed but not inlined.
pub const MAX_INLINE_MEMBER_BYTES: u64 = 5_000_000;

pub fn extract(path: &Path, filename: &str) -> Result<String, ExtractError> {
    let bytes = read_staged(path, CATEGORY)?;
    zip_to_markdown(filename, bytes)
}

pub fn zip_to_markdown(filename: &str, bytes: Vec<u8>) -> Result<String, ExtractError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::failed(CATEGORY, e))?;

    let mut listing: Vec<Vec<String>> = vec![vec!["File".into(), "Size (bytes)".into()]];
    let mut sections = Vec::new();

    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| ExtractError::failed(CATEGORY, format!("member {index}: {e}")))?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        let size = member.size();
        listing.push(vec![name.clone(), size.to_string()]);

        let extension = extension_of(&name);
        let render: fn(&str) -> String = match extension.as_str() {
            ".txt" | ".md" | ".markdown" => |s| s.trim().to_string(),
            ".html" | ".htm" | ".xhtml" => html_to_markdown,
            _ => continue,
        };
        if size > MAX_INLINE_MEMBER_BYTES {
            debug!(member = %name, size, "Archive member too large to inline");
            continue;
        }

        let mut buf = Vec::with_capacity(size as usize);
        if let Err(e) = (&mut member)
            .take(MAX_INLINE_MEMBER_BYTES)
            .read_to_end(&mut buf)
        {
            warn!(member = %name, error = %e, "Could not read archive member");
            continue;
        }
        let body = render(&decode_lossy(&buf));
        if body.is_empty() {
            sections.push(format!("## File: {name}"));
        } else {
            sections.push(format!("## File: {name}\n\n{body}"));
        }
    }

    let mut blocks = vec![format!("# {filename}")];
    if listing.len() > 1 {
        blocks.push(gfm_table(&listing));
    } else {
        blocks.push("_Empty archive._".to_string());
    }
    blocks.extend(sections);
    Ok(blocks.join("\n\n"))
}
