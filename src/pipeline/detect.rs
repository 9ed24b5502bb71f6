//! Type identification: filename + raw bytes → [`DetectionResult`].
//!
//! The MIME type is resolved by a short-circuit chain of `Option`-returning
//! checks, the first success wins:
//!
//! 1. [`sniff_signature`]: magic-number match on the leading bytes (`infer`)
//! 2. [`sniff_text`]     : valid UTF-8 without NUL bytes is `text/plain`
//! 3. [`guess_from_name`]: extension lookup (`mime_guess`)
//!
//! Unknown types are a normal outcome (`is_supported == false`), not an error.

use crate::pipeline::select::{is_supported_extension, is_supported_mime};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How many leading bytes the textual check inspects.
const TEXT_SNIFF_BYTES: usize = 8192;

/// Outcome of [`identify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Lowercased extension including the leading `.`, or empty.
    pub extension: String,
    /// Best-effort MIME type.
    pub mime_type: Option<String>,
    pub is_supported: bool,
}

/// Identify the type of an uploaded file.
pub fn identify(name: &str, content: &[u8]) -> DetectionResult {
    let extension = extension_of(name);

    let mime_type = sniff_signature(content)
        .or_else(|| sniff_text(content))
        .or_else(|| guess_from_name(name));

    let is_supported = is_supported_extension(&extension)
        || mime_type.as_deref().is_some_and(is_supported_mime);

    debug!(
        filename = name,
        extension = %extension,
        mime_type = ?mime_type,
        is_supported,
        "Identified upload"
    );

    DetectionResult {
        extension,
        mime_type,
        is_supported,
    }
}

/// Lowercased extension of the final path component, with its leading `.`.
///
/// Leading dots of hidden files do not start an extension (`.bashrc` has
/// none); a trailing dot yields `"."`.
pub fn extension_of(name: &str) -> String {
    let lowered = name.to_lowercase();
    let file_name = lowered
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(lowered.as_str());
    let stem_start = file_name.len() - file_name.trim_start_matches('.').len();

    match file_name[stem_start..].rfind('.') {
        Some(idx) => file_name[stem_start + idx..].to_string(),
        None => String::new(),
    }
}

/// Content signature check.
pub fn sniff_signature(content: &[u8]) -> Option<String> {
    infer::get(content).map(|kind| kind.mime_type().to_string())
}

/// Textual-content check: non-empty, no NUL bytes and valid UTF-8 within the sample.
pub fn sniff_text(content: &[u8]) -> Option<String> {
    if content.is_empty() {
        return None;
    }
    let sample = &content[..content.len().min(TEXT_SNIFF_BYTES)];
    if sample.contains(&0) {
        return None;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => Some("text/plain".to_string()),
        // A multi-byte sequence cut by the sample boundary is still text.
        Err(e) if e.error_len().is_none() && sample.len() < content.len() => {
            Some("text/plain".to_string())
        }
        Err(_) => None,
    }
}

/// Name-based check.
pub fn guess_from_name(name: &str) -> Option<String> {
    mime_guess::from_path(name).first().map(|mime| mime.to_string())
}
