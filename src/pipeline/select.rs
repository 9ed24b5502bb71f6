//! Converter selection: map `(extension, mime_type)` to a [`ConverterCategory`].
//!
//! Extension wins over MIME type because the client-supplied name is the
//! strongest signal we have for container formats: a `.docx` and a `.zip`
//! share the same `PK\x03\x04` signature, and sniffing often reports the
//! bare `application/zip`. The MIME table is consulted only when the
//! extension is unknown, and anything still unmapped is sent to `text` so
//! every upload at least gets a plain-text rendering.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Closed set of extraction strategies the orchestrator can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterCategory {
    Pdf,
    Docx,
    Pptx,
    Xlsx,
    Html,
    Markdown,
    Text,
    Epub,
    Image,
    Audio,
    Archive,
}

impl ConverterCategory {
    /// Every category, in declaration order.
    pub const ALL: [ConverterCategory; 11] = [
        ConverterCategory::Pdf,
        ConverterCategory::Docx,
        ConverterCategory::Pptx,
        ConverterCategory::Xlsx,
        ConverterCategory::Html,
        ConverterCategory::Markdown,
        ConverterCategory::Text,
        ConverterCategory::Epub,
        ConverterCategory::Image,
        ConverterCategory::Audio,
        ConverterCategory::Archive,
    ];

    /// Category used when neither the extension nor the MIME type is mapped.
    pub const FALLBACK: ConverterCategory = ConverterCategory::Text;

    pub fn as_str(&self) -> &'static str {
        match self {
            ConverterCategory::Pdf => "pdf",
            ConverterCategory::Docx => "docx",
            ConverterCategory::Pptx => "pptx",
            ConverterCategory::Xlsx => "xlsx",
            ConverterCategory::Html => "html",
            ConverterCategory::Markdown => "markdown",
            ConverterCategory::Text => "text",
            ConverterCategory::Epub => "epub",
            ConverterCategory::Image => "image",
            ConverterCategory::Audio => "audio",
            ConverterCategory::Archive => "archive",
        }
    }
}

impl fmt::Display for ConverterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConverterCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        ConverterCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| format!("unknown converter category '{s}'"))
    }
}

static EXTENSION_TABLE: Lazy<HashMap<&'static str, ConverterCategory>> = Lazy::new(|| {
    use ConverterCategory::*;
    HashMap::from([
        (".pdf", Pdf),
        (".docx", Docx),
        (".pptx", Pptx),
        (".xlsx", Xlsx),
        (".html", Html),
        (".htm", Html),
        (".md", Markdown),
        (".txt", Text),
        (".epub", Epub),
        (".jpg", Image),
        (".jpeg", Image),
        (".png", Image),
        (".mp3", Audio),
        (".wav", Audio),
        (".zip", Archive),
    ])
});

static MIME_TABLE: Lazy<HashMap<&'static str, ConverterCategory>> = Lazy::new(|| {
    use ConverterCategory::*;
    HashMap::from([
        ("application/pdf", Pdf),
        (
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Docx,
        ),
        (
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            Pptx,
        ),
        (
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Xlsx,
        ),
        ("text/html", Html),
        ("text/markdown", Markdown),
        ("text/plain", Text),
        ("application/epub+zip", Epub),
        ("image/jpeg", Image),
        ("image/png", Image),
        ("audio/mpeg", Audio),
        ("audio/wav", Audio),
        ("audio/x-wav", Audio),
        ("application/zip", Archive),
    ])
});

/// Look up an extension (with or without its leading `.`) in the extension table.
pub fn category_for_extension(extension: &str) -> Option<ConverterCategory> {
    let lowered = extension.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return None;
    }
    let key = if lowered.starts_with('.') {
        lowered
    } else {
        format!(".{lowered}")
    };
    EXTENSION_TABLE.get(key.as_str()).copied()
}

/// Look up a MIME type in the MIME table. Parameters (`; charset=…`) are ignored.
pub fn category_for_mime(mime_type: &str) -> Option<ConverterCategory> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    MIME_TABLE.get(essence.as_str()).copied()
}

/// Whether `mime_type` is one the service knows how to convert.
pub fn is_supported_mime(mime_type: &str) -> bool {
    category_for_mime(mime_type).is_some()
}

/// Whether `extension` (e.g. `".pdf"`) is one the service knows how to convert.
pub fn is_supported_extension(extension: &str) -> bool {
    category_for_extension(extension).is_some()
}

/// Pick the converter category for a file.
///
/// Extension first, then MIME type, then [`ConverterCategory::FALLBACK`].
/// Never fails.
pub fn select_converter(extension: &str, mime_type: Option<&str>) -> ConverterCategory {
    if let Some(category) = category_for_extension(extension) {
        debug!(extension, ?mime_type, %category, "Converter selected by extension");
        return category;
    }

    if let Some(category) = mime_type.and_then(category_for_mime) {
        debug!(extension, ?mime_type, %category, "Converter selected by MIME type");
        return category;
    }

    warn!(
        extension,
        ?mime_type,
        "Could not determine converter, defaulting to '{}'",
        ConverterCategory::FALLBACK
    );
    ConverterCategory::FALLBACK
}
