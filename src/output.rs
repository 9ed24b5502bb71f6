//! Result envelopes returned to callers and serialised by the HTTP layer.

use crate::pipeline::select::ConverterCategory;
use serde::{Deserialize, Serialize};

/// Message of a successful single-file response.
pub const SUCCESS_MESSAGE: &str = "Conversion successful";

/// A converted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Client-supplied file name.
    pub filename: String,
    /// First `# ` heading, or `"Untitled Document"`.
    pub title: String,
    /// Normalised Markdown.
    pub markdown: String,
    pub metadata: ConversionMetadata,
}

/// How a document was converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionMetadata {
    /// Category the document was dispatched to. Reported even when the
    /// category strategy failed and the plain-text fallback produced the
    /// Markdown.
    pub converter_type: ConverterCategory,
    /// Size of the original upload in bytes.
    pub file_size_bytes: u64,
}

/// A file that could not be converted, in a multi-file response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionFailure {
    pub filename: String,
    pub error: String,
}

/// One record per uploaded file in a multi-file response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Converted(ConversionResult),
    Failed(ConversionFailure),
}

impl FileOutcome {
    pub fn filename(&self) -> &str {
        match self {
            FileOutcome::Converted(result) => &result.filename,
            FileOutcome::Failed(failure) => &failure.filename,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, FileOutcome::Converted(_))
    }
}

/// Body of a successful single-file response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleFileResponse {
    pub message: String,
    pub content: String,
}

impl From<ConversionResult> for SingleFileResponse {
    fn from(result: ConversionResult) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            content: result.markdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ConversionResult {
        ConversionResult {
            filename: "report.pdf".into(),
            title: "Report".into(),
            markdown: "# Report\n".into(),
            metadata: ConversionMetadata {
                converter_type: ConverterCategory::Pdf,
                file_size_bytes: 1234,
            },
        }
    }

    #[test]
    fn converted_record_shape() {
        let value = serde_json::to_value(FileOutcome::Converted(sample())).unwrap();
        assert_eq!(
            value,
            json!({
                "filename": "report.pdf",
                "title": "Report",
                "markdown": "# Report\n",
                "metadata": { "converterType": "pdf", "fileSizeBytes": 1234 }
            })
        );
    }

    #[test]
    fn failed_record_shape() {
        let outcome = FileOutcome::Failed(ConversionFailure {
            filename: "x.bin".into(),
            error: "Unsupported file type: unknown".into(),
        });
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({ "filename": "x.bin", "error": "Unsupported file type: unknown" })
        );
        assert_eq!(outcome.filename(), "x.bin");
        assert!(!outcome.is_converted());
    }

    #[test]
    fn outcome_deserialises_either_variant() {
        let ok: FileOutcome = serde_json::from_value(serde_json::to_value(sample()).unwrap()).unwrap();
        assert!(ok.is_converted());
        let err: FileOutcome =
            serde_json::from_value(json!({ "filename": "a", "error": "b" })).unwrap();
        assert!(!err.is_converted());
    }

    #[test]
    fn single_file_response_carries_markdown() {
        let response = SingleFileResponse::from(sample());
        assert_eq!(response.message, "Conversion successful");
        assert_eq!(response.content, "# Report\n");
    }
}
