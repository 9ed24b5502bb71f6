//! Prompts sent to the enrichment model.
//!
//! Callers can override the default via
//! [`crate::config::ConversionConfig::caption_prompt`]; the constant here is
//! used only when no override is provided.

/// Default prompt for describing an image embedded in a converted document.
pub const DEFAULT_CAPTION_PROMPT: &str = r#"You are describing an image so it can be indexed as part of a Markdown document.

Follow these rules precisely:

1. CONTENT
   - Describe what the image shows in a few sentences
   - Transcribe any legible text exactly as written
   - For charts and diagrams, state the kind of chart and its key values or relationships

2. OUTPUT FORMAT
   - Output ONLY the description as plain Markdown paragraphs
   - Do NOT use headings
   - Do NOT wrap in ```markdown fences
   - Do NOT add commentary about the task"#;
