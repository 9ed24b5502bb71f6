//! Post-processing: deterministic cleanup of strategy output, and title derivation.
//!
//! Every extraction strategy (and the plain-text fallback) produces Markdown
//! with its own quirks: CRLF line endings from Windows-authored text files,
//! runs of blank lines where a PDF page was mostly whitespace, zero-width
//! characters copied out of Office documents, a caption wrapped in a code
//! fence by the vision model. These rules fix those quirks without touching
//! content, so every category returns the same shape of Markdown.
//!
//! All rules are pure `&str → String` functions and the pipeline is
//! idempotent: cleaning already-clean Markdown returns it unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

/// Title returned when the Markdown has no level-1 heading.
pub const UNTITLED_DOCUMENT: &str = "Untitled Document";

/// Apply all post-processing rules.
///
/// Rules (applied in order):
/// 1. Strip an outer ` ```markdown ` / ` ```md ` fence
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line, keeping two-space hard breaks
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Ensure the text ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

/// Derive a document title from Markdown.
///
/// Returns the text of the first `# ` heading, or [`UNTITLED_DOCUMENT`].
/// Headings that are blank once the marker is stripped are skipped, so the
/// result is never empty.
pub fn extract_title(markdown: &str) -> String {
    markdown
        .lines()
        .filter_map(|line| line.strip_prefix("# "))
        .map(str::trim)
        .find(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNTITLED_DOCUMENT.to_string())
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

// Only fences labelled as Markdown; a bare or other-language fence is content.
static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)[ \t]*\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

/// A line ending in two or more spaces before a non-blank line is a hard
/// line break; it keeps exactly two spaces.
fn trim_trailing_whitespace(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end();
        let next_has_text = lines.get(i + 1).is_some_and(|next| !is_blank(next));
        if !is_blank(trimmed) && next_has_text && line.ends_with("  ") {
            out.push(format!("{trimmed}  "));
        } else {
            out.push(trimmed.to_string());
        }
    }
    out.join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode ─────────────────────────────────────────

const INVISIBLE_CHARS: [char; 6] = [
    '\u{200B}', // zero-width space
    '\u{200C}', // zero-width non-joiner
    '\u{200D}', // zero-width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // byte-order mark
    '\u{00AD}', // soft hyphen
];

fn is_blank(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_whitespace() || INVISIBLE_CHARS.contains(&c))
}

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE_CHARS.contains(c)).collect()
}

// ── Rule 6: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_from_first_h1() {
        assert_eq!(extract_title("# Hello\n\nBody"), "Hello");
    }

    #[test]
    fn title_sentinel_without_h1() {
        assert_eq!(extract_title("Body only"), UNTITLED_DOCUMENT);
        assert_eq!(extract_title(""), UNTITLED_DOCUMENT);
        assert_eq!(extract_title("## Section\n\ntext"), UNTITLED_DOCUMENT);
        assert_eq!(extract_title("#NoSpace"), UNTITLED_DOCUMENT);
    }

    #[test]
    fn title_takes_first_of_many_and_skips_blank_headings() {
        assert_eq!(extract_title("intro\n# \n# First\n# Second"), "First");
    }

    #[test]
    fn title_keeps_inner_markers() {
        assert_eq!(extract_title("# C# in depth"), "C# in depth");
    }

    #[test]
    fn strips_outer_fence() {
        let input = "```markdown\n# Title\n\nBody\n```";
        assert_eq!(clean_markdown(input), "# Title\n\nBody\n");
    }

    #[test]
    fn unlabelled_and_code_fences_are_content() {
        let code = "```\nfn main() {}\n```";
        assert_eq!(clean_markdown(code), "```\nfn main() {}\n```\n");
        let rust = "```rust\nlet x = 1;\n```";
        assert_eq!(clean_markdown(rust), "```rust\nlet x = 1;\n```\n");
        assert_eq!(clean_markdown("```md\nbody\n```"), "body\n");
    }

    #[test]
    fn normalises_crlf_and_trailing_space() {
        assert_eq!(clean_markdown("a \t\r\nb\rc"), "a\nb\nc\n");
    }

    #[test]
    fn hard_line_breaks_survive() {
        assert_eq!(clean_markdown("line one  \nline two"), "line one  \nline two\n");
        assert_eq!(clean_markdown("line one    \r\nline two"), "line one  \nline two\n");
        // Before a blank line or at the end there is nothing to break.
        assert_eq!(clean_markdown("para  \n\nnext  "), "para\n\nnext\n");
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(clean_markdown("a\n\n\n\n\n\nb"), "a\n\n\nb\n");
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(clean_markdown("\u{FEFF}# T\u{200B}itle"), "# Title\n");
    }

    #[test]
    fn empty_becomes_single_newline() {
        assert_eq!(clean_markdown(""), "\n");
        assert_eq!(clean_markdown("   \n\n"), "\n");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let once = clean_markdown("# T\r\n\r\n\r\n\r\n\r\nbody  \nmore  \n\u{200B}");
        assert_eq!(clean_markdown(&once), once);
        let once = clean_markdown("x  \n\u{200B}\ny\n\u{200B}  \nz");
        assert_eq!(clean_markdown(&once), once);
    }
}
