//! Office Open XML: DOCX and PPTX.
//!
//! * DOCX is parsed with `docx-rs` and rendered from its document tree:
//!   headings (`Title`, `Heading1`..`Heading6` styles), list items
//!   (paragraphs with numbering), bold/italic runs and tables.
//! * PPTX parts are read with `zip` and walked with [`super::markup`]: one
//!   block per slide, introduced by `<!-- Slide number: N -->`; title
//!   placeholders become `#` headings, tables become GFM tables and
//!   speaker notes follow under `### Notes:`.
//!
//! Every container member is size-checked before it is decompressed, so a
//! small upload cannot expand into an unbounded allocation.

use super::markup::{self, Node};
use super::{gfm_table, read_staged};
use crate::error::ExtractError;
use crate::pipeline::select::ConverterCategory;
use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, Run, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::io::{self, Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Largest uncompressed size accepted for one container member.
pub const MAX_MEMBER_BYTES: u64 = 64 * 1024 * 1024;

/// Largest uncompressed size accepted for a whole container.
pub const MAX_CONTAINER_BYTES: u64 = 4 * MAX_MEMBER_BYTES;

static RE_SLIDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());

pub fn extract_docx(path: &Path, _filename: &str) -> Result<String, ExtractError> {
    let bytes = read_staged(path, ConverterCategory::Docx)?;
    docx_to_markdown(bytes)
}

pub fn extract_pptx(path: &Path, _filename: &str) -> Result<String, ExtractError> {
    let bytes = read_staged(path, ConverterCategory::Pptx)?;
    pptx_to_markdown(bytes)
}

pub(crate) fn open_archive(
    bytes: Vec<u8>,
    category: ConverterCategory,
) -> Result<ZipArchive<Cursor<Vec<u8>>>, ExtractError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::failed(category, e))
}

/// Read one archive member as UTF-8. `Ok(None)` when the member is absent.
pub(crate) fn read_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    category: ConverterCategory,
) -> Result<Option<String>, ExtractError> {
    read_member_capped(archive, name, category, MAX_MEMBER_BYTES)
}

fn read_member_capped<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    category: ConverterCategory,
    cap: u64,
) -> Result<Option<String>, ExtractError> {
    let file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ExtractError::failed(category, format!("{name}: {e}"))),
    };
    let declared = file.size();
    if declared > cap {
        return Err(too_large(category, name, cap));
    }
    let mut buf = Vec::with_capacity(declared as usize);
    file.take(cap + 1)
        .read_to_end(&mut buf)
        .map_err(|e| ExtractError::failed(category, format!("{name}: {e}")))?;
    if buf.len() as u64 > cap {
        return Err(too_large(category, name, cap));
    }
    Ok(Some(super::text::decode_lossy(&buf)))
}

fn too_large(category: ConverterCategory, name: &str, cap: u64) -> ExtractError {
    ExtractError::failed(
        category,
        format!("{name}: uncompressed size exceeds the {cap} byte member limit"),
    )
}

/// Decompress every member into a sink, failing on the first one over
/// `member_cap` or once the running total passes `total_cap`.
fn check_expansion(
    bytes: &[u8],
    category: ConverterCategory,
    member_cap: u64,
    total_cap: u64,
) -> Result<(), ExtractError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::failed(category, e))?;
    let mut total = 0u64;
    for index in 0..archive.len() {
        let file = archive
            .by_index(index)
            .map_err(|e| ExtractError::failed(category, format!("member {index}: {e}")))?;
        let name = file.name().to_string();
        if file.size() > member_cap {
            return Err(too_large(category, &name, member_cap));
        }
        let written = io::copy(&mut file.take(member_cap + 1), &mut io::sink())
            .map_err(|e| ExtractError::failed(category, format!("{name}: {e}")))?;
        if written > member_cap {
            return Err(too_large(category, &name, member_cap));
        }
        total += written;
        if total > total_cap {
            return Err(ExtractError::failed(
                category,
                format!("container expands past the {total_cap} byte limit"),
            ));
        }
    }
    Ok(())
}

// ── DOCX ─────────────────────────────────────────────────────────────────────

/// Render a DOCX container as Markdown.
pub fn docx_to_markdown(bytes: Vec<u8>) -> Result<String, ExtractError> {
    let category = ConverterCategory::Docx;
    check_expansion(&bytes, category, MAX_MEMBER_BYTES, MAX_CONTAINER_BYTES)?;
    let archive =
        ZipArchive::new(Cursor::new(&bytes[..])).map_err(|e| ExtractError::failed(category, e))?;
    if !archive.file_names().any(|name| name == "word/document.xml") {
        return Err(ExtractError::failed(category, "missing word/document.xml"));
    }
    let docx = read_docx(&bytes).map_err(|e| ExtractError::failed(category, format!("{e:?}")))?;

    let mut blocks = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => blocks.extend(render_paragraph(paragraph)),
            DocumentChild::Table(table) => {
                let rows = table_rows(table);
                if !rows.is_empty() {
                    blocks.push(gfm_table(&rows));
                }
            }
            _ => {}
        }
    }
    Ok(blocks.join("\n\n"))
}

fn render_paragraph(paragraph: &Paragraph) -> Option<String> {
    let text = paragraph_text(paragraph);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let property = &paragraph.property;
    if let Some(level) = property.style.as_ref().and_then(|s| heading_level(&s.val)) {
        return Some(format!("{} {}", "#".repeat(level), text));
    }
    if let Some(numbering) = &property.numbering_property {
        let level = numbering.level.as_ref().map_or(0, |l| l.val);
        return Some(format!("{}- {}", "  ".repeat(level), text));
    }
    Some(text.to_string())
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    push_children(&paragraph.children, &mut out);
    out
}

fn push_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => out.push_str(&render_run(run)),
            ParagraphChild::Hyperlink(link) => push_children(&link.children, out),
            _ => {}
        }
    }
}

fn render_run(run: &Run) -> String {
    let mut text = String::new();
    for child in &run.children {
        match child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
    let property = &run.run_property;
    emphasize(&text, toggled(&property.bold), toggled(&property.italic))
}

/// A toggle property is on unless it is present with an explicit false value.
fn toggled<T: Serialize>(property: &Option<T>) -> bool {
    match property {
        None => false,
        Some(value) => !matches!(serde_json::to_value(value), Ok(serde_json::Value::Bool(false))),
    }
}

#[allow(irrefutable_let_patterns)]
fn table_rows(table: &Table) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for row in &table.rows {
        let TableChild::TableRow(row) = row else {
            continue;
        };
        let mut cells = Vec::new();
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            let texts: Vec<String> = cell
                .children
                .iter()
                .filter_map(|content| match content {
                    TableCellContent::Paragraph(p) => {
                        let text = paragraph_text(p).trim().to_string();
                        (!text.is_empty()).then_some(text)
                    }
                    _ => None,
                })
                .collect();
            cells.push(texts.join(" "));
        }
        rows.push(cells);
    }
    rows
}

/// `Title` → 1, `Heading3` / `heading 3` → 3.
fn heading_level(style: &str) -> Option<usize> {
    let lowered = style.to_ascii_lowercase().replace(' ', "");
    if lowered == "title" {
        return Some(1);
    }
    lowered
        .strip_prefix("heading")
        .and_then(|n| n.parse::<usize>().ok())
        .map(|n| n.clamp(1, 6))
}

fn emphasize(text: &str, bold: bool, italic: bool) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || (!bold && !italic) {
        return text.to_string();
    }
    let marker = match (bold, italic) {
        (true, true) => "***",
        (true, false) => "**",
        _ => "*",
    };
    // Keep surrounding spaces outside the markers.
    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[text.trim_end().len()..];
    format!("{lead}{marker}{trimmed}{marker}{trail}")
}

// ── PPTX ─────────────────────────────────────────────────────────────────────

/// Render a PPTX container as Markdown.
pub fn pptx_to_markdown(bytes: Vec<u8>) -> Result<String, ExtractError> {
    let category = ConverterCategory::Pptx;
    let mut archive = open_archive(bytes, category)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let caps = RE_SLIDE.captures(name)?;
            Some((caps[1].parse().ok()?, name.to_string()))
        })
        .collect();
    if slides.is_empty() {
        return Err(ExtractError::failed(category, "no slides found"));
    }
    slides.sort_by_key(|(n, _)| *n);

    let mut out = Vec::with_capacity(slides.len());
    for (number, name) in slides {
        let Some(slide_xml) = read_member(&mut archive, &name, category)? else {
            continue;
        };
        let mut block = format!("<!-- Slide number: {number} -->\n");
        let body = render_slide(&slide_xml)?;
        if !body.is_empty() {
            block.push_str(&body);
            block.push('\n');
        }
        let notes_name = format!("ppt/notesSlides/notesSlide{number}.xml");
        if let Some(notes_xml) = read_member(&mut archive, &notes_name, category)? {
            let notes = render_notes(&notes_xml)?;
            if !notes.is_empty() {
                block.push_str("\n### Notes:\n");
                block.push_str(&notes);
                block.push('\n');
            }
        }
        out.push(block);
    }
    Ok(out.join("\n"))
}

#[derive(Default)]
struct Slide {
    blocks: Vec<String>,
    shape_is_title: bool,
    shape_lines: Vec<String>,
    line: String,
    in_text: bool,
    in_table: bool,
    rows: Vec<Vec<String>>,
    cell: Option<String>,
}

impl Slide {
    fn visit(&mut self, node: Node) {
        match node {
            Node::Text(t) if self.in_text => self.line.push_str(&t),
            Node::Text(_) => {}
            Node::Open(el) => match el.name.as_str() {
                "sp" => {
                    self.shape_is_title = false;
                    self.shape_lines.clear();
                }
                "ph" => {
                    if matches!(el.attr("type"), Some("title" | "ctrTitle")) {
                        self.shape_is_title = true;
                    }
                }
                "tbl" => {
                    self.in_table = true;
                    self.rows.clear();
                }
                "tr" if self.in_table => self.rows.push(Vec::new()),
                "tc" if self.in_table => self.cell = Some(String::new()),
                "p" => self.line.clear(),
                "t" => self.in_text = true,
                "br" => self.line.push(' '),
                _ => {}
            },
            Node::Close(name) => match name.as_str() {
                "sp" => {
                    if !self.shape_lines.is_empty() {
                        let block = if self.shape_is_title {
                            format!("# {}", self.shape_lines.join(" "))
                        } else {
                            self.shape_lines.join("\n")
                        };
                        self.blocks.push(block);
                    }
                    self.shape_lines.clear();
                }
                "tbl" => {
                    self.in_table = false;
                    if !self.rows.is_empty() {
                        self.blocks.push(gfm_table(&self.rows));
                    }
                    self.rows.clear();
                }
                "tc" if self.in_table => {
                    if let (Some(row), Some(text)) = (self.rows.last_mut(), self.cell.take()) {
                        row.push(text);
                    }
                }
                "p" => self.end_paragraph(),
                "t" => self.in_text = false,
                _ => {}
            },
        }
    }

    fn end_paragraph(&mut self) {
        let text = self.line.trim().to_string();
        self.line.clear();
        if text.is_empty() {
            return;
        }
        if self.in_table {
            if let Some(cell) = self.cell.as_mut() {
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(&text);
            }
        } else {
            self.shape_lines.push(text);
        }
    }
}

fn render_slide(xml_text: &str) -> Result<String, ExtractError> {
    let mut slide = Slide::default();
    markup::walk(xml_text, ConverterCategory::Pptx, |node| slide.visit(node))?;
    Ok(slide.blocks.join("\n\n"))
}

/// Notes text, skipping the slide-image and slide-number placeholders.
fn render_notes(xml_text: &str) -> Result<String, ExtractError> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut in_text = false;
    let mut in_body = false;

    markup::walk(xml_text, ConverterCategory::Pptx, |node| match node {
        Node::Text(t) if in_text && in_body => line.push_str(&t),
        Node::Open(el) => match el.name.as_str() {
            "sp" => in_body = false,
            "ph" => in_body = el.attr("type") == Some("body"),
            "t" => in_text = true,
            _ => {}
        },
        Node::Close(name) => match name.as_str() {
            "t" => in_text = false,
            "p" => {
                let text = line.trim();
                if !text.is_empty() {
                    lines.push(text.to_string());
                }
                line.clear();
            }
            _ => {}
        },
        Node::Text(_) => {}
    })?;
    Ok(lines.join("\n"))
}
