//! HTML → Markdown via a `scraper` DOM walk.
//!
//! Only `<body>` is rendered. Headings, paragraphs, emphasis, inline code,
//! preformatted blocks, links, images, nested lists, tables and block quotes
//! map to their Markdown forms; scripts, styles and other non-content
//! elements are dropped. When the body has no `#` heading, the document
//! `<title>` is used as one.

use super::{gfm_table, read_staged};
use crate::error::ExtractError;
use crate::pipeline::select::ConverterCategory;
use ego_tree::NodeRef;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::path::Path;

static SEL_BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static SEL_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub fn extract(path: &Path, _filename: &str) -> Result<String, ExtractError> {
    let bytes = read_staged(path, ConverterCategory::Html)?;
    Ok(html_to_markdown(&super::text::decode_lossy(&bytes)))
}

/// Render an HTML document as Markdown.
pub fn html_to_markdown(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut renderer = Renderer::default();
    match document.select(&SEL_BODY).next() {
        Some(body) => renderer.children(*body),
        None => renderer.children(*document.root_element()),
    }
    let body = renderer.out.trim().to_string();

    let has_h1 = body.lines().any(|l| l.starts_with("# "));
    let title = document
        .select(&SEL_TITLE)
        .next()
        .map(|t| collapse(&t.text().collect::<String>()).trim().to_string())
        .filter(|t| !t.is_empty());

    match title {
        Some(title) if !has_h1 => {
            if body.is_empty() {
                format!("# {title}")
            } else {
                format!("# {title}\n\n{body}")
            }
        }
        _ => body,
    }
}

fn collapse(text: &str) -> std::borrow::Cow<'_, str> {
    RE_WHITESPACE.replace_all(text, " ")
}

#[derive(Default)]
struct Renderer {
    out: String,
    list_depth: usize,
}

impl Renderer {
    fn nested(&self) -> Self {
        Self {
            out: String::new(),
            list_depth: self.list_depth,
        }
    }

    fn children(&mut self, node: NodeRef<'_, Node>) {
        for child in node.children() {
            self.node(child);
        }
    }

    /// Render `node`'s children on their own and flatten to one line.
    fn inline(&self, node: NodeRef<'_, Node>) -> String {
        let mut sub = self.nested();
        sub.children(node);
        collapse(sub.out.trim()).into_owned()
    }

    fn block_break(&mut self) {
        if self.out.is_empty() {
            return;
        }
        let keep = self.out.trim_end().len();
        self.out.truncate(keep);
        self.out.push_str("\n\n");
    }

    fn line_break(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn text(&mut self, text: &str) {
        let collapsed = collapse(text);
        if self.out.is_empty() || self.out.ends_with('\n') || self.out.ends_with(' ') {
            self.out.push_str(collapsed.trim_start());
        } else {
            self.out.push_str(&collapsed);
        }
    }

    fn wrap(&mut self, node: NodeRef<'_, Node>, marker: &str) {
        let inner = self.inline(node);
        if !inner.is_empty() {
            self.out.push_str(marker);
            self.out.push_str(&inner);
            self.out.push_str(marker);
        }
    }

    fn node(&mut self, node: NodeRef<'_, Node>) {
        match node.value() {
            Node::Text(text) => self.text(text),
            Node::Element(element) => self.element(node, element.name(), element),
            _ => {}
        }
    }

    fn element(&mut self, node: NodeRef<'_, Node>, name: &str, element: &scraper::node::Element) {
        match name {
            "script" | "style" | "head" | "noscript" | "template" | "title" | "meta"
            | "link" | "iframe" | "svg" => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(name.as_bytes()[1] - b'0');
                let text = self.inline(node);
                if !text.is_empty() {
                    self.block_break();
                    self.out.push_str(&"#".repeat(level));
                    self.out.push(' ');
                    self.out.push_str(&text);
                    self.block_break();
                }
            }
            "p" | "div" | "section" | "article" | "header" | "footer" | "main" | "nav"
            | "aside" | "figure" | "figcaption" | "dl" | "dt" | "dd" | "form" => {
                self.block_break();
                self.children(node);
                self.block_break();
            }
            "br" => self.out.push('\n'),
            "hr" => {
                self.block_break();
                self.out.push_str("---");
                self.block_break();
            }
            "strong" | "b" => self.wrap(node, "**"),
            "em" | "i" => self.wrap(node, "*"),
            "code" | "kbd" | "samp" => self.wrap(node, "`"),
            "pre" => {
                let raw: String = node
                    .descendants()
                    .filter_map(|n| match n.value() {
                        Node::Text(t) => Some(&**t),
                        _ => None,
                    })
                    .collect();
                self.block_break();
                self.out.push_str("```\n");
                self.out.push_str(raw.trim_matches('\n'));
                self.out.push_str("\n```");
                self.block_break();
            }
            "a" => {
                let text = self.inline(node);
                match element.attr("href").map(str::trim) {
                    Some(href) if !href.is_empty() && !href.starts_with("javascript:") => {
                        let label = if text.is_empty() { href } else { text.as_str() };
                        self.out.push_str(&format!("[{label}]({href})"));
                    }
                    _ => self.out.push_str(&text),
                }
            }
            "img" => {
                let src = element.attr("src").unwrap_or_default().trim();
                if !src.is_empty() {
                    let alt = collapse(element.attr("alt").unwrap_or_default()).trim().to_string();
                    self.out.push_str(&format!("![{alt}]({src})"));
                }
            }
            "ul" | "ol" => self.list(node, name == "ol"),
            "table" => {
                let rows: Vec<Vec<String>> = node
                    .descendants()
                    .filter(|n| is_element(*n, &["tr"]))
                    .map(|tr| {
                        tr.children()
                            .filter(|c| is_element(*c, &["th", "td"]))
                            .map(|cell| self.inline(cell))
                            .collect::<Vec<_>>()
                    })
                    .filter(|row| !row.is_empty())
                    .collect();
                if !rows.is_empty() {
                    self.block_break();
                    self.out.push_str(&gfm_table(&rows));
                    self.block_break();
                }
            }
            "blockquote" => {
                let mut sub = self.nested();
                sub.children(node);
                let inner = sub.out.trim().to_string();
                if !inner.is_empty() {
                    self.block_break();
                    let quoted: Vec<String> = inner
                        .lines()
                        .map(|l| if l.is_empty() { ">".to_string() } else { format!("> {l}") })
                        .collect();
                    self.out.push_str(&quoted.join("\n"));
                    self.block_break();
                }
            }
            _ => self.children(node),
        }
    }

    fn list(&mut self, node: NodeRef<'_, Node>, ordered: bool) {
        if self.list_depth == 0 {
            self.block_break();
        } else {
            self.line_break();
        }
        let indent = "  ".repeat(self.list_depth);

        let items = node.children().filter(|c| is_element(*c, &["li"]));
        for (index, item) in items.enumerate() {
            let mut sub = Renderer {
                out: String::new(),
                list_depth: self.list_depth + 1,
            };
            sub.children(item);
            let content = sub.out.trim();

            let marker = if ordered {
                format!("{}. ", index + 1)
            } else {
                "- ".to_string()
            };
            self.out.push_str(&indent);
            self.out.push_str(&marker);
            self.out.push_str(content);
            self.out.push('\n');
        }

        if self.list_depth == 0 {
            self.block_break();
        }
    }
}

fn is_element(node: NodeRef<'_, Node>, names: &[&str]) -> bool {
    matches!(node.value(), Node::Element(e) if names.contains(&e.name()))
}
