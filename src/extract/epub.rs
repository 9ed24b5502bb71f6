//! EPUB: container → OPF package → spine chapters through the HTML renderer.

use super::html::html_to_markdown;
use super::markup::{self, Node};
use super::office::{open_archive, read_member};
use super::read_staged;
use crate::error::ExtractError;
use crate::pipeline::select::ConverterCategory;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

const CATEGORY: ConverterCategory = ConverterCategory::Epub;

pub fn extract(path: &Path, _filename: &str) -> Result<String, ExtractError> {
    let bytes = read_staged(path, CATEGORY)?;
    epub_to_markdown(bytes)
}

/// Parsed OPF package document.
#[derive(Debug, Default, PartialEq, Eq)]
struct Package {
    title: Option<String>,
    creators: Vec<String>,
    /// Manifest hrefs in spine order.
    spine: Vec<String>,
}

pub fn epub_to_markdown(bytes: Vec<u8>) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes, CATEGORY)?;

    let container = read_member(&mut archive, "META-INF/container.xml", CATEGORY)?
        .ok_or_else(|| ExtractError::failed(CATEGORY, "missing META-INF/container.xml"))?;
    let opf_path = rootfile_path(&container)?
        .ok_or_else(|| ExtractError::failed(CATEGORY, "container.xml names no rootfile"))?;
    let opf = read_member(&mut archive, &opf_path, CATEGORY)?
        .ok_or_else(|| ExtractError::failed(CATEGORY, format!("missing package {opf_path}")))?;
    let package = parse_package(&opf)?;
    debug!(chapters = package.spine.len(), "Parsed EPUB package");

    let base = opf_path.rsplit_once('/').map_or("", |(dir, _)| dir);
    let mut blocks = Vec::with_capacity(package.spine.len() + 2);
    if let Some(title) = &package.title {
        blocks.push(format!("# {title}"));
    }
    if !package.creators.is_empty() {
        blocks.push(format!("**Authors:** {}", package.creators.join(", ")));
    }

    for href in &package.spine {
        let member = resolve_href(base, href);
        match read_member(&mut archive, &member, CATEGORY)? {
            Some(chapter) => {
                let md = html_to_markdown(&chapter);
                if !md.is_empty() {
                    blocks.push(md);
                }
            }
            None => warn!(chapter = %member, "EPUB spine item missing from archive"),
        }
    }
    Ok(blocks.join("\n\n"))
}

fn rootfile_path(container: &str) -> Result<Option<String>, ExtractError> {
    let mut path = None;
    markup::walk(container, CATEGORY, |node| {
        if let Node::Open(el) = node {
            if path.is_none() && el.name == "rootfile" {
                path = el.attr("full-path").map(str::to_string);
            }
        }
    })?;
    Ok(path)
}

fn parse_package(opf: &str) -> Result<Package, ExtractError> {
    let mut package = Package::default();
    let mut manifest: HashMap<String, String> = HashMap::new();
    let mut idrefs: Vec<String> = Vec::new();
    let mut capture = false;
    let mut buf = String::new();

    markup::walk(opf, CATEGORY, |node| match node {
        Node::Open(el) => match el.name.as_str() {
            "title" | "creator" => {
                capture = true;
                buf.clear();
            }
            "item" => {
                if let (Some(id), Some(href)) = (el.attr("id"), el.attr("href")) {
                    manifest.insert(id.to_string(), href.to_string());
                }
            }
            "itemref" => {
                if let Some(idref) = el.attr("idref") {
                    idrefs.push(idref.to_string());
                }
            }
            _ => {}
        },
        Node::Text(t) if capture => buf.push_str(&t),
        Node::Text(_) => {}
        Node::Close(name) => {
            if !matches!(name.as_str(), "title" | "creator") {
                return;
            }
            let text = buf.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                if name == "title" {
                    package.title.get_or_insert(text);
                } else {
                    package.creators.push(text);
                }
            }
            capture = false;
        }
    })?;

    package.spine = idrefs
        .iter()
        .filter_map(|id| manifest.get(id).cloned())
        .collect();
    Ok(package)
}

/// Join `href` onto the package directory, resolving `.` and `..`.
fn resolve_href(base: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let mut parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    for part in href.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;

    const OPF: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>A Small Book</dc:title>
    <dc:creator>Ada Writer</dc:creator>
  </metadata>
  <manifest>
    <item id="c1" href="text/one.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="text/two.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="c2"/><itemref idref="c1"/></spine>
</package>"#;

    fn make_epub(members: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            for (name, body) in members {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(body.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn chapters_follow_spine_order() {
        let bytes = make_epub(&[
            ("mimetype", "application/epub+zip"),
            ("META-INF/container.xml", CONTAINER),
            ("OEBPS/content.opf", OPF),
            ("OEBPS/text/one.xhtml", "<html><body><h2>Chapter One</h2><p>First.</p></body></html>"),
            ("OEBPS/text/two.xhtml", "<html><body><h2>Chapter Two</h2><p>Second.</p></body></html>"),
        ]);
        let md = epub_to_markdown(bytes).unwrap();
        assert!(md.starts_with("# A Small Book\n\n**Authors:** Ada Writer\n\n"), "{md}");
        let one = md.find("## Chapter One").unwrap();
        let two = md.find("## Chapter Two").unwrap();
        assert!(two < one, "spine order not followed: {md}");
    }

    #[test]
    fn missing_container_fails() {
        let err = epub_to_markdown(make_epub(&[("mimetype", "application/epub+zip")])).unwrap_err();
        assert!(err.to_string().contains("container.xml"));
    }

    #[test]
    fn package_parsing() {
        let package = parse_package(OPF).unwrap();
        assert_eq!(package.title.as_deref(), Some("A Small Book"));
        assert_eq!(package.creators, vec!["Ada Writer".to_string()]);
        assert_eq!(package.spine, vec!["text/two.xhtml", "text/one.xhtml"]);
    }

    #[test]
    fn manifest_href_with_angle_bracket_in_sibling_attribute() {
        let opf = r#"<package><metadata><dc:title xmlns:dc="dc">Sums &amp; Signs</dc:title></metadata>
<manifest><item id="c1" properties="x>y" href="one.xhtml"/></manifest>
<spine><itemref idref="c1"/></spine></package>"#;
        let package = parse_package(opf).unwrap();
        assert_eq!(package.title.as_deref(), Some("Sums & Signs"));
        assert_eq!(package.spine, vec!["one.xhtml"]);
    }

    #[test]
    fn malformed_package_fails() {
        assert!(parse_package("<package><manifest></package>").is_err());
    }

    #[test]
    fn href_resolution() {
        assert_eq!(resolve_href("OEBPS", "text/a.xhtml"), "OEBPS/text/a.xhtml");
        assert_eq!(resolve_href("OEBPS/text", "../b.xhtml#x"), "OEBPS/b.xhtml");
        assert_eq!(resolve_href("", "c.xhtml"), "c.xhtml");
    }
}
