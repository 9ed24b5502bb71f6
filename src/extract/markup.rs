//! Namespace-agnostic walk over XML parts (PresentationML slides, EPUB
//! container and package documents) on top of `quick-xml`.
//!
//! Element and attribute names are reported by local name. Self-closing
//! elements produce an [`Node::Open`] immediately followed by a
//! [`Node::Close`], so renderers only need one end-of-element handler.

use crate::error::ExtractError;
use crate::pipeline::select::ConverterCategory;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// An opening tag with its attributes unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Open(Element),
    Close(String),
    Text(String),
}

fn local(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn element(
    start: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    category: ConverterCategory,
) -> Result<Element, ExtractError> {
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ExtractError::failed(category, format!("xml attribute: {e}")))?;
        let value = attr
            .decode_and_unescape_value(reader)
            .map_err(|e| ExtractError::failed(category, format!("xml attribute: {e}")))?;
        attrs.push((local(attr.key.local_name().as_ref()), value.into_owned()));
    }
    Ok(Element {
        name: local(start.local_name().as_ref()),
        attrs,
    })
}

/// Feed every node of `xml` to `visit`, in document order.
pub(crate) fn walk(
    xml: &str,
    category: ConverterCategory,
    mut visit: impl FnMut(Node),
) -> Result<(), ExtractError> {
    let mut reader = Reader::from_str(xml);
    loop {
        let event = reader.read_event().map_err(|e| {
            ExtractError::failed(
                category,
                format!("xml error at byte {}: {e}", reader.buffer_position()),
            )
        })?;
        match event {
            Event::Start(start) => visit(Node::Open(element(&start, &reader, category)?)),
            Event::Empty(start) => {
                let open = element(&start, &reader, category)?;
                let name = open.name.clone();
                visit(Node::Open(open));
                visit(Node::Close(name));
            }
            Event::End(end) => visit(Node::Close(local(end.local_name().as_ref()))),
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| ExtractError::failed(category, format!("xml text: {e}")))?;
                visit(Node::Text(text.into_owned()));
            }
            Event::CData(data) => visit(Node::Text(local(&data.into_inner()))),
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}

#[cfg(test)]
pub(crate) fn nodes(xml: &str) -> Vec<Node> {
    let mut out = Vec::new();
    walk(xml, ConverterCategory::Pptx, |n| out.push(n)).unwrap();
    out
}
