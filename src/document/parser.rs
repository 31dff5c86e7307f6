/*!
 * XML loading on top of quick-xml.
 *
 * Documents are decoded from their declared (or BOM-signalled) encoding with
 * encoding_rs before parsing. Whitespace-only text between elements is
 * dropped unless the element holds mixed content, so the writer is free to
 * re-indent on save. HTML named entities
 * such as `&nbsp;` are resolved because navigation documents are XHTML read
 * without their DTD.
 */

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use once_cell::sync::Lazy;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::bytes::Regex;

use super::model::{Attribute, Declaration, ElementData, NodeId, NodeKind, XmlDocument};
use crate::errors::DocumentError;

// @const: Encoding pseudo-attribute of the XML declaration
static ENCODING_DECL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap()
});

/// Pick the encoding for raw document bytes: BOM first, then the declaration, then UTF-8
pub fn sniff_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    let head = &bytes[..bytes.len().min(256)];
    ENCODING_DECL_REGEX
        .captures(head)
        .and_then(|caps| caps.get(1))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decode raw bytes and parse them into a document
pub fn parse_bytes(bytes: &[u8], location: &str) -> Result<XmlDocument, DocumentError> {
    let encoding = sniff_encoding(bytes);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DocumentError::Encoding {
            location: location.to_string(),
            encoding: encoding.name().to_string(),
        });
    }
    debug!("Decoded {} as {}", location, encoding.name());
    parse_str(&text, location)
}

/// Parse an already decoded document
pub fn parse_str(text: &str, location: &str) -> Result<XmlDocument, DocumentError> {
    let mut reader = Reader::from_str(text);
    let mut doc = XmlDocument::empty();
    let mut stack: Vec<NodeId> = vec![doc.document_node()];

    let parse_error = |position: u64, message: String| DocumentError::Parse {
        location: location.to_string(),
        position,
        message,
    };

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| parse_error(position, e.to_string()))?;
        let parent = *stack.last().unwrap_or(&doc.document_node());

        match event {
            Event::Decl(decl) => {
                let version = decl
                    .version()
                    .map(|v| String::from_utf8_lossy(&v).into_owned())
                    .unwrap_or_else(|_| "1.0".to_string());
                let encoding = decl
                    .encoding()
                    .and_then(|e| e.ok())
                    .map(|e| String::from_utf8_lossy(&e).into_owned());
                let standalone = decl
                    .standalone()
                    .and_then(|s| s.ok())
                    .map(|s| String::from_utf8_lossy(&s).into_owned());
                doc.set_declaration(Some(Declaration {
                    version,
                    encoding,
                    standalone,
                }));
            }
            Event::Start(start) => {
                let element = element_from(&start).map_err(|m| parse_error(position, m))?;
                let node = doc.create_node(NodeKind::Element(element));
                doc.append_child(parent, node);
                stack.push(node);
            }
            Event::Empty(start) => {
                let element = element_from(&start).map_err(|m| parse_error(position, m))?;
                let node = doc.create_node(NodeKind::Element(element));
                doc.append_child(parent, node);
            }
            Event::End(_) => {
                if stack.len() <= 1 {
                    return Err(parse_error(position, "unexpected end tag".to_string()));
                }
                stack.pop();
            }
            Event::Text(content) => {
                let value = content
                    .unescape_with(resolve_html5_entity)
                    .map_err(|e| parse_error(position, e.to_string()))?;
                append_text(&mut doc, parent, value);
            }
            Event::CData(content) => {
                let value = utf8(&content).map_err(|m| parse_error(position, m))?;
                let node = doc.create_node(NodeKind::CData(value));
                doc.append_child(parent, node);
            }
            Event::Comment(content) => {
                let value = utf8(&content).map_err(|m| parse_error(position, m))?;
                let node = doc.create_node(NodeKind::Comment(value));
                doc.append_child(parent, node);
            }
            Event::PI(content) => {
                let value = utf8(&content).map_err(|m| parse_error(position, m))?;
                let node = doc.create_node(NodeKind::ProcessingInstruction(value));
                doc.append_child(parent, node);
            }
            Event::DocType(content) => {
                let value = utf8(&content).map_err(|m| parse_error(position, m))?;
                let node = doc.create_node(NodeKind::DocType(value));
                doc.append_child(parent, node);
            }
            Event::Eof => break,
        }
    }

    if stack.len() > 1 {
        return Err(parse_error(
            reader.buffer_position() as u64,
            "unclosed element at end of document".to_string(),
        ));
    }

    strip_formatting_whitespace(&mut doc);
    Ok(doc)
}

// Whitespace-only text is formatting unless it sits in mixed content. A run
// without a line break (the space between two inline words) counts as content.
fn strip_formatting_whitespace(doc: &mut XmlDocument) {
    let root = doc.document_node();
    let containers = std::iter::once(root).chain(doc.descendants(root));
    for node in containers.collect::<Vec<_>>() {
        let children = doc.children(node).to_vec();
        let mixed = node != root
            && children.iter().any(|&child| match doc.kind(child) {
                NodeKind::Text(text) => !text.trim().is_empty() || !text.contains('\n'),
                NodeKind::CData(_) => true,
                _ => false,
            });
        if mixed {
            continue;
        }
        for child in children {
            if matches!(doc.kind(child), NodeKind::Text(text) if text.trim().is_empty()) {
                doc.remove(child);
            }
        }
    }
}

// Adjacent text runs collapse into a single text node
fn append_text(doc: &mut XmlDocument, parent: NodeId, value: Cow<'_, str>) {
    if let Some(&last) = doc.children(parent).last() {
        if let NodeKind::Text(existing) = doc.kind(last) {
            let merged = format!("{}{}", existing, value);
            doc.set_text(last, &merged);
            return;
        }
    }
    let node = doc.create_text(&value);
    doc.append_child(parent, node);
}

fn element_from(start: &BytesStart<'_>) -> Result<ElementData, String> {
    let name = utf8(start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = utf8(attr.key.as_ref())?;
        let value = attr
            .unescape_value_with(resolve_html5_entity)
            .map_err(|e| e.to_string())?;
        attributes.push(Attribute {
            name: key,
            value: value.into_owned(),
        });
    }
    Ok(ElementData { name, attributes })
}

fn utf8(bytes: &[u8]) -> Result<String, String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| e.to_string())
}
