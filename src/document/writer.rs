/*!
 * Serialization of document trees.
 *
 * Output is indented with two spaces. Elements holding text (mixed content)
 * are written inline so that no whitespace is injected into spoken text.
 * The result is encoded with the document's declared encoding.
 */

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::model::{NodeId, NodeKind, XmlDocument};
use crate::errors::DocumentError;

const INDENT: &str = "  ";

/// Serialize a whole document, declaration and prolog included, to a string
pub fn to_xml_string(doc: &XmlDocument) -> Result<String, DocumentError> {
    let mut writer = Writer::new(Vec::new());
    let mut first = true;

    if let Some(decl) = doc.declaration() {
        let event = BytesDecl::new(
            &decl.version,
            decl.encoding.as_deref(),
            decl.standalone.as_deref(),
        );
        write(&mut writer, Event::Decl(event))?;
        first = false;
    }

    for &child in doc.children(doc.document_node()) {
        if !first {
            write(&mut writer, Event::Text(BytesText::from_escaped("\n")))?;
        }
        write_node(&mut writer, doc, child, 0, false)?;
        first = false;
    }
    write(&mut writer, Event::Text(BytesText::from_escaped("\n")))?;

    into_string(writer)
}

/// Serialize one element and its subtree as a standalone UTF-8 XML document
pub fn element_to_xml_string(doc: &XmlDocument, node: NodeId) -> Result<String, DocumentError> {
    let mut writer = Writer::new(Vec::new());
    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    write(&mut writer, Event::Text(BytesText::from_escaped("\n")))?;
    write_node(&mut writer, doc, node, 0, false)?;
    into_string(writer)
}

/// Serialize and encode a document for writing back to disk
pub fn to_bytes(doc: &XmlDocument) -> Result<Vec<u8>, DocumentError> {
    let encoding = document_encoding(doc);

    // encoding_rs cannot produce UTF-16; such documents are written as UTF-8
    // and the declaration is adjusted to match
    let target: Cow<'_, XmlDocument> = if encoding.output_encoding() != encoding {
        let mut copy = doc.clone();
        let mut decl = doc.declaration().cloned().unwrap_or_default();
        decl.encoding = Some(encoding.output_encoding().name().to_lowercase());
        copy.set_declaration(Some(decl));
        Cow::Owned(copy)
    } else {
        Cow::Borrowed(doc)
    };

    let output = encoding.output_encoding();
    check_unescaped_content(&target, output)?;

    let text = to_xml_string(&target)?;
    // Text and attribute values fall back to numeric character references
    let (bytes, _, _) = output.encode(&text);
    Ok(bytes.into_owned())
}

/// Comments, CDATA sections and processing instructions admit no character
/// references, so every character in them must exist in the target encoding
fn check_unescaped_content(doc: &XmlDocument, encoding: &'static Encoding) -> Result<(), DocumentError> {
    if encoding == UTF_8 {
        return Ok(());
    }
    for node in doc.descendants(doc.document_node()) {
        let raw = match doc.kind(node) {
            NodeKind::CData(s)
            | NodeKind::Comment(s)
            | NodeKind::ProcessingInstruction(s)
            | NodeKind::DocType(s) => s,
            _ => continue,
        };
        let (_, _, unmappable) = encoding.encode(raw);
        if unmappable {
            return Err(DocumentError::Encoding {
                location: doc
                    .location()
                    .map(|url| url.to_string())
                    .unwrap_or_else(|| "<memory>".to_string()),
                encoding: encoding.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Encoding named by the declaration, UTF-8 when absent or unknown
pub fn document_encoding(doc: &XmlDocument) -> &'static Encoding {
    doc.declaration()
        .and_then(|d| d.encoding.as_deref())
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    doc: &XmlDocument,
    node: NodeId,
    depth: usize,
    inline: bool,
) -> Result<(), DocumentError> {
    match doc.kind(node) {
        NodeKind::Document => {
            for &child in doc.children(node) {
                write_node(writer, doc, child, depth, inline)?;
            }
        }
        NodeKind::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for attr in &element.attributes {
                start.push_attribute((attr.name.as_str(), attr.value.as_str()));
            }

            let children = doc.children(node);
            if children.is_empty() {
                return write(writer, Event::Empty(start));
            }
            write(writer, Event::Start(start))?;

            // Everything below mixed content is written inline as well
            let mixed = inline
                || children
                    .iter()
                    .any(|&c| matches!(doc.kind(c), NodeKind::Text(_) | NodeKind::CData(_)));
            for &child in children {
                if !mixed {
                    newline(writer, depth + 1)?;
                }
                write_node(writer, doc, child, depth + 1, mixed)?;
            }
            if !mixed {
                newline(writer, depth)?;
            }

            write(writer, Event::End(BytesEnd::new(element.name.as_str())))?;
        }
        NodeKind::Text(text) => write(writer, Event::Text(BytesText::new(text)))?,
        NodeKind::CData(text) => write(writer, Event::CData(BytesCData::new(text.as_str())))?,
        NodeKind::Comment(text) => {
            write(writer, Event::Comment(BytesText::from_escaped(text.as_str())))?
        }
        NodeKind::ProcessingInstruction(content) => {
            write(writer, Event::PI(BytesPI::new(content.as_str())))?
        }
        NodeKind::DocType(content) => {
            write(writer, Event::DocType(BytesText::from_escaped(content.as_str())))?
        }
    }
    Ok(())
}

fn newline(writer: &mut Writer<Vec<u8>>, depth: usize) -> Result<(), DocumentError> {
    let whitespace = format!("\n{}", INDENT.repeat(depth));
    write(writer, Event::Text(BytesText::from_escaped(whitespace)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), DocumentError> {
    writer
        .write_event(event)
        .map_err(|e| DocumentError::Write(e.to_string()))
}

fn into_string(writer: Writer<Vec<u8>>) -> Result<String, DocumentError> {
    String::from_utf8(writer.into_inner()).map_err(|e| DocumentError::Write(e.to_string()))
}
