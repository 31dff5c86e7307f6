/*!
 * Word level markup for text fragments.
 *
 * Text runs holding at least two words are split so that every word is
 * wrapped in its own element with a fresh document-unique id. A run with a
 * single word (or none) is left alone.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{NodeId, NodeKind, XmlDocument, ID_ATTRIBUTE};
use crate::ids::IdAllocator;

/// Attribute carrying the word class
pub const CLASS_ATTRIBUTE: &str = "class";

// @const: A maximal run of word characters
static WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").unwrap());

/// How word elements are built
#[derive(Debug, Clone, Copy)]
pub struct WordMarkupOptions<'a> {
    // @field: Qualified name of the word element
    pub element_name: &'a str,
    // @field: Class attribute value, omitted when blank
    pub class_name: Option<&'a str>,
    // @field: Descend into child elements
    pub recursive: bool,
}

impl<'a> WordMarkupOptions<'a> {
    pub fn new(element_name: &'a str, class_name: Option<&'a str>) -> Self {
        Self {
            element_name,
            class_name,
            recursive: true,
        }
    }
}

/// Count the words of a text run
pub fn word_count(text: &str) -> usize {
    WORD_REGEX.find_iter(text).count()
}

/// Wrap the words of `element` in word elements.
///
/// Ids are prefixed with the element's own id, else `default_prefix`, else
/// the element's local name. Descendants without an id of their own inherit
/// the prefix. Returns true when any markup was added.
pub fn inject_word_markup(
    doc: &mut XmlDocument,
    element: NodeId,
    options: &WordMarkupOptions<'_>,
    default_prefix: Option<&str>,
) -> bool {
    let mut allocator = IdAllocator::for_document(doc);
    mark_element(doc, element, options, default_prefix, &mut allocator)
}

fn mark_element(
    doc: &mut XmlDocument,
    element: NodeId,
    options: &WordMarkupOptions<'_>,
    default_prefix: Option<&str>,
    allocator: &mut IdAllocator,
) -> bool {
    let prefix = doc
        .attribute(element, ID_ATTRIBUTE)
        .or(default_prefix)
        .or_else(|| doc.local_name(element))
        .unwrap_or("word")
        .to_string();

    let mut added = false;
    for child in doc.children(element).to_vec() {
        let is_text = matches!(doc.kind(child), NodeKind::Text(_));
        if is_text {
            added |= mark_text(doc, child, options, &prefix, allocator);
        } else if options.recursive && doc.is_element(child) {
            added |= mark_element(doc, child, options, Some(&prefix), allocator);
        }
    }
    added
}

fn mark_text(
    doc: &mut XmlDocument,
    text_node: NodeId,
    options: &WordMarkupOptions<'_>,
    prefix: &str,
    allocator: &mut IdAllocator,
) -> bool {
    let Some(value) = doc.text(text_node).map(str::to_string) else {
        return false;
    };
    let words: Vec<(usize, usize)> = WORD_REGEX
        .find_iter(&value)
        .map(|m| (m.start(), m.end()))
        .collect();
    if words.len() <= 1 {
        return false;
    }

    let class_name = options.class_name.filter(|c| !c.trim().is_empty());
    let mut cursor = 0;
    for (start, end) in words {
        if start > cursor {
            let gap = doc.create_text(&value[cursor..start]);
            doc.insert_before(text_node, gap);
        }

        let word = doc.create_element(options.element_name);
        doc.set_attribute(word, ID_ATTRIBUTE, &allocator.allocate(prefix));
        if let Some(class_name) = class_name {
            doc.set_attribute(word, CLASS_ATTRIBUTE, class_name);
        }
        let word_text = doc.create_text(&value[start..end]);
        doc.append_child(word, word_text);
        doc.insert_before(text_node, word);

        cursor = end;
    }

    // The original node keeps whatever follows the last word
    if cursor < value.len() {
        doc.set_text(text_node, &value[cursor..]);
    } else {
        doc.remove(text_node);
    }
    true
}
