/*!
 * Core XML tree types for book documents.
 *
 * Nodes live in an arena owned by `XmlDocument` and are addressed by `NodeId`.
 * Ids stay valid across sibling insertion and removal, which lets callers
 * collect playback groups up front and rewrite them one at a time.
 * Detached nodes stay in the arena but are unreachable from the root.
 */

use std::collections::HashSet;
use std::path::PathBuf;

use url::Url;

/// Name of the attribute that carries element identifiers
pub const ID_ATTRIBUTE: &str = "id";

/// Handle to a node inside one `XmlDocument`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A single `name="value"` attribute, kept in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element name and attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Qualified name as written, e.g. `span` or `xhtml:span`
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl ElementData {
    /// Name without its namespace prefix
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Namespace prefix of the name, if any
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }
}

/// Kinds of nodes kept in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The invisible document node owning the prolog and the root element
    Document,
    Element(ElementData),
    Text(String),
    CData(String),
    Comment(String),
    /// Raw processing instruction content (target and data)
    ProcessingInstruction(String),
    /// Raw doctype content following `<!DOCTYPE `
    DocType(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The `<?xml ...?>` declaration of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for Declaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("utf-8".to_string()),
            standalone: None,
        }
    }
}

/// Borrowed pointer to one element of one document
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    pub document: &'a XmlDocument,
    pub node: NodeId,
}

impl<'a> ElementRef<'a> {
    pub fn new(document: &'a XmlDocument, node: NodeId) -> Self {
        Self { document, node }
    }

    /// The element's id attribute, if present
    pub fn id(&self) -> Option<&'a str> {
        self.document.attribute(self.node, ID_ATTRIBUTE)
    }

    /// `<document-location>#<id>`, or an empty string when either part is missing
    pub fn locator(&self) -> String {
        match (self.document.location(), self.id()) {
            (Some(location), Some(id)) => format!("{}#{}", location, id),
            (Some(location), None) => location.to_string(),
            _ => String::new(),
        }
    }
}

/// An XML document stored as an arena of nodes
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<Node>,
    location: Option<Url>,
    declaration: Option<Declaration>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::empty()
    }
}

impl XmlDocument {
    /// Create a document holding only the document node
    pub fn empty() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            location: None,
            declaration: None,
        }
    }

    // @returns: The invisible node above the root element
    pub fn document_node(&self) -> NodeId {
        NodeId(0)
    }

    /// Base location used for resolving relative references and for write-back
    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: Url) {
        self.location = Some(location);
    }

    /// Local file path of the document location
    pub fn location_path(&self) -> Option<PathBuf> {
        self.location.as_ref().and_then(|url| url.to_file_path().ok())
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    pub fn set_declaration(&mut self, declaration: Option<Declaration>) {
        self.declaration = declaration;
    }

    /// The single top-level element
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.document_node())
            .iter()
            .copied()
            .find(|&child| self.is_element(child))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            name: name.to_string(),
            attributes: Vec::new(),
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Create a detached node of any non-document kind
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.push(kind)
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.0].kind
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes[node.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[node.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    /// Qualified element name
    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.name.as_str())
    }

    /// Element name without namespace prefix
    pub fn local_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.local_name())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Child elements with the given local name
    pub fn child_elements_named(&self, node: NodeId, local_name: &str) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|&child| self.local_name(child) == Some(local_name))
            .collect()
    }

    /// All nodes below `node` in document order, `node` itself excluded
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// Descendant elements with the given local name, in document order
    pub fn descendants_named(&self, node: NodeId, local_name: &str) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|&n| self.local_name(n) == Some(local_name))
            .collect()
    }

    /// `node` followed by its ancestors, nearest first
    pub fn ancestors_and_self(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = vec![node];
        let mut current = self.parent(node);
        while let Some(parent) = current {
            result.push(parent);
            current = self.parent(parent);
        }
        result
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(node) {
            match element.attributes.iter_mut().find(|a| a.name == name) {
                Some(attr) => attr.value = value.to_string(),
                None => element.attributes.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                }),
            }
        }
    }

    pub fn clear_attributes(&mut self, node: NodeId) {
        if let Some(element) = self.element_mut(node) {
            element.attributes.clear();
        }
    }

    /// Content of a text or CDATA node
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) | NodeKind::CData(text) => Some(text),
            _ => None,
        }
    }

    /// Replace the content of a text node; other kinds are left untouched
    pub fn set_text(&mut self, node: NodeId, value: &str) {
        if let NodeKind::Text(text) = &mut self.nodes[node.0].kind {
            *text = value.to_string();
        }
    }

    /// Concatenated text of every text and CDATA node below `node`
    pub fn text_content(&self, node: NodeId) -> String {
        if let Some(text) = self.text(node) {
            return text.to_string();
        }
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Detach `node` from its current parent, if any
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `new_node` as the preceding sibling of `reference`.
    /// Does nothing when `reference` is detached.
    pub fn insert_before(&mut self, reference: NodeId, new_node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(new_node);
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == reference)
            .unwrap_or(0);
        self.nodes[parent.0].children.insert(index, new_node);
        self.nodes[new_node.0].parent = Some(parent);
    }

    /// Remove `node` (and thereby its subtree) from the tree
    pub fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    /// Remove every child of `node`
    pub fn remove_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Check whether `node` is reachable from the document node
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.ancestors_and_self(node).last() == Some(&self.document_node())
    }

    /// First attached element whose id attribute equals `id`
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.document_node())
            .into_iter()
            .find(|&n| self.attribute(n, ID_ATTRIBUTE) == Some(id))
    }

    /// Every id attribute value present in the attached tree
    pub fn collect_ids(&self) -> HashSet<String> {
        self.collect_ids_below(self.document_node())
    }

    /// Id attribute values of `node` and its descendants
    pub fn collect_ids_below(&self, node: NodeId) -> HashSet<String> {
        std::iter::once(node)
            .chain(self.descendants(node))
            .filter_map(|n| self.attribute(n, ID_ATTRIBUTE))
            .map(str::to_string)
            .collect()
    }

    /// Find an attribute on the nearest element of `node`'s ancestor-or-self axis
    pub fn inherited_attribute(&self, node: NodeId, names: &[&str]) -> Option<&str> {
        self.ancestors_and_self(node).into_iter().find_map(|n| {
            names.iter().find_map(|name| self.attribute(n, name))
        })
    }
}

/// Strip the namespace prefix from a qualified name
pub fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}
