/*!
 * Document-unique identifier allocation.
 *
 * An allocator is seeded with every id already present in one document and
 * hands out `prefix`, or `prefix_<n>` for the smallest free `n >= 1`.
 * Identifier spaces are per document; nothing here looks across documents.
 */

use std::collections::HashSet;

use crate::document::XmlDocument;

/// Allocates identifiers unique within one document's id space
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    // @field: Every id known to be taken
    used: HashSet<String>,
}

impl IdAllocator {
    /// Create an allocator over an explicit set of existing ids
    pub fn new(existing: HashSet<String>) -> Self {
        Self { used: existing }
    }

    /// Create an allocator seeded with all ids of `doc`
    pub fn for_document(doc: &XmlDocument) -> Self {
        Self::new(doc.collect_ids())
    }

    /// Return `prefix` if unused, else `prefix_<n>` for the smallest free `n`.
    /// The returned id is recorded as used.
    pub fn allocate(&mut self, prefix: &str) -> String {
        let mut id = prefix.to_string();
        let mut n: u64 = 0;
        while self.used.contains(&id) {
            n += 1;
            id = format!("{}_{}", prefix, n);
        }
        self.used.insert(id.clone());
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.used.contains(id)
    }
}
