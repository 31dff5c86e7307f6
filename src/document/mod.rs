/*!
 * XML document handling for talking book files.
 *
 * - `model`: arena-based tree with stable node ids
 * - `parser`: encoding-aware loading on top of quick-xml
 * - `writer`: indented serialization and write-back
 * - `reference`: resolution of `path#fragment` references
 */

pub mod model;
pub mod parser;
pub mod reference;
pub mod writer;

use std::path::Path;

use log::debug;

use crate::errors::DocumentError;
use crate::file_utils::FileManager;

pub use model::{ElementRef, NodeId, NodeKind, XmlDocument, ID_ATTRIBUTE};
pub use reference::DocumentRef;

impl XmlDocument {
    /// Load a document from disk and attach its location
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let location = reference::location_from_path(path)?;
        let bytes = FileManager::read_bytes(path)?;
        let mut doc = parser::parse_bytes(&bytes, &path.display().to_string())?;
        doc.set_location(location);
        debug!("Loaded document {}", path.display());
        Ok(doc)
    }

    /// Parse a document from a string without a location
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        parser::parse_str(text, "<memory>")
    }

    /// Write the document back to its own location
    pub fn save(&self) -> Result<(), DocumentError> {
        let path = self
            .location_path()
            .ok_or_else(|| DocumentError::InvalidLocation("document has no file location".to_string()))?;
        self.save_to(&path)
    }

    /// Write the document to `path` using its declared encoding
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), DocumentError> {
        let bytes = writer::to_bytes(self)?;
        FileManager::write_bytes(path.as_ref(), &bytes)?;
        debug!("Saved document {}", path.as_ref().display());
        Ok(())
    }

    /// Serialize to an indented UTF-8 string
    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        writer::to_xml_string(self)
    }
}
