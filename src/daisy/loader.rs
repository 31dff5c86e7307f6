/*!
 * Loading the document graph of a DAISY 2.02 book.
 *
 * The navigation document (`ncc.html`) links from its headings to timing
 * documents (SMIL), whose `text` elements point into text documents. The
 * whole graph is loaded as one `DocumentSet`; if any document fails, no set
 * is produced.
 */

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::daisy::sync_point::SRC_ATTRIBUTE;
use crate::document::reference::path_part;
use crate::document::{DocumentRef, NodeId, XmlDocument};
use crate::errors::DocumentError;
use crate::file_utils::FileManager;

// @const: Heading elements whose links name timing documents
const HEADING_NAMES: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Progress callback: `(message, percent) -> stop requested`
pub type ProgressCallback<'a> = dyn FnMut(&str, u8) -> bool + 'a;

/// Percentage of `done` out of `total`, 0 when there is nothing to do
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (100 * done / total).min(100) as u8
}

/// Options controlling discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Ignore text references that resolve to the navigation document
    pub exclude_navigation: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            exclude_navigation: true,
        }
    }
}

/// Navigation, timing and text documents of one book
#[derive(Debug, Clone)]
pub struct DocumentSet {
    // @field: The ncc document
    navigation: XmlDocument,
    // @field: SMIL documents in first-seen order
    timing: Vec<XmlDocument>,
    // @field: Text documents in first-seen order
    text: Vec<XmlDocument>,
}

/// Load the navigation document with its location attached
pub fn load_navigation<P: AsRef<Path>>(path: P) -> Result<XmlDocument, DocumentError> {
    XmlDocument::load(path)
}

fn base_location(doc: &XmlDocument) -> Result<&url::Url, DocumentError> {
    doc.location()
        .ok_or_else(|| DocumentError::InvalidLocation("document has no location".to_string()))
}

// Resolve references against `base`, keeping the first occurrence of each path
fn resolve_unique<'a>(
    references: impl IntoIterator<Item = &'a str>,
    base: &url::Url,
    seen: &mut HashSet<String>,
    result: &mut Vec<PathBuf>,
) -> Result<(), DocumentError> {
    for reference in references {
        let path = path_part(reference);
        if path.trim().is_empty() {
            continue;
        }
        let resolved = DocumentRef::resolve(path, base)?;
        if seen.insert(resolved.path_key()) {
            result.push(resolved.path);
        }
    }
    Ok(())
}

/// Paths of the timing documents linked from the headings of `navigation`
pub fn timing_document_paths(navigation: &XmlDocument) -> Result<Vec<PathBuf>, DocumentError> {
    let base = base_location(navigation)?;
    let root = navigation.document_node();

    let links: Vec<&str> = navigation
        .descendants(root)
        .into_iter()
        .filter(|&n| navigation.local_name(n).is_some_and(|name| HEADING_NAMES.contains(&name)))
        .flat_map(|heading| navigation.child_elements_named(heading, "a"))
        .filter_map(|a| navigation.attribute(a, "href"))
        .collect();

    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    resolve_unique(links, base, &mut seen, &mut paths)?;
    Ok(paths)
}

/// Load every timing document linked from `navigation`, in first-seen order
pub fn discover_timing_documents(navigation: &XmlDocument) -> Result<Vec<XmlDocument>, DocumentError> {
    timing_document_paths(navigation)?
        .iter()
        .map(XmlDocument::load)
        .collect()
}

/// Paths of the text documents referenced by `text` elements of `timing`.
///
/// References resolving to `exclude` (compared without case) are skipped.
pub fn text_document_paths(timing: &[XmlDocument], exclude: Option<&Path>) -> Result<Vec<PathBuf>, DocumentError> {
    let mut seen = HashSet::new();
    if let Some(exclude) = exclude {
        seen.insert(FileManager::path_key(exclude));
    }

    let mut paths = Vec::new();
    for smil in timing {
        let base = base_location(smil)?;
        let sources: Vec<&str> = smil
            .descendants_named(smil.document_node(), "text")
            .into_iter()
            .filter_map(|text| smil.attribute(text, SRC_ATTRIBUTE))
            .collect();
        resolve_unique(sources, base, &mut seen, &mut paths)?;
    }
    Ok(paths)
}

/// Load every text document referenced from `timing`, in first-seen order
pub fn discover_text_documents(timing: &[XmlDocument], exclude: Option<&Path>) -> Result<Vec<XmlDocument>, DocumentError> {
    text_document_paths(timing, exclude)?
        .iter()
        .map(XmlDocument::load)
        .collect()
}

impl DocumentSet {
    /// Load a whole book starting from its navigation document
    pub fn load<P: AsRef<Path>>(navigation_path: P, options: LoadOptions) -> Result<Self, DocumentError> {
        let navigation = load_navigation(navigation_path)?;
        let timing = discover_timing_documents(&navigation)?;

        let own_path = navigation.location_path();
        let exclude = if options.exclude_navigation {
            own_path.as_deref()
        } else {
            None
        };
        let text = discover_text_documents(&timing, exclude)?;

        let set = Self::from_parts(navigation, timing, text);
        info!(
            "Loaded DTB with {} timing documents and {} text documents",
            set.timing.len(),
            set.text.len()
        );
        Ok(set)
    }

    /// Assemble a set from already loaded documents
    pub fn from_parts(navigation: XmlDocument, timing: Vec<XmlDocument>, text: Vec<XmlDocument>) -> Self {
        Self {
            navigation,
            timing,
            text,
        }
    }

    pub fn navigation(&self) -> &XmlDocument {
        &self.navigation
    }

    pub fn timing_documents(&self) -> &[XmlDocument] {
        &self.timing
    }

    pub fn text_documents(&self) -> &[XmlDocument] {
        &self.text
    }

    pub fn timing_document_mut(&mut self, index: usize) -> Option<&mut XmlDocument> {
        self.timing.get_mut(index)
    }

    pub fn text_document_mut(&mut self, index: usize) -> Option<&mut XmlDocument> {
        self.text.get_mut(index)
    }

    /// Index of the loaded text document at `path`, ignoring case
    pub fn text_document_index(&self, path: &Path) -> Option<usize> {
        self.text.iter().position(|doc| {
            doc.location_path()
                .is_some_and(|p| FileManager::same_document(&p, path))
        })
    }

    /// Find the text element a reference points at, as `(document index, node)`
    pub fn resolve_text_element(&self, reference: &DocumentRef) -> Option<(usize, NodeId)> {
        let fragment = reference.fragment.as_deref().filter(|f| !f.is_empty())?;
        let index = self.text_document_index(&reference.path)?;
        let doc = &self.text[index];
        doc.find_by_id(fragment).map(|node| (index, node))
    }

    /// Total number of documents in the set
    pub fn document_count(&self) -> usize {
        1 + self.timing.len() + self.text.len()
    }

    /// Write every document back to its location: navigation, timing, text.
    ///
    /// `progress` is polled before each document. Returns `false` when it
    /// asked to stop before everything was written.
    pub fn save(&self, progress: &mut ProgressCallback<'_>) -> Result<bool, DocumentError> {
        let count = self.document_count();
        let phases: [(&str, &[XmlDocument]); 3] = [
            ("Saving navigation document", std::slice::from_ref(&self.navigation)),
            ("Saving timing documents", &self.timing),
            ("Saving text documents", &self.text),
        ];

        let mut written = 0;
        for (message, documents) in phases {
            for doc in documents {
                if progress(message, percent(written, count)) {
                    info!("Save cancelled after {} of {} documents", written, count);
                    return Ok(false);
                }
                doc.save()?;
                written += 1;
            }
        }

        debug!("Saved {} documents", written);
        info!("Saved DTB ({} documents)", written);
        Ok(true)
    }
}
