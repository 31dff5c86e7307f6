/*!
 * Cross-document references.
 *
 * A reference such as `hod_12.smil#par_3` is resolved against the base
 * location of the document it appears in. Resolution is a pure function of
 * the reference text and the base location.
 */

use std::path::PathBuf;

use url::Url;

use crate::errors::DocumentError;
use crate::file_utils::FileManager;

/// A resolved `{absolute path, fragment}` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Absolute local path of the referenced document
    pub path: PathBuf,
    /// Fragment identifier, without the leading `#`
    pub fragment: Option<String>,
}

impl DocumentRef {
    /// Resolve `reference` relative to `base`
    pub fn resolve(reference: &str, base: &Url) -> Result<Self, DocumentError> {
        let (path_part, fragment) = split_reference(reference);
        let invalid = |message: String| DocumentError::InvalidReference {
            reference: reference.to_string(),
            message,
        };

        let url = base.join(path_part).map_err(|e| invalid(e.to_string()))?;
        let path = url
            .to_file_path()
            .map_err(|_| invalid(format!("{} is not a local file", url)))?;

        Ok(Self {
            path,
            fragment: fragment.map(str::to_string),
        })
    }

    /// Case-insensitive key of the referenced document
    pub fn path_key(&self) -> String {
        FileManager::path_key(&self.path)
    }
}

/// Split `doc.html#frag` into `("doc.html", Some("frag"))`
pub fn split_reference(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (reference, None),
    }
}

/// The part of a reference before `#`
pub fn path_part(reference: &str) -> &str {
    split_reference(reference).0
}

/// Build a `file://` location from a local path
pub fn location_from_path(path: &std::path::Path) -> Result<Url, DocumentError> {
    let absolute = FileManager::absolute_path(path)?;
    Url::from_file_path(&absolute)
        .map_err(|_| DocumentError::InvalidLocation(absolute.display().to_string()))
}

/// Express `target` relative to `base`, falling back to the full location
pub fn relative_location(base: &Url, target: &Url) -> String {
    base.make_relative(target)
        .unwrap_or_else(|| target.to_string())
}
