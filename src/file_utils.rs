use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::DocumentError;

// @module: File and path utilities for book documents

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Read a whole file as raw bytes so the document's own encoding can be honored
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, DocumentError> {
        let path = path.as_ref();
        fs::read(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write raw bytes to a file, creating the parent directory when missing
    pub fn write_bytes<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let io_error = |source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent).map_err(io_error)?;
        }

        fs::write(path, content).map_err(io_error)
    }

    /// Turn a possibly relative path into an absolute one without touching the file system
    pub fn absolute_path<P: AsRef<Path>>(path: P) -> Result<PathBuf, DocumentError> {
        let path = path.as_ref();
        std::path::absolute(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Key used to compare document paths case-insensitively
    pub fn path_key<P: AsRef<Path>>(path: P) -> String {
        path.as_ref().to_string_lossy().to_lowercase()
    }

    /// Check whether two paths name the same document, ignoring case
    pub fn same_document<P1: AsRef<Path>, P2: AsRef<Path>>(a: P1, b: P2) -> bool {
        Self::path_key(a) == Self::path_key(b)
    }
}
