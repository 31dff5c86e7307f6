/*!
 * Error types for the dtbsync library.
 *
 * Each concern owns an error enum built with the thiserror crate. `SyncError`
 * is the top-level type returned by the synchronizer and wraps the others.
 * Anything represented here is fatal to the operation that returned it;
 * recoverable problems travel through the warning channel instead.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading, parsing or writing XML documents
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Reading or writing the underlying file failed
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// The file being accessed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed XML
    #[error("Failed to parse {location} at byte {position}: {message}")]
    Parse {
        /// Where the document came from (path or `<memory>`)
        location: String,
        /// Byte offset reported by the XML reader
        position: u64,
        /// Reader error message
        message: String,
    },

    /// The document cannot be decoded from, or represented in, its declared encoding
    #[error("Encoding mismatch for {location} as {encoding}")]
    Encoding {
        /// Where the document came from
        location: String,
        /// The encoding label in effect
        encoding: String,
    },

    /// Serializing the document tree failed
    #[error("Failed to serialize document: {0}")]
    Write(String),

    /// A path could not be expressed as a document location
    #[error("Invalid document location: {0}")]
    InvalidLocation(String),

    /// A reference could not be resolved against its base location
    #[error("Cannot resolve reference '{reference}': {message}")]
    InvalidReference {
        /// The reference text as found in the document
        reference: String,
        /// Why resolution failed
        message: String,
    },
}

/// Errors raised by the `npt=<seconds>s` clip value codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipError {
    /// The clip attribute is absent from the element
    #[error("Clip attribute {attribute} is missing")]
    Missing {
        /// Attribute name, e.g. `clip-begin`
        attribute: String,
    },

    /// The clip attribute does not match `npt=<seconds>s`
    #[error("Clip attribute {attribute} has invalid value {value}")]
    InvalidValue {
        /// Attribute name, e.g. `clip-begin`
        attribute: String,
        /// The offending value
        value: String,
    },
}

/// Errors returned by an aligner invocation
#[derive(Error, Debug)]
pub enum AlignerError {
    /// The external process could not be started
    #[error("Could not start process {program}: {source}")]
    Spawn {
        /// Program that was launched
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The external process finished with a non-zero exit status
    #[error("Process {program} exited with code {code:?}:\n{stderr}")]
    ExitStatus {
        /// Program that was launched
        program: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// Temporary exchange files could not be created, written or read
    #[error("Aligner I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The text fragment could not be serialized as aligner input
    #[error("Could not prepare aligner input: {0}")]
    Input(#[from] DocumentError),

    /// The aligner produced output that is not a readable sync map
    #[error("Unparsable sync map: {0}")]
    InvalidOutput(String),

    /// The sync map document has no root element
    #[error("No sync map returned from aligner")]
    MissingRoot,

    /// Scripted failure raised by the mock aligner
    #[error("Simulated aligner failure: {0}")]
    Simulated(String),
}

/// Errors found while validating a configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds a value outside its accepted range
    #[error("Invalid configuration value for {field}: {message}")]
    InvalidValue {
        /// Name of the offending field
        field: String,
        /// What is wrong with it
        message: String,
    },
}

/// Main error type for synchronization operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// An operation requiring a book was called before one was loaded
    #[error("No DTB was loaded")]
    NoBookLoaded,

    /// No aligner could be obtained for a language required by the batch
    #[error("No aligner available for language {0}")]
    NoAlignerForLanguage(String),

    /// Loading or saving a document failed
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// The aligner failed while resynchronizing a playback group
    #[error("Aligner error: {0}")]
    Aligner(#[from] AlignerError),
}

