/*!
 * # dtbsync - word level synchronization of DAISY 2.02 talking books
 *
 * A Rust library that refines the audio synchronization of a DAISY 2.02
 * digital talking book from phrase level down to single words.
 *
 * ## Features
 *
 * - Load the navigation, timing (SMIL) and text documents of a book as one set
 * - Validate and merge the audio clips of each playback group
 * - Wrap words of text fragments in elements with unique ids
 * - Align words with audio through a forced aligner:
 *   - aeneas (external process)
 *   - mock aligner for tests
 * - Rewrite timing documents with one playback group per word
 * - Save documents back in their declared encoding
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: XML document tree, parsing, writing and references
 * - `daisy`: DAISY 2.02 book handling:
 *   - `daisy::clip`: `npt=<seconds>s` clip values
 *   - `daisy::sync_point`: Sync points of playback groups
 *   - `daisy::loader`: Loading and saving the document set
 *   - `daisy::synchronizer`: Word level resynchronization
 * - `aligner`: Forced aligner interface and implementations
 * - `markup`: Word markup for text fragments
 * - `ids`: Document-unique identifier allocation
 * - `warnings`: Non-fatal synchronization warnings
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `logging`: Console logger
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod aligner;
pub mod app_config;
pub mod daisy;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod ids;
pub mod language_utils;
pub mod logging;
pub mod markup;
pub mod warnings;

// Re-export main types for easier usage
pub use aligner::{Aligner, AlignerFactory, AlignmentRequest, SyncMap};
pub use app_config::Config;
pub use daisy::{DocumentSet, GroupOutcome, SyncOptions, SyncPoint, SyncReport, Synchronizer};
pub use document::{DocumentRef, ElementRef, NodeId, XmlDocument};
pub use errors::{AlignerError, ClipError, ConfigError, DocumentError, SyncError};
pub use ids::IdAllocator;
pub use warnings::{SyncWarning, WarningQueue, WarningReporter, WarningSink};
