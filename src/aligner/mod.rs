/*!
 * Forced aligner implementations.
 *
 * An aligner maps a text fragment and an audio window to sync points for the
 * fragments inside the text:
 * - `aeneas`: runs the aeneas toolkit as an external process
 * - `mock`: deterministic aligner for tests
 */

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use crate::daisy::sync_point::SyncPoint;
use crate::document::ElementRef;
use crate::errors::AlignerError;

pub mod aeneas;
pub mod mock;

/// Sync points keyed by fragment id
pub type SyncMap = BTreeMap<String, SyncPoint>;

/// Input of a single alignment call
#[derive(Debug, Clone, Copy)]
pub struct AlignmentRequest<'a> {
    /// Text element whose fragments are aligned
    pub text: ElementRef<'a>,
    /// Audio file the window refers to
    pub audio_file: &'a Path,
    pub clip_begin: Duration,
    pub clip_end: Duration,
    /// Only fragments carrying this class are aligned, when set
    pub class_filter: Option<&'a str>,
}

/// Common trait for all aligners
///
/// An aligner is bound to one language. A returned map is only meaningful
/// for the request it was produced for; ids refer to elements below
/// `request.text`.
pub trait Aligner: Debug {
    /// Language code the aligner was created for
    fn language(&self) -> &str;

    /// Align the fragments of `request.text` with the audio window
    fn synchronize(&self, request: &AlignmentRequest<'_>) -> Result<SyncMap, AlignerError>;
}

/// Creates aligners by language
pub trait AlignerFactory {
    /// An aligner for `language`, or `None` when the language is not supported
    fn create(&self, language: &str) -> Option<Box<dyn Aligner>>;
}

impl<F> AlignerFactory for F
where
    F: Fn(&str) -> Option<Box<dyn Aligner>>,
{
    fn create(&self, language: &str) -> Option<Box<dyn Aligner>> {
        self(language)
    }
}

/// Clamp the first point to the window begin and the last to the window end
pub fn clamp_to_window(points: &mut [SyncPoint], clip_begin: Duration, clip_end: Duration) {
    if let Some(first) = points.first_mut() {
        first.clip_begin = clip_begin;
    }
    if let Some(last) = points.last_mut() {
        last.clip_end = clip_end;
    }
}
