/*!
 * Sync points and their extraction from playback groups.
 *
 * A playback group (`par`) may reference several consecutive audio clips.
 * Before a group is rewritten it must collapse into a single interval: one
 * audio file, contiguous clips, parseable times. Any violation is reported
 * as a warning and the group yields no sync point.
 */

use std::cmp::Ordering;
use std::path::PathBuf;
use std::time::Duration;

use crate::daisy::clip::{parse_clip_attribute, CLIP_BEGIN, CLIP_END};
use crate::document::{DocumentRef, ElementRef, NodeId, XmlDocument};
use crate::warnings::WarningReporter;

/// Attribute naming the referenced file of `audio` and `text` elements
pub const SRC_ATTRIBUTE: &str = "src";

/// A resolved time interval for one text fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPoint {
    /// Id of the text fragment; may be empty
    pub id: String,
    pub clip_begin: Duration,
    pub clip_end: Duration,
    /// Audio file the interval refers to
    pub audio_file: PathBuf,
    /// Text recognized by the aligner, when reported
    pub text: Option<String>,
}

impl SyncPoint {
    pub fn new(id: impl Into<String>, clip_begin: Duration, clip_end: Duration, audio_file: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            clip_begin,
            clip_end,
            audio_file: audio_file.into(),
            text: None,
        }
    }

    /// Set the recognized text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// A point is usable only when it spans a positive duration
    pub fn is_usable(&self) -> bool {
        self.clip_begin < self.clip_end
    }

    pub fn duration(&self) -> Duration {
        self.clip_end.saturating_sub(self.clip_begin)
    }

    /// Timeline order: by begin, then by end
    pub fn timeline_order(a: &SyncPoint, b: &SyncPoint) -> Ordering {
        a.clip_begin
            .cmp(&b.clip_begin)
            .then_with(|| a.clip_end.cmp(&b.clip_end))
    }
}

/// Collapse the audio references of `par` into one interval.
///
/// `text_element` is the text the group points at; its id becomes the id of
/// the returned point and it is used to locate warnings.
pub fn extract_sync_point(
    smil: &XmlDocument,
    par: NodeId,
    text_element: Option<ElementRef<'_>>,
    max_clip_gap: Duration,
    reporter: &mut WarningReporter<'_>,
) -> Option<SyncPoint> {
    let mut begin: Option<Duration> = None;
    let mut end: Option<Duration> = None;
    let mut audio_file: Option<&str> = None;

    for audio in smil.descendants_named(par, "audio") {
        let audio_ref = Some(ElementRef::new(smil, audio));

        let src = smil
            .attribute(audio, SRC_ATTRIBUTE)
            .filter(|s| !s.trim().is_empty());
        let Some(src) = src else {
            reporter.fire("Audio file src is missing", text_element, audio_ref);
            return None;
        };

        match audio_file {
            None => audio_file = Some(src),
            Some(previous) if previous.to_lowercase() != src.to_lowercase() => {
                reporter.fire("Audio file src differs from the previous", text_element, audio_ref);
                return None;
            }
            Some(_) => {}
        }

        let audio_begin = match parse_clip_attribute(smil, audio, CLIP_BEGIN) {
            Ok(value) => value,
            Err(e) => {
                reporter.fire(format!("Invalid clip-begin value: {}", e), text_element, audio_ref);
                return None;
            }
        };
        let audio_end = match parse_clip_attribute(smil, audio, CLIP_END) {
            Ok(value) => value,
            Err(e) => {
                reporter.fire(format!("Invalid clip-end value: {}", e), text_element, audio_ref);
                return None;
            }
        };

        if begin.is_none() {
            begin = Some(audio_begin);
        }
        if let Some(previous_end) = end {
            let gap = if audio_begin > previous_end {
                audio_begin - previous_end
            } else {
                previous_end - audio_begin
            };
            if gap > max_clip_gap {
                reporter.fire("The gap to the previous audio clip is too large", text_element, audio_ref);
                return None;
            }
        }
        end = Some(audio_end);
    }

    let (Some(audio_file), Some(begin), Some(end)) = (audio_file, begin, end) else {
        reporter.fire("Found no audio", text_element, Some(ElementRef::new(smil, par)));
        return None;
    };

    let audio_path = match smil.location() {
        Some(base) => match DocumentRef::resolve(audio_file, base) {
            Ok(reference) => reference.path,
            Err(e) => {
                reporter.fire(
                    format!("Cannot resolve audio file {}: {}", audio_file, e),
                    text_element,
                    Some(ElementRef::new(smil, par)),
                );
                return None;
            }
        },
        None => PathBuf::from(audio_file),
    };

    let id = text_element
        .and_then(|t| t.id())
        .unwrap_or_default()
        .to_string();

    Some(SyncPoint::new(id, begin, end, audio_path))
}
