/*!
 * Mock aligner implementations for testing.
 *
 * This module provides mock aligners that simulate different behaviors:
 * - `MockAligner::splitting()` - Splits the window evenly across the fragments
 * - `MockAligner::scripted()` - Returns a fixed set of sync points
 * - `MockAligner::degenerate()` - Returns only zero-length points
 * - `MockAligner::failing()` - Always fails with an error
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::aligner::{Aligner, AlignerFactory, AlignmentRequest, SyncMap};
use crate::daisy::sync_point::SyncPoint;
use crate::document::ID_ATTRIBUTE;
use crate::errors::AlignerError;
use crate::language_utils;
use crate::markup::CLASS_ATTRIBUTE;

/// Behavior mode for the mock aligner
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Divides the window evenly over the matching fragments, in document order
    Splitting,
    /// Returns the given `(id, begin, end)` triples for every request
    Scripted(Vec<(String, Duration, Duration)>),
    /// Returns one point per fragment, all starting and ending at the window begin
    Degenerate,
    /// Returns an empty map
    Empty,
    /// Always fails with an error
    Failing,
}

/// Mock aligner for testing resynchronization
#[derive(Debug)]
pub struct MockAligner {
    /// Language the aligner was created for
    language: String,
    /// Behavior mode
    behavior: MockBehavior,
    /// Call counter shared between clones
    call_count: Arc<AtomicUsize>,
}

impl MockAligner {
    /// Create a new mock aligner with the specified behavior
    pub fn new(language: &str, behavior: MockBehavior) -> Self {
        Self {
            language: language.to_string(),
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn splitting(language: &str) -> Self {
        Self::new(language, MockBehavior::Splitting)
    }

    /// Create a mock returning fixed points, times in milliseconds
    pub fn scripted(language: &str, points: &[(&str, u64, u64)]) -> Self {
        let points = points
            .iter()
            .map(|&(id, begin, end)| (id.to_string(), Duration::from_millis(begin), Duration::from_millis(end)))
            .collect();
        Self::new(language, MockBehavior::Scripted(points))
    }

    pub fn degenerate(language: &str) -> Self {
        Self::new(language, MockBehavior::Degenerate)
    }

    pub fn failing(language: &str) -> Self {
        Self::new(language, MockBehavior::Failing)
    }

    /// Number of `synchronize` calls made so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    // Ids of the fragments an aligner would see, in document order
    fn fragment_ids(request: &AlignmentRequest<'_>) -> Vec<String> {
        let doc = request.text.document;
        doc.descendants(request.text.node)
            .into_iter()
            .filter(|&n| doc.is_element(n))
            .filter(|&n| match request.class_filter {
                Some(class) => doc
                    .attribute(n, CLASS_ATTRIBUTE)
                    .is_some_and(|c| c.split_whitespace().any(|c| c == class)),
                None => true,
            })
            .filter_map(|n| doc.attribute(n, ID_ATTRIBUTE))
            .map(str::to_string)
            .collect()
    }
}

impl Clone for MockAligner {
    fn clone(&self) -> Self {
        Self {
            language: self.language.clone(),
            behavior: self.behavior.clone(),
            call_count: Arc::clone(&self.call_count),
        }
    }
}

impl Aligner for MockAligner {
    fn language(&self) -> &str {
        &self.language
    }

    fn synchronize(&self, request: &AlignmentRequest<'_>) -> Result<SyncMap, AlignerError> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let audio = request.audio_file;

        match &self.behavior {
            MockBehavior::Splitting => {
                let ids = Self::fragment_ids(request);
                if ids.is_empty() {
                    return Ok(SyncMap::new());
                }
                let window = request.clip_end.saturating_sub(request.clip_begin);
                let slice = window / ids.len() as u32;
                let last = ids.len() - 1;
                Ok(ids
                    .into_iter()
                    .enumerate()
                    .map(|(i, id)| {
                        let begin = request.clip_begin + slice * i as u32;
                        let end = if i == last {
                            request.clip_end
                        } else {
                            begin + slice
                        };
                        (id.clone(), SyncPoint::new(id, begin, end, audio))
                    })
                    .collect())
            }

            MockBehavior::Scripted(points) => Ok(points
                .iter()
                .map(|(id, begin, end)| (id.clone(), SyncPoint::new(id.as_str(), *begin, *end, audio)))
                .collect()),

            MockBehavior::Degenerate => Ok(Self::fragment_ids(request)
                .into_iter()
                .map(|id| {
                    let point = SyncPoint::new(id.as_str(), request.clip_begin, request.clip_begin, audio);
                    (id, point)
                })
                .collect()),

            MockBehavior::Empty => Ok(SyncMap::new()),

            MockBehavior::Failing => Err(AlignerError::Simulated(format!(
                "aligner call #{} for {} failed",
                count + 1,
                audio.display()
            ))),
        }
    }
}

/// Factory handing out clones of one mock aligner
#[derive(Debug, Clone)]
pub struct MockAlignerFactory {
    /// Template aligner; clones share its call counter
    aligner: MockAligner,
    /// Supported languages, any language when `None`
    languages: Option<Vec<String>>,
}

impl MockAlignerFactory {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            aligner: MockAligner::new("", behavior),
            languages: None,
        }
    }

    /// Only create aligners for the given languages
    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = Some(languages.iter().map(|l| l.to_string()).collect());
        self
    }

    /// Total calls across every aligner created by this factory
    pub fn call_count(&self) -> usize {
        self.aligner.call_count()
    }
}

impl AlignerFactory for MockAlignerFactory {
    fn create(&self, language: &str) -> Option<Box<dyn Aligner>> {
        if let Some(languages) = &self.languages {
            if !languages.iter().any(|l| language_utils::language_codes_match(l, language)) {
                return None;
            }
        }
        let mut aligner = self.aligner.clone();
        aligner.language = language.to_string();
        Some(Box::new(aligner))
    }
}
