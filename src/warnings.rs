/*!
 * Structured, non-fatal synchronization warnings.
 *
 * Operations receive a `WarningReporter` wrapping a caller-supplied
 * `WarningSink`. Reporting never fails: a sink may drop, collect or forward
 * warnings, and each one is mirrored to the log at warn level.
 */

use std::fmt;

use log::warn;

use crate::document::ElementRef;

/// A single warning raised while synchronizing a playback group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWarning {
    /// Human readable description of the problem
    pub message: String,
    /// Text content of the offending text element, empty when unknown
    pub text: String,
    /// `<text-document-location>#<id>`, or empty
    pub text_locator: String,
    /// `<timing-document-location>#<id>`, or empty
    pub smil_locator: String,
}

impl SyncWarning {
    /// Build a warning from the elements involved
    pub fn new(message: impl Into<String>, text: Option<ElementRef<'_>>, smil: Option<ElementRef<'_>>) -> Self {
        Self {
            message: message.into(),
            text: text
                .map(|t| t.document.text_content(t.node))
                .unwrap_or_default(),
            text_locator: text.map(|t| t.locator()).unwrap_or_default(),
            smil_locator: smil.map(|s| s.locator()).unwrap_or_default(),
        }
    }
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (smil {}, text {})", self.message, self.smil_locator, self.text_locator)
    }
}

/// Receiver of synchronization warnings
pub trait WarningSink {
    fn report(&mut self, warning: SyncWarning);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl WarningSink for NullSink {
    fn report(&mut self, _warning: SyncWarning) {}
}

impl WarningSink for Vec<SyncWarning> {
    fn report(&mut self, warning: SyncWarning) {
        self.push(warning);
    }
}

/// Drainable queue of warnings
#[derive(Debug, Default, Clone)]
pub struct WarningQueue {
    warnings: Vec<SyncWarning>,
}

impl WarningQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncWarning> {
        self.warnings.iter()
    }

    /// Remove and return every queued warning
    pub fn drain(&mut self) -> Vec<SyncWarning> {
        std::mem::take(&mut self.warnings)
    }
}

impl WarningSink for WarningQueue {
    fn report(&mut self, warning: SyncWarning) {
        self.warnings.push(warning);
    }
}

/// Sink forwarding each warning to a closure
pub struct CallbackSink<F: FnMut(&SyncWarning)> {
    callback: F,
}

impl<F: FnMut(&SyncWarning)> CallbackSink<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: FnMut(&SyncWarning)> WarningSink for CallbackSink<F> {
    fn report(&mut self, warning: SyncWarning) {
        (self.callback)(&warning);
    }
}

/// Counts and forwards warnings to a sink
pub struct WarningReporter<'a> {
    sink: &'a mut dyn WarningSink,
    count: usize,
}

impl<'a> WarningReporter<'a> {
    pub fn new(sink: &'a mut dyn WarningSink) -> Self {
        Self { sink, count: 0 }
    }

    /// Report a warning about the given text and timing elements
    pub fn fire(&mut self, message: impl Into<String>, text: Option<ElementRef<'_>>, smil: Option<ElementRef<'_>>) {
        self.emit(SyncWarning::new(message, text, smil));
    }

    /// Report an already built warning
    pub fn emit(&mut self, warning: SyncWarning) {
        warn!("{}", warning);
        self.count += 1;
        self.sink.report(warning);
    }

    /// Number of warnings reported through this reporter
    pub fn count(&self) -> usize {
        self.count
    }
}
