/*!
 * Word level resynchronization of DAISY 2.02 books.
 *
 * Every playback group (`body/seq/par` of a timing document) is processed in
 * document order. A group whose text can be split into words is aligned with
 * its audio window and replaced by one group per word. Problems with a single
 * group are reported as warnings and the group is left as it is; a failing
 * aligner aborts the whole run.
 */

use std::path::Path;
use std::time::Duration;

use log::{debug, error, info};

use crate::aligner::aeneas::AeneasAlignerFactory;
use crate::aligner::{Aligner, AlignerFactory, AlignmentRequest};
use crate::app_config::Config;
use crate::daisy::clip::{format_clip_value, CLIP_BEGIN, CLIP_END};
use crate::daisy::loader::{percent, DocumentSet, LoadOptions, ProgressCallback};
use crate::daisy::sync_point::{extract_sync_point, SyncPoint, SRC_ATTRIBUTE};
use crate::document::reference::{path_part, relative_location};
use crate::document::{DocumentRef, ElementRef, NodeId, XmlDocument, ID_ATTRIBUTE};
use crate::errors::SyncError;
use crate::ids::IdAllocator;
use crate::markup::{inject_word_markup, WordMarkupOptions};
use crate::warnings::{WarningReporter, WarningSink};

// @const: Attributes carrying the language of a text element, nearest first
const LANGUAGE_ATTRIBUTES: [&str; 2] = ["xml:lang", "lang"];

/// Settings of a synchronization run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Language used when the text carries none
    pub default_language: String,
    /// Largest tolerated gap between consecutive clips of one group
    pub max_clip_gap: Duration,
    /// Local name of generated word elements
    pub word_element_name: String,
    /// Class of generated word elements, also passed to the aligner as filter
    pub word_class: Option<String>,
    pub load: LoadOptions,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SyncOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_language: config.default_language.clone(),
            max_clip_gap: config.max_audio_clip_gap(),
            word_element_name: config.word_element_name.clone(),
            word_class: config.word_class_filter().map(str::to_string),
            load: LoadOptions {
                exclude_navigation: config.exclude_navigation_from_text_documents,
            },
        }
    }
}

/// What happened to one playback group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// A precondition failed; a warning was reported
    Skipped,
    /// The text holds at most one word per run, nothing to split
    AlreadyWordLevel,
    /// The aligner returned fewer than two usable points
    Unchanged,
    /// The group was replaced by `new_groups` word level groups
    Resynchronized { new_groups: usize },
}

/// Summary of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub total_groups: usize,
    pub resynchronized: usize,
    pub unchanged: usize,
    pub new_groups: usize,
    pub warnings: usize,
    pub cancelled: bool,
}

impl SyncReport {
    fn record(&mut self, outcome: GroupOutcome) {
        match outcome {
            GroupOutcome::Resynchronized { new_groups } => {
                self.resynchronized += 1;
                self.new_groups += new_groups;
            }
            _ => self.unchanged += 1,
        }
    }
}

// Data copied out of the timing document before any mutation
struct GroupSource {
    par_id: Option<String>,
    text_id: String,
    text_path_part: String,
    audio_src: String,
    par_name: String,
    text_name: String,
    audio_name: String,
}

/// Drives word level synchronization of a loaded book
pub struct Synchronizer {
    factory: Box<dyn AlignerFactory>,
    options: SyncOptions,
    book: Option<DocumentSet>,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("options", &self.options)
            .field("loaded", &self.book.is_some())
            .finish()
    }
}

impl Synchronizer {
    pub fn new(factory: impl AlignerFactory + 'static, options: SyncOptions) -> Self {
        Self {
            factory: Box::new(factory),
            options,
            book: None,
        }
    }

    /// Synchronizer using aeneas as configured
    pub fn from_config(config: &Config) -> Self {
        Self::new(AeneasAlignerFactory::new(config.aligner.clone()), SyncOptions::from(config))
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn is_loaded(&self) -> bool {
        self.book.is_some()
    }

    pub fn book(&self) -> Option<&DocumentSet> {
        self.book.as_ref()
    }

    /// Load a book, replacing the current one. On failure no book is loaded.
    pub fn load_book<P: AsRef<Path>>(&mut self, navigation_path: P) -> Result<(), SyncError> {
        self.book = None;
        let book = DocumentSet::load(navigation_path, self.options.load)?;
        self.book = Some(book);
        Ok(())
    }

    /// Write the loaded book back. Returns `false` when cancelled.
    pub fn save_book(&self, progress: &mut ProgressCallback<'_>) -> Result<bool, SyncError> {
        let book = self.book.as_ref().ok_or(SyncError::NoBookLoaded)?;
        Ok(book.save(progress)?)
    }

    /// An aligner for `language`, the default language when blank
    pub fn aligner_for(&self, language: Option<&str>) -> Option<Box<dyn Aligner>> {
        let language = language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(self.options.default_language.as_str());
        self.factory.create(language)
    }

    /// Every `body/seq/par` group as `(timing document index, node)`, in document order
    pub fn playback_groups(&self) -> Result<Vec<(usize, NodeId)>, SyncError> {
        let book = self.book.as_ref().ok_or(SyncError::NoBookLoaded)?;
        let mut groups = Vec::new();
        for (index, smil) in book.timing_documents().iter().enumerate() {
            for body in smil.descendants_named(smil.document_node(), "body") {
                for seq in smil.child_elements_named(body, "seq") {
                    groups.extend(smil.child_elements_named(seq, "par").into_iter().map(|par| (index, par)));
                }
            }
        }
        Ok(groups)
    }

    /// Resynchronize every playback group of the loaded book.
    ///
    /// `progress` is polled before each group; asking to stop leaves the
    /// remaining groups untouched. Nothing is saved.
    pub fn synchronize_all(
        &mut self,
        progress: &mut ProgressCallback<'_>,
        warnings: &mut dyn WarningSink,
    ) -> Result<SyncReport, SyncError> {
        let mut reporter = WarningReporter::new(warnings);
        let mut report = SyncReport::default();

        let book = self.book.as_ref().ok_or(SyncError::NoBookLoaded)?;
        if book.text_documents().is_empty() {
            reporter.fire("Cannot synchronize an audio-only book", None, None);
            report.warnings = reporter.count();
            return Ok(report);
        }

        if self.aligner_for(None).is_none() {
            return Err(SyncError::NoAlignerForLanguage(self.options.default_language.clone()));
        }

        let groups = self.playback_groups()?;
        report.total_groups = groups.len();

        for (i, &(timing_index, par)) in groups.iter().enumerate() {
            let message = self.progress_message(timing_index, par);
            if progress(&message, percent(i, groups.len())) {
                info!("Synchronization cancelled after {} of {} groups", i, groups.len());
                report.cancelled = true;
                break;
            }
            let outcome = self.resynchronize_group(timing_index, par, &mut reporter)?;
            report.record(outcome);
        }

        report.warnings = reporter.count();
        info!(
            "Synchronized {} of {} groups into {} new groups, {} warnings",
            report.resynchronized, report.total_groups, report.new_groups, report.warnings
        );
        Ok(report)
    }

    fn progress_message(&self, timing_index: usize, par: NodeId) -> String {
        let Some(book) = self.book.as_ref() else {
            return String::new();
        };
        let smil = &book.timing_documents()[timing_index];
        let location = match (book.navigation().location(), smil.location()) {
            (Some(nav), Some(own)) => relative_location(nav, own),
            (_, Some(own)) => own.to_string(),
            _ => String::new(),
        };
        format!(
            "Synchronizing {}#{}",
            location,
            smil.attribute(par, ID_ATTRIBUTE).unwrap_or_default()
        )
    }

    /// Resynchronize one playback group of timing document `timing_index`
    pub fn resynchronize_group(
        &mut self,
        timing_index: usize,
        par: NodeId,
        reporter: &mut WarningReporter<'_>,
    ) -> Result<GroupOutcome, SyncError> {
        let Self { factory, options, book } = self;
        let book = book.as_mut().ok_or(SyncError::NoBookLoaded)?;

        let Some(smil) = book.timing_documents().get(timing_index) else {
            return Ok(GroupOutcome::Skipped);
        };
        let par_ref = ElementRef::new(smil, par);

        let texts = smil.child_elements_named(par, "text");
        let [smil_text] = texts.as_slice() else {
            let message = if texts.is_empty() {
                "Found no child <text> of smil par".to_string()
            } else {
                format!("Expected exactly one child <text> of smil par, found {}", texts.len())
            };
            reporter.fire(message, None, Some(par_ref));
            return Ok(GroupOutcome::Skipped);
        };
        let smil_text = *smil_text;
        let smil_text_ref = Some(ElementRef::new(smil, smil_text));

        let Some(text_id) = smil.attribute(smil_text, ID_ATTRIBUTE).filter(|id| !id.trim().is_empty()) else {
            reporter.fire("id is missing from smil text", None, smil_text_ref);
            return Ok(GroupOutcome::Skipped);
        };

        let src = smil.attribute(smil_text, SRC_ATTRIBUTE).unwrap_or_default();
        let resolved = smil
            .location()
            .and_then(|base| DocumentRef::resolve(src, base).ok())
            .and_then(|reference| book.resolve_text_element(&reference));
        let Some((text_index, text_node)) = resolved else {
            reporter.fire(
                format!("Found no text file element matching src {}", src),
                None,
                smil_text_ref,
            );
            return Ok(GroupOutcome::Skipped);
        };

        let source = GroupSource {
            par_id: smil.attribute(par, ID_ATTRIBUTE).map(str::to_string),
            text_id: text_id.to_string(),
            text_path_part: path_part(src).to_string(),
            audio_src: smil
                .descendants_named(par, "audio")
                .into_iter()
                .find_map(|audio| smil.attribute(audio, SRC_ATTRIBUTE))
                .unwrap_or_default()
                .to_string(),
            par_name: smil.name(par).unwrap_or("par").to_string(),
            text_name: smil.name(smil_text).unwrap_or("text").to_string(),
            audio_name: smil
                .descendants_named(par, "audio")
                .first()
                .and_then(|&audio| smil.name(audio))
                .unwrap_or("audio")
                .to_string(),
        };

        // Word markup changes the text document only
        let markup_added = match book.text_document_mut(text_index) {
            Some(text_doc) => {
                let element_name = qualified_like(text_doc, text_node, &options.word_element_name);
                let markup = WordMarkupOptions::new(&element_name, options.word_class.as_deref());
                inject_word_markup(text_doc, text_node, &markup, None)
            }
            None => false,
        };
        if !markup_added {
            debug!("Group {} is already at word level", source.text_id);
            return Ok(GroupOutcome::AlreadyWordLevel);
        }

        let smil = &book.timing_documents()[timing_index];
        let text_doc = &book.text_documents()[text_index];
        let text_ref = ElementRef::new(text_doc, text_node);

        let language = text_doc
            .inherited_attribute(text_node, &LANGUAGE_ATTRIBUTES)
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(options.default_language.as_str())
            .to_string();
        let Some(aligner) = factory.create(&language) else {
            reporter.fire(
                format!("Could not get aligner for language {}", language),
                Some(text_ref),
                Some(ElementRef::new(smil, smil_text)),
            );
            return Ok(GroupOutcome::Skipped);
        };

        let Some(window) = extract_sync_point(smil, par, Some(text_ref), options.max_clip_gap, reporter) else {
            return Ok(GroupOutcome::Skipped);
        };

        let request = AlignmentRequest {
            text: text_ref,
            audio_file: &window.audio_file,
            clip_begin: window.clip_begin,
            clip_end: window.clip_end,
            class_filter: options.word_class.as_deref(),
        };
        debug!(
            "Aligning {} ({}) against {} [{:?}, {:?}]",
            source.text_id,
            aligner.language(),
            window.audio_file.display(),
            window.clip_begin,
            window.clip_end
        );
        let map = aligner.synchronize(&request).map_err(|e| {
            error!("Aligner failed for {}: {}", ElementRef::new(smil, par).locator(), e);
            SyncError::from(e)
        })?;

        let mut points: Vec<SyncPoint> = map.into_values().filter(SyncPoint::is_usable).collect();
        if points.len() < 2 {
            debug!("Group {} keeps its timing, {} usable points", source.text_id, points.len());
            return Ok(GroupOutcome::Unchanged);
        }
        points.sort_by(SyncPoint::timeline_order);

        let Some(smil) = book.timing_document_mut(timing_index) else {
            return Ok(GroupOutcome::Skipped);
        };
        let new_groups = rebuild_group(smil, par, &source, &points);
        debug!("Group {} split into {} groups", source.text_id, new_groups);
        Ok(GroupOutcome::Resynchronized { new_groups })
    }
}

// Give `local_name` the namespace prefix of `node`'s name
fn qualified_like(doc: &XmlDocument, node: NodeId, local_name: &str) -> String {
    match doc.element(node).and_then(|e| e.prefix()) {
        Some(prefix) => format!("{}:{}", prefix, local_name),
        None => local_name.to_string(),
    }
}

// Replace `par` by one group per point, keeping the original ids on the first group
fn rebuild_group(smil: &mut XmlDocument, par: NodeId, source: &GroupSource, points: &[SyncPoint]) -> usize {
    let mut allocator = IdAllocator::for_document(smil);

    let mut new_pars = Vec::with_capacity(points.len());
    let mut new_texts = Vec::with_capacity(points.len());
    for point in points {
        if let Some(text) = &point.text {
            debug!("{} [{:?}, {:?}] {}", point.id, point.clip_begin, point.clip_end, text);
        }

        let new_par = smil.create_element(&source.par_name);
        smil.set_attribute(new_par, "endsync", "last");

        let new_text = smil.create_element(&source.text_name);
        smil.set_attribute(new_text, SRC_ATTRIBUTE, &format!("{}#{}", source.text_path_part, point.id));
        smil.set_attribute(new_text, ID_ATTRIBUTE, &allocator.allocate(&point.id));
        smil.append_child(new_par, new_text);

        let new_audio = smil.create_element(&source.audio_name);
        smil.set_attribute(new_audio, SRC_ATTRIBUTE, &source.audio_src);
        smil.set_attribute(new_audio, CLIP_BEGIN, &format_clip_value(point.clip_begin));
        smil.set_attribute(new_audio, CLIP_END, &format_clip_value(point.clip_end));
        smil.append_child(new_par, new_audio);

        new_pars.push(new_par);
        new_texts.push(new_text);
    }

    smil.clear_attributes(par);
    smil.remove_children(par);
    for &new_par in &new_pars {
        smil.insert_before(par, new_par);
    }
    smil.remove(par);

    if let (Some(id), Some(&first)) = (&source.par_id, new_pars.first()) {
        smil.set_attribute(first, ID_ATTRIBUTE, id);
    }
    if let Some(&first) = new_texts.first() {
        smil.set_attribute(first, ID_ATTRIBUTE, &source.text_id);
    }
    new_pars.len()
}
