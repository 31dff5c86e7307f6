/*!
 * Integration tests for the word level synchronization workflow
 */

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use dtbsync::aligner::mock::{MockAligner, MockAlignerFactory, MockBehavior};
use dtbsync::daisy::clip::parse_clip_value;
use dtbsync::{Aligner, AlignerError, SyncError, SyncOptions, SyncWarning, Synchronizer, XmlDocument};

use crate::common::{self, clip, par, smil_document, text_document, TestBook};

/// One playback group as read back from a timing document
#[derive(Debug, Clone, PartialEq)]
struct Group {
    par_id: Option<String>,
    text_id: String,
    text_src: String,
    audio_src: String,
    clip_begin: String,
    clip_end: String,
}

fn groups(smil: &XmlDocument) -> Vec<Group> {
    let mut result = Vec::new();
    for par in smil.descendants_named(smil.document_node(), "par") {
        let text = smil.child_elements_named(par, "text")[0];
        let audio = smil.child_elements_named(par, "audio")[0];
        let attr = |node: dtbsync::NodeId, name: &str| smil.attribute(node, name).unwrap_or_default().to_string();
        result.push(Group {
            par_id: smil.attribute(par, "id").map(str::to_string),
            text_id: attr(text, "id"),
            text_src: attr(text, "src"),
            audio_src: attr(audio, "src"),
            clip_begin: attr(audio, "clip-begin"),
            clip_end: attr(audio, "clip-end"),
        });
    }
    result
}

fn synchronizer(behavior: MockBehavior) -> Synchronizer {
    common::init_test_logging();
    Synchronizer::new(MockAlignerFactory::new(behavior), SyncOptions::default())
}

fn timing_xml(sync: &Synchronizer) -> Result<String> {
    let book = sync.book().expect("book should be loaded");
    Ok(book.timing_documents()[0].to_xml_string()?)
}

/// A whole book run splits every multi-word group into word groups
#[test]
fn test_synchronizeAll_withSplittingAligner_shouldCreateWordGroups() -> Result<()> {
    let book = common::sample_book()?;
    let mut sync = synchronizer(MockBehavior::Splitting);
    sync.load_book(&book.ncc)?;

    let mut warnings: Vec<SyncWarning> = Vec::new();
    let report = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut warnings)?;

    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    assert_eq!(report.total_groups, 3);
    assert_eq!(report.resynchronized, 2);
    assert_eq!(report.unchanged, 1);
    assert_eq!(report.new_groups, 5);
    assert!(!report.cancelled);

    let smil = &sync.book().unwrap().timing_documents()[0];
    let result = groups(smil);
    let text_ids: Vec<&str> = result.iter().map(|g| g.text_id.as_str()).collect();
    assert_eq!(text_ids, vec!["t1", "t1_2", "t1_3", "t2", "t3", "t3_2"]);
    let par_ids: Vec<Option<&str>> = result.iter().map(|g| g.par_id.as_deref()).collect();
    assert_eq!(par_ids, vec![Some("p1"), None, None, Some("p2"), Some("p3"), None]);

    assert_eq!(result[0].text_src, "text.html#t1_1");
    assert_eq!(result[2].text_src, "text.html#t1_3");
    assert_eq!(result[5].text_src, "text.html#t3_2");
    assert!(result.iter().all(|g| g.audio_src == "x.mp3"));
    Ok(())
}

/// The new groups of one original group exactly cover its audio window
#[test]
fn test_synchronizeAll_withSplittingAligner_shouldKeepWindowAndOrder() -> Result<()> {
    let book = common::sample_book()?;
    let mut sync = synchronizer(MockBehavior::Splitting);
    sync.load_book(&book.ncc)?;
    sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new())?;

    let result = groups(&sync.book().unwrap().timing_documents()[0]);
    assert_eq!(result[0].clip_begin, "npt=105.399s");
    assert_eq!(result[2].clip_end, "npt=108.758s");
    assert_eq!(result[4].clip_begin, "npt=109.500s");
    assert_eq!(result[5].clip_end, "npt=111.250s");

    let begins: Vec<Duration> = result
        .iter()
        .map(|g| parse_clip_value("clip-begin", &g.clip_begin))
        .collect::<Result<_, _>>()?;
    assert!(begins.windows(2).all(|w| w[0] <= w[1]));
    Ok(())
}

/// Word markup lands in the text document with generated ids and class
#[test]
fn test_synchronizeAll_shouldInjectWordMarkupIntoText() -> Result<()> {
    let book = common::sample_book()?;
    let mut sync = synchronizer(MockBehavior::Splitting);
    sync.load_book(&book.ncc)?;
    sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new())?;

    let text = sync.book().unwrap().text_documents()[0].to_xml_string()?;
    assert!(text.contains(
        "<p id=\"t1\"><span id=\"t1_1\" class=\"word\">Nå</span>, \
         <span id=\"t1_2\" class=\"word\">sagde</span> \
         <span id=\"t1_3\" class=\"word\">Hodja</span>.</p>"
    ));
    assert!(text.contains("<p id=\"t2\">Farvel</p>"));
    Ok(())
}

/// A second run over an already word level book changes nothing
#[test]
fn test_synchronizeAll_runTwice_shouldLeaveSecondRunUnchanged() -> Result<()> {
    let book = common::sample_book()?;
    let mut sync = synchronizer(MockBehavior::Splitting);
    sync.load_book(&book.ncc)?;
    sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new())?;
    let first = timing_xml(&sync)?;

    let report = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new())?;
    assert_eq!(report.total_groups, 6);
    assert_eq!(report.resynchronized, 0);
    assert_eq!(timing_xml(&sync)?, first);
    Ok(())
}

/// Fewer than two usable points keep the group's timing as it was
#[test]
fn test_synchronizeAll_withDegenerateAligner_shouldKeepTiming() -> Result<()> {
    let book = common::sample_book()?;
    let mut sync = synchronizer(MockBehavior::Degenerate);
    sync.load_book(&book.ncc)?;
    let before = timing_xml(&sync)?;

    let report = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new())?;
    assert_eq!(report.resynchronized, 0);
    assert_eq!(report.unchanged, 3);
    assert_eq!(timing_xml(&sync)?, before);
    Ok(())
}

/// A scripted alignment is written back with three decimal clip values
#[test]
fn test_synchronizeAll_withScriptedAligner_shouldWriteGivenTimes() -> Result<()> {
    let smil = smil_document(&[par("p1", "text.html#t1", "t1", &[clip("x.mp3", "105.399", "108.758")])]);
    let text = text_document("da", &[("t1", "Nå, sagde")]);
    let book = TestBook::new(
        &common::ncc_document(&["hod_0001.smil#p1"]),
        &[("hod_0001.smil", smil), ("text.html", text)],
    )?;

    common::init_test_logging();
    let aligner = MockAligner::scripted("da", &[("t1_2", 106_800, 108_758), ("t1_1", 105_399, 106_800)]);
    let factory = move |_: &str| Some(Box::new(aligner.clone()) as Box<dyn Aligner>);
    let mut sync = Synchronizer::new(factory, SyncOptions::default());
    sync.load_book(&book.ncc)?;
    let report = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new())?;
    assert_eq!(report.new_groups, 2);

    let result = groups(&sync.book().unwrap().timing_documents()[0]);
    assert_eq!(
        result,
        vec![
            Group {
                par_id: Some("p1".to_string()),
                text_id: "t1".to_string(),
                text_src: "text.html#t1_1".to_string(),
                audio_src: "x.mp3".to_string(),
                clip_begin: "npt=105.399s".to_string(),
                clip_end: "npt=106.800s".to_string(),
            },
            Group {
                par_id: None,
                text_id: "t1_2".to_string(),
                text_src: "text.html#t1_2".to_string(),
                audio_src: "x.mp3".to_string(),
                clip_begin: "npt=106.800s".to_string(),
                clip_end: "npt=108.758s".to_string(),
            },
        ]
    );
    Ok(())
}

/// Saving writes the rewritten timing and text documents to disk
#[test]
fn test_saveBook_afterSynchronize_shouldPersistChanges() -> Result<()> {
    let book = common::sample_book()?;
    let mut sync = synchronizer(MockBehavior::Splitting);
    sync.load_book(&book.ncc)?;
    sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new())?;

    let mut messages = Vec::new();
    let completed = sync.save_book(&mut |message: &str, _: u8| {
        messages.push(message.to_string());
        false
    })?;
    assert!(completed);
    assert_eq!(
        messages,
        vec!["Saving navigation document", "Saving timing documents", "Saving text documents"]
    );

    let reloaded = XmlDocument::load(book.path("hod_0001.smil"))?;
    assert_eq!(groups(&reloaded).len(), 6);
    assert!(book.read("text.html")?.contains("<span id=\"t3_2\" class=\"word\">gjort</span>"));
    Ok(())
}

/// Cancelling before a group leaves it and every later group untouched
#[test]
fn test_synchronizeAll_withCancellation_shouldStopBeforeNextGroup() -> Result<()> {
    let book = common::sample_book()?;
    let mut sync = synchronizer(MockBehavior::Splitting);
    sync.load_book(&book.ncc)?;

    let mut calls = 0;
    let report = sync.synchronize_all(
        &mut |_: &str, _: u8| {
            calls += 1;
            calls > 1
        },
        &mut Vec::<SyncWarning>::new(),
    )?;
    assert!(report.cancelled);
    assert_eq!(report.resynchronized, 1);

    let result = groups(&sync.book().unwrap().timing_documents()[0]);
    assert_eq!(result.len(), 5);
    assert_eq!(result[4].text_id, "t3");
    assert_eq!(result[4].clip_begin, "npt=109.500s");
    Ok(())
}

/// Progress messages name each group relative to the navigation document
#[test]
fn test_synchronizeAll_shouldReportProgressPerGroup() -> Result<()> {
    let book = common::sample_book()?;
    let mut sync = synchronizer(MockBehavior::Degenerate);
    sync.load_book(&book.ncc)?;

    let mut seen = Vec::new();
    sync.synchronize_all(
        &mut |message: &str, percent: u8| {
            seen.push((message.to_string(), percent));
            false
        },
        &mut Vec::<SyncWarning>::new(),
    )?;
    assert_eq!(
        seen,
        vec![
            ("Synchronizing hod_0001.smil#p1".to_string(), 0),
            ("Synchronizing hod_0001.smil#p2".to_string(), 33),
            ("Synchronizing hod_0001.smil#p3".to_string(), 66),
        ]
    );
    Ok(())
}

/// Clips from different audio files raise exactly one warning and keep the group
#[test]
fn test_synchronizeAll_withDifferentAudioFiles_shouldWarnOnce() -> Result<()> {
    let smil = smil_document(&[par(
        "p1",
        "text.html#t1",
        "t1",
        &[clip("x.mp3", "1.000", "2.000"), clip("y.mp3", "2.000", "3.000")],
    )]);
    let text = text_document("da", &[("t1", "Nå, sagde Hodja.")]);
    let book = TestBook::new(
        &common::ncc_document(&["hod_0001.smil#p1"]),
        &[("hod_0001.smil", smil), ("text.html", text)],
    )?;

    let factory = MockAlignerFactory::new(MockBehavior::Splitting);
    let mut sync = Synchronizer::new(factory.clone(), SyncOptions::default());
    sync.load_book(&book.ncc)?;
    let before = timing_xml(&sync)?;

    let mut warnings: Vec<SyncWarning> = Vec::new();
    let report = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut warnings)?;
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "Audio file src differs from the previous");
    assert_eq!(warnings[0].text, "Nå, sagde Hodja.");
    assert!(warnings[0].smil_locator.ends_with("hod_0001.smil#p1_a1"));
    assert_eq!(report.warnings, 1);
    assert_eq!(factory.call_count(), 0);
    assert_eq!(timing_xml(&sync)?, before);
    Ok(())
}

/// A gap between clips larger than the tolerance skips the group
#[test]
fn test_synchronizeAll_withGapBetweenClips_shouldWarn() -> Result<()> {
    let smil = smil_document(&[par(
        "p1",
        "text.html#t1",
        "t1",
        &[clip("x.mp3", "1.000", "2.000"), clip("x.mp3", "2.500", "3.000")],
    )]);
    let text = text_document("da", &[("t1", "Nå, sagde Hodja.")]);
    let book = TestBook::new(
        &common::ncc_document(&["hod_0001.smil#p1"]),
        &[("hod_0001.smil", smil), ("text.html", text)],
    )?;

    let mut sync = synchronizer(MockBehavior::Splitting);
    sync.load_book(&book.ncc)?;
    let mut warnings: Vec<SyncWarning> = Vec::new();
    let report = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut warnings)?;

    assert_eq!(report.resynchronized, 0);
    let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
    assert_eq!(messages, vec!["The gap to the previous audio clip is too large"]);
    Ok(())
}

/// Broken text references are reported per group and the run continues
#[test]
fn test_synchronizeAll_withBrokenTextReferences_shouldWarnAndContinue() -> Result<()> {
    let smil = smil_document(&[
        "<par id=\"p1\"><text src=\"text.html#t1\"/><audio src=\"x.mp3\" clip-begin=\"npt=0.000s\" clip-end=\"npt=1.000s\"/></par>".to_string(),
        par("p2", "text.html#nope", "t2", &[clip("x.mp3", "1.000", "2.000")]),
        "<par id=\"p3\"><audio src=\"x.mp3\" clip-begin=\"npt=2.000s\" clip-end=\"npt=3.000s\"/></par>".to_string(),
        par("p4", "text.html#t1", "t4", &[clip("x.mp3", "3.000", "4.000")]),
    ]);
    let text = text_document("da", &[("t1", "Nå, sagde Hodja.")]);
    let book = TestBook::new(
        &common::ncc_document(&["hod_0001.smil#p1"]),
        &[("hod_0001.smil", smil), ("text.html", text)],
    )?;

    let mut sync = synchronizer(MockBehavior::Splitting);
    sync.load_book(&book.ncc)?;
    let mut warnings: Vec<SyncWarning> = Vec::new();
    let report = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut warnings)?;

    let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "id is missing from smil text",
            "Found no text file element matching src text.html#nope",
            "Found no child <text> of smil par",
        ]
    );
    assert_eq!(report.total_groups, 4);
    assert_eq!(report.resynchronized, 1);
    assert_eq!(report.new_groups, 3);
    Ok(())
}

/// A group holding two text references is reported and left untouched
#[test]
fn test_synchronizeAll_withTwoTextChildren_shouldWarnAndLeaveGroup() -> Result<()> {
    let smil = smil_document(&[
        "<par id=\"p1\"><text id=\"s1\" src=\"text.html#t1\"/><text id=\"s2\" src=\"text.html#t1\"/>\
         <audio src=\"x.mp3\" clip-begin=\"npt=0.000s\" clip-end=\"npt=1.000s\"/></par>"
            .to_string(),
        par("p2", "text.html#t2", "s3", &[clip("x.mp3", "1.000", "2.000")]),
    ]);
    let text = text_document("da", &[("t1", "Nå, sagde Hodja."), ("t2", "Godt gjort")]);
    let book = TestBook::new(
        &common::ncc_document(&["hod_0001.smil#p1"]),
        &[("hod_0001.smil", smil), ("text.html", text)],
    )?;

    let mut sync = synchronizer(MockBehavior::Splitting);
    sync.load_book(&book.ncc)?;
    let mut warnings: Vec<SyncWarning> = Vec::new();
    let report = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut warnings)?;

    let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
    assert_eq!(messages, vec!["Expected exactly one child <text> of smil par, found 2"]);
    assert_eq!(report.total_groups, 2);
    assert_eq!(report.resynchronized, 1);
    assert_eq!(report.new_groups, 2);

    let smil = &sync.book().expect("book should be loaded").timing_documents()[0];
    let first = smil.find_by_id("p1").expect("p1 should remain");
    let texts = smil.child_elements_named(first, "text");
    assert_eq!(texts.len(), 2);
    assert_eq!(smil.attribute(texts[0], "id"), Some("s1"));
    let audio = smil.child_elements_named(first, "audio");
    assert_eq!(audio.len(), 1);
    assert_eq!(smil.attribute(audio[0], "clip-begin"), Some("npt=0.000s"));
    assert_eq!(smil.attribute(audio[0], "clip-end"), Some("npt=1.000s"));
    assert_eq!(smil.descendants_named(smil.document_node(), "par").len(), 3);
    Ok(())
}

/// A failing aligner aborts the run with its error
#[test]
fn test_synchronizeAll_withFailingAligner_shouldReturnAlignerError() -> Result<()> {
    let book = common::sample_book()?;
    let mut sync = synchronizer(MockBehavior::Failing);
    sync.load_book(&book.ncc)?;

    let result = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new());
    assert!(matches!(result, Err(SyncError::Aligner(AlignerError::Simulated(_)))));
    Ok(())
}

/// Without an aligner for the default language nothing is attempted
#[test]
fn test_synchronizeAll_withoutDefaultAligner_shouldFail() -> Result<()> {
    let book = common::sample_book()?;
    let factory = MockAlignerFactory::new(MockBehavior::Splitting).with_languages(&["fr"]);
    let mut sync = Synchronizer::new(factory.clone(), SyncOptions::default());
    sync.load_book(&book.ncc)?;

    let result = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new());
    match result {
        Err(SyncError::NoAlignerForLanguage(language)) => assert_eq!(language, "en"),
        other => panic!("expected NoAlignerForLanguage, got {:?}", other),
    }
    assert_eq!(factory.call_count(), 0);
    Ok(())
}

/// Groups whose text language has no aligner are skipped with a warning
#[test]
fn test_synchronizeAll_withUnsupportedTextLanguage_shouldWarnPerGroup() -> Result<()> {
    let book = common::sample_book()?;
    let factory = MockAlignerFactory::new(MockBehavior::Splitting).with_languages(&["en"]);
    let mut sync = Synchronizer::new(factory, SyncOptions::default());
    sync.load_book(&book.ncc)?;

    let mut warnings: Vec<SyncWarning> = Vec::new();
    let report = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut warnings)?;
    assert_eq!(report.resynchronized, 0);
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|w| w.message == "Could not get aligner for language da"));
    Ok(())
}

/// The language of a group comes from the nearest language attribute
#[test]
fn test_synchronizeAll_shouldRequestAlignerForTextLanguage() -> Result<()> {
    let smil = smil_document(&[
        par("p1", "text.html#t1", "t1", &[clip("x.mp3", "0.000", "1.000")]),
        par("p2", "text.html#t2", "t2", &[clip("x.mp3", "1.000", "2.000")]),
    ]);
    let text = "<html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"da\"><body>\
                <p id=\"t1\">Nå, sagde Hodja.</p>\
                <div lang=\"en\"><p id=\"t2\">Well said</p></div>\
                </body></html>"
        .to_string();
    let book = TestBook::new(
        &common::ncc_document(&["hod_0001.smil#p1"]),
        &[("hod_0001.smil", smil), ("text.html", text)],
    )?;

    let requested = Rc::new(RefCell::new(Vec::<String>::new()));
    let log = Rc::clone(&requested);
    let factory = move |language: &str| {
        log.borrow_mut().push(language.to_string());
        Some(Box::new(MockAligner::splitting(language)) as Box<dyn Aligner>)
    };
    let mut sync = Synchronizer::new(factory, SyncOptions::default());
    sync.load_book(&book.ncc)?;
    sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new())?;

    assert_eq!(*requested.borrow(), vec!["en", "da", "en"]);
    Ok(())
}

/// A book whose text references all point at the navigation document has no text
#[test]
fn test_synchronizeAll_withAudioOnlyBook_shouldWarnAndDoNothing() -> Result<()> {
    let smil = smil_document(&[par("p1", "ncc.html#h0", "t1", &[clip("x.mp3", "0.000", "1.000")])]);
    let book = TestBook::new(&common::ncc_document(&["hod_0001.smil#p1"]), &[("hod_0001.smil", smil)])?;

    let factory = MockAlignerFactory::new(MockBehavior::Splitting);
    let mut sync = Synchronizer::new(factory.clone(), SyncOptions::default());
    sync.load_book(&book.ncc)?;

    let mut warnings: Vec<SyncWarning> = Vec::new();
    let report = sync.synchronize_all(&mut |_: &str, _: u8| false, &mut warnings)?;
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "Cannot synchronize an audio-only book");
    assert_eq!(report.total_groups, 0);
    assert_eq!(factory.call_count(), 0);
    Ok(())
}

/// Book operations without a loaded book fail
#[test]
fn test_operations_withoutBook_shouldReturnNoBookLoaded() {
    let mut sync = synchronizer(MockBehavior::Splitting);
    assert!(!sync.is_loaded());
    assert!(matches!(
        sync.synchronize_all(&mut |_: &str, _: u8| false, &mut Vec::<SyncWarning>::new()),
        Err(SyncError::NoBookLoaded)
    ));
    assert!(matches!(sync.save_book(&mut |_: &str, _: u8| false), Err(SyncError::NoBookLoaded)));
    assert!(matches!(sync.playback_groups(), Err(SyncError::NoBookLoaded)));
}

/// A failed load leaves no book loaded, even after a previous success
#[test]
fn test_loadBook_withMissingFile_shouldClearPreviousBook() -> Result<()> {
    let book = common::sample_book()?;
    let mut sync = synchronizer(MockBehavior::Splitting);
    sync.load_book(&book.ncc)?;
    assert!(sync.is_loaded());

    let result = sync.load_book(book.path("missing.html"));
    assert!(matches!(result, Err(SyncError::Document(_))));
    assert!(!sync.is_loaded());
    Ok(())
}
