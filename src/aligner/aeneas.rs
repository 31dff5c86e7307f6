/*!
 * Forced alignment through the aeneas toolkit.
 *
 * Each call writes the text fragment to a temporary XML file and runs
 * `python -m aeneas.tools.execute_task` over the audio window, asking for an
 * XML sync map in a second temporary file. Both files are removed when the
 * call returns, whatever the outcome.
 */

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use log::{debug, error};
use tempfile::NamedTempFile;

use crate::aligner::{clamp_to_window, Aligner, AlignerFactory, AlignmentRequest, SyncMap};
use crate::app_config::AeneasConfig;
use crate::daisy::sync_point::SyncPoint;
use crate::document::{parser, writer, NodeId, XmlDocument, ID_ATTRIBUTE};
use crate::errors::AlignerError;
use crate::language_utils;

/// Aligner backed by an aeneas installation
#[derive(Debug, Clone)]
pub struct AeneasAligner {
    language: String,
    config: AeneasConfig,
}

impl AeneasAligner {
    /// Create an aligner for `language`, which is mapped to ISO 639-3 when possible
    pub fn new(language: &str, config: AeneasConfig) -> Self {
        Self {
            language: language_utils::aligner_language(language),
            config,
        }
    }

    /// The `|`-separated task configuration for a request
    pub fn task_config(&self, request: &AlignmentRequest<'_>) -> String {
        let window = request.clip_end.saturating_sub(request.clip_begin);
        let mut config = format!(
            "task_language={}\
             |is_text_type=unparsed\
             |is_text_unparsed_id_sort=unsorted\
             |os_task_file_format=xml\
             |is_audio_file_head_length={}\
             |is_audio_file_process_length={}",
            self.language,
            seconds(request.clip_begin),
            seconds(window),
        );

        match request.class_filter.filter(|c| !c.trim().is_empty()) {
            Some(class) => {
                config.push_str("|is_text_unparsed_class_regex=");
                config.push_str(class);
            }
            None => config.push_str("|is_text_unparsed_id_regex=.*"),
        }

        for option in &self.config.extra_options {
            config.push('|');
            config.push_str(option);
        }
        config
    }

    fn command(&self, audio: &Path, input: &Path, task_config: &str, output: &Path) -> Command {
        let mut command = Command::new(&self.config.python);
        command
            .arg("-m")
            .arg("aeneas.tools.execute_task")
            .arg(audio)
            .arg(input)
            .arg(task_config)
            .arg(output);
        if let Some(root) = &self.config.aeneas_root {
            command.current_dir(root);
        }
        command
    }
}

impl Aligner for AeneasAligner {
    fn language(&self) -> &str {
        &self.language
    }

    fn synchronize(&self, request: &AlignmentRequest<'_>) -> Result<SyncMap, AlignerError> {
        let text_xml = writer::element_to_xml_string(request.text.document, request.text.node)?;

        // Dropped on every return path, which deletes the files
        let mut input = NamedTempFile::new()?;
        input.write_all(text_xml.as_bytes())?;
        input.flush()?;
        let output = NamedTempFile::new()?;

        let task_config = self.task_config(request);
        let mut command = self.command(request.audio_file, input.path(), &task_config, output.path());
        debug!("Running {:?}", command);

        let result = command.output().map_err(|source| AlignerError::Spawn {
            program: self.config.python.clone(),
            source,
        })?;
        debug!("aeneas exited with {}", result.status);

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).into_owned();
            error!("aeneas failed for {}: {}", request.audio_file.display(), stderr.trim());
            return Err(AlignerError::ExitStatus {
                program: self.config.python.clone(),
                code: result.status.code(),
                stderr,
            });
        }

        let map_bytes = std::fs::read(output.path())?;
        parse_sync_map(&map_bytes, request.audio_file, request.clip_begin, request.clip_end)
    }
}

/// Read an aeneas XML sync map: `<map><fragment id begin end>text</fragment>...</map>`.
///
/// Times are seconds. Fragments without an id or with unreadable times are
/// skipped, and a repeated id keeps its first fragment. The first point starts at `clip_begin` and the last ends at
/// `clip_end`.
pub fn parse_sync_map(
    bytes: &[u8],
    audio_file: &Path,
    clip_begin: Duration,
    clip_end: Duration,
) -> Result<SyncMap, AlignerError> {
    let doc = parser::parse_bytes(bytes, "aeneas sync map")
        .map_err(|e| AlignerError::InvalidOutput(e.to_string()))?;
    let root = doc.root_element().ok_or(AlignerError::MissingRoot)?;

    let mut seen = HashSet::new();
    let mut points: Vec<SyncPoint> = doc
        .child_elements_named(root, "fragment")
        .into_iter()
        .filter_map(|fragment| fragment_point(&doc, fragment, audio_file))
        .filter(|point| seen.insert(point.id.clone()))
        .collect();
    points.sort_by(SyncPoint::timeline_order);
    clamp_to_window(&mut points, clip_begin, clip_end);

    Ok(points.into_iter().map(|p| (p.id.clone(), p)).collect())
}

fn fragment_point(doc: &XmlDocument, fragment: NodeId, audio_file: &Path) -> Option<SyncPoint> {
    let id = doc.attribute(fragment, ID_ATTRIBUTE)?;
    let begin = parse_seconds(doc.attribute(fragment, "begin")?)?;
    let end = parse_seconds(doc.attribute(fragment, "end")?)?;
    let text = doc.text_content(fragment).trim().to_string();
    debug!("Fragment {} [{:?}, {:?}] {}", id, begin, end, text);
    Some(SyncPoint::new(id, begin, end, audio_file).with_text(text))
}

// Decimal seconds, kept to millisecond precision
fn parse_seconds(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_millis((secs * 1000.0).round() as u64))
}

// Seconds with exactly three decimals
fn seconds(offset: Duration) -> String {
    let ms = (offset.as_nanos() + 500_000) / 1_000_000;
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Creates an `AeneasAligner` for any language
#[derive(Debug, Clone, Default)]
pub struct AeneasAlignerFactory {
    config: AeneasConfig,
}

impl AeneasAlignerFactory {
    pub fn new(config: AeneasConfig) -> Self {
        Self { config }
    }

    /// Working directory of the runs, when configured
    pub fn aeneas_root(&self) -> Option<&PathBuf> {
        self.config.aeneas_root.as_ref()
    }
}

impl AlignerFactory for AeneasAlignerFactory {
    fn create(&self, language: &str) -> Option<Box<dyn Aligner>> {
        if language.trim().is_empty() {
            return None;
        }
        Some(Box::new(AeneasAligner::new(language, self.config.clone())))
    }
}
