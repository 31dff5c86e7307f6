use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;

/// Synchronizer configuration module
/// This module handles the synchronizer configuration including loading,
/// validating and saving settings as JSON.
/// Represents the synchronizer configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Language used when no language attribute is in scope (ISO)
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Largest tolerated gap between consecutive clips of one group
    #[serde(default = "default_max_audio_clip_gap_ms")]
    pub max_audio_clip_gap_ms: u64,

    /// Local name of generated word elements
    #[serde(default = "default_word_element_name")]
    pub word_element_name: String,

    /// Class of generated word elements, also the aligner's fragment filter
    #[serde(default = "default_word_class")]
    pub word_class: String,

    /// Skip text references that point back at the navigation document
    #[serde(default = "default_true")]
    pub exclude_navigation_from_text_documents: bool,

    /// External aligner config
    #[serde(default)]
    pub aligner: AeneasConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Settings of the aeneas forced aligner
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AeneasConfig {
    // @field: Python interpreter with aeneas installed
    #[serde(default = "default_python")]
    pub python: String,

    // @field: Working directory for aeneas runs
    #[serde(default)]
    pub aeneas_root: Option<PathBuf>,

    // @field: Additional `key=value` task options
    #[serde(default)]
    pub extra_options: Vec<String>,
}

impl Default for AeneasConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            aeneas_root: None,
            extra_options: Vec::new(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_max_audio_clip_gap_ms() -> u64 {
    1
}

fn default_word_element_name() -> String {
    "span".to_string()
}

fn default_word_class() -> String {
    "word".to_string()
}

fn default_true() -> bool {
    true
}

fn default_python() -> String {
    "python3".to_string()
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .context(format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .context("Configuration validation failed")?;
        Ok(config)
    }

    /// Write the configuration as pretty printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .context(format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::language_utils::validate_language_code(&self.default_language).map_err(|e| {
            ConfigError::InvalidValue {
                field: "default_language".to_string(),
                message: e.to_string(),
            }
        })?;

        if self.word_element_name.trim().is_empty() || self.word_element_name.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "word_element_name".to_string(),
                message: format!("'{}' is not an element name", self.word_element_name),
            });
        }

        if self.aligner.python.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "aligner.python".to_string(),
                message: "interpreter must not be empty".to_string(),
            });
        }

        if let Some(option) = self.aligner.extra_options.iter().find(|o| !o.contains('=')) {
            return Err(ConfigError::InvalidValue {
                field: "aligner.extra_options".to_string(),
                message: format!("'{}' is not a key=value option", option),
            });
        }

        Ok(())
    }

    pub fn max_audio_clip_gap(&self) -> Duration {
        Duration::from_millis(self.max_audio_clip_gap_ms)
    }

    /// The word class, `None` when blank
    pub fn word_class_filter(&self) -> Option<&str> {
        Some(self.word_class.as_str()).filter(|c| !c.trim().is_empty())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            default_language: default_language(),
            max_audio_clip_gap_ms: default_max_audio_clip_gap_ms(),
            word_element_name: default_word_element_name(),
            word_class: default_word_class(),
            exclude_navigation_from_text_documents: default_true(),
            aligner: AeneasConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
