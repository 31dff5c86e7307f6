/*!
 * Console logging backend.
 *
 * Records go to stderr as `HH:MM:SS.mmm <marker> <message>`, colored by
 * level. Warnings raised through the warning channel show up here too.
 */

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Logger writing timestamped, colored lines to stderr
#[derive(Debug)]
pub struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    pub fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @returns: ANSI color and marker for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }

    /// Render a record without writing it
    pub fn format_line(level: Level, message: &str) -> String {
        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let (color, marker) = Self::style_for_level(level);
        format!("\x1B[{}m{} {} {}\x1B[0m", color, now, marker, message)
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = Self::format_line(record.level(), &record.args().to_string());
            let _ = writeln!(std::io::stderr(), "{}", line);
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

// @initializes: Global logger
pub fn init_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    let logger = Box::new(CustomLogger::new(level));
    log::set_boxed_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}
