use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

use crate::app_config::LogLevel;

// @module: Pipeline logger writing coloured, timestamped lines to stderr

// @struct: Stderr logger for pipeline hosts without their own logger
pub struct PipelineLogger {
    level: LevelFilter,
}

impl PipelineLogger {
    // @creates: New logger with specified level
    pub fn new(level: LevelFilter) -> Self {
        PipelineLogger { level }
    }

    // @initializes: Global logger; fails if one is already installed
    pub fn init(level: LogLevel) -> Result<(), SetLoggerError> {
        let filter = LevelFilter::from(level);
        log::set_boxed_logger(Box::new(PipelineLogger::new(filter)))?;
        log::set_max_level(filter);
        Ok(())
    }

    // @returns: ANSI colour code and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }

    // @returns: One formatted log line, without colour
    pub fn format_line(level: Level, target: &str, message: &str) -> String {
        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let (_, tag) = Self::style_for_level(level);
        format!("{} {} [{}] {}", now, tag, target, message)
    }
}

impl Log for PipelineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let (colour, _) = Self::style_for_level(record.level());
        let line = Self::format_line(record.level(), record.target(), &record.args().to_string());
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "\x1B[{}m{}\x1B[0m", colour, line);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
