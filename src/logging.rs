//! Log file output.
//!
//! Stdout logging is set up by the binary. When `logging.file_dir` is
//! configured, the same events also go to a file rotated at midnight, with
//! only the newest `max_log_files` kept.

use anyhow::{Context, Result};
use std::fs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::config::LoggingConfig;

/// Daily-rotated file appender, or `None` when file logging is off.
pub fn file_appender(cfg: &LoggingConfig) -> Result<Option<RollingFileAppender>> {
    let Some(ref dir) = cfg.file_dir else {
        return Ok(None);
    };

    fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory: {dir}"))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&cfg.file_name)
        .max_log_files(cfg.max_log_files)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {dir}"))?;

    Ok(Some(appender))
}
