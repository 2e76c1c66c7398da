//! Structured file logging.
//!
//! Each orchestrator run appends JSON-lines records to its own log file. The
//! file is opened, appended, and closed inside every call, so a failing run
//! never holds a handle open and partial runs still leave their trail.

use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One structured log line.
#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    /// Seconds since the Unix epoch.
    timestamp: u64,
    /// Component emitting the record.
    component: &'a str,
    /// Human-readable message.
    message: &'a str,
}

/// Append-only JSON-lines logger bound to one file.
///
/// Logging is best-effort: an unwritable log never masks the pipeline error
/// it was about to describe.
///
/// # Examples
///
/// ```no_run
/// use fraguar::logging::FileLogger;
///
/// let logger = FileLogger::create("logs/training.log").unwrap();
/// logger.log("training", "Started training the model");
/// ```
#[derive(Debug, Clone)]
pub struct FileLogger {
    path: PathBuf,
}

impl FileLogger {
    /// Creates a logger for `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record. Write failures are swallowed.
    pub fn log(&self, component: &str, message: &str) {
        let record = LogRecord {
            timestamp: unix_now(),
            component,
            message,
        };
        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{line}");
        }
    }
}

/// Seconds since the Unix epoch (no chrono dependency).
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = FileLogger::create(&path).unwrap();

        logger.log("training", "first");
        logger.log("training", "second");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["component"], "training");
        assert_eq!(parsed["message"], "first");
        assert!(parsed["timestamp"].as_u64().is_some());
    }

    #[test]
    fn test_create_makes_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/run.log");
        let logger = FileLogger::create(&path).unwrap();
        logger.log("x", "y");
        assert!(path.exists());
    }

    #[test]
    fn test_log_to_unwritable_path_is_silent() {
        let logger = FileLogger {
            path: PathBuf::from("/nonexistent-root-dir/run.log"),
        };
        // Must not panic.
        logger.log("x", "y");
    }
}
