//! Plain-text run logs.
//!
//! * Progress log: truncated when a batch starts, one line per top-level
//!   subdirectory: `<timestamp> <subdirectory>`. Informational only; resume
//!   relies on the Markdown files, not on this log.
//! * Error-detail log: appended across runs:
//!   `time: <timestamp>` followed by `<path> | Error processing : <message>`.
//! * Error-paths log: appended across runs, one failing path per line, so a
//!   follow-up run can be pointed at exactly the files that failed.

use crate::error::{BatchError, FileError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// `YYYY-MM-DD HH:MM:SS` in local time.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Truncating progress log, held open for the whole batch.
#[derive(Debug)]
pub struct ProgressLog {
    path: PathBuf,
    file: File,
}

impl ProgressLog {
    /// Create or truncate the log. Previous contents are discarded.
    pub fn create(path: &Path) -> Result<Self, BatchError> {
        let file = File::create(path).map_err(|e| log_failed(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Record that `directory` is about to be processed. Flushed immediately.
    pub fn record(&mut self, directory: &Path) -> Result<(), BatchError> {
        writeln!(self.file, "{} {}", timestamp(), directory.display())
            .and_then(|_| self.file.flush())
            .map_err(|e| log_failed(&self.path, e))
    }
}

/// The pair of append-only error logs.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    detail_path: PathBuf,
    paths_path: PathBuf,
}

impl ErrorLog {
    pub fn new(detail_path: impl Into<PathBuf>, paths_path: impl Into<PathBuf>) -> Self {
        Self {
            detail_path: detail_path.into(),
            paths_path: paths_path.into(),
        }
    }

    /// Append one failure to both logs.
    ///
    /// Files are opened per call so concurrent inspection (`tail -f`) always
    /// sees complete entries and nothing is lost if the process dies.
    pub fn record(&self, file_path: &Path, error: &FileError) -> Result<(), BatchError> {
        let entry = format!(
            "time: {}\n{} | Error processing : {}\n",
            timestamp(),
            file_path.display(),
            error
        );
        append(&self.detail_path, &entry)?;
        append(&self.paths_path, &format!("{}\n", file_path.display()))
    }
}

fn append(path: &Path, text: &str) -> Result<(), BatchError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| f.write_all(text.as_bytes()))
        .map_err(|e| log_failed(path, e))
}

fn log_failed(path: &Path, source: std::io::Error) -> BatchError {
    BatchError::LogWriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn timestamp_format() {
        let ts = timestamp();
        assert_eq!(ts.len(), 19, "got: {ts}");
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[test]
    fn progress_log_truncates_on_create() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("process.log");

        let mut log = ProgressLog::create(&path).unwrap();
        log.record(Path::new("/src/a/one")).unwrap();
        log.record(Path::new("/src/a/two")).unwrap();
        drop(log);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);

        let mut log = ProgressLog::create(&path).unwrap();
        log.record(Path::new("/src/a/three")).unwrap();
        drop(log);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.trim_end().ends_with(" /src/a/three"), "got: {text}");
    }

    #[test]
    fn error_log_appends_both_files() {
        let tmp = TempDir::new().unwrap();
        let detail = tmp.path().join("error.log");
        let paths = tmp.path().join("error_files.log");
        let log = ErrorLog::new(&detail, &paths);

        let err = FileError::Conversion("boom".into());
        log.record(Path::new("/src/a/x.pdf"), &err).unwrap();
        log.record(Path::new("/src/a/y.pdf"), &err).unwrap();

        let detail_text = std::fs::read_to_string(&detail).unwrap();
        let lines: Vec<&str> = detail_text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("time: "));
        assert_eq!(lines[1], "/src/a/x.pdf | Error processing : boom");
        assert_eq!(lines[3], "/src/a/y.pdf | Error processing : boom");

        assert_eq!(
            std::fs::read_to_string(&paths).unwrap(),
            "/src/a/x.pdf\n/src/a/y.pdf\n"
        );
    }

    #[test]
    fn error_log_unwritable_is_systemic() {
        let tmp = TempDir::new().unwrap();
        let log = ErrorLog::new(
            tmp.path().join("missing/dir/error.log"),
            tmp.path().join("error_files.log"),
        );
        let err = log
            .record(Path::new("/x.pdf"), &FileError::Conversion("e".into()))
            .unwrap_err();
        assert!(matches!(err, BatchError::LogWriteFailed { .. }));
    }
}
