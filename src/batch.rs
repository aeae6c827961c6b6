//! Batch driver: one model load, one walk per top-level subdirectory.
//!
//! Immediate subdirectories of the source root are the units of progress.
//! Before each one starts, a timestamped line goes to the progress log, so
//! after an interruption the log shows how far the run got. Resuming needs
//! no log at all: a re-run skips every document whose Markdown exists.

use crate::context::BatchContext;
use crate::engine::ConversionEngine;
use crate::error::BatchError;
use crate::logs::ProgressLog;
use crate::walker::{walk_directory, WalkReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Aggregate of every subdirectory walked in one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub directories: Vec<WalkReport>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn converted(&self) -> usize {
        self.directories.iter().map(WalkReport::converted).sum()
    }

    pub fn skipped(&self) -> usize {
        self.directories.iter().map(WalkReport::skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.directories.iter().map(WalkReport::failed).sum()
    }

    pub fn total_files(&self) -> usize {
        self.directories.iter().map(|d| d.files.len()).sum()
    }
}

/// Immediate (non-recursive) subdirectories of `dir`, in listing order.
///
/// Symlinks to directories count as directories.
pub fn list_subdirectories(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let list_failed = |source| BatchError::ListDirFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_failed)? {
        let path = entry.map_err(list_failed)?.path();
        if path.is_dir() {
            subdirs.push(path);
        }
    }
    Ok(subdirs)
}

/// Run a full batch as described by the context's [`crate::config::BatchConfig`].
///
/// # Errors
/// Any [`BatchError`] aborts the remaining subdirectories. Per-file failures
/// never surface here; they are in the returned report and the error logs.
pub fn run_batch<E: ConversionEngine>(ctx: &BatchContext<E>) -> Result<BatchReport, BatchError> {
    let start = Instant::now();
    let config = ctx.config();

    if !config.source_dir.is_dir() {
        return Err(BatchError::SourceNotFound {
            path: config.source_dir.clone(),
        });
    }

    let subdirs = list_subdirectories(&config.source_dir)?;
    info!("Sub directories: {:?}", subdirs);
    ctx.progress().on_batch_start(&subdirs);

    info!("Loading models...");
    let model = ctx.engine().load_models().map_err(BatchError::ModelLoad)?;
    info!("Models loaded.");

    let mut progress_log = ProgressLog::create(&config.progress_log)?;
    let mut report = BatchReport::default();

    for subdir in &subdirs {
        progress_log.record(subdir)?;
        info!("Processing {}", subdir.display());
        report
            .directories
            .push(walk_directory(ctx, subdir, Some(&model))?);
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Batch complete: {} converted, {} skipped, {} failed in {}ms",
        report.converted(),
        report.skipped(),
        report.failed(),
        report.duration_ms
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lists_only_immediate_directories() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("a/deep/er")).unwrap();
        std::fs::create_dir_all(tmp.path().join("b")).unwrap();
        std::fs::write(tmp.path().join("loose.pdf"), b"%PDF").unwrap();

        let mut subdirs = list_subdirectories(tmp.path()).unwrap();
        subdirs.sort();
        assert_eq!(subdirs, vec![tmp.path().join("a"), tmp.path().join("b")]);
    }

    #[test]
    fn listing_missing_directory_is_systemic() {
        let tmp = TempDir::new().unwrap();
        let err = list_subdirectories(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, BatchError::ListDirFailed { .. }));
    }
}
