//! Recursive directory walker with per-file failure isolation.
//!
//! Every file under a directory is remapped from the source prefix to the
//! target prefix and handed to [`convert_document`]. A failing file is
//! logged to both error logs and recorded as [`FileOutcome::Failed`]; the
//! walk always continues with the next file. Only problems that make the
//! whole walk meaningless (no model, no target root, wrong prefix, error logs
//! unwritable) surface as [`BatchError`].

use crate::context::BatchContext;
use crate::convert::{convert_document, ConvertOutcome};
use crate::engine::ConversionEngine;
use crate::error::{BatchError, FileError};
use crate::paths::remap_target_dir;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of processing one file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Converted; artifacts are in `output_dir`.
    Converted { output_dir: PathBuf, elapsed: Duration },
    /// Markdown already existed; nothing was done.
    Skipped { markdown_path: PathBuf },
    /// Conversion or persistence failed; logged and skipped.
    Failed { error: FileError },
}

impl From<Result<ConvertOutcome, FileError>> for FileOutcome {
    fn from(result: Result<ConvertOutcome, FileError>) -> Self {
        match result {
            Ok(ConvertOutcome::Converted {
                output_dir,
                elapsed,
            }) => FileOutcome::Converted {
                output_dir,
                elapsed,
            },
            Ok(ConvertOutcome::Skipped { markdown_path }) => {
                FileOutcome::Skipped { markdown_path }
            }
            Err(error) => FileOutcome::Failed { error },
        }
    }
}

/// One source file and what happened to it.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Per-directory aggregate of file outcomes, in processing order.
#[derive(Debug, Clone, Serialize)]
pub struct WalkReport {
    pub directory: PathBuf,
    pub files: Vec<FileRecord>,
}

impl WalkReport {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            files: Vec::new(),
        }
    }

    pub fn converted(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Converted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    /// Paths of every failed file.
    pub fn failed_paths(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|r| matches!(r.outcome, FileOutcome::Failed { .. }))
            .map(|r| r.path.as_path())
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|r| pred(&r.outcome)).count()
    }
}

enum WalkEntry {
    File(PathBuf),
    Unreadable(PathBuf, FileError),
}

/// Convert every file under `directory`.
///
/// When `model` is `None` the engine's models are loaded here, once for this
/// call. Callers walking several directories should load once and pass the
/// handle in.
///
/// # Errors
/// Only systemic failures: model load, target root creation, missing source
/// directory, a directory outside the source prefix, or unwritable error logs.
pub fn walk_directory<E: ConversionEngine>(
    ctx: &BatchContext<E>,
    directory: &Path,
    model: Option<&E::Model>,
) -> Result<WalkReport, BatchError> {
    let loaded;
    let model = match model {
        Some(m) => m,
        None => {
            warn!(
                "No model handle supplied; loading models for {}. \
                 Load once and pass the handle when walking several directories.",
                directory.display()
            );
            loaded = ctx.engine().load_models().map_err(BatchError::ModelLoad)?;
            &loaded
        }
    };

    let config = ctx.config();
    std::fs::create_dir_all(&config.target_prefix).map_err(|source| {
        BatchError::TargetCreateFailed {
            path: config.target_prefix.clone(),
            source,
        }
    })?;

    if !directory.is_dir() {
        return Err(BatchError::SourceNotFound {
            path: directory.to_path_buf(),
        });
    }
    if !directory.starts_with(&config.source_prefix) {
        return Err(BatchError::PrefixMismatch {
            path: directory.to_path_buf(),
            prefix: config.source_prefix.clone(),
        });
    }

    let entries = collect_files(directory);
    let progress = ctx.progress();
    progress.on_directory_start(directory, entries.len());
    info!("Processing {} files under {}", entries.len(), directory.display());

    let mut report = WalkReport::new(directory);
    for entry in entries {
        let (path, result) = match entry {
            WalkEntry::File(path) => {
                let result = convert_file(ctx, model, &path);
                (path, result)
            }
            WalkEntry::Unreadable(path, error) => (path, Err(error)),
        };

        match &result {
            Ok(ConvertOutcome::Skipped { .. }) => progress.on_file_skipped(&path),
            Ok(ConvertOutcome::Converted {
                output_dir,
                elapsed,
            }) => progress.on_file_converted(&path, output_dir, *elapsed),
            Err(error) => {
                warn!("Error processing {}, skipping: {}", path.display(), error);
                ctx.error_log().record(&path, error)?;
                progress.on_file_failed(&path, error);
            }
        }

        report.files.push(FileRecord {
            path,
            outcome: result.into(),
        });
    }

    info!(
        "Finished {}: {} converted, {} skipped, {} failed",
        directory.display(),
        report.converted(),
        report.skipped(),
        report.failed()
    );
    progress.on_directory_complete(&report);
    Ok(report)
}

fn convert_file<E: ConversionEngine>(
    ctx: &BatchContext<E>,
    model: &E::Model,
    path: &Path,
) -> Result<ConvertOutcome, FileError> {
    let config = ctx.config();
    let target_dir = remap_target_dir(path, &config.source_prefix, &config.target_prefix)?;
    debug!("{} → {}", path.display(), target_dir.display());
    convert_document(ctx.engine(), model, path, &target_dir)
}

/// Enumerate files recursively in filesystem order.
///
/// Symlinks are not descended into, but a symlink that points at a file is
/// listed like a file.
fn collect_files(directory: &Path) -> Vec<WalkEntry> {
    WalkDir::new(directory)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => {
                let ft = e.file_type();
                let is_file = ft.is_file() || (ft.is_symlink() && e.path().is_file());
                is_file.then(|| WalkEntry::File(e.into_path()))
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| directory.to_path_buf());
                Some(WalkEntry::Unreadable(path, FileError::Walk(err.to_string())))
            }
        })
        .collect()
}
