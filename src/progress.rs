//! Progress-callback trait for batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the batch walks directories and converts files. The library itself only
//! logs through `tracing`; terminal progress bars, JSON event streams and the
//! like live in callers.
//!
//! # Example
//!
//! ```rust
//! use pdf2md_batch::{BatchConfig, BatchProgressCallback, FileError};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter(AtomicUsize);
//!
//! impl BatchProgressCallback for FailureCounter {
//!     fn on_file_failed(&self, path: &Path, error: &FileError) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}: {}", path.display(), error);
//!     }
//! }
//!
//! let config = BatchConfig::builder("/data/src", "/data/dst")
//!     .progress_callback(Arc::new(FailureCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::FileError;
use crate::walker::WalkReport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Called by the batch driver and directory walker as work progresses.
///
/// All methods default to no-ops so implementors override only what they need.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after the top-level subdirectories are listed.
    fn on_batch_start(&self, subdirectories: &[PathBuf]) {
        let _ = subdirectories;
    }

    /// Called once per walked directory, after its files are enumerated.
    fn on_directory_start(&self, directory: &Path, total_files: usize) {
        let _ = (directory, total_files);
    }

    /// Called when a file is skipped because its Markdown already exists.
    fn on_file_skipped(&self, path: &Path) {
        let _ = path;
    }

    /// Called when a file is converted and its artifacts are written.
    fn on_file_converted(&self, path: &Path, output_dir: &Path, elapsed: Duration) {
        let _ = (path, output_dir, elapsed);
    }

    /// Called when a file fails; the batch continues with the next file.
    fn on_file_failed(&self, path: &Path, error: &FileError) {
        let _ = (path, error);
    }

    /// Called once per walked directory when all its files were attempted.
    fn on_directory_complete(&self, report: &WalkReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
