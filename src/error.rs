//! Error types for pdf2md-batch.
//!
//! Failures fall into two tiers, and the types mirror that split:
//!
//! * [`BatchError`] is **systemic**: the run cannot continue (source directory
//!   unreadable, target root uncreatable, model load failed, a log file cannot
//!   be written). Returned as `Err(BatchError)` from
//!   [`crate::batch::run_batch`] and [`crate::walker::walk_directory`] and
//!   aborts every remaining subdirectory.
//!
//! * [`FileError`] is **per file**: one document could not be converted or
//!   persisted. Caught at the walker, written to the error logs and recorded
//!   as [`crate::walker::FileOutcome::Failed`]; the batch moves on.
//!
//! [`EngineError`] is what a [`crate::engine::ConversionEngine`] reports, and
//! [`PageError`] is the non-fatal per-page error inside the VLM engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that stop a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The root source directory does not exist or is not a directory.
    #[error("Source directory not found: '{path}'")]
    SourceNotFound { path: PathBuf },

    /// Listing the immediate subdirectories of the source root failed.
    #[error("Failed to list directory '{path}': {source}")]
    ListDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target prefix directory could not be created.
    #[error("Failed to create target directory '{path}': {source}")]
    TargetCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A walked directory is not rooted under the declared source prefix.
    #[error("'{path}' is not under source prefix '{prefix}'\nCheck --source-prefix matches the source directory.")]
    PrefixMismatch { path: PathBuf, prefix: PathBuf },

    /// The conversion engine could not load its models.
    #[error("Failed to load conversion models: {0}")]
    ModelLoad(#[source] EngineError),

    /// A progress or error log could not be opened or written.
    #[error("Failed to write log file '{path}': {source}")]
    LogWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error for a single source file.
///
/// The message is what lands in the error-detail log after
/// `"<path> | Error processing : "`.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum FileError {
    /// The engine failed to convert the document.
    #[error("{0}")]
    Conversion(String),

    /// One of the output artifacts could not be written.
    #[error("failed to write '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },

    /// The file path does not start with the source prefix.
    #[error("'{path}' is not under source prefix '{prefix}'")]
    PrefixMismatch { path: PathBuf, prefix: PathBuf },

    /// The directory walk could not read this entry.
    #[error("walk error: {0}")]
    Walk(String),

    /// The path ends in `..` or is a root, so there is nothing to name the output after.
    #[error("'{path}' has no file name")]
    NoFileName { path: PathBuf },
}

impl From<EngineError> for FileError {
    fn from(e: EngineError) -> Self {
        FileError::Conversion(e.to_string())
    }
}

/// Errors reported by a conversion engine.
#[derive(Debug, Error)]
pub enum EngineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}' (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every page failed after all retries; output would be empty.
    #[error("All {total} pages failed after {retries} retries each. First error: {first_error}")]
    AllPagesFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    /// Some pages succeeded but at least one failed (strict mode only).
    #[error("{failed}/{total} pages failed during conversion")]
    PartialFailure { failed: usize, total: usize },

    // ── Model loading ─────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    /// The async runtime driving the LLM provider could not be created.
    #[error("Failed to start LLM runtime: {0}")]
    Runtime(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page inside the VLM engine.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum PageError {
    /// Page rasterisation or encoding failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// LLM call failed after retries.
    #[error("Page {page}: LLM call failed after {retries} retries: {detail}")]
    LlmFailed {
        page: usize,
        retries: u8,
        detail: String,
    },

    /// LLM call timed out.
    #[error("Page {page}: LLM call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_becomes_conversion_file_error() {
        let e = EngineError::CorruptPdf {
            path: PathBuf::from("/src/a/bad.pdf"),
            detail: "xref missing".into(),
        };
        let fe: FileError = e.into();
        let msg = fe.to_string();
        assert!(msg.contains("bad.pdf"), "got: {msg}");
        assert!(msg.contains("xref missing"), "got: {msg}");
    }

    #[test]
    fn partial_failure_display() {
        let e = EngineError::PartialFailure {
            failed: 1,
            total: 10,
        };
        assert!(e.to_string().contains("1/10"));
    }

    #[test]
    fn prefix_mismatch_names_both_paths() {
        let e = BatchError::PrefixMismatch {
            path: PathBuf::from("/other/dir"),
            prefix: PathBuf::from("/src/a"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/other/dir"));
        assert!(msg.contains("/src/a"));
    }

    #[test]
    fn model_load_keeps_source() {
        use std::error::Error as _;
        let e = BatchError::ModelLoad(EngineError::PdfiumBindingFailed("no lib".into()));
        assert!(e.source().is_some());
        assert!(e.to_string().contains("no lib"));
    }

    #[test]
    fn page_error_timeout_display() {
        let e = PageError::Timeout { page: 3, secs: 60 };
        assert!(e.to_string().contains("Page 3"));
        assert!(e.to_string().contains("60s"));
    }
}
