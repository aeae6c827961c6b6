//! # pdf2md-batch
//!
//! Resumable batch conversion of PDF trees to Markdown.
//!
//! Point the crate at a source directory and a target prefix. Every file found
//! under the source's immediate subdirectories is converted and written to a
//! mirrored location:
//!
//! ```text
//! /data/src/reports/2023/q1.pdf
//!        └──────────┘ remapped from source prefix to target prefix
//! /data/md/reports/2023/q1/q1.md
//! /data/md/reports/2023/q1/q1_meta.json
//! /data/md/reports/2023/q1/page_2_image_1.png
//! ```
//!
//! ## Resuming
//!
//! A document whose `<stem>/<stem>.md` exists is skipped without touching the
//! engine. An interrupted run is resumed by running it again; nothing else
//! needs to be remembered.
//!
//! ## Layers
//!
//! ```text
//! run_batch            list subdirectories, load the model once, log progress
//!  └─ walk_directory   recurse, remap paths, isolate per-file failures
//!      └─ convert_document   skip-if-done, engine.convert, save_artifacts
//! ```
//!
//! The conversion itself sits behind [`ConversionEngine`]. [`VlmEngine`]
//! rasterises pages with pdfium and transcribes them with a vision LLM via
//! `edgequake-llm`; tests and alternative back ends supply their own engine.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_batch::{run_batch, BatchConfig, BatchContext, EngineConfig, VlmEngine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder("/data/src", "/data/md").build()?;
//!     let engine = VlmEngine::new(EngineConfig::default());
//!     let ctx = BatchContext::new(config, engine);
//!
//!     let report = run_batch(&ctx)?;
//!     eprintln!(
//!         "{} converted, {} skipped, {} failed",
//!         report.converted(),
//!         report.skipped(),
//!         report.failed()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md-batch` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2md-batch = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod context;
pub mod convert;
pub mod engine;
pub mod error;
pub mod logs;
pub mod paths;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod vlm;
pub mod walker;
pub mod writer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{list_subdirectories, run_batch, BatchReport};
pub use config::{BatchConfig, BatchConfigBuilder, EngineConfig, EngineConfigBuilder, PageSeparator};
pub use context::BatchContext;
pub use convert::{convert_document, ConvertOutcome};
pub use engine::{ConversionEngine, ConversionResult, ImageMap, Metadata};
pub use error::{BatchError, EngineError, FileError, PageError};
pub use paths::{
    already_converted, file_stem, markdown_path, metadata_path, remap_target_dir, subfolder_path,
};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use vlm::{VlmEngine, VlmModels};
pub use walker::{walk_directory, FileOutcome, FileRecord, WalkReport};
pub use writer::save_artifacts;
