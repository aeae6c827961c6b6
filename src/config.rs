//! Configuration types for batch runs and the default VLM engine.
//!
//! Two structs, two concerns:
//!
//! * [`BatchConfig`]: where to read, where to write, where the run logs go.
//!   Everything the orchestration layer needs, constructed once at the top
//!   level and carried by [`crate::context::BatchContext`].
//! * [`EngineConfig`]: how the [`crate::vlm::VlmEngine`] renders pages and
//!   talks to the vision model. Irrelevant to custom engines.
//!
//! Both are built via builders so callers set only what they care about.

use crate::error::BatchError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default progress log file name (relative to the working directory).
pub const DEFAULT_PROGRESS_LOG: &str = "process_log.log";
/// Default error-detail log file name.
pub const DEFAULT_ERROR_LOG: &str = "error.log";
/// Default error-paths log file name.
pub const DEFAULT_ERROR_PATHS_LOG: &str = "error_files.log";

/// Configuration for one batch run.
///
/// # Example
/// ```rust
/// use pdf2md_batch::BatchConfig;
///
/// let config = BatchConfig::builder("/data/source/a", "/data/target/b")
///     .progress_log("/data/process_log.log")
///     .build()
///     .unwrap();
/// assert_eq!(config.source_prefix, config.source_dir);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Root source directory. The batch driver processes its immediate subdirectories.
    pub source_dir: PathBuf,

    /// Prefix stripped from every source file path. Default: `source_dir`.
    ///
    /// May be any ancestor of `source_dir`; the part of each file's path below
    /// the prefix is recreated under `target_prefix`.
    pub source_prefix: PathBuf,

    /// Root under which the source structure is mirrored.
    pub target_prefix: PathBuf,

    /// Progress log, truncated at the start of every batch run.
    pub progress_log: PathBuf,

    /// Error-detail log, appended across runs.
    pub error_log: PathBuf,

    /// Error-paths log (one failing path per line), appended across runs.
    pub error_paths_log: PathBuf,

    /// Receives per-directory and per-file events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("source_dir", &self.source_dir)
            .field("source_prefix", &self.source_prefix)
            .field("target_prefix", &self.target_prefix)
            .field("progress_log", &self.progress_log)
            .field("error_log", &self.error_log)
            .field("error_paths_log", &self.error_paths_log)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a builder. `source_prefix` defaults to `source_dir`.
    pub fn builder(
        source_dir: impl Into<PathBuf>,
        target_prefix: impl Into<PathBuf>,
    ) -> BatchConfigBuilder {
        let source_dir = source_dir.into();
        BatchConfigBuilder {
            config: BatchConfig {
                source_prefix: source_dir.clone(),
                source_dir,
                target_prefix: target_prefix.into(),
                progress_log: PathBuf::from(DEFAULT_PROGRESS_LOG),
                error_log: PathBuf::from(DEFAULT_ERROR_LOG),
                error_paths_log: PathBuf::from(DEFAULT_ERROR_PATHS_LOG),
                progress_callback: None,
            },
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn source_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.config.source_prefix = prefix.into();
        self
    }

    pub fn progress_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.progress_log = path.into();
        self
    }

    pub fn error_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.error_log = path.into();
        self
    }

    pub fn error_paths_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.error_paths_log = path.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating that no path is empty.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        let required: [(&str, &Path); 6] = [
            ("source_dir", &c.source_dir),
            ("source_prefix", &c.source_prefix),
            ("target_prefix", &c.target_prefix),
            ("progress_log", &c.progress_log),
            ("error_log", &c.error_log),
            ("error_paths_log", &c.error_paths_log),
        ];
        for (name, path) in required {
            if path.as_os_str().is_empty() {
                return Err(BatchError::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        Ok(self.config)
    }
}

/// Configuration for the default [`crate::vlm::VlmEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rendering DPI used when rasterising each page. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Maximum rendered image dimension in pixels. Default: 2000.
    ///
    /// Caps the longest edge regardless of page size, so a poster-sized page
    /// cannot exhaust memory at high DPI.
    pub max_rendered_pixels: u32,

    /// Concurrent VLM calls for the pages of one document. Default: 4.
    pub concurrency: usize,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts on a failed VLM call, at most [`MAX_RETRIES`]. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Pass the previous page's Markdown as context. Forces sequential page processing.
    pub maintain_format: bool,

    /// Page separator in the assembled Markdown. Default: None.
    pub page_separator: PageSeparator,

    /// Convert at most this many leading pages. Default: all.
    pub max_pages: Option<usize>,

    /// Extract embedded raster images as PNG artifacts. Default: true.
    pub extract_images: bool,

    /// Fail the whole document when any page fails. Default: false.
    ///
    /// A failed document writes no Markdown, so the next run retries it.
    pub strict: bool,

    /// Per-VLM-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Explicit pdfium library path. Falls back to `PDFIUM_LIB_PATH`, then the system library.
    pub pdfium_library_path: Option<PathBuf>,
}

/// Upper bound for [`EngineConfig::max_retries`].
pub const MAX_RETRIES: u32 = 10;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 2000,
            concurrency: 4,
            model: None,
            provider_name: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            password: None,
            system_prompt: None,
            maintain_format: false,
            page_separator: PageSeparator::default(),
            max_pages: None,
            extract_images: true,
            strict: false,
            api_timeout_secs: 60,
            pdfium_library_path: None,
        }
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    /// Clamped to [`MAX_RETRIES`].
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn maintain_format(mut self, v: bool) -> Self {
        self.config.maintain_format = v;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n);
        self
    }

    pub fn extract_images(mut self, v: bool) -> Self {
        self.config.extract_images = v;
        self
    }

    pub fn strict(mut self, v: bool) -> Self {
        self.config.strict = v;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, BatchError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(BatchError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(BatchError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.max_pages == Some(0) {
            return Err(BatchError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        if c.max_retries > MAX_RETRIES {
            return Err(BatchError::InvalidConfig(format!(
                "max_retries must be 0–{MAX_RETRIES}, got {}",
                c.max_retries
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(BatchError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}

/// How to separate pages in the assembled Markdown output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PageSeparator {
    /// No separator; pages joined with "\n\n". (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator string for the given page number (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_builder_defaults() {
        let c = BatchConfig::builder("/src/a", "/dst/b").build().unwrap();
        assert_eq!(c.source_prefix, PathBuf::from("/src/a"));
        assert_eq!(c.target_prefix, PathBuf::from("/dst/b"));
        assert_eq!(c.progress_log, PathBuf::from(DEFAULT_PROGRESS_LOG));
        assert_eq!(c.error_log, PathBuf::from(DEFAULT_ERROR_LOG));
        assert_eq!(c.error_paths_log, PathBuf::from(DEFAULT_ERROR_PATHS_LOG));
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn batch_builder_overrides_prefix() {
        let c = BatchConfig::builder("/src/a/x", "/dst/b")
            .source_prefix("/src/a")
            .build()
            .unwrap();
        assert_eq!(c.source_dir, PathBuf::from("/src/a/x"));
        assert_eq!(c.source_prefix, PathBuf::from("/src/a"));
    }

    #[test]
    fn batch_builder_rejects_empty_target() {
        let err = BatchConfig::builder("/src/a", "").build().unwrap_err();
        assert!(err.to_string().contains("target_prefix"));
    }

    #[test]
    fn engine_builder_clamps() {
        let c = EngineConfig::builder()
            .dpi(10)
            .concurrency(0)
            .temperature(5.0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn engine_builder_rejects_zero_pages() {
        assert!(EngineConfig::builder().max_pages(0).build().is_err());
    }

    #[test]
    fn engine_builder_clamps_retries() {
        let c = EngineConfig::builder().max_retries(300).build().unwrap();
        assert_eq!(c.max_retries, MAX_RETRIES);

        let mut b = EngineConfig::builder();
        b.config.max_retries = 64;
        assert!(b.build().is_err());
    }

    #[test]
    fn separator_render() {
        assert_eq!(PageSeparator::None.render(2), "\n\n");
        assert_eq!(PageSeparator::HorizontalRule.render(2), "\n\n---\n\n");
        assert_eq!(PageSeparator::Comment.render(7), "\n\n<!-- page 7 -->\n\n");
        assert_eq!(
            PageSeparator::Custom("***".into()).render(1),
            "\n\n***\n\n"
        );
    }
}
