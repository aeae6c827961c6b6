//! CLI binary for pdf2md-batch.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`
//! and `EngineConfig`, runs the batch and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2md_batch::{
    run_batch, walk_directory, BatchConfig, BatchContext, BatchProgressCallback, BatchReport,
    EngineConfig, FileError, PageSeparator, VlmEngine, WalkReport,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar per walked directory, one line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    directories_total: AtomicUsize,
    directories_done: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading models…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            directories_total: AtomicUsize::new(0),
            directories_done: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize, prefix: String) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(progress_style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(prefix);
        self.bar.reset_eta();
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, subdirectories: &[PathBuf]) {
        self.directories_total
            .store(subdirectories.len(), Ordering::SeqCst);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Found {} subdirectories to process",
                subdirectories.len()
            ))
        ));
    }

    fn on_directory_start(&self, directory: &Path, total_files: usize) {
        let done = self.directories_done.load(Ordering::SeqCst);
        let total = self.directories_total.load(Ordering::SeqCst);
        let prefix = if total > 0 {
            format!("[{}/{}] {}", done + 1, total, short_name(directory))
        } else {
            short_name(directory)
        };
        self.activate_bar(total_files, prefix);
    }

    fn on_file_skipped(&self, path: &Path) {
        self.bar.set_message(short_name(path));
        self.bar.inc(1);
    }

    fn on_file_converted(&self, path: &Path, _output_dir: &Path, elapsed: Duration) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            path.display(),
            dim(&format!("{:.1}s", elapsed.as_secs_f64())),
        ));
        self.bar.inc(1);
    }

    fn on_file_failed(&self, path: &Path, error: &FileError) {
        let error = error.to_string();
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error,
        };
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            path.display(),
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_directory_complete(&self, report: &WalkReport) {
        self.directories_done.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "{} {}  {} converted, {} skipped, {}",
            if report.failed() == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&report.directory.display().to_string()),
            report.converted(),
            report.skipped(),
            if report.failed() == 0 {
                dim("0 failed")
            } else {
                red(&format!("{} failed", report.failed()))
            },
        ));
    }
}

fn short_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every subdirectory of /data/src into /data/md
  pdf2md-batch /data/src --target-prefix /data/md

  # Mirror a deeper tree: /data/src/a/x/doc.pdf → /data/md/a/x/doc/doc.md
  pdf2md-batch /data/src/a --source-prefix /data/src --target-prefix /data/md

  # Re-run after an interruption (converted documents are skipped)
  pdf2md-batch /data/src --target-prefix /data/md

  # Walk one directory recursively, without the per-subdirectory driver
  pdf2md-batch /data/src/reports --single-dir --source-prefix /data/src --target-prefix /data/md

  # Machine-readable report
  pdf2md-batch /data/src --target-prefix /data/md --json > report.json

OUTPUT LAYOUT (per source file <name>.<ext>):
  <target>/<relative dir>/<name>/<name>.md          Markdown
  <target>/<relative dir>/<name>/<name>_meta.json   conversion metadata
  <target>/<relative dir>/<name>/*.png              extracted images

RUN LOGS:
  process_log.log   one timestamped line per subdirectory, truncated per run
  error.log         failure details, appended across runs
  error_files.log   failing paths, one per line, appended across runs

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Override log filter
"#;

/// Convert directory trees of PDFs to Markdown, resumably.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md-batch",
    version,
    about = "Convert directory trees of PDFs to Markdown using Vision LLMs",
    long_about = "Walk every immediate subdirectory of SOURCE_DIR, convert each file found \
to Markdown with a vision LLM, and write the results to a mirrored tree under the target \
prefix. Documents that already have Markdown output are skipped, so an interrupted run is \
resumed by running it again.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Root source directory.
    source_dir: PathBuf,

    /// Prefix stripped from source paths. Default: SOURCE_DIR.
    #[arg(long, env = "PDF2MD_BATCH_SOURCE_PREFIX")]
    source_prefix: Option<PathBuf>,

    /// Root of the mirrored output tree.
    #[arg(long, env = "PDF2MD_BATCH_TARGET_PREFIX")]
    target_prefix: PathBuf,

    /// Progress log path (truncated every run).
    #[arg(long, env = "PDF2MD_BATCH_PROGRESS_LOG", default_value = "process_log.log")]
    progress_log: PathBuf,

    /// Error-detail log path (appended).
    #[arg(long, env = "PDF2MD_BATCH_ERROR_LOG", default_value = "error.log")]
    error_log: PathBuf,

    /// Error-paths log path (appended).
    #[arg(long, env = "PDF2MD_BATCH_ERROR_PATHS_LOG", default_value = "error_files.log")]
    error_paths_log: PathBuf,

    /// Walk SOURCE_DIR itself recursively instead of its subdirectories.
    #[arg(long)]
    single_dir: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "PDF2MD_BATCH_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "PDF2MD_BATCH_PROVIDER")]
    provider: Option<String>,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PDF2MD_BATCH_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Concurrent VLM calls per document.
    #[arg(short, long, env = "PDF2MD_BATCH_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Sequential mode: pass previous page as context for format continuity.
    #[arg(long, env = "PDF2MD_BATCH_MAINTAIN_FORMAT")]
    maintain_format: bool,

    /// Convert at most this many leading pages of each document.
    #[arg(long, env = "PDF2MD_BATCH_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, env = "PDF2MD_BATCH_SEPARATOR", default_value = "none")]
    separator: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2MD_BATCH_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2MD_BATCH_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per page.
    #[arg(long, env = "PDF2MD_BATCH_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2MD_BATCH_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries per page on LLM failure (0–10).
    #[arg(
        long,
        env = "PDF2MD_BATCH_MAX_RETRIES",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(0..=10)
    )]
    max_retries: u32,

    /// Per-page LLM call timeout in seconds.
    #[arg(long, env = "PDF2MD_BATCH_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Do not write embedded images next to the Markdown.
    #[arg(long, env = "PDF2MD_BATCH_NO_IMAGES")]
    no_images: bool,

    /// Treat any failed page as a failed document.
    #[arg(long, env = "PDF2MD_BATCH_STRICT")]
    strict: bool,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "PDF2MD_BATCH_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2MD_BATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_BATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_BATCH_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // With the progress bar active, library INFO logs would tear the bar;
    // warnings still get through so per-file failures stay visible.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb = show_progress.then(CliProgressCallback::new);

    let mut builder = BatchConfig::builder(&cli.source_dir, &cli.target_prefix)
        .progress_log(&cli.progress_log)
        .error_log(&cli.error_log)
        .error_paths_log(&cli.error_paths_log);
    if let Some(ref prefix) = cli.source_prefix {
        builder = builder.source_prefix(prefix);
    }
    if let Some(ref cb) = progress_cb {
        builder = builder.progress_callback(cb.clone());
    }
    let batch_config = builder.build().context("Invalid configuration")?;
    let engine = VlmEngine::new(build_engine_config(&cli)?);
    let ctx = BatchContext::new(batch_config, engine);

    // ── Run ──────────────────────────────────────────────────────────────
    let result = if cli.single_dir {
        walk_directory(&ctx, &cli.source_dir, None).map(|walk| BatchReport {
            duration_ms: 0,
            directories: vec![walk],
        })
    } else {
        run_batch(&ctx)
    };
    if let Some(ref cb) = progress_cb {
        cb.finish();
    }
    let report = result.context("Batch failed")?;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    }

    if !cli.quiet {
        eprintln!(
            "{}  {} converted  {} skipped  {} failed  of {} files",
            if report.failed() == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&report.converted().to_string()),
            report.skipped(),
            if report.failed() == 0 {
                "0".to_string()
            } else {
                red(&report.failed().to_string())
            },
            report.total_files(),
        );
        if report.failed() > 0 {
            eprintln!(
                "   failing paths appended to {}",
                dim(&cli.error_paths_log.display().to_string())
            );
        }
    }

    Ok(())
}

/// Map CLI args to `EngineConfig`.
fn build_engine_config(cli: &Cli) -> Result<EngineConfig> {
    let mut builder = EngineConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .maintain_format(cli.maintain_format)
        .page_separator(parse_separator(&cli.separator))
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .extract_images(!cli.no_images)
        .strict(cli.strict);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(n) = cli.max_pages {
        builder = builder.max_pages(n);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }

    builder.build().context("Invalid engine configuration")
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
