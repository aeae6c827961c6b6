//! The default conversion engine: pdfium rasterisation + vision LLM.
//!
//! ## Model handle
//!
//! [`VlmModels`] bundles the three things that are expensive to set up and
//! safe to reuse for every document in a batch:
//!
//! * a bound pdfium library,
//! * a resolved [`LLMProvider`] (API keys read, HTTP client built),
//! * a tokio runtime that drives the provider's async API from this
//!   otherwise synchronous crate.
//!
//! ## Per document
//!
//! ```text
//! validate %PDF ─▶ open ─▶ metadata ─▶ render pages ─▶ encode ─▶ VLM per page
//!                              └────▶ embedded images          └─▶ cleanup ─▶ assemble
//! ```
//!
//! Pages of one document go to the VLM concurrently (up to
//! `EngineConfig::concurrency`) unless `maintain_format` asks for sequential
//! calls with the previous page as context. Documents themselves are always
//! converted one at a time by the batch.

use crate::config::EngineConfig;
use crate::engine::{ConversionEngine, ConversionResult, ImageMap, Metadata};
use crate::error::EngineError;
use crate::pipeline::llm::PageResult;
use crate::pipeline::render::DocumentMetadata;
use crate::pipeline::{encode, input, llm, postprocess, render};
use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use pdfium_render::prelude::Pdfium;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Loaded resources shared by every conversion in a batch.
pub struct VlmModels {
    pdfium: Pdfium,
    provider: Arc<dyn LLMProvider>,
    runtime: tokio::runtime::Runtime,
    label: String,
}

impl fmt::Debug for VlmModels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VlmModels")
            .field("provider", &self.label)
            .finish_non_exhaustive()
    }
}

impl VlmModels {
    /// `provider/model` as resolved at load time.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Vision-LLM conversion engine.
#[derive(Debug, Clone, Default)]
pub struct VlmEngine {
    config: EngineConfig,
}

impl VlmEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl ConversionEngine for VlmEngine {
    type Model = VlmModels;

    fn load_models(&self) -> Result<VlmModels, EngineError> {
        let start = Instant::now();
        let pdfium = bind_pdfium(self.config.pdfium_library_path.as_deref())?;
        let (provider, label) = resolve_provider(&self.config)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EngineError::Runtime(e.to_string()))?;

        info!(
            "Loaded pdfium and provider {} in {}ms",
            label,
            start.elapsed().as_millis()
        );
        Ok(VlmModels {
            pdfium,
            provider,
            runtime,
            label,
        })
    }

    fn convert(&self, path: &Path, model: &VlmModels) -> Result<ConversionResult, EngineError> {
        let start = Instant::now();
        let config = &self.config;

        input::validate_pdf_file(path)?;
        let document = render::open_document(&model.pdfium, path, config.password.as_deref())?;
        let doc_meta = render::read_metadata(&document);

        let page_count = config
            .max_pages
            .map_or(doc_meta.page_count, |m| m.min(doc_meta.page_count));
        if page_count == 0 {
            return Err(EngineError::CorruptPdf {
                path: path.to_path_buf(),
                detail: "document has no pages".into(),
            });
        }
        info!("{}: {} pages", path.display(), page_count);

        let rendered = render::render_pages(&document, config, page_count);
        let images = if config.extract_images {
            render::extract_images(&document, page_count)
        } else {
            ImageMap::new()
        };
        drop(document);

        let mut pages: Vec<PageResult> = Vec::with_capacity(page_count);
        let mut encoded: Vec<(usize, ImageData)> = Vec::with_capacity(page_count);
        for (idx, result) in rendered {
            match result.and_then(|img| encode::encode_page(idx + 1, &img)) {
                Ok(data) => encoded.push((idx, data)),
                Err(e) => {
                    warn!("{}: {}", path.display(), e);
                    pages.push(PageResult::failed(idx + 1, e));
                }
            }
        }

        pages.extend(model.runtime.block_on(async {
            if config.maintain_format {
                process_sequential(&model.provider, &encoded, config).await
            } else {
                process_concurrent(&model.provider, &encoded, config).await
            }
        }));
        pages.sort_by_key(|p| p.page_num);

        let known_images: BTreeSet<String> = images.keys().cloned().collect();
        for page in pages.iter_mut().filter(|p| p.is_ok()) {
            page.markdown = postprocess::clean_markdown(&page.markdown, &known_images);
        }

        let failed = pages.iter().filter(|p| !p.is_ok()).count();
        if failed == pages.len() {
            let first_error = pages
                .iter()
                .find_map(|p| p.error.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(EngineError::AllPagesFailed {
                total: pages.len(),
                retries: config.max_retries,
                first_error,
            });
        }
        if config.strict && failed > 0 {
            return Err(EngineError::PartialFailure {
                failed,
                total: pages.len(),
            });
        }

        let markdown = assemble_document(&pages, config);
        let metadata = build_metadata(&doc_meta, &pages, &images, model.label(), start);
        debug!(
            "{}: {} bytes of Markdown, {} images",
            path.display(),
            markdown.len(),
            images.len()
        );

        Ok(ConversionResult {
            markdown,
            images,
            metadata,
        })
    }
}

/// Bind pdfium from an explicit path, `PDFIUM_LIB_PATH`, or the system library.
///
/// A directory is resolved to the platform library name inside it.
fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, EngineError> {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = match configured {
        Some(path) => {
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| EngineError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `provider_name` (+ `model`, default `gpt-4.1-nano`) from the config
/// 2. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 3. `OPENAI_API_KEY` present → OpenAI
/// 4. `ProviderFactory::from_env()` auto-detection
fn resolve_provider(config: &EngineConfig) -> Result<(Arc<dyn LLMProvider>, String), EngineError> {
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_vision_provider("openai", model);
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| EngineError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                 Error: {}",
                e
            ),
        })?;
    Ok((provider, "auto".to_string()))
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<(Arc<dyn LLMProvider>, String), EngineError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        EngineError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok((provider, format!("{provider_name}/{model}")))
}

async fn process_concurrent(
    provider: &Arc<dyn LLMProvider>,
    pages: &[(usize, ImageData)],
    config: &EngineConfig,
) -> Vec<PageResult> {
    stream::iter(pages.iter().map(|(idx, img)| {
        llm::process_page(provider, idx + 1, img.clone(), None, config)
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}

/// One page at a time, each seeing the previous successful page as context.
async fn process_sequential(
    provider: &Arc<dyn LLMProvider>,
    pages: &[(usize, ImageData)],
    config: &EngineConfig,
) -> Vec<PageResult> {
    let mut results = Vec::with_capacity(pages.len());
    let mut prior: Option<String> = None;

    for (idx, img) in pages {
        let result =
            llm::process_page(provider, idx + 1, img.clone(), prior.as_deref(), config).await;
        if result.is_ok() {
            prior = Some(result.markdown.clone());
        }
        results.push(result);
    }
    results
}

/// Join successful pages with the configured separator.
fn assemble_document(pages: &[PageResult], config: &EngineConfig) -> String {
    let mut out = String::new();
    for (i, page) in pages.iter().filter(|p| p.is_ok()).enumerate() {
        if i > 0 {
            out.push_str(&config.page_separator.render(page.page_num));
        }
        out.push_str(page.markdown.trim_end_matches('\n'));
    }
    out.push('\n');
    out
}

fn build_metadata(
    doc: &DocumentMetadata,
    pages: &[PageResult],
    images: &ImageMap,
    model_label: &str,
    start: Instant,
) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("pages".into(), json!(doc.page_count));
    meta.insert(
        "converted_pages".into(),
        json!(pages.iter().filter(|p| p.is_ok()).count()),
    );
    let failed: Vec<usize> = pages
        .iter()
        .filter(|p| !p.is_ok())
        .map(|p| p.page_num)
        .collect();
    meta.insert("failed_pages".into(), json!(failed));
    meta.insert(
        "page_errors".into(),
        Value::Array(
            pages
                .iter()
                .filter_map(|p| p.error.as_ref())
                .map(|e| Value::String(e.to_string()))
                .collect(),
        ),
    );

    let info = [
        ("title", &doc.title),
        ("author", &doc.author),
        ("subject", &doc.subject),
        ("creator", &doc.creator),
        ("producer", &doc.producer),
    ];
    for (key, value) in info {
        if let Some(v) = value {
            meta.insert(key.into(), json!(v));
        }
    }

    meta.insert("pdf_version".into(), json!(doc.pdf_version));
    meta.insert("model".into(), json!(model_label));
    meta.insert(
        "input_tokens".into(),
        json!(pages.iter().map(|p| p.input_tokens as u64).sum::<u64>()),
    );
    meta.insert(
        "output_tokens".into(),
        json!(pages.iter().map(|p| p.output_tokens as u64).sum::<u64>()),
    );
    meta.insert(
        "images".into(),
        json!(images.keys().collect::<Vec<_>>()),
    );
    meta.insert(
        "duration_ms".into(),
        json!(start.elapsed().as_millis() as u64),
    );
    meta
}
