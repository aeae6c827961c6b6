//! The conversion-engine seam.
//!
//! The orchestration layer never looks inside a PDF. It hands a path and a
//! model handle to a [`ConversionEngine`] and persists whatever comes back.
//! [`crate::vlm::VlmEngine`] is the implementation shipped with the crate;
//! tests plug in scripted engines through the same trait.

use crate::error::EngineError;
use image::DynamicImage;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Generated image file name → image content.
pub type ImageMap = BTreeMap<String, DynamicImage>;

/// Free-form conversion metadata, serialised as the `_meta.json` sidecar.
pub type Metadata = Map<String, Value>;

/// Everything an engine produces for one document.
#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    /// Full extracted Markdown text.
    pub markdown: String,
    /// Images to write next to the Markdown, keyed by file name.
    pub images: ImageMap,
    /// Conversion metadata (page count, notes, token usage …).
    pub metadata: Metadata,
}

/// A document-conversion engine with an expensive, reusable model handle.
///
/// `load_models` is meant to run once per batch; the resulting handle is only
/// ever lent out by shared reference, so `convert` must not rely on mutating it.
pub trait ConversionEngine {
    /// Opaque loaded-model handle.
    type Model;

    /// Load the models this engine needs. Expensive.
    fn load_models(&self) -> Result<Self::Model, EngineError>;

    /// Convert one file. Unrecoverable per-file problems are returned as `Err`.
    fn convert(&self, path: &Path, model: &Self::Model) -> Result<ConversionResult, EngineError>;
}
