//! pdfium access: open documents, read metadata, rasterise pages, pull images.
//!
//! Everything here is synchronous and borrows the [`Pdfium`] instance held by
//! the loaded model handle, so the library is bound once per batch rather
//! than once per document.
//!
//! Page width follows the configured DPI (`page width in inches × dpi`) but is
//! capped at `max_rendered_pixels` on both edges, which keeps poster-sized
//! pages from exhausting memory.

use crate::config::EngineConfig;
use crate::engine::ImageMap;
use crate::error::{EngineError, PageError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Document-level information read from the PDF info dictionary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Open a PDF, classifying password failures.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, EngineError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                EngineError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                EngineError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            EngineError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Read title/author/… and the page count.
pub fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

/// Rasterise the first `page_count` pages.
///
/// A page that fails to render yields `Err(PageError)` in its slot; the other
/// pages are unaffected.
///
/// # Returns
/// `(page_index_0based, result)` for every requested page, in page order.
pub fn render_pages(
    document: &PdfDocument<'_>,
    config: &EngineConfig,
    page_count: usize,
) -> Vec<(usize, Result<DynamicImage, PageError>)> {
    let pages = document.pages();
    let max_px = config.max_rendered_pixels as f32;

    (0..page_count)
        .map(|idx| {
            let result = page_index(idx)
                .and_then(|i| pages.get(i).map_err(|e| render_failed(idx, e)))
                .and_then(|page| {
                    let width_px = (page.width().to_inches() * config.dpi as f32).min(max_px);
                    let render_config = PdfRenderConfig::new()
                        .set_target_width(width_px.max(1.0) as i32)
                        .set_maximum_height(max_px as i32);
                    let bitmap = page
                        .render_with_config(&render_config)
                        .map_err(|e| render_failed(idx, e))?;
                    Ok(bitmap.as_image())
                });

            if let Ok(ref image) = result {
                debug!(
                    "Rendered page {} → {}x{} px",
                    idx + 1,
                    image.width(),
                    image.height()
                );
            }
            (idx, result)
        })
        .collect()
}

/// pdfium addresses pages with `u16`; anything past that cannot be rendered.
fn page_index(idx: usize) -> Result<u16, PageError> {
    u16::try_from(idx).map_err(|_| PageError::RenderFailed {
        page: idx + 1,
        detail: format!("page index {idx} exceeds the pdfium page range"),
    })
}

/// Extract embedded raster images from the first `page_count` pages.
///
/// Images are named `page_<n>_image_<k>.png` (both 1-based). Images pdfium
/// cannot decode are logged and left out.
pub fn extract_images(document: &PdfDocument<'_>, page_count: usize) -> ImageMap {
    let mut images = ImageMap::new();

    for (idx, page) in document.pages().iter().take(page_count).enumerate() {
        let mut k = 0usize;
        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };
            k += 1;
            match image_object.get_raw_image() {
                Ok(image) => {
                    images.insert(format!("page_{}_image_{}.png", idx + 1, k), image);
                }
                Err(e) => warn!("Page {}: could not decode image {}: {:?}", idx + 1, k, e),
            }
        }
    }

    if !images.is_empty() {
        info!("Extracted {} embedded images", images.len());
    }
    images
}

fn render_failed(idx: usize, e: PdfiumError) -> PageError {
    PageError::RenderFailed {
        page: idx + 1,
        detail: format!("{:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_index_within_range() {
        assert_eq!(page_index(0).unwrap(), 0);
        assert_eq!(page_index(65_535).unwrap(), u16::MAX);
    }

    #[test]
    fn page_index_past_u16_is_render_failure() {
        match page_index(70_000) {
            Err(PageError::RenderFailed { page, .. }) => assert_eq!(page, 70_001),
            other => panic!("expected RenderFailed, got {other:?}"),
        }
    }
}
