//! Page encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! PNG keeps rendered text crisp; JPEG artefacts around glyphs measurably hurt
//! VLM transcription. `detail: "high"` asks OpenAI-style models for the full
//! tile budget so small print survives.

use crate::error::PageError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page (1-indexed `page_num`) for the VLM API.
pub fn encode_page(page_num: usize, img: &DynamicImage) -> Result<ImageData, PageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PageError::RenderFailed {
            page: page_num,
            detail: format!("PNG encoding failed: {e}"),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!("Page {}: {} bytes base64", page_num, b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255])));
        let data = encode_page(1, &img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
