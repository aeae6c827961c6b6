//! Stages of the default VLM engine ([`crate::vlm::VlmEngine`]).
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ postprocess
//! (%PDF)    (pdfium)   (base64)   (VLM)   (cleanup)
//! ```
//!
//! 1. [`input`] : reject files that are missing, unreadable or not PDFs
//!    before pdfium sees them
//! 2. [`render`]: open the document, read its metadata, rasterise pages and
//!    pull out embedded images
//! 3. [`encode`]: PNG-encode and base64-wrap each page for the API request
//! 4. [`llm`]   : VLM call per page with retry, backoff and timeout
//! 5. [`postprocess`]: deterministic cleanup of model output

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
