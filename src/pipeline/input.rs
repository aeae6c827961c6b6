//! Source-file validation.
//!
//! Batches routinely contain stray files (`.DS_Store`, scans saved as `.jpg`,
//! half-copied downloads). Checking the `%PDF` magic bytes up front turns each
//! of those into a clear per-file error instead of an opaque pdfium failure.

use crate::error::EngineError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Validate that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_pdf_file(path: &Path) -> Result<(), EngineError> {
    if !path.is_file() {
        return Err(EngineError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(EngineError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(EngineError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == b"%PDF" => {
            debug!("Validated PDF: {}", path.display());
            Ok(())
        }
        Ok(()) => Err(EngineError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        }),
        // Shorter than four bytes: cannot be a PDF.
        Err(_) => Err(EngineError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn accepts_pdf_magic() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("ok.pdf");
        std::fs::write(&p, b"%PDF-1.7\n...").unwrap();
        assert!(validate_pdf_file(&p).is_ok());
    }

    #[test]
    fn rejects_non_pdf() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join(".DS_Store");
        std::fs::write(&p, b"\0\0\0\x01Bud1").unwrap();
        let err = validate_pdf_file(&p).unwrap_err();
        assert!(matches!(err, EngineError::NotAPdf { .. }), "got: {err}");
    }

    #[test]
    fn rejects_tiny_file() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("stub.pdf");
        std::fs::write(&p, b"%P").unwrap();
        assert!(matches!(
            validate_pdf_file(&p),
            Err(EngineError::NotAPdf { .. })
        ));
    }

    #[test]
    fn rejects_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            validate_pdf_file(&tmp.path().join("gone.pdf")),
            Err(EngineError::FileNotFound { .. })
        ));
    }
}
