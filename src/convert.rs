//! Single-document conversion: skip if done, else convert and persist.
//!
//! This layer does no error handling of its own. Every failure, from the
//! engine or from the writer, is returned to the caller; isolating failures
//! per file is the job of [`crate::walker`].

use crate::engine::ConversionEngine;
use crate::error::FileError;
use crate::paths::{already_converted, markdown_path};
use crate::writer::save_artifacts;
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// What happened to a document that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConvertOutcome {
    /// Markdown already existed; the engine was not called.
    Skipped { markdown_path: PathBuf },
    /// The engine ran and all artifacts were written.
    Converted { output_dir: PathBuf, elapsed: Duration },
}

/// Convert `file_path` into `out_root/<stem>/`.
///
/// # Errors
/// Returns `Err(FileError)` if the path has no file name, the engine fails,
/// or an artifact cannot be written.
pub fn convert_document<E: ConversionEngine>(
    engine: &E,
    model: &E::Model,
    file_path: &Path,
    out_root: &Path,
) -> Result<ConvertOutcome, FileError> {
    let start = Instant::now();
    let file_name = file_name_of(file_path)?;

    if already_converted(out_root, file_name) {
        info!(
            "Markdown file already exists for {}",
            Path::new(file_name).display()
        );
        return Ok(ConvertOutcome::Skipped {
            markdown_path: markdown_path(out_root, file_name),
        });
    }

    let result = engine.convert(file_path, model)?;
    let output_dir = save_artifacts(out_root, file_name, &result)?;

    let elapsed = start.elapsed();
    info!(
        "Saved markdown to the {} folder ({:.1}s)",
        output_dir.display(),
        elapsed.as_secs_f64()
    );
    Ok(ConvertOutcome::Converted {
        output_dir,
        elapsed,
    })
}

fn file_name_of(path: &Path) -> Result<&OsStr, FileError> {
    path.file_name().ok_or_else(|| FileError::NoFileName {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ConversionResult;
    use crate::error::EngineError;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct CountingEngine {
        calls: Cell<usize>,
        fail: bool,
    }

    impl ConversionEngine for CountingEngine {
        type Model = ();

        fn load_models(&self) -> Result<(), EngineError> {
            Ok(())
        }

        fn convert(&self, _path: &Path, _model: &()) -> Result<ConversionResult, EngineError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(EngineError::Internal("engine exploded".into()));
            }
            Ok(ConversionResult {
                markdown: "converted\n".into(),
                ..Default::default()
            })
        }
    }

    #[test]
    fn second_run_skips_without_calling_engine() {
        let tmp = TempDir::new().unwrap();
        let engine = CountingEngine {
            calls: Cell::new(0),
            fail: false,
        };
        let src = Path::new("/src/a/doc.pdf");

        let first = convert_document(&engine, &(), src, tmp.path()).unwrap();
        assert!(matches!(first, ConvertOutcome::Converted { .. }));

        let second = convert_document(&engine, &(), src, tmp.path()).unwrap();
        assert_eq!(
            second,
            ConvertOutcome::Skipped {
                markdown_path: tmp.path().join("doc/doc.md")
            }
        );
        assert_eq!(engine.calls.get(), 1);
    }

    #[test]
    fn engine_error_propagates_and_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let engine = CountingEngine {
            calls: Cell::new(0),
            fail: true,
        };
        let err = convert_document(&engine, &(), Path::new("/src/a/doc.pdf"), tmp.path())
            .unwrap_err();
        assert!(err.to_string().contains("engine exploded"));
        assert!(!tmp.path().join("doc").exists());
    }

    #[test]
    fn path_without_file_name_is_rejected_before_engine() {
        let tmp = TempDir::new().unwrap();
        let engine = CountingEngine {
            calls: Cell::new(0),
            fail: false,
        };
        let err = convert_document(&engine, &(), Path::new("/src/a/.."), tmp.path()).unwrap_err();
        assert!(matches!(err, FileError::NoFileName { .. }), "got: {err:?}");
        assert_eq!(engine.calls.get(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn converts_file_with_non_utf8_name() {
        use std::os::unix::ffi::OsStrExt;
        let tmp = TempDir::new().unwrap();
        let engine = CountingEngine {
            calls: Cell::new(0),
            fail: false,
        };
        let name = OsStr::from_bytes(b"\xb1\xa8\xb8\xe6.pdf");
        let stem = OsStr::from_bytes(b"\xb1\xa8\xb8\xe6");
        let src = Path::new("/src/a").join(name);

        let outcome = convert_document(&engine, &(), &src, tmp.path()).unwrap();
        assert!(matches!(outcome, ConvertOutcome::Converted { .. }));

        let mut md_name = stem.to_os_string();
        md_name.push(".md");
        assert!(tmp.path().join(stem).join(md_name).is_file());
    }
}
