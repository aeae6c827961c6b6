//! Output path mapping.
//!
//! Every output location is a pure function of `(out_root, file_name)`:
//!
//! ```text
//! out_root/
//!   <stem>/
//!     <stem>.md
//!     <stem>_meta.json
//!     <image>.png …
//! ```
//!
//! The Markdown file doubles as the completion marker: a document whose
//! `<stem>.md` exists is considered converted and is skipped on later runs.

use crate::error::FileError;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Strip the final extension from a file name.
///
/// Only the last `.`-suffix is removed (`report.v2.pdf` → `report.v2`).
/// Names without a dot, and dot-files such as `.hidden`, are returned as-is.
/// Works on raw OS strings, so names that are not valid UTF-8 map like any other.
pub fn file_stem<S: AsRef<OsStr> + ?Sized>(file_name: &S) -> &OsStr {
    let name = file_name.as_ref();
    Path::new(name).file_stem().unwrap_or(name)
}

/// Per-document output folder: `out_root/<stem>`.
pub fn subfolder_path<S: AsRef<OsStr> + ?Sized>(out_root: &Path, file_name: &S) -> PathBuf {
    out_root.join(file_stem(file_name))
}

/// Markdown output: `out_root/<stem>/<stem>.md`.
pub fn markdown_path<S: AsRef<OsStr> + ?Sized>(out_root: &Path, file_name: &S) -> PathBuf {
    subfolder_path(out_root, file_name).join(stem_with(file_name, ".md"))
}

/// Metadata sidecar: `out_root/<stem>/<stem>_meta.json`.
pub fn metadata_path<S: AsRef<OsStr> + ?Sized>(out_root: &Path, file_name: &S) -> PathBuf {
    subfolder_path(out_root, file_name).join(stem_with(file_name, "_meta.json"))
}

/// True iff the Markdown output for `file_name` already exists.
///
/// Says nothing about whether that output is complete or correct.
pub fn already_converted<S: AsRef<OsStr> + ?Sized>(out_root: &Path, file_name: &S) -> bool {
    markdown_path(out_root, file_name).exists()
}

fn stem_with<S: AsRef<OsStr> + ?Sized>(file_name: &S, suffix: &str) -> OsString {
    let mut name = file_stem(file_name).to_os_string();
    name.push(suffix);
    name
}

/// Compute the target directory for a source file.
///
/// The part of `file_path` below `source_prefix` is re-rooted under
/// `target_prefix` and the file name is dropped:
/// `/src/a/sub/doc.pdf` with `/src/a` → `/dst/b` gives `/dst/b/sub`.
///
/// Matching is per path component, so `/src/a` is not a prefix of
/// `/src/ab/doc.pdf`.
pub fn remap_target_dir(
    file_path: &Path,
    source_prefix: &Path,
    target_prefix: &Path,
) -> Result<PathBuf, FileError> {
    let relative = file_path
        .strip_prefix(source_prefix)
        .map_err(|_| FileError::PrefixMismatch {
            path: file_path.to_path_buf(),
            prefix: source_prefix.to_path_buf(),
        })?;

    Ok(match relative.parent() {
        Some(parent) => target_prefix.join(parent),
        None => target_prefix.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stem_strips_only_final_extension() {
        assert_eq!(file_stem("doc.pdf"), "doc");
        assert_eq!(file_stem("report.v2.pdf"), "report.v2");
        assert_eq!(file_stem("README"), "README");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }

    #[cfg(unix)]
    #[test]
    fn stem_of_non_utf8_name() {
        use std::os::unix::ffi::OsStrExt;
        let name = OsStr::from_bytes(b"\xb1\xa8\xb8\xe6.pdf");
        let stem = OsStr::from_bytes(b"\xb1\xa8\xb8\xe6");
        assert_eq!(file_stem(name), stem);

        let mut md = stem.to_os_string();
        md.push(".md");
        assert_eq!(
            markdown_path(Path::new("/out"), name),
            Path::new("/out").join(stem).join(md)
        );
    }

    #[test]
    fn markdown_path_shape() {
        let root = Path::new("/out");
        for (name, stem) in [("doc.pdf", "doc"), ("a.b.c.PDF", "a.b.c"), ("x", "x")] {
            assert_eq!(
                markdown_path(root, name),
                PathBuf::from(format!("/out/{stem}/{stem}.md"))
            );
        }
    }

    #[test]
    fn metadata_path_shape() {
        assert_eq!(
            metadata_path(Path::new("/out"), "doc.pdf"),
            PathBuf::from("/out/doc/doc_meta.json")
        );
    }

    #[test]
    fn already_converted_tracks_markdown_file() {
        let tmp = TempDir::new().unwrap();
        assert!(!already_converted(tmp.path(), "doc.pdf"));

        // The folder alone does not count.
        std::fs::create_dir_all(subfolder_path(tmp.path(), "doc.pdf")).unwrap();
        assert!(!already_converted(tmp.path(), "doc.pdf"));

        std::fs::write(markdown_path(tmp.path(), "doc.pdf"), "").unwrap();
        assert!(already_converted(tmp.path(), "doc.pdf"));
    }

    #[test]
    fn remap_nested_file() {
        let dir = remap_target_dir(
            Path::new("/src/a/sub/doc.pdf"),
            Path::new("/src/a"),
            Path::new("/dst/b"),
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/dst/b/sub"));
    }

    #[test]
    fn remap_file_directly_under_prefix() {
        let dir = remap_target_dir(
            Path::new("/src/a/doc.pdf"),
            Path::new("/src/a"),
            Path::new("/dst/b"),
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/dst/b"));
    }

    #[test]
    fn remap_with_partial_prefix_keeps_lower_levels() {
        let dir = remap_target_dir(
            Path::new("/data/source/a/x/y/doc.pdf"),
            Path::new("/data/source"),
            Path::new("/data/target"),
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/data/target/a/x/y"));
    }

    #[test]
    fn remap_rejects_textual_but_not_structural_prefix() {
        let err = remap_target_dir(
            Path::new("/src/ab/doc.pdf"),
            Path::new("/src/a"),
            Path::new("/dst/b"),
        )
        .unwrap_err();
        assert!(matches!(err, FileError::PrefixMismatch { .. }));
    }

    #[test]
    fn remap_rejects_unrelated_path() {
        assert!(remap_target_dir(
            Path::new("/elsewhere/doc.pdf"),
            Path::new("/src/a"),
            Path::new("/dst/b"),
        )
        .is_err());
    }
}
