//! Artifact persistence: Markdown, metadata sidecar, images.
//!
//! The Markdown file is the resume marker (see [`crate::paths::already_converted`]),
//! so it is written last, through a temp file in the destination folder that is
//! renamed into place. A crash mid-write therefore never leaves a truncated
//! `.md` that a later run would skip, and an existing `.md` implies its sidecar
//! and images were written before it.

use crate::engine::ConversionResult;
use crate::error::FileError;
use crate::paths::{markdown_path, metadata_path, subfolder_path};
use serde::Serialize;
use std::ffi::OsStr;
use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persist a conversion result under `out_root/<stem>/`.
///
/// Creates the folder (and parents) if needed, then writes `<stem>_meta.json`,
/// every image as PNG and finally `<stem>.md`. Existing files are overwritten.
///
/// # Returns
/// The per-document output folder.
pub fn save_artifacts<S: AsRef<OsStr> + ?Sized>(
    out_root: &Path,
    file_name: &S,
    result: &ConversionResult,
) -> Result<PathBuf, FileError> {
    if let Some(bad) = result.images.keys().find(|n| !is_plain_file_name(n)) {
        return Err(FileError::WriteFailed {
            path: subfolder_path(out_root, file_name).join(bad),
            detail: "image name must be a plain file name".into(),
        });
    }

    let folder = subfolder_path(out_root, file_name);
    std::fs::create_dir_all(&folder).map_err(|e| write_failed(&folder, e))?;

    let meta_path = metadata_path(out_root, file_name);
    let meta = metadata_json(&result.metadata).map_err(|e| write_failed(&meta_path, e))?;
    std::fs::write(&meta_path, meta).map_err(|e| write_failed(&meta_path, e))?;

    for (name, image) in &result.images {
        let image_path = folder.join(name);
        image
            .save_with_format(&image_path, image::ImageFormat::Png)
            .map_err(|e| write_failed(&image_path, e))?;
    }

    // Same mode as the sidecar just created; a bare temp file would be 0600.
    let perms = std::fs::metadata(&meta_path)
        .map_err(|e| write_failed(&meta_path, e))?
        .permissions();
    let md_path = markdown_path(out_root, file_name);
    write_atomic(&folder, &md_path, result.markdown.as_bytes(), perms)?;

    debug!(
        "Wrote {} + {} image(s) to {}",
        md_path.display(),
        result.images.len(),
        folder.display()
    );
    Ok(folder)
}

/// Serialise metadata as JSON indented by four spaces.
///
/// serde_json writes non-ASCII characters literally, never as `\u` escapes.
fn metadata_json(metadata: &crate::engine::Metadata) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    metadata.serialize(&mut ser)?;
    Ok(buf)
}

fn write_atomic(
    folder: &Path,
    path: &Path,
    bytes: &[u8],
    perms: Permissions,
) -> Result<(), FileError> {
    let mut tmp = tempfile::NamedTempFile::new_in(folder).map_err(|e| write_failed(path, e))?;
    tmp.write_all(bytes).map_err(|e| write_failed(path, e))?;
    tmp.as_file()
        .set_permissions(perms)
        .map_err(|e| write_failed(path, e))?;
    tmp.persist(path).map_err(|e| write_failed(path, e.error))?;
    Ok(())
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

fn write_failed(path: &Path, e: impl std::fmt::Display) -> FileError {
    FileError::WriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}
