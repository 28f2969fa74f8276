//! Build artifact handling: existence checks and variant-named copies.

use std::fs;
use std::path::Path;

use crate::error::ArtifactError;

/// Copy the toolchain's fixed-path output to a variant-named destination.
///
/// The source must exist and be non-empty; a build that exited zero but
/// produced nothing is treated as a failure rather than copied through.
/// An existing destination is overwritten. Returns the copied byte count.
pub fn copy_artifact(src: &Path, dst: &Path) -> Result<u64, ArtifactError> {
    let metadata = fs::metadata(src).map_err(|_| ArtifactError::Missing(src.to_path_buf()))?;

    if !metadata.is_file() || metadata.len() == 0 {
        return Err(ArtifactError::Empty(src.to_path_buf()));
    }

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ArtifactError::CopyFailed {
                from: src.to_path_buf(),
                to: dst.to_path_buf(),
                source: e,
            })?;
        }
    }

    let copied = fs::copy(src, dst).map_err(|e| ArtifactError::CopyFailed {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;

    log::info!(
        "Copied {} -> {} ({:.1} KiB)",
        src.display(),
        dst.display(),
        copied as f64 / 1024.0
    );

    Ok(copied)
}
