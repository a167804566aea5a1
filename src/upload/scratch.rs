/// Scratch files: a stored row written back to disk so the view has a path
/// to load, removed again right after.

use mime_guess::MimeGuess;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, UploadError};
use crate::state::data::{ImageRow, ScratchArtifact};

/// Used when the source path gives no MIME hint
const DEFAULT_EXTENSION: &str = "jpg";

/// Extension for the scratch file: the MIME subtype guessed from the
/// source path, verbatim (`image/svg+xml` gives `svg+xml`).
pub fn guess_extension(source: &Path) -> String {
    MimeGuess::from_path(source)
        .first()
        .and_then(|mime| {
            let essence = mime.essence_str();
            essence.rsplit('/').next().map(str::to_string)
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Write the row's bytes to `temp_image_<id>.<ext>` in the scratch directory
pub fn write(config: &Config, row: &ImageRow, source: &Path) -> Result<ScratchArtifact> {
    let extension = guess_extension(source);
    let path = config.scratch_path(row.id, &extension);

    let artifact = ScratchArtifact { path, extension };

    if let Err(source) = fs::write(&artifact.path, &row.blob) {
        // The file may exist with partial contents
        remove(&artifact);
        return Err(UploadError::ScratchIo {
            path: artifact.path,
            source,
        });
    }

    tracing::debug!(path = %artifact.path.display(), len = row.blob.len(), "scratch file written");
    Ok(artifact)
}

/// Best-effort delete. Failures are logged and otherwise ignored.
///
/// Returns true if the file is gone afterwards.
pub fn remove(artifact: &ScratchArtifact) -> bool {
    if !artifact.path.exists() {
        return true;
    }

    match fs::remove_file(&artifact.path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                path = %artifact.path.display(),
                error = %e,
                "failed to remove scratch file"
            );
            false
        }
    }
}
