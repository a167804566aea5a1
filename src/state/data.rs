/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the database layer, the upload coordinator and the view.

use std::path::{Path, PathBuf};

/// One stored image, as read back from the `images` table
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRow {
    /// Unique database ID (AUTOINCREMENT, never reused)
    pub id: i64,
    /// Raw file bytes, stored inline in the `gambar` column
    pub blob: Vec<u8>,
}

/// The file the user picked, waiting for the upload trigger
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub source_path: PathBuf,
}

impl UploadRequest {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }

    /// File name shown in the status line
    pub fn basename(&self) -> String {
        basename(&self.source_path)
    }
}

/// Short-lived copy of a stored row, written so the view has a file to load
#[derive(Debug, Clone, PartialEq)]
pub struct ScratchArtifact {
    pub path: PathBuf,
    /// Guessed from the source file's MIME type ("jpg" when unknown)
    pub extension: String,
}

/// Last path component, or the whole path if it has none
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
