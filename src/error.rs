use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop an upload or the startup database check
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unable to open database {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("unable to create images table: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("unable to read {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to store image: {0}")]
    AppendFailed(#[source] rusqlite::Error),

    #[error("image {0} not found")]
    NotFound(i64),

    /// Lookup failed for a reason other than a missing row
    #[error("unable to read image {id}: {source}")]
    FetchFailed {
        id: i64,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("database session for {} is closed", .0.display())]
    SessionClosed(PathBuf),

    #[error("unable to write scratch file {}: {source}", path.display())]
    ScratchIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, UploadError>;

impl UploadError {
    /// Message detail collapsed onto one line for the status label
    pub fn status_line(&self) -> String {
        self.to_string()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
