/// Where the app keeps its files
///
/// Everything lives in the working directory: the database file and the
/// short-lived scratch images written after each upload.

use std::io;
use std::path::{Path, PathBuf};

/// Database file name, kept for compatibility with existing databases
pub const DATABASE_FILE: &str = "kivydata.db";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Target of all database reads and writes
    pub database_path: PathBuf,
    /// Directory that receives `temp_image_<id>.<ext>` files
    pub scratch_dir: PathBuf,
}

impl Config {
    /// Layout rooted at the process working directory
    pub fn from_current_dir() -> io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::in_dir(cwd))
    }

    /// Same layout rooted at an arbitrary directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            database_path: dir.join(DATABASE_FILE),
            scratch_dir: dir.to_path_buf(),
        }
    }

    /// Scratch path for a freshly stored row
    pub fn scratch_path(&self, id: i64, extension: &str) -> PathBuf {
        self.scratch_dir.join(format!("temp_image_{}.{}", id, extension))
    }
}
