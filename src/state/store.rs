use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::error::{Result, UploadError};

/// The BlobStore owns one session on the SQLite image database.
/// Images are stored inline as BLOBs so that moving or renaming the
/// source file never invalidates a row.
pub struct BlobStore {
    /// None once `close()` has run
    conn: Option<Connection>,
    db_path: PathBuf,
}

impl BlobStore {
    /// Open (or create) the database at `path` and make sure the
    /// `images` table exists.
    ///
    /// The connection is opened in serialized mode so it may be used
    /// from any thread of the process.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags).map_err(|source| {
            UploadError::StorageUnavailable {
                path: db_path.clone(),
                source,
            }
        })?;

        tracing::debug!(path = %db_path.display(), "database session opened");

        let store = BlobStore {
            conn: Some(conn),
            db_path,
        };
        store.ensure_schema()?;

        Ok(store)
    }

    /// Create the images table if it doesn't exist. Safe to call repeatedly.
    ///
    /// The column name `gambar` is kept so existing databases keep working.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS images (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                gambar  BLOB
            )",
            [],
        )
        .map_err(UploadError::Schema)?;

        Ok(())
    }

    /// Insert one row holding `bytes` and return its id.
    ///
    /// The insert runs in its own transaction: on any error the
    /// transaction is dropped without commit, which rolls it back.
    pub fn append(&mut self, bytes: &[u8]) -> Result<i64> {
        let conn = self.conn_mut()?;

        let tx = conn.transaction().map_err(UploadError::AppendFailed)?;
        tx.execute("INSERT INTO images (gambar) VALUES (?1)", params![bytes])
            .map_err(UploadError::AppendFailed)?;
        // Read before commit: the id belongs to this transaction's insert
        let id = tx.last_insert_rowid();
        tx.commit().map_err(UploadError::AppendFailed)?;

        tracing::debug!(id, len = bytes.len(), "image row appended");
        Ok(id)
    }

    /// Read back the `gambar` column of row `id`
    pub fn fetch(&self, id: i64) -> Result<Vec<u8>> {
        let conn = self.conn()?;
        let blob: Option<Option<Vec<u8>>> = conn
            .query_row(
                "SELECT gambar FROM images WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|source| UploadError::FetchFailed { id, source })?;

        match blob {
            Some(bytes) => Ok(bytes.unwrap_or_default()),
            None => Err(UploadError::NotFound(id)),
        }
    }

    /// Number of stored images
    pub fn image_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .map_err(UploadError::Query)
    }

    /// Release the connection. Calling it again does nothing.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_conn, e)) = conn.close() {
                // The connection is dropped here, which finalizes it anyway
                tracing::warn!(path = %self.db_path.display(), error = %e, "database close reported an error");
            } else {
                tracing::debug!(path = %self.db_path.display(), "database session closed");
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| UploadError::SessionClosed(self.db_path.clone()))
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        match self.conn.as_mut() {
            Some(conn) => Ok(conn),
            None => Err(UploadError::SessionClosed(self.db_path.clone())),
        }
    }
}

impl Drop for BlobStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("db_path", &self.db_path)
            .field("open", &self.is_open())
            .finish()
    }
}
