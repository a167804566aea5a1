use std::cell::Cell;
use std::fs;
use std::ops::{Deref, DerefMut};

use super::scratch;
use crate::config::Config;
use crate::error::{Result, UploadError};
use crate::state::data::{ImageRow, UploadRequest};
use crate::state::{BlobStore, ViewAdapter};

pub const STATUS_UPLOADING: &str = "Uploading…";
pub const STATUS_SUCCESS: &str = "Upload successful!";

/// Open the long-lived session at startup.
///
/// On failure the status line reports it, the selection is cleared and
/// None is returned; the app keeps running.
pub fn bootstrap(config: &Config, view: &mut ViewAdapter) -> Option<BlobStore> {
    match BlobStore::open(&config.database_path) {
        Ok(store) => {
            let count = store.image_count().unwrap_or(0);
            tracing::info!(
                path = %store.path().display(),
                images = count,
                "database initialized"
            );
            Some(store)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to database");
            view.set_status(format!("Database connection failed: {}", e.status_line()));
            view.clear_selection();
            None
        }
    }
}

/// Runs uploads one at a time, each through its own database session
#[derive(Debug)]
pub struct Uploader {
    config: Config,
    /// Sessions opened by this uploader that haven't been closed yet
    live_sessions: Cell<usize>,
}

impl Uploader {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            live_sessions: Cell::new(0),
        }
    }

    #[cfg(test)]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(test)]
    pub fn live_sessions(&self) -> usize {
        self.live_sessions.get()
    }

    /// First half of the upload trigger: show "Uploading…" and hand back
    /// the request so the body can run on the next tick, after a redraw.
    pub fn begin(&self, view: &mut ViewAdapter) -> Option<UploadRequest> {
        let request = view.selected()?.clone();
        view.set_status(STATUS_UPLOADING);
        Some(request)
    }

    /// Store the selected file, read it back and put it on screen.
    ///
    /// Never fails outward: errors end up in the status line and the log.
    /// Returns the new row id on success.
    pub fn upload(&self, request: &UploadRequest, view: &mut ViewAdapter) -> Option<i64> {
        view.set_status(STATUS_UPLOADING);

        match self.run(request, view) {
            Ok(id) => {
                view.set_status(STATUS_SUCCESS);
                tracing::info!(id, source = %request.source_path.display(), "upload complete");
                Some(id)
            }
            Err(e) => {
                tracing::error!(source = %request.source_path.display(), error = %e, "upload failed");
                view.set_status(format!("Upload failed: {}", e.status_line()));
                None
            }
        }
    }

    fn run(&self, request: &UploadRequest, view: &mut ViewAdapter) -> Result<i64> {
        // Dropped on every return path below, which closes the session
        let mut session = self.open_session()?;

        let bytes = fs::read(&request.source_path).map_err(|source| {
            UploadError::SourceUnreadable {
                path: request.source_path.clone(),
                source,
            }
        })?;

        let id = session.append(&bytes)?;

        // Read back before touching the view: proves the row is durable
        let row = ImageRow {
            id,
            blob: session.fetch(id)?,
        };

        let artifact = scratch::write(&self.config, &row, &request.source_path)?;
        tracing::debug!(id, extension = %artifact.extension, "scratch extension guessed");
        let shown = view.show(&artifact.path);
        scratch::remove(&artifact);
        shown?;

        Ok(id)
    }

    fn open_session(&self) -> Result<Session<'_>> {
        let store = BlobStore::open(&self.config.database_path)?;
        self.live_sessions.set(self.live_sessions.get() + 1);
        Ok(Session {
            store,
            live: &self.live_sessions,
        })
    }
}

/// Per-upload database session, closed when dropped
struct Session<'a> {
    store: BlobStore,
    live: &'a Cell<usize>,
}

impl Deref for Session<'_> {
    type Target = BlobStore;

    fn deref(&self) -> &BlobStore {
        &self.store
    }
}

impl DerefMut for Session<'_> {
    fn deref_mut(&mut self) -> &mut BlobStore {
        &mut self.store
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.store.close();
        self.live.set(self.live.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

    fn setup() -> (TempDir, Uploader, ViewAdapter) {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Uploader::new(Config::in_dir(dir.path()));
        (dir, uploader, ViewAdapter::new())
    }

    fn write_source(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn row_count(uploader: &Uploader) -> i64 {
        BlobStore::open(&uploader.config().database_path)
            .unwrap()
            .image_count()
            .unwrap()
    }

    fn upload_selected(uploader: &Uploader, view: &mut ViewAdapter) -> Option<i64> {
        let request = uploader.begin(view).expect("a file should be selected");
        uploader.upload(&request, view)
    }

    #[test]
    fn test_upload_png_into_empty_database() {
        let (dir, uploader, mut view) = setup();
        let source = write_source(dir.path(), "pixel.png", &PNG_MAGIC);
        view.set_selected(&source);

        let id = upload_selected(&uploader, &mut view).unwrap();

        assert_eq!(id, 1);
        assert_eq!(row_count(&uploader), 1);
        assert_eq!(view.status(), STATUS_SUCCESS);
        assert_eq!(view.displayed().unwrap().bytes, PNG_MAGIC.to_vec());
        assert!(!dir.path().join("temp_image_1.png").exists());
        assert_eq!(uploader.live_sessions(), 0);

        let store = BlobStore::open(&uploader.config().database_path).unwrap();
        assert_eq!(store.fetch(id).unwrap(), PNG_MAGIC.to_vec());
    }

    #[test]
    fn test_same_jpeg_twice() {
        let (dir, uploader, mut view) = setup();
        let bytes: Vec<u8> = (0..10).collect();
        let source = write_source(dir.path(), "photo.jpg", &bytes);
        view.set_selected(&source);

        let first = upload_selected(&uploader, &mut view).unwrap();
        let first_handle = view.displayed().unwrap().handle.id();
        let second = upload_selected(&uploader, &mut view).unwrap();

        assert_eq!((first, second), (1, 2));
        assert_eq!(row_count(&uploader), 2);
        let store = BlobStore::open(&uploader.config().database_path).unwrap();
        assert_eq!(store.fetch(2).unwrap(), bytes);
        assert!(!dir.path().join("temp_image_1.jpeg").exists());
        assert!(!dir.path().join("temp_image_2.jpeg").exists());
        assert_eq!(
            view.displayed().unwrap().source,
            dir.path().join("temp_image_2.jpeg")
        );
        assert_ne!(view.displayed().unwrap().handle.id(), first_handle);
    }

    #[test]
    fn test_source_deleted_before_upload() {
        let (dir, uploader, mut view) = setup();
        let source = write_source(dir.path(), "gone.png", &PNG_MAGIC);
        view.set_selected(&source);
        fs::remove_file(&source).unwrap();

        let result = upload_selected(&uploader, &mut view);

        assert!(result.is_none());
        assert!(view.status().starts_with("Upload failed: unable to read"));
        assert!(!view.status().contains('\n'));
        assert_eq!(row_count(&uploader), 0);
        assert!(view.displayed().is_none());
        assert_eq!(uploader.live_sessions(), 0);
    }

    #[test]
    fn test_failed_append_keeps_previous_image() {
        let (dir, uploader, mut view) = setup();
        let good = write_source(dir.path(), "good.png", &PNG_MAGIC);
        view.set_selected(&good);
        upload_selected(&uploader, &mut view).unwrap();

        let conn = rusqlite::Connection::open(&uploader.config().database_path).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_all BEFORE INSERT ON images
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();
        drop(conn);

        let other = write_source(dir.path(), "other.png", &[1, 2, 3]);
        view.set_selected(&other);
        let result = upload_selected(&uploader, &mut view);

        assert!(result.is_none());
        assert!(view.status().starts_with("Upload failed: unable to store image"));
        assert_eq!(row_count(&uploader), 1);
        assert_eq!(view.displayed().unwrap().bytes, PNG_MAGIC.to_vec());
        assert_eq!(uploader.live_sessions(), 0);
    }

    #[test]
    fn test_svg_uses_full_subtype_as_extension() {
        let (dir, uploader, mut view) = setup();
        let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>";
        let source = write_source(dir.path(), "a.svg", svg);
        view.set_selected(&source);

        let id = upload_selected(&uploader, &mut view).unwrap();

        let scratch = dir.path().join(format!("temp_image_{}.svg+xml", id));
        assert_eq!(view.displayed().unwrap().source, scratch);
        assert!(!scratch.exists());
        assert_eq!(view.status(), STATUS_SUCCESS);
    }

    #[test]
    fn test_zero_byte_source() {
        let (dir, uploader, mut view) = setup();
        let source = write_source(dir.path(), "empty.png", &[]);
        view.set_selected(&source);

        let id = upload_selected(&uploader, &mut view).unwrap();

        let store = BlobStore::open(&uploader.config().database_path).unwrap();
        assert!(store.fetch(id).unwrap().is_empty());
        assert!(view.displayed().unwrap().bytes.is_empty());
        assert_eq!(view.status(), STATUS_SUCCESS);
    }

    #[test]
    fn test_unwritable_scratch_dir_fails_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::in_dir(dir.path());
        config.scratch_dir = dir.path().join("missing");
        let uploader = Uploader::new(config);
        let mut view = ViewAdapter::new();
        let source = write_source(dir.path(), "pixel.png", &PNG_MAGIC);
        view.set_selected(&source);

        let result = upload_selected(&uploader, &mut view);

        assert!(result.is_none());
        assert!(view.status().starts_with("Upload failed: unable to write scratch file"));
        assert!(view.displayed().is_none());
        assert_eq!(uploader.live_sessions(), 0);
    }

    #[test]
    fn test_unavailable_database_fails_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::in_dir(dir.path());
        config.database_path = dir.path().join("missing").join("kivydata.db");
        let uploader = Uploader::new(config);
        let mut view = ViewAdapter::new();
        let source = write_source(dir.path(), "pixel.png", &PNG_MAGIC);
        view.set_selected(&source);

        let result = upload_selected(&uploader, &mut view);

        assert!(result.is_none());
        assert!(view.status().starts_with("Upload failed: unable to open database"));
        assert_eq!(uploader.live_sessions(), 0);
    }

    #[test]
    fn test_begin_without_selection() {
        let (_dir, uploader, mut view) = setup();

        assert!(uploader.begin(&mut view).is_none());
        assert_eq!(view.status(), "");
    }

    #[test]
    fn test_begin_sets_uploading_status() {
        let (_dir, uploader, mut view) = setup();
        view.set_selected("/pics/cat.png");

        let request = uploader.begin(&mut view).unwrap();

        assert_eq!(request.source_path, PathBuf::from("/pics/cat.png"));
        assert_eq!(view.status(), STATUS_UPLOADING);
    }

    #[test]
    fn test_session_guard_tracks_open_sessions() {
        let (_dir, uploader, _view) = setup();

        let session = uploader.open_session().unwrap();
        assert_eq!(uploader.live_sessions(), 1);
        assert!(session.is_open());

        drop(session);
        assert_eq!(uploader.live_sessions(), 0);
    }

    #[test]
    fn test_bootstrap_creates_schema() {
        let (dir, _uploader, mut view) = setup();
        let config = Config::in_dir(dir.path());

        let store = bootstrap(&config, &mut view).unwrap();

        assert_eq!(store.image_count().unwrap(), 0);
        assert_eq!(view.status(), "");
    }

    #[test]
    fn test_bootstrap_failure_reports_and_disables_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::in_dir(dir.path());
        // A missing parent directory stands in for a read-only filesystem:
        // both make SQLite refuse to open the file
        config.database_path = dir.path().join("missing").join("kivydata.db");
        let mut view = ViewAdapter::new();

        let store = bootstrap(&config, &mut view);

        assert!(store.is_none());
        assert!(view.status().starts_with("Database connection failed: "));
        assert!(!view.upload_enabled());
    }
}
