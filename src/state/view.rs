/// View-side state: what the window shows and whether uploading is possible
///
/// The shell reads this struct when it draws; the upload coordinator and
/// the file-picker callback are the only writers.

use iced::widget::image::Handle;
use std::path::{Path, PathBuf};

use super::data::UploadRequest;
use crate::error::{Result, UploadError};

/// Image currently on screen
#[derive(Debug, Clone)]
pub struct DisplayedImage {
    /// File the bytes were loaded from
    pub source: PathBuf,
    pub bytes: Vec<u8>,
    /// Built from `bytes`, so every load gets a fresh handle id
    pub handle: Handle,
}

#[derive(Debug, Default)]
pub struct ViewAdapter {
    selected: Option<UploadRequest>,
    status: String,
    upload_enabled: bool,
    displayed: Option<DisplayedImage>,
}

impl ViewAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the picked file and enable the upload button. No I/O.
    pub fn set_selected(&mut self, path: impl Into<PathBuf>) {
        let request = UploadRequest::new(path);
        self.status = format!("Selected: {}", request.basename());
        self.selected = Some(request);
        self.upload_enabled = true;
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
    }

    /// Load the image at `path` for the next redraw.
    ///
    /// Always re-reads the file: the same path can hold different bytes
    /// from one upload to the next, and a handle keyed on the path would
    /// keep painting the old frame.
    pub fn show(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path).map_err(|source| UploadError::ScratchIo {
            path: path.to_path_buf(),
            source,
        })?;

        self.displayed = Some(DisplayedImage {
            source: path.to_path_buf(),
            handle: Handle::from_bytes(bytes.clone()),
            bytes,
        });
        Ok(())
    }

    /// Forget the selection and disable uploading
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.upload_enabled = false;
    }

    pub fn selected(&self) -> Option<&UploadRequest> {
        self.selected.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn upload_enabled(&self) -> bool {
        self.upload_enabled
    }

    pub fn displayed(&self) -> Option<&DisplayedImage> {
        self.displayed.as_ref()
    }
}
