use iced::widget::{button, column, container, image, text, Column};
use iced::{window, Alignment, Element, Length, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;

mod config;
mod error;
mod state;
mod upload;

use config::Config;
use state::data::UploadRequest;
use state::{BlobStore, ViewAdapter};
use upload::Uploader;

/// Extensions offered by the file picker
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Main application state
struct ImageUploader {
    /// Long-lived session opened at startup (None if the database was unavailable)
    store: Option<BlobStore>,
    uploader: Uploader,
    view: ViewAdapter,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked "Select Image"
    SelectImage,
    /// User clicked "Upload Image"
    UploadImage,
    /// Next tick after the "Uploading…" status was drawn
    ProcessUpload(UploadRequest),
    /// Window close button pressed
    CloseRequested(window::Id),
}

impl ImageUploader {
    fn new() -> (Self, Task<Message>) {
        let config = Config::from_current_dir().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "working directory unavailable, using \".\"");
            Config::in_dir(".")
        });

        (Self::with_config(config), Task::none())
    }

    fn with_config(config: Config) -> Self {
        let mut view = ViewAdapter::new();
        let store = upload::bootstrap(&config, &mut view);

        ImageUploader {
            store,
            uploader: Uploader::new(config),
            view,
        }
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SelectImage => {
                let selection = FileDialog::new()
                    .set_title("Select Image")
                    .add_filter("Image files", &IMAGE_EXTENSIONS)
                    .pick_files();

                if let Some(path) = first_selection(selection) {
                    tracing::debug!(path = %path.display(), "image selected");
                    self.view.set_selected(path);
                }

                Task::none()
            }
            Message::UploadImage => match self.uploader.begin(&mut self.view) {
                // Yield once so "Uploading…" is painted before the blocking work
                Some(request) => Task::done(Message::ProcessUpload(request)),
                None => Task::none(),
            },
            Message::ProcessUpload(request) => {
                if self.uploader.upload(&request, &mut self.view).is_some() {
                    if let Some(shown) = self.view.displayed() {
                        tracing::debug!(
                            path = %shown.source.display(),
                            len = shown.bytes.len(),
                            "showing stored image"
                        );
                    }
                }
                Task::none()
            }
            Message::CloseRequested(id) => {
                if let Some(mut store) = self.store.take() {
                    store.close();
                }
                tracing::info!("shutting down");
                window::close(id)
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let upload_press = self
            .view
            .upload_enabled()
            .then_some(Message::UploadImage);

        let mut content: Column<Message> = column![
            button("Select Image")
                .on_press(Message::SelectImage)
                .padding(10),
            button("Upload Image")
                .on_press_maybe(upload_press)
                .padding(10),
            text(self.view.status()).size(16),
        ]
        .spacing(20)
        .padding(20)
        .align_x(Alignment::Center);

        if let Some(shown) = self.view.displayed() {
            content = content.push(
                image(shown.handle.clone())
                    .width(Length::Fill)
                    .height(Length::Fill),
            );
        }

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        window::close_requests().map(Message::CloseRequested)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// The picker can return several files; only the first one is used
fn first_selection(selection: Option<Vec<PathBuf>>) -> Option<PathBuf> {
    selection.and_then(|paths| paths.into_iter().next())
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter("image_uploader=info")
        .with_target(false)
        .init();

    iced::application("Image Uploader", ImageUploader::update, ImageUploader::view)
        .subscription(ImageUploader::subscription)
        .theme(ImageUploader::theme)
        .exit_on_close_request(false)
        .centered()
        .run_with(ImageUploader::new)
}
