/// State management module
///
/// This module handles all application state, including:
/// - The SQLite image database (store.rs)
/// - Shared data structures (data.rs)
/// - What the window currently shows (view.rs)

pub mod data;
pub mod store;
pub mod view;

pub use store::BlobStore;
pub use view::ViewAdapter;
