/// Upload module
///
/// - coordinator.rs - runs one upload end to end, plus the startup bootstrap
/// - scratch.rs - temporary files handed to the view

pub mod coordinator;
pub mod scratch;

pub use coordinator::{bootstrap, Uploader};
