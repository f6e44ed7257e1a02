pub mod api;
pub mod chat;
pub mod library;
pub mod notification;
pub mod panic_handler;
pub mod settings;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use viewer::{ViewMode, Viewer, ViewerConfig, ViewerEvent};
