// Export modules for use in tests
pub mod answer_renderer;
pub mod app;
pub mod ask;
pub mod clipboard;
pub mod drag;
pub mod event_source;
pub mod geometry;
pub mod math;
pub mod panic_handler;
pub mod pdf;
pub mod selection;
pub mod settings;
pub mod terminal;
pub mod theme;
pub mod viewport;
pub mod widget;

pub mod test_utils;

// Re-export main app components
pub use app::{AppAction, Viewer, ViewerOptions, run_app_with_event_source};
