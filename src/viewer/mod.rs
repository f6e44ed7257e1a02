//! Page rendering and view-mode coordination

#[cfg(feature = "pdf")]
mod mupdf_source;
mod request;
mod scroll;
mod service;
mod source;
mod state;
mod surface;
mod text_layer;
mod types;
mod worker;

#[cfg(feature = "pdf")]
pub use mupdf_source::MupdfOpener;
pub use request::{Generation, LiveGeneration, RenderRequest, RenderResponse, WorkerFault};
pub use scroll::{
    ColumnLayout, ScrollTracker, VISIBILITY_THRESHOLD, VisibilityEntry, scroll_offset_for_page,
    visibility_from_scroll,
};
pub use service::{DEFAULT_PAGE_TIMEOUT, Viewer, ViewerConfig, ViewerEvent};
pub use source::{DocumentOpener, DocumentSource, SourcePage};
pub use state::{Command, Effect, Phase, ViewState};
pub use surface::{Canvas, PageSurface, SurfaceStatus, Surfaces};
pub use text_layer::render_text_layer;
pub use types::*;
pub use worker::render_page;
