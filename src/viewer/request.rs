//! Render request and response types

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::source::DocumentOpener;
use super::types::{DocumentInfo, PageData};

/// Token identifying one render pass. A newer generation supersedes
/// every older one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

/// Generation counter shared between the coordinator and the worker
#[derive(Clone, Debug, Default)]
pub struct LiveGeneration(Arc<AtomicU64>);

impl LiveGeneration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding all in-flight work
    pub fn advance(&self) -> Generation {
        Generation(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }

    #[must_use]
    pub fn current(&self) -> Generation {
        Generation(self.0.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current() == generation
    }
}

/// Request sent to the render worker
pub enum RenderRequest {
    /// Open a new document, replacing the current one
    Open {
        generation: Generation,
        opener: Box<dyn DocumentOpener>,
    },

    /// Render a single page
    Page {
        generation: Generation,
        page: usize,
        scale: f32,
    },

    /// Render pages `1..=page_count` in order
    Sweep {
        generation: Generation,
        page_count: usize,
        scale: f32,
    },

    /// Shutdown the worker
    Shutdown,
}

impl std::fmt::Debug for RenderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderRequest::Open { generation, opener } => f
                .debug_struct("Open")
                .field("generation", generation)
                .field("document", &opener.describe())
                .finish(),
            RenderRequest::Page {
                generation,
                page,
                scale,
            } => f
                .debug_struct("Page")
                .field("generation", generation)
                .field("page", page)
                .field("scale", scale)
                .finish(),
            RenderRequest::Sweep {
                generation,
                page_count,
                scale,
            } => f
                .debug_struct("Sweep")
                .field("generation", generation)
                .field("page_count", page_count)
                .field("scale", scale)
                .finish(),
            RenderRequest::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Errors from the render worker
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("no document is open")]
    NoDocument,

    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("page {page} timed out")]
    TimedOut { page: usize },

    #[error("{detail}")]
    Generic { detail: String },
}

impl WorkerFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from the render worker
#[derive(Debug)]
pub enum RenderResponse {
    /// Document opened
    Opened {
        generation: Generation,
        info: DocumentInfo,
    },

    /// Document could not be opened
    OpenFailed {
        generation: Generation,
        error: WorkerFault,
    },

    /// The worker began rendering a page
    Started { generation: Generation, page: usize },

    /// Rendered page data; the text layer may still have failed
    Page {
        generation: Generation,
        data: PageData,
        /// True when this page ends a single-page request
        last: bool,
    },

    /// A page failed to render
    PageFailed {
        generation: Generation,
        page: usize,
        error: WorkerFault,
        last: bool,
    },

    /// Every page of a sweep was attempted
    SweepDone {
        generation: Generation,
        rendered: usize,
        failed: usize,
    },

    /// The request was abandoned because a newer generation started
    Superseded(Generation),
}

impl RenderResponse {
    #[must_use]
    pub fn generation(&self) -> Generation {
        match self {
            RenderResponse::Opened { generation, .. }
            | RenderResponse::OpenFailed { generation, .. }
            | RenderResponse::Started { generation, .. }
            | RenderResponse::Page { generation, .. }
            | RenderResponse::PageFailed { generation, .. }
            | RenderResponse::SweepDone { generation, .. } => *generation,
            RenderResponse::Superseded(generation) => *generation,
        }
    }

    /// True when no further responses follow for the originating request
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            RenderResponse::Opened { .. }
            | RenderResponse::OpenFailed { .. }
            | RenderResponse::SweepDone { .. }
            | RenderResponse::Superseded(_) => true,
            RenderResponse::Page { last, .. } | RenderResponse::PageFailed { last, .. } => *last,
            RenderResponse::Started { .. } => false,
        }
    }
}
