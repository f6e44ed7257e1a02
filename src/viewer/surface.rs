//! Render targets for both view modes

use std::sync::Arc;

use super::types::{Bitmap, SurfaceId, TextLayer, ViewMode};

/// Outcome of the last render into a surface
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// Never rendered
    #[default]
    Blank,
    /// Bitmap and text layer are in place
    Rendered,
    /// Bitmap painted, text layer missing
    Partial(String),
    /// Nothing usable was produced
    Failed(String),
}

/// Bitmap canvas sized to a page viewport
#[derive(Clone, Debug, Default)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub bitmap: Option<Arc<Bitmap>>,
}

/// A (bitmap canvas, text layer) pair for one page
#[derive(Clone, Debug)]
pub struct PageSurface {
    pub id: SurfaceId,
    /// Page currently shown (1-based, 0 until first paint)
    pub page: usize,
    pub canvas: Canvas,
    pub text_layer: TextLayer,
    pub status: SurfaceStatus,
}

impl PageSurface {
    #[must_use]
    pub fn new(id: SurfaceId) -> Self {
        let page = match id {
            SurfaceId::Paged => 0,
            SurfaceId::Continuous(page) => page,
        };
        Self {
            id,
            page,
            canvas: Canvas::default(),
            text_layer: TextLayer::default(),
            status: SurfaceStatus::Blank,
        }
    }

    /// Resize the canvas to the bitmap and replace its contents
    pub fn paint(&mut self, page: usize, bitmap: Arc<Bitmap>) {
        self.page = page;
        self.canvas.width = bitmap.width;
        self.canvas.height = bitmap.height;
        self.canvas.bitmap = Some(bitmap);
    }

    /// Discard any previous spans, then install the new layer
    pub fn set_text_layer(&mut self, layer: TextLayer) {
        self.text_layer.spans.clear();
        self.text_layer = layer;
        self.status = SurfaceStatus::Rendered;
    }

    /// Bitmap is kept, stale text is removed
    pub fn mark_partial(&mut self, reason: impl Into<String>) {
        self.text_layer.spans.clear();
        self.status = SurfaceStatus::Partial(reason.into());
    }

    /// Nothing of `page` could be shown: canvas and text layer are emptied
    pub fn mark_failed(&mut self, page: usize, reason: impl Into<String>) {
        self.page = page;
        self.canvas = Canvas::default();
        self.text_layer.spans.clear();
        self.status = SurfaceStatus::Failed(reason.into());
    }

    #[must_use]
    pub fn is_painted(&self) -> bool {
        self.canvas.bitmap.is_some() && self.canvas.width > 0 && self.canvas.height > 0
    }
}

/// Containers for both modes. Only one is visible at a time; the hidden one
/// keeps its surfaces.
#[derive(Debug)]
pub struct Surfaces {
    visible: ViewMode,
    paged: PageSurface,
    continuous: Vec<PageSurface>,
}

impl Surfaces {
    #[must_use]
    pub fn new(visible: ViewMode) -> Self {
        Self {
            visible,
            paged: PageSurface::new(SurfaceId::Paged),
            continuous: Vec::new(),
        }
    }

    /// Show the container of `mode` and hide the other
    pub fn show(&mut self, mode: ViewMode) {
        self.visible = mode;
    }

    #[must_use]
    pub fn is_container_visible(&self, mode: ViewMode) -> bool {
        self.visible == mode
    }

    /// Replace all continuous surfaces with `page_count` blank ones
    pub fn recreate_continuous(&mut self, page_count: usize) {
        self.continuous = (1..=page_count)
            .map(|page| PageSurface::new(SurfaceId::Continuous(page)))
            .collect();
    }

    /// Drop everything rendered for the previous document
    pub fn reset(&mut self) {
        self.paged = PageSurface::new(SurfaceId::Paged);
        self.continuous.clear();
    }

    #[must_use]
    pub fn paged(&self) -> &PageSurface {
        &self.paged
    }

    #[must_use]
    pub fn continuous(&self) -> &[PageSurface] {
        &self.continuous
    }

    #[must_use]
    pub fn get(&self, id: SurfaceId) -> Option<&PageSurface> {
        match id {
            SurfaceId::Paged => Some(&self.paged),
            SurfaceId::Continuous(page) => page
                .checked_sub(1)
                .and_then(|index| self.continuous.get(index)),
        }
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut PageSurface> {
        match id {
            SurfaceId::Paged => Some(&mut self.paged),
            SurfaceId::Continuous(page) => page
                .checked_sub(1)
                .and_then(|index| self.continuous.get_mut(index)),
        }
    }

    /// Surfaces of the visible container
    #[must_use]
    pub fn visible_surfaces(&self) -> Vec<&PageSurface> {
        match self.visible {
            ViewMode::Paged => vec![&self.paged],
            ViewMode::Continuous => self.continuous.iter().collect(),
        }
    }
}
