//! Scroll tracking for continuous mode
//!
//! Page containers report how much of their area is visible inside the
//! scrolling region. A container counts once more than half of it is visible;
//! the tracker only moves the page indicator and never asks for a render.

/// Fraction of a container that must be visible before it becomes current
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// Visibility report for one page container
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityEntry {
    /// Page number (1-based)
    pub page: usize,
    /// Visible fraction of the container's area, `0.0..=1.0`
    pub ratio: f32,
}

impl VisibilityEntry {
    #[must_use]
    pub fn is_intersecting(&self) -> bool {
        self.ratio > 0.0
    }
}

/// Watches continuous-mode containers once the render sweep finished
#[derive(Clone, Debug, Default)]
pub struct ScrollTracker {
    armed: bool,
}

impl ScrollTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start observing (called after a sweep completes)
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Stop observing (mode switch, reload)
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Page that should become current for this observation batch.
    ///
    /// Entries are visited in order and every qualifying one overwrites the
    /// previous pick, so the last qualifying entry wins.
    #[must_use]
    pub fn observe(&self, entries: &[VisibilityEntry]) -> Option<usize> {
        if !self.armed {
            return None;
        }

        entries
            .iter()
            .filter(|entry| entry.is_intersecting() && entry.ratio > VISIBILITY_THRESHOLD)
            .last()
            .map(|entry| entry.page)
    }
}

/// Vertical layout of the continuous-mode column
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnLayout {
    /// Container height of each page in pixels, page 1 first
    pub page_heights: Vec<f32>,
    /// Gap between consecutive containers
    pub gap: f32,
}

impl ColumnLayout {
    /// Offset of the top edge of `page` (1-based)
    #[must_use]
    pub fn page_top(&self, page: usize) -> f32 {
        self.page_heights
            .iter()
            .take(page.saturating_sub(1))
            .map(|h| h + self.gap)
            .sum()
    }
}

/// Scroll offset that puts `page` at the top of the scrolling region
#[must_use]
pub fn scroll_offset_for_page(layout: &ColumnLayout, page: usize) -> f32 {
    let page = page.clamp(1, layout.page_heights.len().max(1));
    layout.page_top(page)
}

/// Visibility of every container intersecting the region
/// `[scroll_offset, scroll_offset + viewport_height)`, in page order
#[must_use]
pub fn visibility_from_scroll(
    layout: &ColumnLayout,
    scroll_offset: f32,
    viewport_height: f32,
) -> Vec<VisibilityEntry> {
    let view_top = scroll_offset.max(0.0);
    let view_bottom = view_top + viewport_height.max(0.0);
    let mut cursor = 0.0;
    let mut entries = Vec::new();

    for (index, &height) in layout.page_heights.iter().enumerate() {
        let top = cursor;
        let bottom = cursor + height;
        cursor = bottom + layout.gap;

        if height <= 0.0 {
            continue;
        }

        let visible = (bottom.min(view_bottom) - top.max(view_top)).max(0.0);
        if visible > 0.0 {
            entries.push(VisibilityEntry {
                page: index + 1,
                ratio: (visible / height).min(1.0),
            });
        }

        if top >= view_bottom {
            break;
        }
    }

    entries
}
