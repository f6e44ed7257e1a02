//! Core types for page rendering

use std::sync::Arc;

/// Zoom factor used for every rendered page unless configured otherwise
pub const DEFAULT_RENDER_SCALE: f32 = 1.5;

/// Display mode of the page area
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// One page at a time with page-turn controls
    Paged,
    /// Every page stacked in a scrolling column
    #[default]
    Continuous,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Paged => "paged",
            ViewMode::Continuous => "continuous",
        }
    }
}

/// Page geometry at a given zoom scale, in pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Viewport {
    /// Build a viewport from unscaled page dimensions
    #[must_use]
    pub fn from_page_size(page_width: f32, page_height: f32, scale: f32) -> Self {
        Self {
            width: page_width * scale,
            height: page_height * scale,
            scale,
        }
    }

    /// Canvas dimensions in whole pixels (fractional parts are truncated)
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width.max(0.0) as u32, self.height.max(0.0) as u32)
    }
}

/// Raw rendered page image.
///
/// RGB pixel data, 3 bytes per pixel, rows packed without padding.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// A bitmap of the given size filled with a single gray level
    #[must_use]
    pub fn filled(width: u32, height: u32, level: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![level; width as usize * height as usize * 3],
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// One run of text as reported by the document source, in unscaled page
/// coordinates with the origin at the top-left corner
#[derive(Clone, Debug, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// All text runs of one page
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextContent {
    pub items: Vec<TextItem>,
}

/// A selectable, invisible text node positioned over the rendered glyphs
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TextSpan {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub font_size: f32,
}

/// Transparent overlay holding the selectable text of one page
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct TextLayer {
    pub width: f32,
    pub height: f32,
    pub spans: Vec<TextSpan>,
}

impl TextLayer {
    /// Plain text of the layer, one span per line
    #[must_use]
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|span| span.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Everything the renderer produced for a page
#[derive(Clone, Debug)]
pub struct PageData {
    /// Page number (1-based)
    pub page: usize,
    pub viewport: Viewport,
    pub bitmap: Arc<Bitmap>,
    /// Text layer, or why it could not be built
    pub text_layer: Result<TextLayer, String>,
}

/// Identifies a render target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    /// The single reusable surface of paged mode
    Paged,
    /// The surface of one page in continuous mode (1-based)
    Continuous(usize),
}

/// Document metadata available once a source opens
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_pixel_size_truncates() {
        let viewport = Viewport::from_page_size(612.0, 792.5, 1.5);
        assert_eq!(viewport.pixel_size(), (918, 1188));
    }

    #[test]
    fn view_mode_defaults_to_continuous() {
        assert_eq!(ViewMode::default(), ViewMode::Continuous);
    }
}
