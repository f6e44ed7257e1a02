//! Text layer layout
//!
//! Turns the text runs of a page into selectable spans positioned over the
//! rendered bitmap. Coordinates are multiplied by the viewport scale so a
//! selection made on the layer lines up with the glyphs underneath.

use super::types::{TextContent, TextLayer, TextSpan, Viewport};

/// Lay out `content` over a page rendered at `viewport`.
///
/// Whitespace-only runs and runs that fall completely outside the page are
/// dropped. The layer always takes the viewport's width and height.
#[must_use]
pub fn render_text_layer(content: &TextContent, viewport: &Viewport) -> TextLayer {
    let scale = viewport.scale;

    let spans = content
        .items
        .iter()
        .filter(|item| !item.text.trim().is_empty())
        .filter_map(|item| {
            let left = item.x * scale;
            let top = item.y * scale;
            let width = item.width.max(0.0) * scale;
            let font_size = item.height.max(0.0) * scale;

            if !left.is_finite() || !top.is_finite() {
                return None;
            }
            if left >= viewport.width || top >= viewport.height {
                return None;
            }
            if left + width <= 0.0 || top + font_size <= 0.0 {
                return None;
            }

            Some(TextSpan {
                text: item.text.clone(),
                left,
                top,
                width,
                font_size,
            })
        })
        .collect();

    TextLayer {
        width: viewport.width,
        height: viewport.height,
        spans,
    }
}
