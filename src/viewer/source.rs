//! Document source capability consumed by the renderer

use super::request::WorkerFault;
use super::types::{Bitmap, TextContent, Viewport};

/// Opens a document. Runs on the render worker thread, so the source it
/// returns never has to cross threads.
pub trait DocumentOpener: Send + 'static {
    fn open(&self) -> Result<Box<dyn DocumentSource>, WorkerFault>;

    /// Human readable name for logs
    fn describe(&self) -> String;
}

/// A loaded document
pub trait DocumentSource {
    fn page_count(&self) -> Result<usize, WorkerFault>;

    /// Document title, if the file carries one
    fn title(&self) -> Option<String> {
        None
    }

    /// Fetch a page (1-based)
    fn page(&self, number: usize) -> Result<Box<dyn SourcePage + '_>, WorkerFault>;
}

/// A single page of a loaded document
pub trait SourcePage {
    /// Unscaled page width and height
    fn dimensions(&self) -> (f32, f32);

    fn viewport(&self, scale: f32) -> Viewport {
        let (width, height) = self.dimensions();
        Viewport::from_page_size(width, height, scale)
    }

    /// Paint the page at the viewport's scale
    fn render(&self, viewport: &Viewport) -> Result<Bitmap, WorkerFault>;

    fn text_content(&self) -> Result<TextContent, WorkerFault>;
}
