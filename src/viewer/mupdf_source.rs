//! MuPDF-backed document source

use std::path::PathBuf;

use mupdf::text_page::TextBlockType;
use mupdf::{Colorspace, Document, Matrix, Page, Pixmap, TextPageFlags};

use super::request::WorkerFault;
use super::source::{DocumentOpener, DocumentSource, SourcePage};
use super::types::{Bitmap, TextContent, TextItem, Viewport};

/// Opens a PDF file from disk with MuPDF
#[derive(Clone, Debug)]
pub struct MupdfOpener {
    path: PathBuf,
}

impl MupdfOpener {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentOpener for MupdfOpener {
    fn open(&self) -> Result<Box<dyn DocumentSource>, WorkerFault> {
        let doc = Document::open(self.path.to_string_lossy().as_ref())?;
        Ok(Box::new(MupdfDocument { doc }))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

struct MupdfDocument {
    doc: Document,
}

impl DocumentSource for MupdfDocument {
    fn page_count(&self) -> Result<usize, WorkerFault> {
        Ok(self.doc.page_count()?.max(0) as usize)
    }

    fn title(&self) -> Option<String> {
        self.doc.metadata(mupdf::MetadataName::Title).ok()
    }

    fn page(&self, number: usize) -> Result<Box<dyn SourcePage + '_>, WorkerFault> {
        let index = number
            .checked_sub(1)
            .ok_or(WorkerFault::PageOutOfRange {
                page: number,
                page_count: self.page_count()?,
            })?;
        let page = self.doc.load_page(index as i32)?;
        let bounds = page.bounds()?;

        Ok(Box::new(MupdfPage {
            origin: (bounds.x0, bounds.y0),
            size: (bounds.x1 - bounds.x0, bounds.y1 - bounds.y0),
            page,
        }))
    }
}

struct MupdfPage {
    page: Page,
    origin: (f32, f32),
    size: (f32, f32),
}

impl SourcePage for MupdfPage {
    fn dimensions(&self) -> (f32, f32) {
        self.size
    }

    fn render(&self, viewport: &Viewport) -> Result<Bitmap, WorkerFault> {
        let transform = Matrix::new_scale(viewport.scale, viewport.scale);
        let rgb = Colorspace::device_rgb();
        let pixmap = self.page.to_pixmap(&transform, &rgb, false, false)?;
        pixmap_to_bitmap(&pixmap)
    }

    fn text_content(&self) -> Result<TextContent, WorkerFault> {
        let text_page = self.page.to_text_page(TextPageFlags::empty())?;
        let (origin_x, origin_y) = self.origin;
        let mut items = Vec::new();

        for block in text_page.blocks() {
            if block.r#type() != TextBlockType::Text {
                continue;
            }
            for line in block.lines() {
                let text: String = line.chars().filter_map(|ch| ch.char()).collect();
                if text.trim().is_empty() {
                    continue;
                }

                let bbox = line.bounds();
                items.push(TextItem {
                    text,
                    x: bbox.x0.min(bbox.x1) - origin_x,
                    y: bbox.y0.min(bbox.y1) - origin_y,
                    width: (bbox.x1 - bbox.x0).abs(),
                    height: (bbox.y1 - bbox.y0).abs(),
                });
            }
        }

        Ok(TextContent { items })
    }
}

fn pixmap_to_bitmap(pixmap: &Pixmap) -> Result<Bitmap, WorkerFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(WorkerFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(WorkerFault::generic("Pixmap buffer size mismatch"));
    }

    let mut pixels = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row = &samples[y * stride..y * stride + row_bytes];
        if n == 3 {
            pixels.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                pixels.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(Bitmap {
        width: pixmap.width(),
        height: pixmap.height(),
        pixels,
    })
}
