//! Render worker - runs in a dedicated thread
//!
//! A single worker owns the open document and processes requests strictly in
//! arrival order. Sweeps render page after page, each page (bitmap, then text
//! layer) finishing before the next starts.

use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, info, warn};

use super::request::{Generation, LiveGeneration, RenderRequest, RenderResponse, WorkerFault};
use super::source::{DocumentOpener, DocumentSource};
use super::text_layer::render_text_layer;
use super::types::{Bitmap, DocumentInfo, PageData};

/// Main worker function
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker(
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    live: LiveGeneration,
) {
    let mut document: Option<Box<dyn DocumentSource>> = None;

    for request in requests {
        match request {
            RenderRequest::Open { generation, opener } => {
                document = None;

                if !live.is_current(generation) {
                    let _ = responses.send(RenderResponse::Superseded(generation));
                    continue;
                }

                match open_document(opener.as_ref()) {
                    Ok((doc, info)) => {
                        info!(
                            "Opened {} ({} pages)",
                            opener.describe(),
                            info.page_count
                        );
                        document = Some(doc);
                        let _ = responses.send(RenderResponse::Opened { generation, info });
                    }
                    Err(error) => {
                        let _ = responses.send(RenderResponse::OpenFailed { generation, error });
                    }
                }
            }

            RenderRequest::Page {
                generation,
                page,
                scale,
            } => {
                if !live.is_current(generation) {
                    let _ = responses.send(RenderResponse::Superseded(generation));
                    continue;
                }

                let _ = responses.send(RenderResponse::Started { generation, page });
                let response = match render_page(document.as_deref(), page, scale, &live, generation)
                {
                    Ok(Some(data)) => RenderResponse::Page {
                        generation,
                        data,
                        last: true,
                    },
                    Ok(None) => RenderResponse::Superseded(generation),
                    Err(error) => RenderResponse::PageFailed {
                        generation,
                        page,
                        error,
                        last: true,
                    },
                };
                let _ = responses.send(response);
            }

            RenderRequest::Sweep {
                generation,
                page_count,
                scale,
            } => {
                sweep(
                    document.as_deref(),
                    generation,
                    page_count,
                    scale,
                    &live,
                    &responses,
                );
            }

            RenderRequest::Shutdown => break,
        }
    }

    debug!("Render worker stopped");
}

fn open_document(
    opener: &dyn DocumentOpener,
) -> Result<(Box<dyn DocumentSource>, DocumentInfo), WorkerFault> {
    let doc = opener.open()?;
    let page_count = doc.page_count()?;

    if page_count == 0 {
        return Err(WorkerFault::generic(format!(
            "{} has no pages",
            opener.describe()
        )));
    }

    let title = doc.title().filter(|t| !t.is_empty());
    Ok((doc, DocumentInfo { page_count, title }))
}

fn sweep(
    document: Option<&dyn DocumentSource>,
    generation: Generation,
    page_count: usize,
    scale: f32,
    live: &LiveGeneration,
    responses: &Sender<RenderResponse>,
) {
    let mut rendered = 0;
    let mut failed = 0;

    for page in 1..=page_count {
        if !live.is_current(generation) {
            debug!("Sweep {generation:?} superseded before page {page}");
            let _ = responses.send(RenderResponse::Superseded(generation));
            return;
        }

        let _ = responses.send(RenderResponse::Started { generation, page });
        match render_page(document, page, scale, live, generation) {
            Ok(Some(data)) => {
                rendered += 1;
                let _ = responses.send(RenderResponse::Page {
                    generation,
                    data,
                    last: false,
                });
            }
            Ok(None) => {
                debug!("Sweep {generation:?} superseded during page {page}");
                let _ = responses.send(RenderResponse::Superseded(generation));
                return;
            }
            Err(error) => {
                failed += 1;
                let _ = responses.send(RenderResponse::PageFailed {
                    generation,
                    page,
                    error,
                    last: false,
                });
            }
        }
    }

    let _ = responses.send(RenderResponse::SweepDone {
        generation,
        rendered,
        failed,
    });
}

/// Render a single page: bitmap first, then the text layer.
///
/// Returns `Ok(None)` when `generation` was superseded between the two
/// stages. A text-content failure does not fail the page; it is carried in
/// `PageData::text_layer`.
pub fn render_page(
    document: Option<&dyn DocumentSource>,
    page_num: usize,
    scale: f32,
    live: &LiveGeneration,
    generation: Generation,
) -> Result<Option<PageData>, WorkerFault> {
    let doc = document.ok_or(WorkerFault::NoDocument)?;

    let page_count = doc.page_count()?;
    if page_num == 0 || page_num > page_count {
        return Err(WorkerFault::PageOutOfRange {
            page: page_num,
            page_count,
        });
    }

    let page = doc.page(page_num)?;
    let viewport = page.viewport(scale);
    let (width, height) = viewport.pixel_size();
    if width == 0 || height == 0 {
        return Err(WorkerFault::generic(format!(
            "page {page_num} has an empty viewport"
        )));
    }

    let bitmap = conform_bitmap(page.render(&viewport)?, width, height);

    if !live.is_current(generation) {
        return Ok(None);
    }

    let text_layer = page
        .text_content()
        .map(|content| render_text_layer(&content, &viewport))
        .map_err(|e| {
            warn!("Text layer for page {page_num} unavailable: {e}");
            e.to_string()
        });

    Ok(Some(PageData {
        page: page_num,
        viewport,
        bitmap: Arc::new(bitmap),
        text_layer,
    }))
}

/// Crop or pad (white) a bitmap to exactly `width` x `height`
fn conform_bitmap(bitmap: Bitmap, width: u32, height: u32) -> Bitmap {
    if bitmap.width == width && bitmap.height == height {
        return bitmap;
    }

    let mut out = Bitmap::filled(width, height, 0xFF);
    let copy_width = bitmap.width.min(width) as usize;
    let copy_height = bitmap.height.min(height) as usize;
    let src_stride = bitmap.width as usize * 3;
    let dst_stride = width as usize * 3;

    for y in 0..copy_height {
        let src = &bitmap.pixels[y * src_stride..y * src_stride + copy_width * 3];
        out.pixels[y * dst_stride..y * dst_stride + copy_width * 3].copy_from_slice(src);
    }

    out
}
