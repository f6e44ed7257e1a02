//! In-memory document source for exercising the viewer without MuPDF

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use flume::{Receiver, Sender};

use crate::viewer::{
    Bitmap, DocumentOpener, DocumentSource, SourcePage, TextContent, TextItem, Viewport,
    WorkerFault,
};

/// Unscaled size of every fake page unless overridden
pub const FAKE_PAGE_SIZE: (f32, f32) = (200.0, 300.0);

/// Counts calls made into a fake document
#[derive(Clone, Debug, Default)]
pub struct RenderCounters {
    bitmaps: Arc<AtomicUsize>,
    texts: Arc<AtomicUsize>,
}

impl RenderCounters {
    pub fn bitmaps(&self) -> usize {
        self.bitmaps.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

/// Holds one page render until released.
///
/// The worker signals `entered` when it reaches the gated page, then blocks
/// until `release` is called or the gate is dropped.
#[derive(Clone)]
pub struct PageGate {
    entered_tx: Sender<usize>,
    entered_rx: Receiver<usize>,
    release_tx: Sender<()>,
    release_rx: Receiver<()>,
}

impl PageGate {
    pub fn new() -> Self {
        let (entered_tx, entered_rx) = flume::unbounded();
        let (release_tx, release_rx) = flume::unbounded();
        Self {
            entered_tx,
            entered_rx,
            release_tx,
            release_rx,
        }
    }

    /// Wait until the worker is blocked on the gated page
    pub fn wait_entered(&self, timeout: Duration) -> bool {
        self.entered_rx.recv_timeout(timeout).is_ok()
    }

    pub fn release(&self) {
        let _ = self.release_tx.send(());
    }

    fn hold(&self, page: usize) {
        let _ = self.entered_tx.send(page);
        let _ = self.release_rx.recv();
    }
}

impl Default for PageGate {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct FakeScript {
    page_count: usize,
    title: Option<String>,
    sizes: HashMap<usize, (f32, f32)>,
    bitmap_failures: HashSet<usize>,
    text_failures: HashSet<usize>,
    gates: HashMap<usize, PageGate>,
    open_error: Option<String>,
}

/// Builder for an in-memory document.
///
/// Every page renders as a solid bitmap whose gray level is the page number,
/// with one text run reading `"Page N"`.
#[derive(Clone)]
pub struct FakeDocument {
    script: Arc<FakeScript>,
    counters: RenderCounters,
}

impl FakeDocument {
    pub fn new(page_count: usize) -> Self {
        Self {
            script: Arc::new(FakeScript {
                page_count,
                ..FakeScript::default()
            }),
            counters: RenderCounters::default(),
        }
    }

    fn script_mut(&mut self) -> &mut FakeScript {
        Arc::get_mut(&mut self.script).expect("configure FakeDocument before cloning it")
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.script_mut().title = Some(title.to_string());
        self
    }

    pub fn with_page_size(mut self, page: usize, width: f32, height: f32) -> Self {
        self.script_mut().sizes.insert(page, (width, height));
        self
    }

    /// Make the bitmap stage of `page` fail
    pub fn failing_page(mut self, page: usize) -> Self {
        self.script_mut().bitmap_failures.insert(page);
        self
    }

    /// Make text extraction of `page` fail while the bitmap still renders
    pub fn failing_text(mut self, page: usize) -> Self {
        self.script_mut().text_failures.insert(page);
        self
    }

    /// Block the bitmap stage of `page` on `gate`
    pub fn gated(mut self, page: usize, gate: &PageGate) -> Self {
        self.script_mut().gates.insert(page, gate.clone());
        self
    }

    pub fn failing_open(mut self, message: &str) -> Self {
        self.script_mut().open_error = Some(message.to_string());
        self
    }

    pub fn counters(&self) -> RenderCounters {
        self.counters.clone()
    }

    pub fn page_size(&self, page: usize) -> (f32, f32) {
        self.script.sizes.get(&page).copied().unwrap_or(FAKE_PAGE_SIZE)
    }
}

impl DocumentOpener for FakeDocument {
    fn open(&self) -> Result<Box<dyn DocumentSource>, WorkerFault> {
        if let Some(message) = &self.script.open_error {
            return Err(WorkerFault::generic(message.clone()));
        }
        Ok(Box::new(self.clone()))
    }

    fn describe(&self) -> String {
        format!("fake document ({} pages)", self.script.page_count)
    }
}

impl DocumentSource for FakeDocument {
    fn page_count(&self) -> Result<usize, WorkerFault> {
        Ok(self.script.page_count)
    }

    fn title(&self) -> Option<String> {
        self.script.title.clone()
    }

    fn page(&self, number: usize) -> Result<Box<dyn SourcePage + '_>, WorkerFault> {
        if number == 0 || number > self.script.page_count {
            return Err(WorkerFault::PageOutOfRange {
                page: number,
                page_count: self.script.page_count,
            });
        }
        Ok(Box::new(FakePage {
            doc: self,
            number,
        }))
    }
}

struct FakePage<'a> {
    doc: &'a FakeDocument,
    number: usize,
}

impl SourcePage for FakePage<'_> {
    fn dimensions(&self) -> (f32, f32) {
        self.doc.page_size(self.number)
    }

    fn render(&self, viewport: &Viewport) -> Result<Bitmap, WorkerFault> {
        if let Some(gate) = self.doc.script.gates.get(&self.number) {
            gate.hold(self.number);
        }
        self.doc.counters.bitmaps.fetch_add(1, Ordering::SeqCst);

        if self.doc.script.bitmap_failures.contains(&self.number) {
            return Err(WorkerFault::generic(format!(
                "corrupt content stream on page {}",
                self.number
            )));
        }

        let (width, height) = viewport.pixel_size();
        Ok(Bitmap::filled(width, height, self.number as u8))
    }

    fn text_content(&self) -> Result<TextContent, WorkerFault> {
        self.doc.counters.texts.fetch_add(1, Ordering::SeqCst);

        if self.doc.script.text_failures.contains(&self.number) {
            return Err(WorkerFault::generic("missing font encoding"));
        }

        Ok(TextContent {
            items: vec![
                TextItem {
                    text: format!("Page {}", self.number),
                    x: 10.0,
                    y: 10.0,
                    width: 50.0,
                    height: 12.0,
                },
                TextItem {
                    text: "  ".to_string(),
                    x: 70.0,
                    y: 10.0,
                    width: 5.0,
                    height: 12.0,
                },
            ],
        })
    }
}
