//! Viewer service - owns the view state, surfaces and the render worker

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use super::request::{Generation, LiveGeneration, RenderRequest, RenderResponse, WorkerFault};
use super::scroll::{ColumnLayout, ScrollTracker, VisibilityEntry, visibility_from_scroll};
use super::source::DocumentOpener;
use super::state::{Command, Effect, ViewState};
use super::surface::Surfaces;
use super::types::{DEFAULT_RENDER_SCALE, DocumentInfo, PageData, SurfaceId, ViewMode};
use super::worker::render_worker;
use crate::notification::NotificationManager;
use crate::settings;

/// Default time a single page may take before it is reported as stalled
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Viewer construction parameters
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub mode: ViewMode,
    pub scale: f32,
    pub page_timeout: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            mode: ViewMode::default(),
            scale: DEFAULT_RENDER_SCALE,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
        }
    }
}

impl ViewerConfig {
    /// Build from the global settings
    #[must_use]
    pub fn from_settings() -> Self {
        Self {
            mode: settings::get_view_mode(),
            scale: settings::get_render_scale(),
            page_timeout: settings::get_page_timeout(),
        }
    }
}

/// Things the embedding UI may want to react to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerEvent {
    DocumentLoaded {
        page_count: usize,
        title: Option<String>,
    },
    DocumentFailed {
        message: String,
    },
    PageRendered {
        surface: SurfaceId,
        page: usize,
        /// False when the bitmap painted but the text layer failed
        text_layer: bool,
    },
    PageFailed {
        surface: SurfaceId,
        page: usize,
        message: String,
    },
    PageStalled {
        surface: SurfaceId,
        page: usize,
    },
    SweepFinished {
        rendered: usize,
        failed: usize,
    },
    CurrentPageChanged {
        page: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassKind {
    Single,
    Sweep,
}

#[derive(Clone, Copy, Debug)]
struct RenderPass {
    generation: Generation,
    kind: PassKind,
}

impl RenderPass {
    fn target(&self, page: usize) -> SurfaceId {
        match self.kind {
            PassKind::Single => SurfaceId::Paged,
            PassKind::Sweep => SurfaceId::Continuous(page),
        }
    }
}

#[derive(Debug)]
struct InFlightPage {
    generation: Generation,
    page: usize,
    since: Instant,
    reported: bool,
}

/// Coordinates view mode, navigation, scrolling and rendering for one
/// document at a time. Several viewers can coexist; each runs its own
/// worker thread.
pub struct Viewer {
    state: ViewState,
    surfaces: Surfaces,
    tracker: ScrollTracker,
    live: LiveGeneration,
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    pass: Option<RenderPass>,
    loading: Option<Generation>,
    outstanding: usize,
    in_flight: Option<InFlightPage>,
    page_timeout: Duration,
    indicator: String,
    reported_page: usize,
    doc_info: Option<DocumentInfo>,
    notifications: NotificationManager,
    events: Vec<ViewerEvent>,
    worker: Option<JoinHandle<()>>,
}

impl Viewer {
    /// Create a viewer with settings taken from the global configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ViewerConfig::from_settings())
    }

    #[must_use]
    pub fn with_config(config: ViewerConfig) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();
        let live = LiveGeneration::new();

        let worker_live = live.clone();
        let worker = std::thread::Builder::new()
            .name("render-worker".to_string())
            .spawn(move || render_worker(request_rx, response_tx, worker_live))
            .map_err(|e| error!("Failed to spawn render worker: {e}"))
            .ok();

        let state = ViewState::new(config.mode, config.scale);
        let indicator = state.indicator();

        Self {
            surfaces: Surfaces::new(state.mode),
            state,
            tracker: ScrollTracker::new(),
            live,
            request_tx,
            response_rx,
            pass: None,
            loading: None,
            outstanding: 0,
            in_flight: None,
            page_timeout: config.page_timeout,
            indicator,
            reported_page: 0,
            doc_info: None,
            notifications: NotificationManager::new(),
            events: Vec::new(),
            worker,
        }
    }

    /// Start opening a document. Any render still running for the previous
    /// document is superseded; the result arrives through `poll`.
    pub fn load_document(&mut self, opener: impl DocumentOpener) {
        info!("Loading document {}", opener.describe());
        self.apply_command(Command::BeginLoad);

        let generation = self.live.current();
        self.loading = Some(generation);
        self.send(RenderRequest::Open {
            generation,
            opener: Box::new(opener),
        });
    }

    /// Switch between paged and continuous mode
    pub fn set_mode(&mut self, mode: ViewMode) {
        self.apply_command(Command::SetMode(mode));
    }

    pub fn next_page(&mut self) {
        self.apply_command(Command::NextPage);
    }

    pub fn previous_page(&mut self) {
        self.apply_command(Command::PreviousPage);
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.apply_command(Command::GoToPage(page));
    }

    /// Feed one batch of container visibility reports
    pub fn observe_visibility(&mut self, entries: &[VisibilityEntry]) {
        if self.state.mode != ViewMode::Continuous {
            return;
        }
        if let Some(page) = self.tracker.observe(entries) {
            self.apply_command(Command::ScrolledTo(page));
        }
    }

    /// Derive visibility from a scroll position and feed it to the tracker
    pub fn observe_scroll(&mut self, layout: &ColumnLayout, scroll_offset: f32, height: f32) {
        let entries = visibility_from_scroll(layout, scroll_offset, height);
        self.observe_visibility(&entries);
    }

    /// Apply a command to the view state
    pub fn apply_command(&mut self, cmd: Command) {
        let effects = self.state.apply(cmd);
        self.execute_effects(effects);
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CancelRenders => {
                    let generation = self.live.advance();
                    debug!("Cancelled in-flight renders, now at {generation:?}");
                    self.pass = None;
                    self.in_flight = None;
                    self.tracker.disarm();
                }

                Effect::ResetSurfaces => {
                    self.surfaces.reset();
                    self.doc_info = None;
                }

                Effect::ShowContainer(mode) => {
                    self.surfaces.show(mode);
                    self.tracker.disarm();
                }

                Effect::RenderCurrentPage => {
                    let generation = self.live.advance();
                    self.pass = Some(RenderPass {
                        generation,
                        kind: PassKind::Single,
                    });
                    self.in_flight = None;
                    self.send(RenderRequest::Page {
                        generation,
                        page: self.state.current_page,
                        scale: self.state.scale,
                    });
                }

                Effect::RenderAllPages => {
                    let generation = self.live.advance();
                    self.surfaces.recreate_continuous(self.state.total_pages);
                    self.tracker.disarm();
                    self.pass = Some(RenderPass {
                        generation,
                        kind: PassKind::Sweep,
                    });
                    self.in_flight = None;
                    self.send(RenderRequest::Sweep {
                        generation,
                        page_count: self.state.total_pages,
                        scale: self.state.scale,
                    });
                }

                Effect::UpdateIndicator => {
                    self.indicator = self.state.indicator();
                    if self.state.current_page != self.reported_page {
                        self.reported_page = self.state.current_page;
                        if self.state.current_page > 0 {
                            self.events.push(ViewerEvent::CurrentPageChanged {
                                page: self.state.current_page,
                            });
                        }
                    }
                }
            }
        }
    }

    fn send(&mut self, request: RenderRequest) {
        debug!("Render request: {request:?}");
        if self.request_tx.send(request).is_ok() {
            self.outstanding += 1;
        } else {
            error!("Render worker is gone, request dropped");
        }
    }

    /// Collect finished worker responses without blocking
    pub fn poll(&mut self) -> Vec<ViewerEvent> {
        while let Ok(response) = self.response_rx.try_recv() {
            self.handle_response(response);
        }
        self.check_stalled(Instant::now());
        self.notifications.update();
        std::mem::take(&mut self.events)
    }

    /// Block until every outstanding request has finished or `timeout`
    /// elapses. Returns the events produced meanwhile.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<ViewerEvent> {
        let deadline = Instant::now() + timeout;

        while self.outstanding > 0 {
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Viewer still busy after {timeout:?} ({} requests outstanding)",
                    self.outstanding
                );
                break;
            }

            let wait = (deadline - now).min(IDLE_POLL_INTERVAL);
            match self.response_rx.recv_timeout(wait) {
                Ok(response) => self.handle_response(response),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    error!("Render worker disconnected");
                    self.outstanding = 0;
                    break;
                }
            }
            self.check_stalled(Instant::now());
        }

        self.poll()
    }

    fn handle_response(&mut self, response: RenderResponse) {
        if response.is_terminal() {
            self.outstanding = self.outstanding.saturating_sub(1);
        }

        let generation = response.generation();
        if !self.live.is_current(generation) {
            debug!("Dropping stale response from {generation:?}");
            return;
        }

        match response {
            RenderResponse::Opened { generation, info } => {
                if self.loading != Some(generation) {
                    return;
                }
                self.loading = None;
                info!(
                    "Document ready: {} pages{}",
                    info.page_count,
                    info.title
                        .as_deref()
                        .map(|t| format!(" ({t})"))
                        .unwrap_or_default()
                );
                let page_count = info.page_count;
                self.events.push(ViewerEvent::DocumentLoaded {
                    page_count,
                    title: info.title.clone(),
                });
                self.doc_info = Some(info);
                self.apply_command(Command::DocumentLoaded { page_count });
            }

            RenderResponse::OpenFailed { generation, error } => {
                if self.loading != Some(generation) {
                    return;
                }
                self.loading = None;
                let message = format!("Failed to load document: {error}");
                error!("{message}");
                self.notifications.error(message.clone());
                self.events.push(ViewerEvent::DocumentFailed { message });
                self.apply_command(Command::LoadFailed);
            }

            RenderResponse::Started { generation, page } => {
                self.in_flight = Some(InFlightPage {
                    generation,
                    page,
                    since: Instant::now(),
                    reported: false,
                });
            }

            RenderResponse::Page { data, .. } => {
                self.in_flight = None;
                self.apply_page(data);
            }

            RenderResponse::PageFailed { page, error, .. } => {
                self.in_flight = None;
                self.apply_failure(page, &error);
            }

            RenderResponse::SweepDone {
                rendered, failed, ..
            } => {
                self.in_flight = None;
                if failed > 0 {
                    warn!("Sweep finished with {failed} failed pages ({rendered} rendered)");
                } else {
                    debug!("Sweep finished, {rendered} pages rendered");
                }
                self.tracker.arm();
                self.events
                    .push(ViewerEvent::SweepFinished { rendered, failed });
            }

            RenderResponse::Superseded(_) => {}
        }
    }

    fn apply_page(&mut self, data: PageData) {
        let Some(pass) = self.pass else {
            return;
        };
        let id = pass.target(data.page);
        let Some(surface) = self.surfaces.get_mut(id) else {
            warn!("No surface {id:?} for rendered page {}", data.page);
            return;
        };

        surface.paint(data.page, data.bitmap);
        let text_layer = match data.text_layer {
            Ok(layer) => {
                surface.set_text_layer(layer);
                true
            }
            Err(reason) => {
                surface.mark_partial(reason);
                false
            }
        };

        self.events.push(ViewerEvent::PageRendered {
            surface: id,
            page: data.page,
            text_layer,
        });
    }

    fn apply_failure(&mut self, page: usize, error: &WorkerFault) {
        error!("Failed to render page {page}: {error}");
        let Some(pass) = self.pass else {
            return;
        };
        let id = pass.target(page);
        if let Some(surface) = self.surfaces.get_mut(id) {
            surface.mark_failed(page, error.to_string());
        }
        self.events.push(ViewerEvent::PageFailed {
            surface: id,
            page,
            message: error.to_string(),
        });
    }

    fn check_stalled(&mut self, now: Instant) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return;
        };
        if in_flight.reported
            || !self.live.is_current(in_flight.generation)
            || now.duration_since(in_flight.since) < self.page_timeout
        {
            return;
        }

        in_flight.reported = true;
        let page = in_flight.page;
        let fault = WorkerFault::TimedOut { page };
        warn!("{fault} after {:?}", self.page_timeout);

        let Some(pass) = self.pass else {
            return;
        };
        let id = pass.target(page);
        if let Some(surface) = self.surfaces.get_mut(id) {
            surface.mark_failed(page, fault.to_string());
        }
        self.events
            .push(ViewerEvent::PageStalled { surface: id, page });
    }

    #[must_use]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    #[must_use]
    pub fn mode(&self) -> ViewMode {
        self.state.mode
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.state.total_pages
    }

    /// Page-number indicator text, e.g. `"3 / 12"`
    #[must_use]
    pub fn indicator(&self) -> &str {
        &self.indicator
    }

    #[must_use]
    pub fn controls_visible(&self) -> bool {
        self.state.controls_visible()
    }

    #[must_use]
    pub fn surfaces(&self) -> &Surfaces {
        &self.surfaces
    }

    #[must_use]
    pub fn document_info(&self) -> Option<&DocumentInfo> {
        self.doc_info.as_ref()
    }

    #[must_use]
    pub fn is_scroll_tracking(&self) -> bool {
        self.tracker.is_armed()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationManager {
        &mut self.notifications
    }

    /// Stop the worker and wait for it to exit
    pub fn shutdown(&mut self) {
        self.live.advance();
        let _ = self.request_tx.send(RenderRequest::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Render worker panicked");
            }
        }
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.live.advance();
        let _ = self.request_tx.send(RenderRequest::Shutdown);
    }
}
