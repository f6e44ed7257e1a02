//! View state management
//!
//! The coordinator's state machine. `ViewState::apply` is pure: it updates
//! mode, page and document bookkeeping and returns the effects the service
//! has to carry out (render calls, container switches, indicator refresh).

use super::types::{DEFAULT_RENDER_SCALE, ViewMode};

/// Lifecycle of the loaded document
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// Nothing loaded
    #[default]
    Empty,
    /// A document is being opened
    Loading,
    /// A document is open and `total_pages >= 1`
    Ready,
}

/// Current view state for one viewer instance
#[derive(Clone, Debug)]
pub struct ViewState {
    /// Active view mode
    pub mode: ViewMode,

    pub phase: Phase,

    /// Current page (1-based, 0 while nothing is loaded)
    pub current_page: usize,

    /// Total page count
    pub total_pages: usize,

    /// Zoom factor for every render
    pub scale: f32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(ViewMode::default(), DEFAULT_RENDER_SCALE)
    }
}

impl ViewState {
    #[must_use]
    pub fn new(mode: ViewMode, scale: f32) -> Self {
        Self {
            mode,
            phase: Phase::Empty,
            current_page: 0,
            total_pages: 0,
            scale: if scale.is_finite() && scale > 0.0 {
                scale
            } else {
                DEFAULT_RENDER_SCALE
            },
        }
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::BeginLoad => {
                self.phase = Phase::Loading;
                self.current_page = 0;
                self.total_pages = 0;
                vec![Effect::CancelRenders, Effect::ResetSurfaces]
            }

            Command::DocumentLoaded { page_count } => {
                if self.phase != Phase::Loading {
                    return vec![];
                }
                if page_count == 0 {
                    self.phase = Phase::Empty;
                    return vec![Effect::UpdateIndicator];
                }

                self.phase = Phase::Ready;
                self.total_pages = page_count;
                self.current_page = 1;
                vec![
                    Effect::ShowContainer(self.mode),
                    self.render_effect(),
                    Effect::UpdateIndicator,
                ]
            }

            Command::LoadFailed => {
                if self.phase != Phase::Loading {
                    return vec![];
                }
                self.phase = Phase::Empty;
                vec![Effect::UpdateIndicator]
            }

            Command::SetMode(mode) => {
                if self.mode == mode {
                    return vec![];
                }
                self.mode = mode;

                let mut effects = vec![Effect::ShowContainer(mode)];
                if self.phase == Phase::Ready {
                    effects.push(self.render_effect());
                }
                effects.push(Effect::UpdateIndicator);
                effects
            }

            Command::NextPage => {
                if self.mode != ViewMode::Paged || self.phase != Phase::Ready {
                    return vec![];
                }
                if self.current_page < self.total_pages {
                    self.current_page += 1;
                    vec![Effect::RenderCurrentPage, Effect::UpdateIndicator]
                } else {
                    vec![]
                }
            }

            Command::PreviousPage => {
                if self.mode != ViewMode::Paged || self.phase != Phase::Ready {
                    return vec![];
                }
                if self.current_page > 1 {
                    self.current_page -= 1;
                    vec![Effect::RenderCurrentPage, Effect::UpdateIndicator]
                } else {
                    vec![]
                }
            }

            Command::GoToPage(page) => {
                if self.mode != ViewMode::Paged || self.phase != Phase::Ready {
                    return vec![];
                }
                let clamped = page.clamp(1, self.total_pages);
                if self.current_page != clamped {
                    self.current_page = clamped;
                    vec![Effect::RenderCurrentPage, Effect::UpdateIndicator]
                } else {
                    vec![]
                }
            }

            Command::ScrolledTo(page) => {
                if self.mode != ViewMode::Continuous || self.phase != Phase::Ready {
                    return vec![];
                }
                if page == 0 || page > self.total_pages || page == self.current_page {
                    return vec![];
                }
                self.current_page = page;
                vec![Effect::UpdateIndicator]
            }
        }
    }

    fn render_effect(&self) -> Effect {
        match self.mode {
            ViewMode::Paged => Effect::RenderCurrentPage,
            ViewMode::Continuous => Effect::RenderAllPages,
        }
    }

    /// Text of the page-number indicator
    #[must_use]
    pub fn indicator(&self) -> String {
        format!("{} / {}", self.current_page, self.total_pages)
    }

    /// Page-turn controls are only shown in paged mode
    #[must_use]
    pub fn controls_visible(&self) -> bool {
        self.mode == ViewMode::Paged
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.phase == Phase::Ready
    }
}

/// Commands that modify view state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// A new document started opening
    BeginLoad,
    /// The document opened with this many pages
    DocumentLoaded { page_count: usize },
    /// The document could not be opened
    LoadFailed,
    /// Switch view mode
    SetMode(ViewMode),
    /// Turn to the next page (paged mode)
    NextPage,
    /// Turn to the previous page (paged mode)
    PreviousPage,
    /// Jump to a page (paged mode), clamped into range
    GoToPage(usize),
    /// The scroll tracker saw this page become the most visible one
    ScrolledTo(usize),
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Supersede every in-flight render
    CancelRenders,
    /// Drop surfaces of the previous document
    ResetSurfaces,
    /// Show this mode's container and hide the other
    ShowContainer(ViewMode),
    /// Render the current page into the paged surface
    RenderCurrentPage,
    /// Recreate continuous surfaces and sweep every page
    RenderAllPages,
    /// Refresh the page-number indicator
    UpdateIndicator,
}
