use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use simplelog::{Config, LevelFilter, WriteLogger};

use readpane::api::{ApiClient, Role};
use readpane::chat::{ChatSession, SelectionAction};
use readpane::library;
use readpane::notification::NotificationManager;
use readpane::panic_handler::initialize_panic_handler;
use readpane::settings;
use readpane::viewer::{
    DocumentOpener, PageSurface, SurfaceStatus, ViewMode, Viewer, ViewerConfig, ViewerEvent,
};

/// PDF reader client with paged/continuous rendering and AI chat
#[derive(Parser)]
#[command(name = "readpane", version)]
#[command(about = "Read PDFs and ask an AI about them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    /// Backend base URL (overrides the configured one)
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a local PDF and export its pages
    Render {
        file: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
    },

    /// List documents stored on the backend
    List,

    /// Upload a PDF to the backend
    Upload { file: PathBuf },

    /// Delete a stored document
    Delete { id: i64 },

    /// Download a stored document and render it
    Open {
        id: i64,
        #[command(flatten)]
        view: ViewArgs,
    },

    /// Ask a question about a document
    Ask {
        id: i64,
        message: String,
        /// Passage the question refers to
        #[arg(long)]
        selection: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Run a quick action on a passage
    Act {
        id: i64,
        #[arg(value_enum)]
        action: SelectionAction,
        selection: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Show the latest conversation about a document
    History { id: i64 },

    /// Show the whole-document summary, generating it on first use
    Summary { id: i64 },

    /// Copy a passage to the clipboard
    Copy { text: String },
}

#[derive(Args)]
struct ViewArgs {
    #[arg(long, value_enum)]
    mode: Option<ViewMode>,

    /// Page to show in paged mode
    #[arg(long)]
    page: Option<usize>,

    #[arg(long)]
    scale: Option<f32>,

    /// Directory for exported PNGs and text layers
    #[arg(long, short, default_value = "pages")]
    out: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    WriteLogger::init(
        if cli.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        Config::default(),
        File::create("readpane.log")?,
    )?;

    initialize_panic_handler();
    settings::load_settings();
    if let Some(url) = &cli.api_url {
        settings::set_api_base_url(url);
    }

    info!("Starting readpane");
    let result = run(cli.command);
    if let Err(e) = &result {
        error!("{e:#}");
    }
    info!("Shutting down readpane");
    result
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Render { file, view } => render(file, &view),

        Commands::List => {
            let pdfs = ApiClient::from_settings()?.list_pdfs()?;
            if pdfs.is_empty() {
                println!("No documents yet");
            }
            for line in library::listing(&pdfs) {
                println!("{line}");
            }
            Ok(())
        }

        Commands::Upload { file } => {
            let uploaded = ApiClient::from_settings()?.upload_pdf(&file)?;
            let mut notifications = NotificationManager::new();
            notifications.success(format!(
                "Uploaded {} as #{} ({} pages · {})",
                file.display(),
                uploaded.id,
                uploaded.page_count,
                library::format_file_size(uploaded.file_size)
            ));
            show_toast(&notifications);
            Ok(())
        }

        Commands::Delete { id } => {
            ApiClient::from_settings()?.delete_pdf(id)?;
            println!("Deleted #{id}");
            Ok(())
        }

        Commands::Open { id, view } => open(id, &view),

        Commands::Ask {
            id,
            message,
            selection,
            page,
        } => {
            let client = ApiClient::from_settings()?;
            let mut session = ChatSession::new(id);
            session.set_current_page(page);
            if let Some(selection) = selection {
                session.select(&selection);
            }
            println!("{}", session.send(&client, &message)?);
            Ok(())
        }

        Commands::Act {
            id,
            action,
            selection,
            page,
        } => {
            let client = ApiClient::from_settings()?;
            let mut session = ChatSession::new(id);
            session.set_current_page(page);
            if !session.select(&selection) {
                bail!("selection is empty");
            }
            if let Some(preview) = session.selection_preview() {
                println!("> {preview}");
            }
            println!("{}", session.run_action(&client, action)?);
            Ok(())
        }

        Commands::History { id } => {
            let client = ApiClient::from_settings()?;
            let mut session = ChatSession::new(id);
            if session.load_history(&client)? == 0 {
                println!("No conversations yet");
            }
            print_transcript(&session);
            Ok(())
        }

        Commands::Summary { id } => {
            let client = ApiClient::from_settings()?;
            let summary = match client.get_summary(id)? {
                Some(summary) => summary,
                None => {
                    let summary = client.generate_summary(id)?;
                    let mut notifications = NotificationManager::new();
                    notifications.success("Summary generated");
                    show_toast(&notifications);
                    summary
                }
            };
            println!("{}", summary.summary);
            Ok(())
        }

        Commands::Copy { text } => {
            let mut session = ChatSession::new(0);
            if !session.select(&text) {
                bail!("selection is empty");
            }
            let mut notifications = NotificationManager::new();
            session.copy_selection(&mut notifications);
            show_toast(&notifications);
            Ok(())
        }
    }
}

fn show_toast(notifications: &NotificationManager) {
    if let Some(toast) = notifications.current() {
        println!("{}", toast.message);
    }
}

fn print_transcript(session: &ChatSession) {
    for entry in session.transcript() {
        let who = match entry.role {
            Role::User => "you",
            Role::Assistant => "ai",
        };
        println!("{who}: {}\n", entry.content);
    }
}

#[cfg(feature = "pdf")]
fn render(file: PathBuf, view: &ViewArgs) -> Result<()> {
    if !file.exists() {
        bail!("{} does not exist", file.display());
    }
    view_document(readpane::viewer::MupdfOpener::new(file), view)
}

#[cfg(feature = "pdf")]
fn open(id: i64, view: &ViewArgs) -> Result<()> {
    let client = ApiClient::from_settings()?;
    let info = client.get_pdf(id)?;
    let bytes = client.download_pdf(id)?;

    let file = tempfile::Builder::new()
        .prefix("readpane-")
        .suffix(".pdf")
        .tempfile()
        .context("failed to create temporary file")?;
    fs::write(file.path(), bytes).context("failed to write downloaded document")?;

    println!("{}", info.original_filename);
    view_document(readpane::viewer::MupdfOpener::new(file.path()), view)?;

    // History is best effort once the document rendered
    let mut session = ChatSession::new(id);
    match session.load_history(&client) {
        Ok(0) => {}
        Ok(_) => print_transcript(&session),
        Err(e) => warn!("Failed to load conversation history: {e:#}"),
    }
    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn render(_file: PathBuf, _view: &ViewArgs) -> Result<()> {
    bail!("readpane was built without PDF support")
}

#[cfg(not(feature = "pdf"))]
fn open(_id: i64, _view: &ViewArgs) -> Result<()> {
    bail!("readpane was built without PDF support")
}

fn view_document(opener: impl DocumentOpener, view: &ViewArgs) -> Result<()> {
    let mut config = ViewerConfig::from_settings();
    if let Some(mode) = view.mode {
        config.mode = mode;
    }
    if let Some(scale) = view.scale {
        config.scale = scale;
    }
    let page_timeout = config.page_timeout;

    let mut viewer = Viewer::with_config(config);
    viewer.load_document(opener);
    let mut events = settle(&mut viewer, page_timeout);

    if let Some(alert) = viewer.notifications().pending_alert() {
        bail!("{}", alert.message);
    }

    if let Some(page) = view.page {
        if viewer.mode() == ViewMode::Paged {
            viewer.go_to_page(page);
            events.extend(settle(&mut viewer, page_timeout));
        }
    }

    for event in &events {
        match event {
            ViewerEvent::PageFailed { page, message, .. } => {
                eprintln!("page {page}: {message}");
            }
            ViewerEvent::PageStalled { page, .. } => {
                eprintln!("page {page}: timed out after {page_timeout:?}");
            }
            _ => {}
        }
    }

    let exported = export_surfaces(&viewer, &view.out)?;
    println!(
        "{} mode, page {} · {} page(s) exported to {}",
        viewer.mode().as_str(),
        viewer.indicator(),
        exported,
        view.out.display()
    );

    viewer.shutdown();
    Ok(())
}

/// Wait until the viewer has nothing outstanding or a page stalls
fn settle(viewer: &mut Viewer, page_timeout: Duration) -> Vec<ViewerEvent> {
    let mut events = Vec::new();
    loop {
        let batch = viewer.wait_idle(page_timeout);
        let stalled = batch
            .iter()
            .any(|event| matches!(event, ViewerEvent::PageStalled { .. }));
        events.extend(batch);
        if viewer.is_idle() || stalled {
            return events;
        }
    }
}

fn export_surfaces(viewer: &Viewer, out: &Path) -> Result<usize> {
    fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;

    let mut exported = 0;
    for surface in viewer.surfaces().visible_surfaces() {
        if export_surface(surface, out)? {
            exported += 1;
        }
    }
    Ok(exported)
}

fn export_surface(surface: &PageSurface, out: &Path) -> Result<bool> {
    let Some(bitmap) = &surface.canvas.bitmap else {
        return Ok(false);
    };
    if matches!(surface.status, SurfaceStatus::Failed(_)) {
        return Ok(false);
    }

    let stem = format!("page-{:03}", surface.page);
    let image = image::RgbImage::from_raw(bitmap.width, bitmap.height, bitmap.pixels.clone())
        .context("bitmap size does not match its pixel buffer")?;
    let png = out.join(format!("{stem}.png"));
    image
        .save(&png)
        .with_context(|| format!("failed to write {}", png.display()))?;

    let json = serde_json::to_string_pretty(&surface.text_layer)?;
    fs::write(out.join(format!("{stem}.json")), json)
        .with_context(|| format!("failed to write text layer for page {}", surface.page))?;

    Ok(true)
}
