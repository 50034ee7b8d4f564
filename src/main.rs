//! musten-scroll: pages through the Musten ad board or song catalog in the
//! terminal, showing each batch as soon as it is ready.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌─────────────┐ ViewMsg   ┌──────────┐  draw()  ┌──────────┐
//! │ scheduler   │ ────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (tokio task)│ (channel) │ (state)  │          │ (render) │
//! └─────────────┘           └──────────┘          └──────────┘
//!   ▲  source/ + enrich/         ▲
//!   │                            │ handle_key_event()
//!   │ refresh / cancel      ┌──────────┐
//!   └────────────────────── │ input.rs │
//!                           └──────────┘
//! ```
//!
//! * **`bootstrap`** builds a session: HTTP client, credentials, and the
//!   source/enricher pair for the chosen catalog.
//! * **`source/`**: the `ItemSource` trait and the paginated listings.
//! * **`enrich/`**: the `ItemEnricher` trait, one per catalog.
//! * **`scheduler`** walks pages: fetch, enrich, dedup, render, wait.
//! * **`render`**: the `Renderer` contract and the channel into the UI.
//! * **`app`** / **`ui`** / **`input`**: terminal state, drawing, keys.
//! * **`main`** wires everything together: parse args, set up logging and
//!   the terminal, and run the event loop.

mod app;
mod bootstrap;
mod config;
mod dedup;
mod enrich;
mod error;
mod input;
mod pacing;
mod render;
mod scheduler;
mod source;
mod ui;

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::{Action, App};
use bootstrap::{Bootstrap, CredentialBootstrap, SongBootstrap};
use config::Config;
use render::{ChannelRenderer, RenderEvent};
use scheduler::{BatchScheduler, SchedulerOptions};
use source::DisplayableRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Catalog {
    /// Private `ad-*` repositories on GitHub.
    Ads,
    /// The public song catalog.
    Songs,
}

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Which catalog to browse.
    #[arg(value_enum, default_value_t = Catalog::Songs)]
    catalog: Catalog,

    /// Config file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write logs; the terminal belongs to the UI.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Override the delay between pages, in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before the default hook prints the panic.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

fn default_log_path() -> Result<PathBuf> {
    let dir = dirs::cache_dir().context("Failed to get cache directory")?;
    Ok(dir.join("musten-scroll").join("musten-scroll.log"))
}

/// Log to a file.  `RUST_LOG` overrides the default filter.
fn init_logging(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p,
        None => default_log_path()?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = File::create(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("musten_scroll=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(path)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging(cli.log_file.clone())?;

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(delay_ms) = cli.delay_ms {
        config.pacing.delay_ms = delay_ms;
    }
    info!(catalog = ?cli.catalog, log = %log_path.display(), "starting");

    // -- session and scheduler -----------------------------------------------
    let (title, max_pages) = match cli.catalog {
        Catalog::Ads => ("Ads", config.ads.page_limit()),
        Catalog::Songs => ("Songs", config.songs.page_limit()),
    };
    let bootstrap: Arc<dyn Bootstrap> = match cli.catalog {
        Catalog::Ads => Arc::new(CredentialBootstrap::new(config.ads.clone(), config.timeout())),
        Catalog::Songs => Arc::new(SongBootstrap::new(config.songs.clone(), config.timeout())),
    };

    // The scheduler runs on the runtime's workers; the UI stays on this thread.
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let _runtime_guard = runtime.enter();

    let (renderer, rx) = ChannelRenderer::new();
    let scheduler = BatchScheduler::new(
        bootstrap,
        Box::new(renderer),
        SchedulerOptions {
            pacing: config.pacing(),
            max_pages,
        },
    );

    let mut app = App::new(title);
    app.subscribe(Box::new(|event: &RenderEvent, record: &DisplayableRecord| match event {
        RenderEvent::Activated(handle) => {
            info!(?handle, id = %record.id, url = ?record.action_url, "activated");
        }
    }));

    install_panic_hook();
    let mut guard = TerminalGuard::new()?;
    scheduler.start();

    // -- main event loop -----------------------------------------------------
    // ~10 fps: drain scheduler messages, act on requests, draw, poll keys.
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(msg) = rx.try_recv() {
            app.apply(msg);
        }

        match app.take_action() {
            Some(Action::Refresh) => {
                info!("refresh requested");
                scheduler.refresh();
            }
            Some(Action::Cancel) => scheduler.cancel(),
            None => {}
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    scheduler.cancel();
    info!("exiting");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
