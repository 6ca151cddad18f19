//! hotspot-tui: a terminal client for the hot-articles service.
//!
//! ## Architecture overview
//!
//! ```text
//!                 Request (outbox)            spawn
//! ┌──────────┐ ─────────────────► ┌───────────┐ ─────► ┌──────────┐
//! │  app.rs  │                    │ worker.rs │        │  api/    │
//! │ (state)  │ ◄───────────────── │  (tokio)  │ ◄───── │ (HTTP)   │
//! └──────────┘  Outcome (channel) └───────────┘        └──────────┘
//!    ▲     │ draw()
//!    │     ▼
//!    │  ┌──────────┐
//!    │  │  ui.rs   │
//!    │  └──────────┘
//!    │ handle_key_event()
//! ┌──────────┐
//! │ input.rs │
//! └──────────┘
//! ```
//!
//! * **`api/`**: the `Backend` trait, wire models, and the reqwest client.
//! * **`probe`**: local test fetch of a source's RSS or JSON feed.
//! * **`worker`**: runs queued requests as tokio tasks.
//! * **`app`**: owns all application state (lists, filters, forms, runs).
//! * **`filters`** / **`form`**: filter criteria and the source form.
//! * **`ui`**: pure rendering of `App` state.
//! * **`input`**: maps key events to `App` mutations.
//! * **`config`**: settings from defaults, TOML, env and flags.
//! * **`main`**: wires everything together: settings, logging, the
//!   terminal, and the event loop.

mod api;
mod app;
mod config;
mod filters;
mod form;
mod input;
mod probe;
mod ui;
mod worker;

use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use api::{Backend, HttpBackend};
use app::App;
use config::{Cli, Settings};
use worker::Worker;

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
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

/// Restore the terminal before printing a panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Log to a file; stdout belongs to the UI.
fn init_logging(settings: &Settings) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_file)
        .with_context(|| format!("failed to open log file '{}'", settings.log_file.display()))?;

    let filter = EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load_settings(&cli)?;
    init_logging(&settings)?;
    tracing::info!(api_base = %settings.api_base, page_size = settings.page_size, "starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let backend: Arc<dyn Backend> =
        Arc::new(HttpBackend::new(&settings.api_base, settings.request_timeout())?);
    let (worker, mut outcomes) = Worker::new(runtime.handle().clone(), backend);

    let mut app = App::new(settings.page_size, settings.debounce());
    app.start();

    install_panic_hook();
    let mut guard = TerminalGuard::new()?;

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Fold finished requests into the app.
    //   2. Fire any due debounced read, then dispatch queued requests.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(outcome) = outcomes.try_recv() {
            app.apply(outcome);
        }

        app.tick(Instant::now());
        for request in app.take_requests() {
            worker.dispatch(request);
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key, Instant::now());
            }
        }

        if app.quit {
            break;
        }
    }

    tracing::info!("exiting");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
