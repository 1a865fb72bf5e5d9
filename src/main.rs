// SPDX-License-Identifier: MPL-2.0

//! `plaza` — terminal client for a shared Supabase chat room.
//!
//! # Usage
//!
//! ```
//! plaza --url https://xyzcompany.supabase.co --key <anon key>
//! plaza --config ~/.config/plaza/config.toml
//! ```

mod app;
mod config;
mod state;
mod supabase;
mod ui;

use std::{io, time::Duration};

use anyhow::{Context, Result, bail};
use app::App;
use clap::Parser;
use config::{APP_NAME, BackendConfig, ConfigFile};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use supabase::SupabaseClient;

// ─── CLI args ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "plaza", about = "Terminal client for a shared Supabase chat room")]
struct Args {
    /// Path to a TOML config file (url, anon_key).
    #[arg(short, long, value_name = "FILE")]
    config: Option<std::path::PathBuf>,

    /// Project base URL, e.g. https://xyzcompany.supabase.co.
    #[arg(long, env = "PLAZA_URL")]
    url: Option<String>,

    /// Publishable (anon) API key.
    #[arg(long, env = "PLAZA_ANON_KEY")]
    key: Option<String>,
}

// ─── Entry point ──────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file_cfg = ConfigFile::load(args.config.as_ref()).map_err(anyhow::Error::msg)?;

    // CLI flags override the config file.
    let url = args
        .url
        .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()));
    let key = args
        .key
        .or_else(|| (!file_cfg.anon_key.is_empty()).then(|| file_cfg.anon_key.clone()));

    let backend = match (url, key) {
        (Some(url), Some(anon_key)) => BackendConfig { url, anon_key },
        _ => {
            let hint = ConfigFile::default_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "a config file".to_string());
            bail!("backend not configured: pass --url and --key, or set url/anon_key in {hint}");
        }
    };

    // The TUI owns the terminal, so logs go to a file.
    let _log_guard = init_logging();

    let client = SupabaseClient::new(&backend).context("building backend client")?;
    let mut app = App::new(client, backend);

    // Set up the terminal.
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend).context("creating terminal")?;

    let run_result = run_event_loop(&mut terminal, &mut app).await;

    // Restore the terminal and release the feed regardless of result.
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    app.shutdown();

    run_result
}

fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let dir = dirs::state_dir().or_else(dirs::data_local_dir)?.join(APP_NAME);
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::never(dir, format!("{APP_NAME}.log"));
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Some(guard)
}

// ─── Event loop ───────────────────────────────────────────────────────────

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Feed deliveries land between ticks; move them into the log first.
        app.drain_feed();

        terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

        // Poll for an event, yielding control to tokio while waiting.
        let maybe_event = tokio::task::block_in_place(|| {
            if event::poll(Duration::from_millis(50))? {
                Ok::<_, io::Error>(Some(event::read()?))
            } else {
                Ok(None)
            }
        })?;

        if let Some(evt) = maybe_event {
            match evt {
                Event::Key(key) => {
                    if !app.handle_key(key).await {
                        break;
                    }
                }
                Event::Resize(_, _) => {
                    // Terminal redraws on the next iteration.
                }
                _ => {}
            }
        }
    }

    Ok(())
}
