//! MPM - live process manager for MySQL servers
//!
//! This binary provides a terminal user interface over the process-manager
//! backend: a live, sortable and filterable view of every session, batch
//! kills, a dashboard and an ad-hoc query executor.
//!
//! # Usage
//!
//! ```text
//! mpm                          # Connect to http://localhost:8000 and start polling
//! mpm --url http://db:8000     # Use another backend
//! mpm --paused                 # Load once, then wait for `p`
//! mpm ping                     # Check backend and database health
//! mpm databases                # List databases
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use mpm_tui::client::Backend;
use mpm_tui::config::{Config, ConfigOverrides, Credentials, PASSWORD_ENV};
use mpm_tui::error::{Result as TuiResult, TuiError};
use mpm_tui::poll::spawn_poll_timer;
use mpm_tui::{ui, App, BackendClient, Controller, Dispatcher, Event, Flow};

// ============================================================================
// CLI Arguments
// ============================================================================

/// MPM - live process manager for MySQL servers
#[derive(Parser, Debug)]
#[command(name = "mpm")]
#[command(about = "Watch and manage live MySQL sessions")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Backend base URL (overrides the config file)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Seconds between polls
    #[arg(long, short = 'i', global = true)]
    interval: Option<u64>,

    /// Config file (default: $XDG_CONFIG_HOME/mpm/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Backend user; the password is read from MPM_PASSWORD
    #[arg(long, short = 'u', global = true)]
    username: Option<String>,

    /// Start with polling paused
    #[arg(long)]
    paused: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend and its database respond
    Ping,
    /// List the databases visible to the backend
    Databases,
}

// ============================================================================
// Terminal Setup / Cleanup
// ============================================================================

fn setup_terminal() -> TuiResult<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| TuiError::TerminalInit(e.to_string()))
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> TuiResult<()> {
    disable_raw_mode().map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    terminal
        .show_cursor()
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    Ok(())
}

// ============================================================================
// Keyboard Input Task
// ============================================================================

fn spawn_keyboard_task(
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel_token.is_cancelled() {
                debug!("Keyboard task shutting down");
                break;
            }

            // Short poll timeout so cancellation is noticed promptly
            let poll_result = tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await;

            match poll_result {
                Ok(Some(CrosstermEvent::Key(key))) => {
                    if event_tx.send(Event::Key(key)).is_err() {
                        debug!("Event channel closed, keyboard task exiting");
                        break;
                    }
                }
                Ok(Some(CrosstermEvent::Resize(width, height))) => {
                    if event_tx.send(Event::Resize(width, height)).is_err() {
                        break;
                    }
                }
                Ok(Some(_)) | Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Keyboard polling task panicked");
                    break;
                }
            }
        }
    })
}

// ============================================================================
// Main Event Loop
// ============================================================================

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    controller: &mut Controller,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    cancel_token: &CancellationToken,
) -> Result<()> {
    // Redraw at least this often so notices expire on time
    let tick_rate = Duration::from_millis(100);

    loop {
        controller.app_mut().tick();
        terminal.draw(|frame| ui::render(frame, controller.app()))?;

        match tokio::time::timeout(tick_rate, event_rx.recv()).await {
            Ok(Some(event)) => {
                if controller.handle_event(event) == Flow::Quit {
                    break;
                }
            }
            Ok(None) => {
                warn!("Event channel closed");
                break;
            }
            Err(_) => {}
        }

        if cancel_token.is_cancelled() {
            break;
        }
    }

    Ok(())
}

// ============================================================================
// Logging Setup
// ============================================================================

/// Returns the log directory: `$XDG_STATE_HOME/mpm`, else `~/.local/state/mpm`.
fn get_log_dir() -> Option<PathBuf> {
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg_state).join("mpm"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/mpm"))
}

/// Opens the log file in append mode. Returns `None` (logging disabled) on failure.
fn create_log_file() -> Option<std::fs::File> {
    let log_dir = get_log_dir()?;

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory {log_dir:?}: {e}");
        return None;
    }

    let log_path = log_dir.join("tui.log");

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to open log file {log_path:?}: {e}");
            None
        }
    }
}

fn init_logging() {
    // The TUI owns the terminal, so logs never go to stderr.
    if let Some(file) = create_log_file() {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mpm=info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("off"))
            .init();
    }
}

// ============================================================================
// Backend Connection
// ============================================================================

/// Builds the HTTP client and authenticates it from the environment.
async fn connect(config: &Config) -> Result<BackendClient> {
    let mut client = BackendClient::from_config(config)?;

    match Credentials::from_env(config.username.as_deref()) {
        Credentials::Token(token) => {
            debug!("Using bearer token from environment");
            client = client.with_token(token);
        }
        Credentials::Login { username, password } => {
            client
                .login(&username, &password)
                .await
                .with_context(|| format!("Login as {username} failed"))?;
        }
        Credentials::None => {
            if let Some(username) = &config.username {
                warn!(username = %username, "Username given but {PASSWORD_ENV} is not set");
            }
            debug!("Sending unauthenticated requests");
        }
    }

    Ok(client)
}

async fn run_command(command: Command, client: &BackendClient) -> Result<()> {
    match command {
        Command::Ping => {
            let response = client
                .ping()
                .await
                .with_context(|| format!("Backend at {} did not answer", client.base_url()))?;
            println!("backend: ok ({})", client.base_url());
            println!("database: {}", response.db);
        }
        Command::Databases => {
            for name in client.list_databases().await? {
                println!("{name}");
            }
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging();

    let config = Config::load(args.config.as_deref())?.with_overrides(ConfigOverrides {
        backend_url: args.url,
        poll_interval_secs: args.interval,
        username: args.username,
    })?;
    info!(
        backend = %config.base_url(),
        interval_secs = config.poll_interval_secs,
        paused = args.paused,
        "MPM starting..."
    );

    let client = connect(&config).await?;

    if let Some(command) = args.command {
        return run_command(command, &client).await;
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let cancel_token = CancellationToken::new();

    let mut terminal = match setup_terminal() {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to initialize terminal");
            return Err(e.into());
        }
    };

    let (timer, timer_handle) = spawn_poll_timer(
        config.poll_interval(),
        event_tx.clone(),
        cancel_token.clone(),
    );
    let dispatcher = Dispatcher::new(Arc::new(client), event_tx.clone(), cancel_token.clone());
    let mut controller = Controller::new(App::new(config.engine_config()), dispatcher, timer);
    controller.start(args.paused);

    let keyboard_handle = spawn_keyboard_task(event_tx, cancel_token.clone());

    let result = run_event_loop(&mut terminal, &mut controller, &mut event_rx, &cancel_token).await;

    cancel_token.cancel();

    let _ = tokio::time::timeout(Duration::from_millis(100), timer_handle).await;
    let _ = tokio::time::timeout(Duration::from_millis(100), keyboard_handle).await;

    if let Err(e) = cleanup_terminal(&mut terminal) {
        error!(error = %e, "Failed to cleanup terminal");
    }

    info!("MPM stopped");

    result
}
