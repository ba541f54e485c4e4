#![allow(clippy::missing_errors_doc)] // Internal functions don't need # Errors docs
#![allow(clippy::missing_panics_doc)] // Internal functions don't need # Panics docs
#![allow(clippy::must_use_candidate)] // Not all getters need #[must_use]
#![allow(clippy::module_name_repetitions)] // e.g., SessionState in registry is fine
#![allow(clippy::cast_possible_truncation)] // We're careful with our casts

//! Aura - ambient HUD for concurrent AI coding agent sessions
//!
//! A single Rust binary that provides both:
//! - Daemon mode: IPC server + Codex rollout watcher + HUD surfaces
//! - Hook mode: called by agent hooks to parse stdin JSON and forward events
//!
//! Usage:
//!   aura                            # Start the daemon (default)
//!   aura hook --agent claude-code   # Process one hook event from stdin

mod app;
mod cli;
mod codex;
mod config;
mod errors;
mod event;
mod hook;
mod install;
mod notify;
mod registry;
mod tui;
mod ui;
mod view;

use app::App;
use clap::Parser;
use cli::{Cli, Commands};
use color_eyre::Result;
use registry::Registry;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Get the log directory path
fn get_log_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("/tmp/aura/logs"),
        |dirs| dirs.cache_dir().join("aura").join("logs"),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Hook { agent: _, no_notify }) => {
            // Short-lived adapter: parse stdin, forward, exit. Exit code is
            // non-zero only for malformed stdin JSON; a missing daemon is fine.
            return hook::run(&cli.socket, !no_notify)
                .await
                .map_err(|e| color_eyre::eyre::eyre!("{}", e));
        }
        Some(Commands::SetName { name }) => {
            // Stub: the name reaches the daemon through hook parsing of this
            // very command line, not through this process.
            println!("Session name set to \"{name}\"");
            return Ok(());
        }
        Some(Commands::HookInstall) => {
            install::run();
            return Ok(());
        }
        Some(Commands::Completions { shell }) => {
            cli::print_completions(shell);
            return Ok(());
        }
        None => {
            // Daemon mode: continue with full setup
        }
    }

    color_eyre::install()?;

    // File logging with daily rotation; the HUD owns the terminal
    let log_dir = get_log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "aura.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let log_filter = format!("aura={}", cli::log_level(cli.verbose));
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_filter))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(non_blocking),
        )
        .init();

    tracing::info!("Starting aura v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Socket path: {:?}", cli.socket);

    let hud_config = config::HudConfig::load();
    let hud_state = config::HudState::load();

    // The registry is the only shared mutable state; everything below hands
    // out clones of the same handle.
    let registry = Registry::new();
    let cancel = CancellationToken::new();

    let socket_path = cli.socket.clone();
    let socket_registry = registry.clone();
    let socket_handle = tokio::spawn(async move {
        if let Err(e) = event::socket::listen(socket_registry, &socket_path).await {
            tracing::error!("Socket listener error: {}", e);
        }
    });

    let rollout_root = cli
        .codex_home
        .as_ref()
        .map(|home| home.join("sessions"))
        .unwrap_or_else(codex::sessions_root);
    let watcher = codex::RolloutWatcher::new(registry.clone(), rollout_root);
    let watcher_cancel = cancel.clone();
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watcher.run(watcher_cancel).await {
            tracing::error!("Rollout watcher error: {}", e);
        }
    });

    let result = run_hud(registry.clone(), hud_config.theme, cancel.clone()).await;

    // Graceful shutdown: stop the adapters, persist HUD state, unlink socket
    tracing::info!(sessions = registry.len(), "Shutting down");
    cancel.cancel();
    socket_handle.abort();
    let _ = watcher_handle.await;
    hud_config.save();
    hud_state.save();
    if cli.socket.exists() {
        let _ = std::fs::remove_file(&cli.socket);
    }

    result
}

/// Frame loop: snapshot → project → draw, at a fixed cadence. Rendering
/// never blocks on I/O; all event application happens on the background
/// tasks spawned above.
async fn run_hud(registry: Registry, theme: config::Theme, cancel: CancellationToken) -> Result<()> {
    use std::time::Duration;

    let mut terminal = tui::init()?;
    let _guard = tui::TerminalGuard;

    let (key_tx, mut key_rx) = mpsc::channel(16);
    let input_cancel = cancel.clone();
    let input_handle = tokio::spawn(async move {
        event::input::listen(key_tx, input_cancel).await;
    });

    let mut app = App::new(registry, theme);

    // 10 frames/sec is plenty for a 2-second subtitle cycle
    let frame_duration = Duration::from_millis(100);

    loop {
        app.refresh();
        terminal.draw(|f| ui::render(f, &app))?;

        tokio::select! {
            Some(key) = key_rx.recv() => app.handle_key(key),
            () = tokio::time::sleep(frame_duration) => {}
        }

        if app.should_quit {
            break;
        }
    }

    tracing::debug!("Shutting down HUD loop");
    input_handle.abort();

    tui::restore()?;
    terminal.show_cursor()?;

    Ok(())
}
