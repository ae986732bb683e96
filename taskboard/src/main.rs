//! `taskboard`: terminal client for a Taskboard server.
//!
//! Without a subcommand, opens the interactive board and follows the live
//! update channel. With one, performs a single request and prints the result.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! # Interactive board
//! cargo run --bin taskboard -- --server-url http://127.0.0.1:3000
//!
//! # Scripted use
//! TASKBOARD_URL=http://board.local:3000 cargo run --bin taskboard -- notes add alpha "called back"
//! ```

use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use taskboard_proto::event::BoardEvent;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::api::{ApiClient, ApiError};
use taskboard::app::{Action, App, NotesView};
use taskboard::board::Board;
use taskboard::cache::TaskCache;
use taskboard::config::{CliArgs, ClientConfig, Command, NotesCommand};
use taskboard::net::{self, NetCommand, NetEvent};
use taskboard::ui;

/// Errors from one-shot subcommands.
#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to read {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },

    #[error("{0} has no file name")]
    NoFileName(PathBuf),
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file, never stdout, since ratatui owns the terminal.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let api = match ApiClient::new(&config.server_url) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    if let Some(command) = cli.command {
        tracing::info!(?command, "running one-shot command");
        if let Err(e) = run_command(&api, &config, command).await {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        return Ok(());
    }

    tracing::info!(server = %config.server_url, "taskboard starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &api, &config).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("taskboard exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

// =============================================================================
// One-shot commands
// =============================================================================

async fn run_command(
    api: &ApiClient,
    config: &ClientConfig,
    command: Command,
) -> Result<(), CommandError> {
    match command {
        Command::List => {
            let mut board = Board::new(Some(TaskCache::new(&config.cache_path)));
            board.reconcile(&api.list_tasks().await?);
            for (category, tasks) in board.categorized() {
                println!("{category}");
                for task in tasks {
                    println!(
                        "  {:<11} {:<9} {}",
                        task.state.label(),
                        task.priority(),
                        task.id
                    );
                }
            }
        }
        Command::Ls { path } => {
            for entry in api.list_folder(&path).await? {
                let suffix = if entry.is_folder { "/" } else { "" };
                println!("{}{suffix}", entry.name);
            }
        }
        Command::Notes { action } => match action {
            NotesCommand::Show { id } => print!("{}", api.read_notes(&id).await?),
            NotesCommand::Add { id, text } => {
                let stored = api.read_notes(&id).await?;
                api.append_note(&id, &format!("{stored}{text}")).await?;
            }
            NotesCommand::Clear { id } => api.clear_notes(&id).await?,
        },
        Command::Status { id, from, to } => api.log_status_change(&id, &from, &to).await?,
        Command::Upload {
            folder,
            file,
            overwrite,
        } => {
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| CommandError::NoFileName(file.clone()))?
                .to_string();
            let contents = std::fs::read(&file).map_err(|source| CommandError::ReadFile {
                path: file.clone(),
                source,
            })?;
            let stored = match api.upload(&folder, &file_name, contents.clone(), false).await {
                Err(ApiError::Conflict(_)) if overwrite => {
                    tracing::info!(%folder, %file_name, "file exists, replacing");
                    api.upload(&folder, &file_name, contents, true).await?
                }
                other => other?,
            };
            println!("{stored}");
        }
        Command::Move { id } => api.move_task(&id).await?,
        Command::CheckIp => {
            let allowed = api.check_ip().await?;
            println!("{}", if allowed { "allowed" } else { "not allowed" });
        }
        Command::Users => {
            for (id, addr) in api.connected_users().await? {
                println!("{id}\t{addr}");
            }
        }
    }
    Ok(())
}

// =============================================================================
// Interactive board
// =============================================================================

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    api: &ApiClient,
    config: &ClientConfig,
) -> io::Result<()> {
    let board = Board::new(Some(TaskCache::new(&config.cache_path)));
    let mut app = App::new(board, config.feedback_timeout);

    refresh(&mut app, api).await;
    app.allowed = match api.check_ip().await {
        Ok(allowed) => allowed,
        Err(e) => {
            tracing::warn!(error = %e, "allow-list check failed");
            false
        }
    };

    let (cmd_tx, mut evt_rx) = match net::spawn_net(&config.server_url, config.channel_capacity)
        .await
    {
        Ok((tx, rx)) => {
            app.connected = true;
            (Some(tx), Some(rx))
        }
        Err(e) => {
            tracing::warn!(error = %e, "live updates unavailable");
            app.set_feedback(format!("Live updates unavailable ({e})"));
            (None, None)
        }
    };

    loop {
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Every event means "something changed": re-fetch and reconcile.
        if let Some(rx) = evt_rx.as_mut()
            && drain_net_events(&mut app, rx)
        {
            refresh(&mut app, api).await;
        }

        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(action) = app.handle_key_event(key) {
                perform(&mut app, api, cmd_tx.as_ref(), action).await;
            }
        }

        if app.should_quit {
            if let Some(tx) = &cmd_tx {
                let _ = tx.try_send(NetCommand::Shutdown);
            }
            return Ok(());
        }
    }
}

/// Applies pending live-update events; returns whether any arrived.
fn drain_net_events(app: &mut App, rx: &mut mpsc::Receiver<NetEvent>) -> bool {
    let mut any = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            NetEvent::Event(event) => {
                app.board.apply_event(&event);
                app.clamp_selection();
                any = true;
            }
            NetEvent::Disconnected(reason) => {
                app.connected = false;
                app.set_feedback(format!("Live updates lost: {reason}"));
            }
        }
    }
    any
}

async fn perform(
    app: &mut App,
    api: &ApiClient,
    tx: Option<&mpsc::Sender<NetCommand>>,
    action: Action,
) {
    match action {
        Action::StateChanged { id, change } => {
            publish(app, tx, BoardEvent::TaskUpdate(change.update));
            if let Err(e) = api
                .log_status_change(&id, change.from.label(), change.to.label())
                .await
            {
                app.set_feedback(format!("Could not log status change: {e}"));
            }
        }
        Action::PriorityChanged(update) => publish(app, tx, BoardEvent::TaskUpdate(update)),
        Action::Archive(id) => match api.move_task(&id).await {
            Ok(()) => {
                app.board.remove(&id);
                app.clamp_selection();
                app.set_feedback(format!("Archived {id}"));
            }
            Err(ApiError::Forbidden(message)) => {
                app.allowed = false;
                app.set_feedback(message);
            }
            Err(e) => app.set_feedback(format!("Archive failed: {e}")),
        },
        Action::Refresh => {
            refresh(app, api).await;
            let now = chrono::Local::now().format("%H:%M:%S");
            app.set_feedback(format!("Refreshed at {now}"));
        }
        Action::Reset => {
            if tx.is_some() {
                // Applied when the relay echoes it back to us.
                publish(app, tx, BoardEvent::ResetTasks);
            } else {
                app.board.reset();
            }
        }
        Action::ShowNotes(id) => load_notes(app, api, id).await,
        Action::AppendNote { id, notes } => match api.append_note(&id, &notes).await {
            Ok(()) => load_notes(app, api, id).await,
            Err(e) => app.set_feedback(format!("Could not save note: {e}")),
        },
    }
}

fn publish(app: &mut App, tx: Option<&mpsc::Sender<NetCommand>>, event: BoardEvent) {
    let Some(tx) = tx else {
        app.set_feedback("Offline: change kept locally");
        return;
    };
    match tx.try_send(NetCommand::Publish(event)) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            app.set_feedback("Network busy, change kept locally");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            app.connected = false;
            app.set_feedback("Live updates disconnected, change kept locally");
        }
    }
}

async fn refresh(app: &mut App, api: &ApiClient) {
    match api.list_tasks().await {
        Ok(tasks) => {
            app.board.reconcile(&tasks);
            app.clamp_selection();
        }
        Err(e) => {
            tracing::warn!(error = %e, "task refresh failed");
            app.set_feedback(format!("Unable to fetch tasks: {e}"));
        }
    }
    if let Some(id) = app.notes.as_ref().map(|n| n.id.clone()) {
        load_notes(app, api, id).await;
    }
}

async fn load_notes(app: &mut App, api: &ApiClient, id: String) {
    match api.read_notes(&id).await {
        Ok(text) => app.notes = Some(NotesView { id, text }),
        Err(e) => app.set_feedback(format!("Unable to load notes: {e}")),
    }
}
