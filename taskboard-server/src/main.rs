//! Taskboard server: the filesystem task board over HTTP plus the
//! live-update relay.
//!
//! # Usage
//!
//! ```bash
//! # Serve ./tasks on 0.0.0.0:3000, archiving into ./tasksdone
//! cargo run --bin taskboard-server
//!
//! # Custom roots and address
//! cargo run --bin taskboard-server -- --bind 127.0.0.1:8080 \
//!     --tasks-root /srv/tasks --archive-root /srv/tasksdone --layout grouped
//!
//! # Or via environment variables
//! TASKBOARD_ADDR=127.0.0.1:8080 cargo run --bin taskboard-server
//! ```

use clap::Parser;
use taskboard_server::config::{ServerCliArgs, ServerConfig};
use taskboard_server::server::{self, AppState, RouterOptions};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Err(e) = std::fs::create_dir_all(&config.tasks_root) {
        tracing::error!(
            path = %config.tasks_root.display(),
            error = %e,
            "failed to create tasks root"
        );
        std::process::exit(1);
    }

    tracing::info!(
        addr = %config.bind_addr,
        tasks_root = %config.tasks_root.display(),
        archive_root = %config.archive_root.display(),
        layout = ?config.layout,
        "starting taskboard server"
    );

    let state = AppState::from_config(&config);
    let relay = state.relay.clone();
    let options = RouterOptions::from_config(&config);

    match server::start_server(&config.bind_addr, state, &options).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "server listening");
            tokio::select! {
                result = handle => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "server task failed");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutting down");
                    relay.close_all_connections().await;
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
