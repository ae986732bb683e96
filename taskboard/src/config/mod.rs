//! Configuration system for the Taskboard client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

/// Errors loading the client configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists (or was named explicitly) but could not be read.
    #[error("cannot read {path}: {source}")]
    ReadFile {
        /// The config file.
        path: PathBuf,
        /// Why reading failed.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid client config: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    network: NetworkFileConfig,
    cache: CacheFileConfig,
    ui: UiFileConfig,
}

/// `[network]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NetworkFileConfig {
    server_url: Option<String>,
    channel_capacity: Option<usize>,
}

/// `[cache]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct CacheFileConfig {
    path: Option<PathBuf>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
    feedback_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL of the server; the live-update URL is derived from it.
    pub server_url: String,
    /// Capacity of the live-update command and event channels.
    pub channel_capacity: usize,
    /// Where the merged task list is cached between runs.
    pub cache_path: PathBuf,
    /// How long the TUI waits for a key before redrawing.
    pub poll_timeout: Duration,
    /// How long a feedback message stays on screen.
    pub feedback_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            channel_capacity: 256,
            cache_path: default_cache_path(),
            poll_timeout: Duration::from_millis(50),
            feedback_timeout: Duration::from_secs(3),
        }
    }
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("taskboard")
        .join("tasks.json")
}

impl ClientConfig {
    /// Resolves the configuration from the CLI (and env) over the TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a `--config` file is unreadable, or if any
    /// config file fails to parse.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = read_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            server_url: cli
                .server_url
                .clone()
                .or_else(|| file.network.server_url.clone())
                .unwrap_or(defaults.server_url),
            channel_capacity: file
                .network
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            cache_path: cli
                .cache_path
                .clone()
                .or_else(|| file.cache.path.clone())
                .unwrap_or(defaults.cache_path),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            feedback_timeout: file
                .ui
                .feedback_secs
                .map_or(defaults.feedback_timeout, Duration::from_secs),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal client for the Taskboard task board")]
pub struct CliArgs {
    /// Base URL of the Taskboard server.
    #[arg(long, env = "TASKBOARD_URL")]
    pub server_url: Option<String>,

    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path of the local task cache.
    #[arg(long)]
    pub cache_path: Option<PathBuf>,

    /// Tracing filter directive for the log file, e.g. `debug` or `taskboard=trace`.
    #[arg(long, default_value = "info", env = "TASKBOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskboard.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Run a single command instead of the interactive board.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// One-shot commands for scripted use.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print every task with its cached workflow state.
    List,
    /// List the contents of a task folder.
    Ls {
        /// Task id, optionally followed by a sub-folder path.
        path: String,
    },
    /// Read or modify a task's notes log.
    Notes {
        #[command(subcommand)]
        action: NotesCommand,
    },
    /// Record a workflow state change in a task's notes log.
    Status {
        /// Task id.
        id: String,
        /// Previous state label.
        from: String,
        /// New state label.
        to: String,
    },
    /// Upload a file into a task folder.
    Upload {
        /// Destination task id or folder path.
        folder: String,
        /// Local file to upload.
        file: PathBuf,
        /// Replace an existing file with the same name.
        #[arg(long)]
        overwrite: bool,
    },
    /// Move a task to the archive.
    Move {
        /// Task id.
        id: String,
    },
    /// Report whether this machine may archive tasks and clear notes.
    CheckIp,
    /// List live-update connections.
    Users,
}

/// Notes subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum NotesCommand {
    /// Print the notes log.
    Show {
        /// Task id.
        id: String,
    },
    /// Append a line to the notes log.
    Add {
        /// Task id.
        id: String,
        /// Text to append.
        text: String,
    },
    /// Delete the notes log.
    Clear {
        /// Task id.
        id: String,
    },
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Reads the explicit config file, or the per-user default if it exists.
fn read_config_file(explicit: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match dirs::config_dir() {
            Some(dir) => (dir.join("taskboard").join("config.toml"), false),
            None => return Ok(ConfigFile::default()),
        },
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(source) if !required && source.kind() == std::io::ErrorKind::NotFound => {
            Ok(ConfigFile::default())
        }
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}
