//! Configuration system for the Taskboard server.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard-server/config.toml`)
//! 4. Compiled defaults

use std::net::IpAddr;
use std::path::PathBuf;

use crate::archive::ArchiveStrategy;
use crate::store::TaskLayout;

/// Errors that can occur when loading server configuration.
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
    #[error("invalid server config: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// An allow-list entry is not an IP address.
    #[error("invalid allowed IP address: {0}")]
    InvalidAllowedIp(String),

    /// The notes timestamp format contains an unknown specifier.
    #[error("invalid timestamp format: {0}")]
    InvalidTimestampFormat(String),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerFileConfig,
    storage: StorageFileConfig,
    access: AccessFileConfig,
    notes: NotesFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    public_dir: Option<PathBuf>,
    max_frame_size: Option<usize>,
    max_upload_size: Option<usize>,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    tasks_root: Option<PathBuf>,
    archive_root: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
    layout: Option<TaskLayout>,
    category_label: Option<String>,
    archive_strategy: Option<ArchiveStrategy>,
}

/// `[access]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AccessFileConfig {
    allowed_ips: Option<Vec<String>>,
    trust_forwarded_for: Option<bool>,
}

/// `[notes]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NotesFileConfig {
    timestamp_format: Option<String>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Taskboard server")]
pub struct ServerCliArgs {
    /// Address to bind the HTTP server to.
    #[arg(short, long, env = "TASKBOARD_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/taskboard-server/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory whose sub-directories are the active tasks.
    #[arg(long, env = "TASKBOARD_TASKS_ROOT")]
    pub tasks_root: Option<PathBuf>,

    /// Directory archived tasks are moved into.
    #[arg(long, env = "TASKBOARD_ARCHIVE_ROOT")]
    pub archive_root: Option<PathBuf>,

    /// Directory holding the static web UI.
    #[arg(long)]
    pub public_dir: Option<PathBuf>,

    /// How task directories are laid out under the tasks root.
    #[arg(long, value_enum)]
    pub layout: Option<TaskLayout>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKBOARD_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to (e.g., `0.0.0.0:3000`).
    pub bind_addr: String,
    /// Static UI directory served for unmatched paths.
    pub public_dir: PathBuf,
    /// Maximum accepted live-update frame size in bytes.
    pub max_frame_size: usize,
    /// Maximum accepted upload request body in bytes.
    pub max_upload_size: usize,
    /// Root of the active task tree.
    pub tasks_root: PathBuf,
    /// Root of the archived task tree.
    pub archive_root: PathBuf,
    /// Where uploads are written before being moved into place.
    pub staging_dir: PathBuf,
    /// Task directory layout.
    pub layout: TaskLayout,
    /// Category assigned to every task in the flat layout.
    pub category_label: String,
    /// How archive moves are performed.
    pub archive_strategy: ArchiveStrategy,
    /// Caller addresses allowed to perform gated operations.
    pub allowed_ips: Vec<IpAddr>,
    /// Whether `X-Forwarded-For` identifies the caller.
    pub trust_forwarded_for: bool,
    /// chrono format string for note timestamps.
    pub timestamp_format: String,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            public_dir: PathBuf::from("public"),
            max_frame_size: 64 * 1024,
            max_upload_size: 100 * 1024 * 1024,
            tasks_root: PathBuf::from("tasks"),
            archive_root: PathBuf::from("tasksdone"),
            staging_dir: std::env::temp_dir().join("taskboard-uploads"),
            layout: TaskLayout::Flat,
            category_label: crate::store::DEFAULT_CATEGORY_LABEL.to_string(),
            archive_strategy: ArchiveStrategy::Recursive,
            allowed_ips: vec![
                IpAddr::from([127, 0, 0, 1]),
                IpAddr::from(std::net::Ipv6Addr::LOCALHOST),
            ],
            trust_forwarded_for: true,
            timestamp_format: crate::notes::DEFAULT_TIMESTAMP_FORMAT.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and missing file
    /// is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read or
    /// parsed, an allow-list entry is not an IP address, or the timestamp
    /// format is invalid.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = read_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `ServerConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &ServerCliArgs, file: &ServerConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let allowed_ips = match &file.access.allowed_ips {
            Some(entries) => entries
                .iter()
                .map(|s| {
                    s.parse::<IpAddr>()
                        .map(|ip| ip.to_canonical())
                        .map_err(|_| ConfigError::InvalidAllowedIp(s.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.allowed_ips,
        };

        let timestamp_format = file
            .notes
            .timestamp_format
            .clone()
            .unwrap_or(defaults.timestamp_format);
        if !crate::notes::is_valid_timestamp_format(&timestamp_format) {
            return Err(ConfigError::InvalidTimestampFormat(timestamp_format));
        }

        Ok(Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            public_dir: cli
                .public_dir
                .clone()
                .or_else(|| file.server.public_dir.clone())
                .unwrap_or(defaults.public_dir),
            max_frame_size: file
                .server
                .max_frame_size
                .unwrap_or(defaults.max_frame_size),
            max_upload_size: file
                .server
                .max_upload_size
                .unwrap_or(defaults.max_upload_size),
            tasks_root: cli
                .tasks_root
                .clone()
                .or_else(|| file.storage.tasks_root.clone())
                .unwrap_or(defaults.tasks_root),
            archive_root: cli
                .archive_root
                .clone()
                .or_else(|| file.storage.archive_root.clone())
                .unwrap_or(defaults.archive_root),
            staging_dir: file
                .storage
                .staging_dir
                .clone()
                .unwrap_or(defaults.staging_dir),
            layout: cli
                .layout
                .or(file.storage.layout)
                .unwrap_or(defaults.layout),
            category_label: file
                .storage
                .category_label
                .clone()
                .unwrap_or(defaults.category_label),
            archive_strategy: file
                .storage
                .archive_strategy
                .unwrap_or(defaults.archive_strategy),
            allowed_ips,
            trust_forwarded_for: file
                .access
                .trust_forwarded_for
                .unwrap_or(defaults.trust_forwarded_for),
            timestamp_format,
            log_level: cli.log_level.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file for the server.
fn read_config_file(explicit: Option<&std::path::Path>) -> Result<ServerConfigFile, ConfigError> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match dirs::config_dir() {
            Some(dir) => (dir.join("taskboard-server").join("config.toml"), false),
            None => return Ok(ServerConfigFile::default()),
        },
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(source) if !required && source.kind() == std::io::ErrorKind::NotFound => {
            Ok(ServerConfigFile::default())
        }
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}
