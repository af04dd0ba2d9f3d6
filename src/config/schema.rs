//! Configuration schema definitions.
//!
//! `BuildConfig` is read from the TOML file passed with `--config`;
//! `ServerConfig` is assembled from command-line flags.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root of the build configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Where the handler artifact is written.
    pub output: OutputConfig,

    /// Optional build command re-run on source changes.
    #[serde(default)]
    pub build: Option<CommandConfig>,
}

/// Build output location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory (relative paths resolve against the config file).
    pub path: PathBuf,

    /// Entry artifact file name; emissions of this file trigger reloads.
    pub filename: String,
}

impl OutputConfig {
    /// Full path of the entry artifact.
    pub fn entry_path(&self) -> PathBuf {
        self.path.join(&self.filename)
    }
}

/// External build command settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    /// Program and arguments, e.g. `["cargo", "build"]`.
    pub command: Vec<String>,

    /// Source paths whose changes trigger a rebuild.
    #[serde(default)]
    pub watch: Vec<PathBuf>,

    /// Quiet period before reacting to file changes.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl CommandConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Command line for logs.
    pub fn display(&self) -> String {
        self.command.join(" ")
    }
}

fn default_debounce_ms() -> u64 {
    200
}

/// Debounce used for output-directory events when no build command is set.
pub const DEFAULT_OUTPUT_DEBOUNCE: Duration = Duration::from_millis(100);

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub bind_address: SocketAddr,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Enable permissive CORS.
    pub cors: bool,

    /// How long a handler may take to call back.
    pub handler_timeout: Duration,

    /// Maximum request body size in bytes.
    pub body_limit: usize,

    /// Optional Prometheus listener.
    pub metrics_address: Option<SocketAddr>,
}

/// TLS certificate and key (PEM).
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            tls: None,
            cors: false,
            handler_timeout: Duration::from_secs(30),
            body_limit: 50 * 1024 * 1024, // 50MB
            metrics_address: None,
        }
    }
}
