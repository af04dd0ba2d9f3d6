//! Bundler collaborator.
//!
//! # Data Flow
//! ```text
//! source paths change (build.watch)
//!     → watcher.rs (notify, debounced)
//!     → command.rs (run build.command)
//!     → BuildEvent::Done(BuildStats)
//!
//! output directory changes (output.path)
//!     → watcher.rs (notify, debounced)
//!     → read each changed file
//!     → BuildEvent::AssetEmitted { file, content }
//! ```
//!
//! # Design Decisions
//! - The bundler knows nothing about handlers; it only reports builds and
//!   emitted files, and the reload orchestrator decides what matters
//! - Files already present at startup are emitted once, like an initial build
//! - Builds never overlap; changes during a build queue the next one
//! - Without a build command the crate only watches the output directory,
//!   leaving the build to an external watcher

pub mod command;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::schema::{BuildConfig, DEFAULT_OUTPUT_DEBOUNCE};
use crate::lifecycle::Shutdown;

/// Notification from the bundler.
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// A file was written to the output directory.
    AssetEmitted {
        /// Path relative to the output directory, `/`-separated.
        file: String,
        content: Vec<u8>,
    },
    /// A build command run finished.
    Done(BuildStats),
}

/// Result of one build command run.
#[derive(Debug, Clone)]
pub struct BuildStats {
    pub command: String,
    pub success: bool,
    pub duration: Duration,
    /// Combined stdout and stderr.
    pub output: String,
}

#[derive(Debug, Error)]
pub enum BundlerError {
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Watches sources and output, runs builds, and reports what happened.
pub struct Bundler {
    config: BuildConfig,
    working_dir: PathBuf,
    events: mpsc::UnboundedSender<BuildEvent>,
}

impl Bundler {
    /// Create a bundler; `working_dir` is where the build command runs.
    ///
    /// Returns the bundler and a receiver for its notifications.
    pub fn new(config: BuildConfig, working_dir: &Path) -> (Self, mpsc::UnboundedReceiver<BuildEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                config,
                working_dir: working_dir.to_path_buf(),
                events,
            },
            rx,
        )
    }

    /// Install watchers, emit existing output, and spawn the watch loops.
    pub async fn start(self, shutdown: &Shutdown) -> Result<JoinHandle<()>, BundlerError> {
        let output_dir = prepare_output_dir(&self.config.output.path)?;

        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let output_watcher = watcher::watch(&[output_dir.clone()], false, output_tx, |_| true)?;

        let mut watchers = vec![output_watcher];
        let mut build = None;
        if let Some(command_config) = self.config.build.clone() {
            let (source_tx, source_rx) = mpsc::unbounded_channel();
            let ignore = output_dir.clone();
            watchers.push(watcher::watch(&command_config.watch, true, source_tx, move |path| {
                !path.starts_with(&ignore)
            })?);
            build = Some((command_config, source_rx));
        }

        tracing::info!(output = %output_dir.display(), "Watching build output");
        for path in watcher::existing_files(&output_dir) {
            emit_asset(&output_dir, &path, &self.events).await;
        }

        let events = self.events.clone();
        let output_shutdown = shutdown.subscribe();
        let output_debounce = self
            .config
            .build
            .as_ref()
            .map_or(DEFAULT_OUTPUT_DEBOUNCE, |b| b.debounce().min(DEFAULT_OUTPUT_DEBOUNCE));
        let watch_output = output_loop(output_dir, output_rx, output_debounce, events, output_shutdown);

        let watch_sources = build.map(|(command_config, source_rx)| {
            build_loop(
                command_config,
                self.working_dir.clone(),
                source_rx,
                self.events.clone(),
                shutdown.subscribe(),
            )
        });

        Ok(tokio::spawn(async move {
            // Watchers stop delivering events once dropped.
            let _watchers = watchers;
            match watch_sources {
                Some(watch_sources) => {
                    tokio::join!(watch_output, watch_sources);
                }
                None => watch_output.await,
            }
            tracing::debug!("Bundler stopped");
        }))
    }
}

fn prepare_output_dir(path: &Path) -> Result<PathBuf, BundlerError> {
    std::fs::create_dir_all(path).map_err(|source| BundlerError::OutputDir {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::canonicalize(path).map_err(|source| BundlerError::OutputDir {
        path: path.to_path_buf(),
        source,
    })
}

async fn output_loop(
    output_dir: PathBuf,
    mut changes: mpsc::UnboundedReceiver<PathBuf>,
    debounce: Duration,
    events: mpsc::UnboundedSender<BuildEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            batch = watcher::debounced(&mut changes, debounce) => {
                let Some(paths) = batch else { break };
                for path in paths {
                    emit_asset(&output_dir, &path, &events).await;
                }
            }
        }
    }
}

async fn build_loop(
    config: crate::config::CommandConfig,
    working_dir: PathBuf,
    mut changes: mpsc::UnboundedReceiver<PathBuf>,
    events: mpsc::UnboundedSender<BuildEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let stats = command::run_build(&config, &working_dir).await;
    if events.send(BuildEvent::Done(stats)).is_err() {
        return;
    }

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            batch = watcher::debounced(&mut changes, config.debounce()) => {
                let Some(paths) = batch else { break };
                tracing::info!(changed = paths.len(), "Sources changed, rebuilding");
                let stats = command::run_build(&config, &working_dir).await;
                if events.send(BuildEvent::Done(stats)).is_err() {
                    break;
                }
            }
        }
    }
}

async fn emit_asset(output_dir: &Path, path: &Path, events: &mpsc::UnboundedSender<BuildEvent>) {
    let Ok(relative) = path.strip_prefix(output_dir) else {
        tracing::debug!(path = %path.display(), "Ignoring change outside the output directory");
        return;
    };
    let file = relative.to_string_lossy().replace('\\', "/");

    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(file = %file, "Asset removed");
            return;
        }
        Err(e) => {
            tracing::warn!(file = %file, error = %e, "Cannot inspect emitted asset");
            return;
        }
    }

    match tokio::fs::read(path).await {
        Ok(content) => {
            tracing::debug!(file = %file, bytes = content.len(), "Asset emitted");
            let _ = events.send(BuildEvent::AssetEmitted { file, content });
        }
        Err(e) => tracing::warn!(file = %file, error = %e, "Failed to read emitted asset"),
    }
}
