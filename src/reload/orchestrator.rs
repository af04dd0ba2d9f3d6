//! Reload orchestration.
//!
//! # State Transitions
//! ```text
//! Uninitialized ──(entry emitted, load ok, routes ok)──▶ Loaded
//! Loaded ──(entry emitted, load ok, routes ok)──▶ Loaded'
//! any state ──(load or route failure)──▶ same state
//! ```
//!
//! # Design Decisions
//! - Only the configured entry artifact triggers a reload
//! - Module compilation runs on the blocking pool; requests keep flowing
//! - A failed reload keeps the previous snapshot (handler AND routes)
//! - Build completion notices are logged only

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::bundler::{BuildEvent, BuildStats};
use crate::handler::{HandlerError, ModuleLoadError, ModuleLoader};
use crate::observability::metrics;
use crate::reload::state::{AppSnapshot, SharedState};
use crate::routing::{RouteCompileError, RouteTable};

/// A reload attempt that did not publish a new snapshot.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Load(#[from] ModuleLoadError),

    #[error("api_config() failed in '{filename}': {source}")]
    ApiConfig {
        filename: String,
        #[source]
        source: HandlerError,
    },

    #[error("invalid routes in '{filename}': {source}")]
    Routes {
        filename: String,
        #[source]
        source: RouteCompileError,
    },

    #[error("reload task failed: {0}")]
    Task(String),
}

/// Drives module loading and route compilation from build notifications.
#[derive(Clone)]
pub struct ReloadOrchestrator {
    entry: String,
    loader: Arc<dyn ModuleLoader>,
    state: SharedState,
}

impl ReloadOrchestrator {
    /// `entry` is the output filename that identifies the handler artifact.
    pub fn new(entry: impl Into<String>, loader: Arc<dyn ModuleLoader>, state: SharedState) -> Self {
        Self {
            entry: entry.into(),
            loader,
            state,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Whether an emitted artifact is the configured entry output.
    pub fn is_entry(&self, file: &str) -> bool {
        file.replace('\\', "/") == self.entry
    }

    /// Load `source`, compile its routes and publish both.
    pub fn reload(&self, source: &[u8], filename: &str) -> Result<Arc<AppSnapshot>, ReloadError> {
        let handler = self.loader.load(source, filename)?;

        let config = handler.api_config().map_err(|source| ReloadError::ApiConfig {
            filename: filename.to_string(),
            source,
        })?;

        let routes = RouteTable::compile(config.routes.as_ref()).map_err(|source| ReloadError::Routes {
            filename: filename.to_string(),
            source,
        })?;

        Ok(self.state.publish(handler, routes, filename))
    }

    /// React to one bundler notification.
    ///
    /// Returns `None` when the notification does not trigger a reload.
    pub async fn handle(&self, event: BuildEvent) -> Option<Result<Arc<AppSnapshot>, ReloadError>> {
        match event {
            BuildEvent::Done(stats) => {
                log_build(&stats);
                None
            }
            BuildEvent::AssetEmitted { file, content } => {
                if !self.is_entry(&file) {
                    tracing::debug!(file = %file, entry = %self.entry, "Ignoring emitted asset");
                    return None;
                }

                tracing::info!(file = %file, bytes = content.len(), "Reloading handler");
                let start = Instant::now();
                let this = self.clone();
                let result = tokio::task::spawn_blocking(move || this.reload(&content, &file))
                    .await
                    .unwrap_or_else(|e| Err(ReloadError::Task(e.to_string())));

                match &result {
                    Ok(snapshot) => {
                        metrics::record_reload(true, snapshot.generation);
                        tracing::info!(
                            generation = snapshot.generation,
                            routes = snapshot.routes.len(),
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "Handler reloaded"
                        );
                        for route in snapshot.routes.routes() {
                            tracing::debug!(
                                resource_path = %route.resource_path,
                                methods = ?route.supported_methods,
                                "Route registered"
                            );
                        }
                    }
                    Err(e) => {
                        metrics::record_reload(false, 0);
                        if self.state.is_loaded() {
                            tracing::error!(error = %e, "Reload failed; keeping the previous handler");
                        } else {
                            tracing::error!(error = %e, "Reload failed; no handler loaded yet");
                        }
                    }
                }
                Some(result)
            }
        }
    }

    /// Consume bundler notifications until shutdown or until the bundler stops.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<BuildEvent>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(entry = %self.entry, "Reload orchestrator started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle(event).await;
                    }
                    None => {
                        tracing::warn!("Bundler stopped; no further reloads");
                        break;
                    }
                },
            }
        }
        tracing::debug!("Reload orchestrator stopped");
    }
}

fn log_build(stats: &BuildStats) {
    if stats.success {
        tracing::info!(
            command = %stats.command,
            elapsed_ms = stats.duration.as_millis() as u64,
            "Build finished"
        );
    } else {
        tracing::warn!(
            command = %stats.command,
            elapsed_ms = stats.duration.as_millis() as u64,
            "Build failed\n{}",
            stats.output
        );
    }
    if stats.success && !stats.output.trim().is_empty() {
        tracing::debug!("Build output\n{}", stats.output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::handler::WasmLoader;

    const ITEMS: &str = include_str!("../../tests/fixtures/items.wat");
    const ECHO: &str = include_str!("../../tests/fixtures/echo.wat");
    const SPIN_CONFIG: &str = include_str!("../../tests/fixtures/spin_config.wat");

    fn orchestrator() -> ReloadOrchestrator {
        let loader = WasmLoader::new().unwrap().with_load_timeout(Duration::from_millis(50));
        ReloadOrchestrator::new("handler.wat", Arc::new(loader), SharedState::new())
    }

    fn emitted(file: &str, source: &str) -> BuildEvent {
        BuildEvent::AssetEmitted {
            file: file.to_string(),
            content: source.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_reload_publishes_routes_and_handler() {
        let orchestrator = orchestrator();
        let snapshot = orchestrator.handle(emitted("handler.wat", ITEMS)).await.unwrap().unwrap();

        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.filename, "handler.wat");
        assert_eq!(snapshot.routes.routes()[0].resource_path, "/items/{id}");
        assert!(orchestrator.state().is_loaded());
    }

    #[tokio::test]
    async fn test_other_assets_ignored() {
        let orchestrator = orchestrator();
        assert!(orchestrator.handle(emitted("vendor.wat", ITEMS)).await.is_none());
        assert!(!orchestrator.state().is_loaded());
    }

    #[tokio::test]
    async fn test_build_done_does_not_reload() {
        let orchestrator = orchestrator();
        let stats = BuildStats {
            command: "make".into(),
            success: false,
            duration: Duration::from_millis(5),
            output: "error: nope".into(),
        };
        assert!(orchestrator.handle(BuildEvent::Done(stats)).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let orchestrator = orchestrator();
        orchestrator.handle(emitted("handler.wat", ITEMS)).await.unwrap().unwrap();

        let result = orchestrator.handle(emitted("handler.wat", "(module")).await.unwrap();
        assert!(matches!(result, Err(ReloadError::Load(_))));

        let current = orchestrator.state().load().unwrap();
        assert_eq!(current.generation, 1);
        assert_eq!(current.routes.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_first_reload_stays_unloaded() {
        let orchestrator = orchestrator();
        let result = orchestrator.handle(emitted("handler.wat", "not a module")).await.unwrap();
        assert!(result.is_err());
        assert!(!orchestrator.state().is_loaded());
    }

    #[tokio::test]
    async fn test_identical_reloads_are_equivalent() {
        let orchestrator = orchestrator();
        let first = orchestrator.handle(emitted("handler.wat", ECHO)).await.unwrap().unwrap();
        let second = orchestrator.handle(emitted("handler.wat", ECHO)).await.unwrap().unwrap();

        assert_eq!(second.generation, 2);
        for (path, method) in [("/items/7", "GET"), ("/echo/x/y", "POST"), ("/nope", "GET")] {
            assert_eq!(
                first.routes.match_route(path, method),
                second.routes.match_route(path, method)
            );
        }
    }

    #[tokio::test]
    async fn test_run_stops_when_bundler_closes() {
        let orchestrator = orchestrator();
        let state = orchestrator.state().clone();
        let (tx, rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tx.send(emitted("handler.wat", ITEMS)).unwrap();
        drop(tx);

        orchestrator.run(rx, shutdown_rx).await;
        assert!(state.is_loaded());
    }

    #[tokio::test]
    async fn test_spinning_build_does_not_block_later_reloads() {
        let orchestrator = orchestrator();
        let state = orchestrator.state().clone();
        let (tx, rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tx.send(emitted("handler.wat", SPIN_CONFIG)).unwrap();
        tx.send(emitted("handler.wat", ITEMS)).unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(10), orchestrator.run(rx, shutdown_rx))
            .await
            .expect("orchestrator should get past the spinning build");
        let snapshot = state.load().unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.routes.len(), 1);
    }

    #[tokio::test]
    async fn test_spinning_api_config_keeps_previous_snapshot() {
        let orchestrator = orchestrator();
        orchestrator.handle(emitted("handler.wat", ITEMS)).await.unwrap().unwrap();

        let result = orchestrator.handle(emitted("handler.wat", SPIN_CONFIG)).await.unwrap();
        assert!(matches!(result, Err(ReloadError::ApiConfig { .. })));
        assert_eq!(orchestrator.state().load().unwrap().generation, 1);
    }
}
