//! Hot-reloading development proxy
//!
//! Serves a user-supplied request handler over HTTP and swaps it for the
//! freshly built version every time the bundler emits a new artifact.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────────────┐
//!                      │                    HOT-RELOAD PROXY                       │
//!                      │                                                           │
//!   source changes ────┼─▶┌──────────┐  BuildEvent  ┌─────────────┐                │
//!                      │  │ bundler  │─────────────▶│   reload    │                │
//!   build output   ────┼─▶│ watchers │              │orchestrator │                │
//!                      │  └──────────┘              └──────┬──────┘                │
//!                      │                                   │ load + api_config     │
//!                      │                                   ▼                       │
//!                      │                            ┌─────────────┐                │
//!                      │                            │ SharedState │ (ArcSwap)      │
//!                      │                            │handler+routes│               │
//!                      │                            └──────┬──────┘                │
//!                      │                                   │ snapshot per request  │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌───▼──────┐               │
//!   ───────────────────┼─▶│  http   │──▶│ routing  │──▶│ handler  │               │
//!                      │  │ server  │   │  table   │   │proxy_    │               │
//!   Client Response    │  │         │◀──┤ response │◀──│router    │               │
//!   ◀──────────────────┼──│         │   │ adapter  │   │ + done() │               │
//!                      │  └─────────┘   └──────────┘   └──────────┘               │
//!                      │                                                           │
//!                      │  ┌─────────────────────────────────────────────────────┐  │
//!                      │  │              Cross-Cutting Concerns                 │  │
//!                      │  │   config   observability   lifecycle   net (tls)    │  │
//!                      │  └─────────────────────────────────────────────────────┘  │
//!                      └───────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use hotreload_proxy::bundler::Bundler;
use hotreload_proxy::cli::Cli;
use hotreload_proxy::config::load_config;
use hotreload_proxy::handler::WasmLoader;
use hotreload_proxy::http::HttpServer;
use hotreload_proxy::lifecycle::{wait_for_signal, Shutdown};
use hotreload_proxy::observability::{logging, metrics};
use hotreload_proxy::reload::{ReloadOrchestrator, SharedState};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Fatal error");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("hotreload-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let build_config = load_config(&cli.config)?;
    let server_config = cli.server_config();

    tracing::info!(
        config = %cli.config.display(),
        entry = %build_config.output.entry_path().display(),
        build_command = %build_config.build.as_ref().map(|b| b.display()).unwrap_or_default(),
        bind_address = %server_config.bind_address,
        tls = server_config.tls.is_some(),
        "Configuration loaded"
    );

    if let Some(addr) = server_config.metrics_address {
        metrics::init_metrics(addr);
    }

    let shutdown = Shutdown::new();
    let state = SharedState::new();

    let orchestrator = ReloadOrchestrator::new(
        build_config.output.filename.clone(),
        Arc::new(WasmLoader::new()?.with_call_timeout(server_config.handler_timeout)),
        state.clone(),
    );

    let working_dir = match cli.config.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let (bundler, events) = Bundler::new(build_config, &working_dir);

    let orchestrator_task = tokio::spawn(orchestrator.run(events, shutdown.subscribe()));
    let bundler_task = bundler.start(&shutdown).await?;

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(server_config, state);
    let result = server.serve(shutdown.clone()).await;

    // Stop the background tasks even if the server failed on its own.
    shutdown.trigger();
    let _ = tokio::join!(orchestrator_task, bundler_task);

    result?;
    Ok(())
}
