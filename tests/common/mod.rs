//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hotreload_proxy::bundler::BuildEvent;
use hotreload_proxy::config::ServerConfig;
use hotreload_proxy::handler::{
    ApiConfig, Done, Handler, HandlerError, InvocationEvent, InvocationResponse, WasmLoader,
};
use hotreload_proxy::http::HttpServer;
use hotreload_proxy::lifecycle::Shutdown;
use hotreload_proxy::reload::{ReloadOrchestrator, SharedState};
use hotreload_proxy::routing::RouteTable;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const ENTRY: &str = "handler.wat";

/// WebAssembly text fixture from `tests/fixtures`.
pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {:?}: {}", path, e))
}

/// Build event for the entry artifact.
pub fn emitted(source: &str) -> BuildEvent {
    BuildEvent::AssetEmitted {
        file: ENTRY.to_string(),
        content: source.as_bytes().to_vec(),
    }
}

/// Wasm loader with short execution limits.
pub fn loader() -> WasmLoader {
    WasmLoader::new()
        .unwrap()
        .with_load_timeout(Duration::from_millis(200))
        .with_call_timeout(Duration::from_millis(200))
}

/// Orchestrator backed by the wasm loader and an empty state.
pub fn orchestrator() -> ReloadOrchestrator {
    ReloadOrchestrator::new(ENTRY, Arc::new(loader()), SharedState::new())
}

/// Orchestrator with `fixture` already loaded.
pub async fn loaded(fixture_name: &str) -> ReloadOrchestrator {
    let orchestrator = orchestrator();
    orchestrator
        .handle(emitted(&fixture(fixture_name)))
        .await
        .expect("entry artifact should reload")
        .expect("fixture should load");
    orchestrator
}

/// Publish a native handler with the given route configuration.
pub fn publish(state: &SharedState, handler: impl Handler, routes: Value) -> u64 {
    let routes = RouteTable::compile(routes.as_object()).expect("valid routes");
    state.publish(Arc::new(handler), routes, "native").generation
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        handler_timeout: Duration::from_secs(5),
        ..ServerConfig::default()
    }
}

/// Serve `state` on an ephemeral port; returns the base URL.
pub async fn start_proxy(state: SharedState, config: ServerConfig, shutdown: Shutdown) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, state);

    tokio::spawn(async move {
        server.run(listener, shutdown).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Handler that never resolves its callback but keeps it alive.
#[derive(Default)]
pub struct HangingHandler {
    pending: Mutex<Vec<Done>>,
}

impl Handler for HangingHandler {
    fn api_config(&self) -> Result<ApiConfig, HandlerError> {
        Ok(ApiConfig::default())
    }

    fn proxy_router(&self, _event: InvocationEvent, done: Done) {
        self.pending.lock().unwrap().push(done);
    }
}

/// Handler that drops its callback without calling it.
pub struct DroppingHandler;

impl Handler for DroppingHandler {
    fn api_config(&self) -> Result<ApiConfig, HandlerError> {
        Ok(ApiConfig::default())
    }

    fn proxy_router(&self, _event: InvocationEvent, done: Done) {
        drop(done);
    }
}

/// Handler that answers from a spawned task, after `proxy_router` returned.
pub struct DeferredHandler {
    pub delay: Duration,
}

impl Handler for DeferredHandler {
    fn api_config(&self) -> Result<ApiConfig, HandlerError> {
        Ok(ApiConfig::default())
    }

    fn proxy_router(&self, event: InvocationEvent, done: Done) {
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            done.succeed(InvocationResponse {
                status_code: Some(202),
                headers: None,
                body: Some(json!({
                    "resourcePath": event.request_context.resource_path,
                    "pathParameters": event.path_parameters,
                })),
            });
        });
    }
}
