//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router (one catch-all handler, no 404s at this layer)
//! - Wire up middleware (tracing, request ID, optional CORS, body limit)
//! - Serve over plain TCP or rustls
//! - Dispatch requests to the currently published handler

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::Response,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::handler::{Done, InvocationError};
use crate::http::{request, response};
use crate::lifecycle::Shutdown;
use crate::net::tls::load_tls_config;
use crate::observability::metrics;
use crate::reload::SharedState;
use crate::routing::MatchResult;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load TLS certificate or key: {0}")]
    Tls(#[source] std::io::Error),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub shared: SharedState,
    pub handler_timeout: Duration,
}

/// HTTP front end for the hot-reloaded handler.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving whatever `shared` currently holds.
    pub fn new(config: ServerConfig, shared: SharedState) -> Self {
        let state = AppState {
            shared,
            handler_timeout: config.handler_timeout,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let router = Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.body_limit))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        if config.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// The router, for serving on a custom listener or in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn serve(self, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = self.config.bind_address;
        match self.config.tls.clone() {
            Some(tls) => {
                let rustls = load_tls_config(&tls)
                    .await
                    .map_err(ServerError::Tls)?;
                tracing::info!(address = %addr, "Server listening (https)");

                let handle = axum_server::Handle::new();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    shutdown.triggered().await;
                    shutdown_handle.graceful_shutdown(Some(Duration::from_secs(5)));
                });

                axum_server::bind_rustls(addr, rustls)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await?;
                tracing::info!("HTTP server stopped");
                Ok(())
            }
            None => {
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|source| ServerError::Bind { addr, source })?;
                self.run(listener, shutdown).await
            }
        }
    }

    /// Serve plain HTTP on an already bound listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Server listening (http)");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.triggered().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: match, build the event, invoke, translate the outcome.
async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, axum::extract::rejection::BytesRejection>,
) -> Response {
    let start = Instant::now();
    let path = uri.path().to_string();

    // One snapshot for the whole request, whatever reloads happen meanwhile.
    let Some(snapshot) = state.shared.load() else {
        tracing::warn!(method = %method, path = %path, "Request before any handler was loaded");
        metrics::record_request(method.as_str(), 503, "unloaded", start);
        return response::error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Handler is not loaded yet; waiting for the first successful build",
        );
    };

    let bytes = match body {
        Ok(bytes) => bytes,
        Err(rejection) => {
            let status = rejection.status();
            metrics::record_request(method.as_str(), status.as_u16(), "rejected", start);
            return response::error_response(status, rejection.body_text());
        }
    };

    let body = match request::parse_body(&headers, &bytes) {
        Ok(body) => body,
        Err(e) => {
            metrics::record_request(method.as_str(), e.status().as_u16(), "rejected", start);
            return response::error_response(e.status(), e.to_string());
        }
    };

    let (matched, route_label) = match snapshot.routes.lookup(&path, method.as_str()) {
        Some(matched) => {
            let label = matched.resource_path.clone();
            (matched, label)
        }
        None => (MatchResult::unmatched(&path), "unmatched".to_string()),
    };

    tracing::debug!(
        method = %method,
        path = %path,
        resource_path = %matched.resource_path,
        generation = snapshot.generation,
        "Dispatching request"
    );

    let event = request::build_event(&method, &headers, &uri, body, matched);
    let (done, completion) = Done::channel();
    snapshot.handler.proxy_router(event, done);
    let outcome = completion.wait(state.handler_timeout).await;

    match &outcome {
        Ok(_) => {}
        Err(InvocationError::Handler(e)) => {
            tracing::warn!(method = %method, path = %path, error = %e, "Handler reported an error")
        }
        Err(e) => tracing::error!(method = %method, path = %path, error = %e, "Handler invocation failed"),
    }

    let response = response::into_response(outcome);
    metrics::record_request(method.as_str(), response.status().as_u16(), &route_label, start);
    response
}
