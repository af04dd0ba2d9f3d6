//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, catch-all dispatch)
//!     → request.rs (headers, query, body → InvocationEvent)
//!     → [routing table picks resource path + params]
//!     → [handler.proxy_router, callback awaited with timeout]
//!     → response.rs (status, headers, body → HTTP response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer, ServerError};
