//! Hot-reloading development proxy library

pub mod bundler;
pub mod cli;
pub mod config;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod reload;
pub mod routing;

pub use config::schema::{BuildConfig, ServerConfig};
pub use handler::{Handler, ModuleLoader, WasmLoader};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use reload::{ReloadOrchestrator, SharedState};
