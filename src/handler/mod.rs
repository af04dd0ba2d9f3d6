//! Handler module subsystem.
//!
//! # Data Flow
//! ```text
//! Build artifact (bytes + filename)
//!     → ModuleLoader::load (fresh, isolated instance)
//!     → Arc<dyn Handler>
//!         api_config()              → ApiConfig { routes }
//!         proxy_router(event, done) → done.done(Ok(response) | Err(error))
//! ```
//!
//! # Design Decisions
//! - Every load yields a brand-new instance; nothing is shared with the
//!   previous generation
//! - Invocation is callback-style: the handler may call `done` after
//!   `proxy_router` has returned
//! - The loader reports failures; recovery policy belongs to the reload layer

pub mod completion;
pub mod event;
pub mod wasm;

use std::sync::Arc;

use thiserror::Error;

pub use completion::{Completion, Done, InvocationError};
pub use event::{
    ApiConfig, HandlerError, HandlerOutcome, InvocationEvent, InvocationResponse, RequestContext,
};
pub use wasm::WasmLoader;

/// One loaded version of the user's routing/dispatch module.
pub trait Handler: Send + Sync + 'static {
    /// The module's declared route configuration.
    fn api_config(&self) -> Result<ApiConfig, HandlerError>;

    /// Dispatch one event; the handler must eventually resolve `done`.
    fn proxy_router(&self, event: InvocationEvent, done: Done);
}

/// Turns build output into handler instances.
pub trait ModuleLoader: Send + Sync + 'static {
    fn load(&self, source: &[u8], filename: &str) -> Result<Arc<dyn Handler>, ModuleLoadError>;
}

/// Build output could not be turned into a handler instance.
#[derive(Debug, Error)]
#[error("failed to load module '{filename}': {cause}")]
pub struct ModuleLoadError {
    pub filename: String,
    pub cause: String,
}

impl ModuleLoadError {
    pub fn new(filename: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self {
            filename: filename.into(),
            cause: cause.to_string(),
        }
    }
}
