//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse flags → Load build config → Start bundler → Start orchestrator → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → bundler, orchestrator and server stop
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last, after the first reload has had a chance to run
//! - Requests that arrive before a handler is loaded get 503, not a hang

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
