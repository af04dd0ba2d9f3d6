//! Hot reload subsystem.
//!
//! # Data Flow
//! ```text
//! bundler emits BuildEvent
//!     → orchestrator.rs (filter for the entry artifact)
//!     → ModuleLoader::load (new handler instance)
//!     → handler.api_config() → RouteTable::compile
//!     → state.rs (atomic publish of handler + routes)
//!     → requests observe the new snapshot
//! ```
//!
//! # Design Decisions
//! - Single writer (the orchestrator), many lock-free readers
//! - Failed reloads never crash the server and never touch in-flight requests

pub mod orchestrator;
pub mod state;

pub use orchestrator::{ReloadError, ReloadOrchestrator};
pub use state::{AppSnapshot, SharedState};
