//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! build config file (TOML)
//!     → loader.rs (parse, deserialize, resolve relative paths)
//!     → validation.rs (semantic checks)
//!     → BuildConfig (validated, immutable)
//!     → bundler + reload orchestrator
//!
//! command-line flags
//!     → cli.rs
//!     → ServerConfig
//!     → http server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the handler reloads, the config does not
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{BuildConfig, CommandConfig, OutputConfig, ServerConfig, TlsConfig};
