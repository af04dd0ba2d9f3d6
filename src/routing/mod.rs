//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (on every reload):
//!     api_config().routes  { "items/{id}": { "GET": {...} }, ... }
//!     → pattern.rs (rewrite {param} into single-segment captures)
//!     → router.rs (ordered RouteDescriptor list)
//!     → published together with the handler instance
//!
//! Incoming Request (path, method)
//!     → router.rs (first descriptor supporting the method whose pattern matches)
//!     → MatchResult { resource_path, path_parameters }
//!     → or the raw path with no parameters
//! ```
//!
//! # Design Decisions
//! - Routes compiled on reload, immutable while serving
//! - Deterministic: same input always matches same route
//! - First match wins (declaration order)
//! - No 404 at this layer; unmatched requests still reach the handler

pub mod pattern;
pub mod router;

pub use pattern::{PathPattern, RouteCompileError};
pub use router::{MatchResult, RouteDescriptor, RouteTable};
