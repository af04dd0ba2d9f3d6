//! Network layer subsystem.
//!
//! Plain TCP is bound directly by the HTTP server; this module only prepares
//! the optional rustls configuration used when a certificate and key are
//! given on the command line.

pub mod tls;

pub use tls::load_tls_config;
