//! Command-line flags.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{ServerConfig, TlsConfig};

#[derive(Debug, Parser)]
#[command(name = "hotreload-proxy")]
#[command(about = "Serve a hot-reloaded request handler over HTTP during development", long_about = None)]
pub struct Cli {
    /// Build configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// TLS certificate (PEM); requires --key
    #[arg(long, value_name = "PATH", requires = "key")]
    pub cert: Option<PathBuf>,

    /// TLS private key (PEM); requires --cert
    #[arg(long, value_name = "PATH", requires = "cert")]
    pub key: Option<PathBuf>,

    /// Answer with permissive CORS headers
    #[arg(long)]
    pub cors: bool,

    /// Seconds a handler may take before the request fails with 504
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Maximum request body size in bytes
    #[arg(long, default_value_t = 50 * 1024 * 1024)]
    pub body_limit: usize,

    /// Serve Prometheus metrics on this address
    #[arg(long, value_name = "ADDR")]
    pub metrics_address: Option<SocketAddr>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// HTTP server settings derived from the flags.
    pub fn server_config(&self) -> ServerConfig {
        let tls = match (&self.cert, &self.key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };

        ServerConfig {
            bind_address: SocketAddr::new(self.host, self.port),
            tls,
            cors: self.cors,
            handler_timeout: Duration::from_secs(self.timeout_secs),
            body_limit: self.body_limit,
            metrics_address: self.metrics_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["hotreload-proxy", "--config", "proxy.toml"]).unwrap();
        let server = cli.server_config();

        assert_eq!(cli.config, PathBuf::from("proxy.toml"));
        assert_eq!(server.bind_address, SocketAddr::from(([0, 0, 0, 0], 3000)));
        assert!(server.tls.is_none());
        assert!(!server.cors);
        assert_eq!(server.handler_timeout, Duration::from_secs(30));
        assert_eq!(server.body_limit, 50 * 1024 * 1024);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "hotreload-proxy",
            "--config",
            "proxy.toml",
            "-p",
            "8443",
            "--host",
            "127.0.0.1",
            "--cert",
            "cert.pem",
            "--key",
            "key.pem",
            "--cors",
            "--timeout-secs",
            "5",
            "--body-limit",
            "1024",
            "--metrics-address",
            "127.0.0.1:9090",
            "-v",
        ])
        .unwrap();
        let server = cli.server_config();

        assert_eq!(server.bind_address, SocketAddr::from(([127, 0, 0, 1], 8443)));
        let tls = server.tls.unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("cert.pem"));
        assert_eq!(tls.key_path, PathBuf::from("key.pem"));
        assert!(server.cors);
        assert_eq!(server.handler_timeout, Duration::from_secs(5));
        assert_eq!(server.body_limit, 1024);
        assert_eq!(server.metrics_address, Some(SocketAddr::from(([127, 0, 0, 1], 9090))));
        assert!(cli.verbose);
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["hotreload-proxy"]).is_err());
    }

    #[test]
    fn test_cert_requires_key() {
        let result = Cli::try_parse_from(["hotreload-proxy", "--config", "c.toml", "--cert", "cert.pem"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["hotreload-proxy", "--config", "c.toml", "--key", "key.pem"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = Cli::try_parse_from(["hotreload-proxy", "--config", "c.toml", "--timeout-secs", "0"]);
        assert!(result.is_err());
    }
}
