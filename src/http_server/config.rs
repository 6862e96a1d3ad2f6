//! HTTP Server Configuration
//!
//! Bind address, static root, docs source, and the readiness-gate timeout.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::store::DEFAULT_CONNECT_TIMEOUT;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Host to bind to (default: 0.0.0.0)
    pub host: IpAddr,

    /// Port to bind to (default: 3000)
    pub port: u16,

    /// Directory served by the static stage (default: ./public)
    pub public_dir: PathBuf,

    /// External OpenAPI document; the generated one is used when unset
    pub openapi_spec: Option<PathBuf>,

    /// Upper bound on one store connect attempt
    pub store_connect_timeout: Duration,
}

pub const DEFAULT_PORT: u16 = 3000;

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            public_dir: PathBuf::from("public"),
            openapi_spec: None,
            store_connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
