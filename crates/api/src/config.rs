use std::net::SocketAddr;

/// Server configuration resolved by the binary from flags and environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (default: `127.0.0.1:3000`).
    pub bind: SocketAddr,
    /// Allowed CORS origins; empty disables cross-origin access.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            cors_origins: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}
