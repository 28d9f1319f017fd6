//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Idle timeout for request connections, and lifetime of a subscription
    pub idle_timeout: Duration,

    /// How long a single response or event write may take
    pub write_timeout: Duration,

    /// Longest accepted request line in bytes
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            idle_timeout: Duration::from_secs(15 * 60),
            write_timeout: Duration::from_secs(1),
            max_line_length: 64 * 1024,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the request line limit
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.max_line_length = len.max(1);
        self
    }
}
