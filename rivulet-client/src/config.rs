//! Connection configuration.

use rivulet_protocol::DEFAULT_ADDRESS;
use std::path::PathBuf;
use std::time::Duration;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// TLS configuration for client connections.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Server name for SNI and certificate validation. Defaults to the host
    /// part of the server address.
    pub domain: Option<String>,
    /// PEM-encoded CA certificate(s). If None, the bundled web PKI roots are
    /// used.
    pub ca_file: Option<PathBuf>,
    /// Verify the server certificate. Disabling this is insecure and meant
    /// for development only.
    pub validate_certificate: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            domain: None,
            ca_file: None,
            validate_certificate: true,
        }
    }
}

impl TlsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    pub fn with_insecure(mut self) -> Self {
        self.validate_certificate = false;
        self
    }
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address as `host:port`.
    pub server_address: String,
    /// Connection timeout (TCP connect plus TLS handshake).
    pub connect_timeout: Duration,
    /// Upper bound on one request/response exchange.
    pub request_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
    /// Set `TCP_NODELAY` on the socket.
    pub nodelay: bool,
    /// TLS configuration (optional).
    pub tls: Option<TlsConfig>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl ConnectionConfig {
    pub fn new(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            nodelay: true,
            tls: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn with_tls(mut self, tls_config: TlsConfig) -> Self {
        self.tls = Some(tls_config);
        self
    }

    /// Host part of the server address, without port or IPv6 brackets.
    pub fn server_host(&self) -> &str {
        let host = match self.server_address.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
            _ => &self.server_address,
        };
        host.trim_start_matches('[').trim_end_matches(']')
    }
}
