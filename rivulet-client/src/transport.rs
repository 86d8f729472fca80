//! Transport factory: plain TCP or TCP upgraded to TLS.

use crate::config::ConnectionConfig;
use crate::error::ClientError;
use crate::tls::create_tls_connector;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// A reliable, ordered, bidirectional byte stream.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

pub type BoxedTransport = Box<dyn Transport>;

/// Opens a transport to the configured server.
pub async fn open(config: &ConnectionConfig) -> Result<BoxedTransport, ClientError> {
    tracing::debug!("Connecting to {}...", config.server_address);

    let tcp_stream = tokio::time::timeout(
        config.connect_timeout,
        TcpStream::connect(config.server_address.as_str()),
    )
    .await
    .map_err(|_| {
        tracing::debug!("Connection timeout");
        ClientError::Timeout
    })?
    .map_err(|e| {
        tracing::debug!("Connection failed: {}", e);
        ClientError::Io(e)
    })?;

    if config.nodelay {
        if let Err(e) = tcp_stream.set_nodelay(true) {
            tracing::warn!("Failed to set TCP_NODELAY: {}", e);
        }
    }

    let Some(ref tls_config) = config.tls else {
        tracing::debug!("TCP connected to {}", config.server_address);
        return Ok(Box::new(tcp_stream));
    };

    let (connector, server_name) = create_tls_connector(tls_config, config.server_host())?;
    tracing::debug!("Performing TLS handshake...");
    let tls_stream = tokio::time::timeout(
        config.connect_timeout,
        connector.connect(server_name, tcp_stream),
    )
    .await
    .map_err(|_| ClientError::Timeout)?
    .map_err(|e| ClientError::TlsHandshake(e.to_string()))?;

    tracing::debug!("TLS handshake complete");
    Ok(Box::new(tls_stream))
}
