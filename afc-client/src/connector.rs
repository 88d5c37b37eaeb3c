//! Session bootstrap seam.
//!
//! A [`Connector`] produces the authenticated byte stream the AFC engine
//! talks over. Lockdown, pairing and service discovery live behind it; the
//! engine only sees the resulting stream.

use crate::config::ConnectionConfig;
use crate::error::ClientError;
use crate::tls::create_tls_connector;
use async_trait::async_trait;
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// Produces a fresh byte stream to the AFC service.
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Establishes a new stream. Called once per connection generation.
    async fn connect(&self) -> Result<Self::Stream, ClientError>;
}

pin_project! {
    /// A device stream that is either plain TCP or TLS over TCP.
    #[project = DeviceStreamProj]
    pub enum DeviceStream {
        Plain { #[pin] stream: TcpStream },
        Tls { #[pin] stream: TlsStream<TcpStream> },
    }
}

impl DeviceStream {
    pub fn is_tls(&self) -> bool {
        matches!(self, DeviceStream::Tls { .. })
    }
}

impl AsyncRead for DeviceStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.project() {
            DeviceStreamProj::Plain { stream } => stream.poll_read(cx, buf),
            DeviceStreamProj::Tls { stream } => stream.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for DeviceStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.project() {
            DeviceStreamProj::Plain { stream } => stream.poll_write(cx, buf),
            DeviceStreamProj::Tls { stream } => stream.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            DeviceStreamProj::Plain { stream } => stream.poll_flush(cx),
            DeviceStreamProj::Tls { stream } => stream.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            DeviceStreamProj::Plain { stream } => stream.poll_shutdown(cx),
            DeviceStreamProj::Tls { stream } => stream.poll_shutdown(cx),
        }
    }
}

/// Connects to an AFC service exposed on a TCP address, optionally over TLS.
///
/// This is the right connector for a port already forwarded to the device's
/// AFC service; it does not speak lockdown.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    config: ConnectionConfig,
}

impl TcpConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = DeviceStream;

    async fn connect(&self) -> Result<DeviceStream, ClientError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let tcp_stream = tokio::time::timeout(
            self.config.connect_timeout(),
            TcpStream::connect(self.config.addr),
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

        tcp_stream.set_nodelay(true).ok();

        if !self.config.tls.enabled {
            return Ok(DeviceStream::Plain { stream: tcp_stream });
        }

        let host = self.config.addr.ip().to_string();
        let (connector, server_name) = create_tls_connector(&self.config.tls, &host)?;

        tracing::debug!("Performing TLS handshake...");
        let tls_stream = connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| ClientError::TlsHandshake(e.to_string()))?;
        tracing::debug!("TLS handshake complete");

        Ok(DeviceStream::Tls { stream: tls_stream })
    }
}
