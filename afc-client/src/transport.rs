//! Byte-stream adapter with exact-length reads.

use crate::error::ClientError;
use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Owns the stream of one live connection.
pub struct Transport<S> {
    stream: S,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Writes the whole buffer and flushes it.
    ///
    /// Suspends while the stream applies backpressure; nothing is buffered here.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads exactly `n` bytes, concatenating partial deliveries.
    pub async fn receive_exactly(&mut self, n: usize) -> Result<Bytes, ClientError> {
        let mut buf = BytesMut::zeroed(n);
        self.receive_into(&mut buf).await?;
        Ok(buf.freeze())
    }

    /// Fills `buf` completely from the stream.
    pub async fn receive_into(&mut self, buf: &mut [u8]) -> Result<(), ClientError> {
        match self.stream.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::debug!("Stream ended while waiting for {} bytes", buf.len());
                Err(ClientError::ConnectionClosed)
            }
            Err(e) => Err(ClientError::Io(e)),
        }
    }

    /// Shuts down the write side; errors are ignored since the stream is being dropped.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
