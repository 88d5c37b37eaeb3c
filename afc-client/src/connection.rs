//! Connection management and request dispatch.
//!
//! A [`Connection`] owns at most one live stream and runs one request at a
//! time: the inner mutex is held for the whole send-then-receive cycle, so
//! responses are correlated by arrival order.
//!
//! State machine:
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Ready --fatal error--> Faulted
//!      ^                         |                                       |
//!      +-------- close ----------+------------- reconnect ---------------+
//! ```

use crate::connector::Connector;
use crate::error::ClientError;
use crate::transport::Transport;
use afc_protocol::{Header, Opcode, Packet, Reply, Request, StatusCode, HEADER_SIZE};
use bytes::Bytes;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Ready = 2,
    /// A transport or protocol failure (or an abandoned request) left the
    /// stream at an unknown frame boundary.
    Faulted = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Ready,
            3 => ConnectionState::Faulted,
            _ => ConnectionState::Disconnected,
        }
    }
}

struct Inner<S> {
    state: ConnectionState,
    transport: Option<Transport<S>>,
    /// Packet number for the next request on this transport.
    next_packet_num: u64,
    /// Bumped every time a new transport is established.
    generation: u64,
}

impl<S> Inner<S> {
    fn set_state(&mut self, mirror: &AtomicU8, state: ConnectionState) {
        self.state = state;
        mirror.store(state as u8, Ordering::SeqCst);
    }

    fn fault(&mut self, mirror: &AtomicU8) {
        tracing::warn!(
            "Faulting AFC connection (generation {}); reconnect required",
            self.generation
        );
        self.transport = None;
        self.set_state(mirror, ConnectionState::Faulted);
    }
}

/// Faults the connection unless the exchange is marked complete.
///
/// Dropping a request future mid-exchange leaves the stream between frames,
/// and this guard makes sure such a connection is never reused.
struct InFlight<'a, S> {
    inner: &'a mut Inner<S>,
    mirror: &'a AtomicU8,
    completed: bool,
}

impl<S> InFlight<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn exchange(&mut self, frame: &[u8], request: Opcode) -> Result<Reply, ClientError> {
        let transport = self
            .inner
            .transport
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?;

        transport.send(frame).await?;
        let packet = receive_packet(transport).await?;
        tracing::debug!(
            "Received {} (packet_num={}, {} payload bytes)",
            packet.opcode,
            packet.packet_num,
            packet.header_payload.len() + packet.content.len()
        );

        Ok(Reply::classify(request, &packet)?)
    }
}

impl<S> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if !self.completed {
            self.inner.fault(self.mirror);
        }
    }
}

/// Reads one complete frame: a fixed header, then `entire_length - 40` bytes.
async fn receive_packet<S>(transport: &mut Transport<S>) -> Result<Packet, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut raw = [0u8; HEADER_SIZE];
    transport.receive_into(&mut raw).await?;
    let header = Header::parse(&raw)?;

    let payload = match header.payload_len() {
        0 => Bytes::new(),
        len => transport.receive_exactly(len).await?,
    };

    Ok(Packet::from_parts(header, payload)?)
}

/// A connection to an AFC service.
pub struct Connection<C: Connector> {
    connector: C,
    inner: Mutex<Inner<C::Stream>>,
    /// Mirror of `inner.state`, readable without taking the lock.
    state: AtomicU8,
}

impl<C: Connector> Connection<C> {
    /// Creates a new connection (not yet connected).
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                transport: None,
                next_packet_num: 0,
                generation: 0,
            }),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Establishes the connection unless one is already live.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().await;
        if inner.state == ConnectionState::Ready {
            return Ok(());
        }
        self.establish(&mut inner).await
    }

    /// Drops the current stream (if any) and establishes a fresh one.
    ///
    /// Packet numbering restarts at zero and handles from the previous
    /// connection become stale.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().await;
        self.establish(&mut inner).await
    }

    /// Closes the connection. The next request connects again lazily.
    pub async fn close(&self) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().await;
        tracing::debug!("Closing AFC connection...");

        if let Some(mut transport) = inner.transport.take() {
            transport.shutdown().await;
        }
        inner.set_state(&self.state, ConnectionState::Disconnected);

        tracing::debug!("Connection closed");
        Ok(())
    }

    async fn establish(&self, inner: &mut Inner<C::Stream>) -> Result<(), ClientError> {
        if let Some(mut old) = inner.transport.take() {
            old.shutdown().await;
        }

        inner.set_state(&self.state, ConnectionState::Connecting);
        match self.connector.connect().await {
            Ok(stream) => {
                inner.transport = Some(Transport::new(stream));
                inner.next_packet_num = 0;
                inner.generation += 1;
                inner.set_state(&self.state, ConnectionState::Ready);
                tracing::debug!("AFC connection ready (generation {})", inner.generation);
                Ok(())
            }
            Err(e) => {
                tracing::debug!("AFC connection failed: {}", e);
                inner.set_state(&self.state, ConnectionState::Faulted);
                Err(e)
            }
        }
    }

    /// Sends a request and waits for its classified response.
    ///
    /// Returns the response data, or an empty buffer for a successful
    /// `STATUS` reply.
    pub async fn execute(&self, request: &Request) -> Result<Bytes, ClientError> {
        self.dispatch(None, request)
            .await
            .map(|(data, _generation)| data)
    }

    /// Like [`execute`](Self::execute), but refuses to run unless the live
    /// transport belongs to `generation`, and reports which generation
    /// served the request.
    pub(crate) async fn dispatch(
        &self,
        generation: Option<u64>,
        request: &Request,
    ) -> Result<(Bytes, u64), ClientError> {
        let opcode = request.opcode();
        let mut inner = self.inner.lock().await;

        match inner.state {
            ConnectionState::Faulted | ConnectionState::Connecting => {
                return Err(ClientError::Faulted)
            }
            ConnectionState::Disconnected | ConnectionState::Ready => {}
        }

        if let Some(expected) = generation {
            if inner.state != ConnectionState::Ready || inner.generation != expected {
                return Err(ClientError::StaleHandle {
                    handle: handle_of(request).unwrap_or_default(),
                });
            }
        }

        if inner.state == ConnectionState::Disconnected {
            self.establish(&mut inner).await?;
        }

        let packet_num = inner.next_packet_num;
        let frame = request
            .to_packet(packet_num)
            .and_then(|packet| packet.encode())
            .map_err(ClientError::InvalidRequest)?;
        inner.next_packet_num += 1;
        let served_by = inner.generation;

        tracing::debug!(
            "Sending {} (packet_num={}, {} bytes)",
            opcode,
            packet_num,
            frame.len()
        );

        let mut in_flight = InFlight {
            inner: &mut *inner,
            mirror: &self.state,
            completed: false,
        };
        let reply = match in_flight.exchange(&frame, opcode).await {
            Ok(reply) => {
                in_flight.completed = true;
                reply
            }
            Err(e) => {
                tracing::debug!("{} exchange failed: {}", opcode, e);
                return Err(e);
            }
        };
        drop(in_flight);

        match reply {
            Reply::Data(data) => Ok((data, served_by)),
            Reply::Status(StatusCode::Success) => Ok((Bytes::new(), served_by)),
            Reply::Status(StatusCode::ObjectNotFound) => {
                tracing::debug!("{} failed: object not found", opcode);
                Err(ClientError::FileNotFound { opcode })
            }
            Reply::Status(status) => {
                tracing::debug!("{} failed with status {} ({})", opcode, status, status.code());
                Err(ClientError::OperationFailed { opcode, status })
            }
        }
    }
}

fn handle_of(request: &Request) -> Option<u64> {
    match request {
        Request::Read { handle, .. }
        | Request::Write { handle, .. }
        | Request::FileSeek { handle, .. }
        | Request::FileTell { handle }
        | Request::FileClose { handle }
        | Request::FileSetSize { handle, .. }
        | Request::FileLock { handle, .. } => Some(*handle),
        _ => None,
    }
}
