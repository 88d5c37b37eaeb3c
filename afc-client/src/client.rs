//! High-level client API.

use crate::config::ConnectionConfig;
use crate::connection::{Connection, ConnectionState};
use crate::connector::{Connector, TcpConnector};
use crate::error::ClientError;
use crate::file::FileHandle;
use afc_protocol::message::parse_u64;
use afc_protocol::{
    parse_name_list, DeviceInfo, FileMode, LinkKind, LockOp, Opcode, ProtocolError, Request,
    SeekWhence, StatRecord, MAX_READ_CHUNK, MAX_WRITE_CHUNK,
};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Filesystem-style client for an AFC service.
pub struct AfcClient<C: Connector> {
    conn: Arc<Connection<C>>,
}

impl AfcClient<TcpConnector> {
    /// Creates a client that connects over TCP with the given configuration.
    pub fn from_config(config: ConnectionConfig) -> Self {
        Self::new(TcpConnector::new(config))
    }
}

impl<C: Connector> AfcClient<C> {
    /// Creates a new client. Nothing is connected until the first operation
    /// or an explicit [`connect`](Self::connect).
    pub fn new(connector: C) -> Self {
        Self {
            conn: Arc::new(Connection::new(connector)),
        }
    }

    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Replaces the current stream with a fresh one. Required to recover a
    /// faulted connection; open file handles become stale.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        self.conn.reconnect().await
    }

    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Returns the underlying connection (for raw requests).
    pub fn connection(&self) -> Arc<Connection<C>> {
        self.conn.clone()
    }

    // =========================================================================
    // Path operations
    // =========================================================================

    /// Returns the stat record for `path`.
    pub async fn stat(&self, path: &str) -> Result<StatRecord, ClientError> {
        let data = self
            .conn
            .execute(&Request::GetFileInfo {
                path: path.to_string(),
            })
            .await?;
        StatRecord::parse(&data).map_err(ClientError::MalformedResponse)
    }

    /// Returns whether `path` exists.
    ///
    /// Only a not-found status means `false`; every other failure is
    /// returned as an error.
    pub async fn exists(&self, path: &str) -> Result<bool, ClientError> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn is_dir(&self, path: &str) -> Result<bool, ClientError> {
        Ok(self.stat(path).await?.is_dir())
    }

    /// Lists the entries of a directory, without `.` and `..`.
    pub async fn list_dir(&self, path: &str) -> Result<Vec<String>, ClientError> {
        let data = self
            .conn
            .execute(&Request::ReadDir {
                path: path.to_string(),
            })
            .await?;
        let mut names = parse_name_list(&data).map_err(ClientError::MalformedResponse)?;
        names.retain(|name| name != "." && name != "..");
        Ok(names)
    }

    pub async fn device_info(&self) -> Result<DeviceInfo, ClientError> {
        let data = self.conn.execute(&Request::GetDevInfo).await?;
        DeviceInfo::parse(&data).map_err(ClientError::MalformedResponse)
    }

    pub async fn make_dir(&self, path: &str) -> Result<(), ClientError> {
        self.status(Request::MakeDir {
            path: path.to_string(),
        })
        .await
    }

    /// Removes a file or an empty directory.
    pub async fn remove(&self, path: &str) -> Result<(), ClientError> {
        self.status(Request::RemovePath {
            path: path.to_string(),
        })
        .await
    }

    pub async fn rename(&self, from: &str, to: &str) -> Result<(), ClientError> {
        self.status(Request::RenamePath {
            from: from.to_string(),
            to: to.to_string(),
        })
        .await
    }

    /// Creates a link at `link_path` pointing to `target`.
    pub async fn link(
        &self,
        kind: LinkKind,
        target: &str,
        link_path: &str,
    ) -> Result<(), ClientError> {
        self.status(Request::MakeLink {
            kind,
            target: target.to_string(),
            link_path: link_path.to_string(),
        })
        .await
    }

    pub async fn truncate(&self, path: &str, size: u64) -> Result<(), ClientError> {
        self.status(Request::Truncate {
            path: path.to_string(),
            size,
        })
        .await
    }

    /// Sets the modification time of `path`. Times before the epoch are
    /// rejected before anything is sent.
    pub async fn set_file_time(&self, path: &str, mtime: DateTime<Utc>) -> Result<(), ClientError> {
        let nanos = mtime
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| {
                ClientError::InvalidRequest(ProtocolError::InvalidValue {
                    key: "mtime",
                    value: mtime.to_rfc3339(),
                })
            })?;

        self.status(Request::SetFileTime {
            path: path.to_string(),
            mtime: nanos,
        })
        .await
    }

    // =========================================================================
    // File operations
    // =========================================================================

    pub async fn open(&self, path: &str, mode: FileMode) -> Result<FileHandle, ClientError> {
        let request = Request::FileOpen {
            path: path.to_string(),
            mode,
        };
        let (data, generation) = self.conn.dispatch(None, &request).await?;
        let raw = parse_u64(Opcode::FileOpen, &data).map_err(ClientError::MalformedResponse)?;

        tracing::debug!("Opened {} as handle {}", path, raw);
        Ok(FileHandle::new(raw, generation))
    }

    /// Reads up to `len` bytes from the current position.
    ///
    /// Large reads are split into requests of at most 4 MiB; a short chunk
    /// ends the read early (end of file).
    pub async fn read(&self, handle: &FileHandle, len: u64) -> Result<Bytes, ClientError> {
        if len <= MAX_READ_CHUNK {
            return self.read_chunk(handle, len).await;
        }

        let mut buf = BytesMut::new();
        let mut remaining = len;
        while remaining > 0 {
            let want = remaining.min(MAX_READ_CHUNK);
            let chunk = self.read_chunk(handle, want).await?;
            let short = (chunk.len() as u64) < want;
            buf.extend_from_slice(&chunk);
            remaining = remaining.saturating_sub(chunk.len() as u64);
            if short {
                break;
            }
        }
        Ok(buf.freeze())
    }

    async fn read_chunk(&self, handle: &FileHandle, len: u64) -> Result<Bytes, ClientError> {
        self.file_request(
            handle,
            Request::Read {
                handle: handle.raw(),
                len,
            },
        )
        .await
    }

    /// Writes all of `data` at the current position, in chunks of at most
    /// 4 MiB.
    pub async fn write(&self, handle: &FileHandle, data: Bytes) -> Result<(), ClientError> {
        let mut offset = 0;
        loop {
            let end = (offset + MAX_WRITE_CHUNK).min(data.len());
            self.file_request(
                handle,
                Request::Write {
                    handle: handle.raw(),
                    data: data.slice(offset..end),
                },
            )
            .await?;
            offset = end;
            if offset >= data.len() {
                return Ok(());
            }
        }
    }

    pub async fn seek(
        &self,
        handle: &FileHandle,
        offset: i64,
        whence: SeekWhence,
    ) -> Result<(), ClientError> {
        self.file_request(
            handle,
            Request::FileSeek {
                handle: handle.raw(),
                offset,
                whence,
            },
        )
        .await
        .map(|_| ())
    }

    /// Returns the current position in the file.
    pub async fn tell(&self, handle: &FileHandle) -> Result<u64, ClientError> {
        let data = self
            .file_request(
                handle,
                Request::FileTell {
                    handle: handle.raw(),
                },
            )
            .await?;
        parse_u64(Opcode::FileTell, &data).map_err(ClientError::MalformedResponse)
    }

    pub async fn set_size(&self, handle: &FileHandle, size: u64) -> Result<(), ClientError> {
        self.file_request(
            handle,
            Request::FileSetSize {
                handle: handle.raw(),
                size,
            },
        )
        .await
        .map(|_| ())
    }

    /// Applies an advisory lock operation. Locks never block; a held lock
    /// comes back as an operation failure.
    pub async fn lock(&self, handle: &FileHandle, op: LockOp) -> Result<(), ClientError> {
        self.file_request(
            handle,
            Request::FileLock {
                handle: handle.raw(),
                op,
            },
        )
        .await
        .map(|_| ())
    }

    /// Closes a handle.
    pub async fn close(&self, handle: FileHandle) -> Result<(), ClientError> {
        self.file_request(
            &handle,
            Request::FileClose {
                handle: handle.raw(),
            },
        )
        .await
        .map(|_| ())
    }

    // =========================================================================
    // Whole-file helpers
    // =========================================================================

    /// Reads an entire file.
    pub async fn read_file(&self, path: &str) -> Result<Bytes, ClientError> {
        let handle = self.open(path, FileMode::ReadOnly).await?;

        let mut buf = BytesMut::new();
        let result = loop {
            match self.read_chunk(&handle, MAX_READ_CHUNK).await {
                Ok(chunk) => {
                    let done = (chunk.len() as u64) < MAX_READ_CHUNK;
                    buf.extend_from_slice(&chunk);
                    if done {
                        break Ok(());
                    }
                }
                Err(e) => break Err(e),
            }
        };

        finish(result, self.close(handle).await)?;
        Ok(buf.freeze())
    }

    /// Creates or replaces a file with `data`.
    pub async fn write_file(&self, path: &str, data: Bytes) -> Result<(), ClientError> {
        let handle = self.open(path, FileMode::WriteOnly).await?;
        let result = self.write(&handle, data).await;
        finish(result, self.close(handle).await)
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    async fn status(&self, request: Request) -> Result<(), ClientError> {
        self.conn.execute(&request).await.map(|_| ())
    }

    async fn file_request(
        &self,
        handle: &FileHandle,
        request: Request,
    ) -> Result<Bytes, ClientError> {
        self.conn
            .dispatch(Some(handle.generation()), &request)
            .await
            .map(|(data, _)| data)
    }
}

/// Combines the result of a file transfer with the result of closing the
/// handle; the transfer error wins.
fn finish(result: Result<(), ClientError>, closed: Result<(), ClientError>) -> Result<(), ClientError> {
    if let Err(e) = &closed {
        if result.is_ok() {
            tracing::debug!("Close after transfer failed: {}", e);
        }
    }
    result.and(closed)
}
