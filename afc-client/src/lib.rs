//! # afc-client
//!
//! Async client for the Apple File Conduit (AFC) service.
//!
//! This crate provides:
//! - Connection state machine with lazy connect and explicit recovery
//! - Strictly serialized request dispatch with status-to-error mapping
//! - Filesystem API (stat, directories, links, file handles)
//! - TCP connector with optional TLS

pub mod client;
pub mod config;
pub mod connection;
pub mod connector;
pub mod error;
pub mod file;
pub mod tls;
pub mod transport;

pub use client::AfcClient;
pub use config::{ConfigError, ConnectionConfig, TlsClientConfig};
pub use connection::{Connection, ConnectionState};
pub use connector::{Connector, DeviceStream, TcpConnector};
pub use error::ClientError;
pub use file::FileHandle;
pub use transport::Transport;

pub use afc_protocol::{
    DeviceInfo, FileMode, FileType, LinkKind, LockOp, Opcode, Request, SeekWhence, StatRecord,
    StatusCode,
};
