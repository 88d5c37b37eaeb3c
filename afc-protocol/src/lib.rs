//! # afc-protocol
//!
//! Wire protocol implementation for the Apple File Conduit (AFC).
//!
//! This crate provides:
//! - Binary packet framing with magic and length validation
//! - Opcode and status code tables
//! - Request payload encoding and response classification
//! - Stat and device-info dictionary decoding

pub mod dict;
pub mod error;
pub mod frame;
pub mod message;
pub mod opcode;
pub mod record;

pub use dict::{parse_dict, parse_name_list};
pub use error::{ProtocolError, StatusCode};
pub use frame::{Header, Packet, HEADER_SIZE, MAGIC};
pub use message::{FileMode, LinkKind, LockOp, Reply, Request, SeekWhence};
pub use opcode::Opcode;
pub use record::{DeviceInfo, FileType, StatRecord};

/// Maximum accepted frame size (64 MiB), header included.
pub const MAX_FRAME_SIZE: u64 = 64 * 1024 * 1024;

/// Largest single `READ` request issued by the client (4 MiB).
pub const MAX_READ_CHUNK: u64 = 4 * 1024 * 1024;

/// Largest single `WRITE` payload issued by the client (4 MiB).
pub const MAX_WRITE_CHUNK: usize = 4 * 1024 * 1024;
