//! Protocol error types and AFC status codes.

use crate::opcode::Opcode;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Protocol-level errors that can occur during framing or payload decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid magic bytes: expected 'CFA6LPAA', got {0:?}")]
    InvalidMagic([u8; 8]),

    #[error("invalid packet lengths: this_length={this_length}, entire_length={entire_length}")]
    InvalidLength {
        this_length: u64,
        entire_length: u64,
    },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u64, max: u64 },

    #[error("unknown opcode: {0:#x}")]
    UnknownOpcode(u64),

    #[error("unexpected response opcode {received} to {request}")]
    UnexpectedOpcode { request: Opcode, received: Opcode },

    #[error("status payload must be 8 bytes, got {0}")]
    InvalidStatusLength(usize),

    #[error("malformed dictionary: odd number of elements ({0})")]
    OddDictionary(usize),

    #[error("invalid UTF-8 in payload")]
    InvalidUtf8,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid payload length for {opcode}: expected {expected} bytes, got {actual}")]
    InvalidPayloadLength {
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },
}

/// Status codes carried by `STATUS` responses.
///
/// Values the device sends that are not in the published table are kept as
/// [`StatusCode::Other`] so that nothing is lost in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Success,
    UnknownError,
    OpHeaderInvalid,
    NoResources,
    ReadError,
    WriteError,
    UnknownPacketType,
    InvalidArg,
    ObjectNotFound,
    ObjectIsDir,
    PermDenied,
    ServiceNotConnected,
    OpTimeout,
    TooMuchData,
    EndOfData,
    OpNotSupported,
    ObjectExists,
    ObjectBusy,
    NoSpaceLeft,
    OpWouldBlock,
    IoError,
    OpInterrupted,
    OpInProgress,
    InternalError,
    MuxError,
    NoMem,
    NotEnoughData,
    DirNotEmpty,
    Other(u32),
}

impl StatusCode {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => StatusCode::Success,
            1 => StatusCode::UnknownError,
            2 => StatusCode::OpHeaderInvalid,
            3 => StatusCode::NoResources,
            4 => StatusCode::ReadError,
            5 => StatusCode::WriteError,
            6 => StatusCode::UnknownPacketType,
            7 => StatusCode::InvalidArg,
            8 => StatusCode::ObjectNotFound,
            9 => StatusCode::ObjectIsDir,
            10 => StatusCode::PermDenied,
            11 => StatusCode::ServiceNotConnected,
            12 => StatusCode::OpTimeout,
            13 => StatusCode::TooMuchData,
            14 => StatusCode::EndOfData,
            15 => StatusCode::OpNotSupported,
            16 => StatusCode::ObjectExists,
            17 => StatusCode::ObjectBusy,
            18 => StatusCode::NoSpaceLeft,
            19 => StatusCode::OpWouldBlock,
            20 => StatusCode::IoError,
            21 => StatusCode::OpInterrupted,
            22 => StatusCode::OpInProgress,
            23 => StatusCode::InternalError,
            30 => StatusCode::MuxError,
            31 => StatusCode::NoMem,
            32 => StatusCode::NotEnoughData,
            33 => StatusCode::DirNotEmpty,
            other => StatusCode::Other(other),
        }
    }

    /// Numeric value as sent on the wire.
    pub fn code(&self) -> u32 {
        match self {
            StatusCode::Success => 0,
            StatusCode::UnknownError => 1,
            StatusCode::OpHeaderInvalid => 2,
            StatusCode::NoResources => 3,
            StatusCode::ReadError => 4,
            StatusCode::WriteError => 5,
            StatusCode::UnknownPacketType => 6,
            StatusCode::InvalidArg => 7,
            StatusCode::ObjectNotFound => 8,
            StatusCode::ObjectIsDir => 9,
            StatusCode::PermDenied => 10,
            StatusCode::ServiceNotConnected => 11,
            StatusCode::OpTimeout => 12,
            StatusCode::TooMuchData => 13,
            StatusCode::EndOfData => 14,
            StatusCode::OpNotSupported => 15,
            StatusCode::ObjectExists => 16,
            StatusCode::ObjectBusy => 17,
            StatusCode::NoSpaceLeft => 18,
            StatusCode::OpWouldBlock => 19,
            StatusCode::IoError => 20,
            StatusCode::OpInterrupted => 21,
            StatusCode::OpInProgress => 22,
            StatusCode::InternalError => 23,
            StatusCode::MuxError => 30,
            StatusCode::NoMem => 31,
            StatusCode::NotEnoughData => 32,
            StatusCode::DirNotEmpty => 33,
            StatusCode::Other(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Success)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Success => "SUCCESS",
            StatusCode::UnknownError => "UNKNOWN_ERROR",
            StatusCode::OpHeaderInvalid => "OP_HEADER_INVALID",
            StatusCode::NoResources => "NO_RESOURCES",
            StatusCode::ReadError => "READ_ERROR",
            StatusCode::WriteError => "WRITE_ERROR",
            StatusCode::UnknownPacketType => "UNKNOWN_PACKET_TYPE",
            StatusCode::InvalidArg => "INVALID_ARG",
            StatusCode::ObjectNotFound => "OBJECT_NOT_FOUND",
            StatusCode::ObjectIsDir => "OBJECT_IS_DIR",
            StatusCode::PermDenied => "PERM_DENIED",
            StatusCode::ServiceNotConnected => "SERVICE_NOT_CONNECTED",
            StatusCode::OpTimeout => "OP_TIMEOUT",
            StatusCode::TooMuchData => "TOO_MUCH_DATA",
            StatusCode::EndOfData => "END_OF_DATA",
            StatusCode::OpNotSupported => "OP_NOT_SUPPORTED",
            StatusCode::ObjectExists => "OBJECT_EXISTS",
            StatusCode::ObjectBusy => "OBJECT_BUSY",
            StatusCode::NoSpaceLeft => "NO_SPACE_LEFT",
            StatusCode::OpWouldBlock => "OP_WOULD_BLOCK",
            StatusCode::IoError => "IO_ERROR",
            StatusCode::OpInterrupted => "OP_INTERRUPTED",
            StatusCode::OpInProgress => "OP_IN_PROGRESS",
            StatusCode::InternalError => "INTERNAL_ERROR",
            StatusCode::MuxError => "MUX_ERROR",
            StatusCode::NoMem => "NO_MEM",
            StatusCode::NotEnoughData => "NOT_ENOUGH_DATA",
            StatusCode::DirNotEmpty => "DIR_NOT_EMPTY",
            StatusCode::Other(code) => return write!(f, "UNKNOWN({})", code),
        };
        f.write_str(name)
    }
}
