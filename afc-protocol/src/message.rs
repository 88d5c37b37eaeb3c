//! Request payloads and response classification.

use crate::error::{ProtocolError, StatusCode};
use crate::frame::Packet;
use crate::opcode::Opcode;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of a `STATUS` response payload.
pub const STATUS_PAYLOAD_SIZE: usize = 8;

/// Mode for `FILE_OPEN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum FileMode {
    /// `r`: read only.
    ReadOnly = 1,
    /// `r+`: read/write, create.
    ReadWrite = 2,
    /// `w`: write only, create, truncate.
    WriteOnly = 3,
    /// `w+`: read/write, create, truncate.
    WriteRead = 4,
    /// `a`: write only, append, create.
    Append = 5,
    /// `a+`: read/write, append, create.
    ReadAppend = 6,
}

/// Origin for `FILE_SEEK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum SeekWhence {
    Set = 0,
    Cur = 1,
    End = 2,
}

/// Operation for `FILE_LOCK` (flock semantics, always non-blocking).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum LockOp {
    Shared = 1 | 4,
    Exclusive = 2 | 4,
    Unlock = 8 | 4,
}

/// Kind of link for `MAKE_LINK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum LinkKind {
    Hard = 1,
    Symbolic = 2,
}

/// An AFC request before it is assigned a packet number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadDir {
        path: String,
    },
    GetFileInfo {
        path: String,
    },
    GetDevInfo,
    MakeDir {
        path: String,
    },
    RemovePath {
        path: String,
    },
    RenamePath {
        from: String,
        to: String,
    },
    MakeLink {
        kind: LinkKind,
        target: String,
        link_path: String,
    },
    Truncate {
        path: String,
        size: u64,
    },
    SetFileTime {
        path: String,
        /// Nanoseconds since the epoch.
        mtime: u64,
    },
    FileOpen {
        path: String,
        mode: FileMode,
    },
    Read {
        handle: u64,
        len: u64,
    },
    Write {
        handle: u64,
        data: Bytes,
    },
    FileSeek {
        handle: u64,
        offset: i64,
        whence: SeekWhence,
    },
    FileTell {
        handle: u64,
    },
    FileClose {
        handle: u64,
    },
    FileSetSize {
        handle: u64,
        size: u64,
    },
    FileLock {
        handle: u64,
        op: LockOp,
    },
    /// Any other opcode with a caller-built payload.
    Raw {
        opcode: Opcode,
        header_payload: Bytes,
        content: Bytes,
    },
}

impl Request {
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::ReadDir { .. } => Opcode::ReadDir,
            Request::GetFileInfo { .. } => Opcode::GetFileInfo,
            Request::GetDevInfo => Opcode::GetDevInfo,
            Request::MakeDir { .. } => Opcode::MakeDir,
            Request::RemovePath { .. } => Opcode::RemovePath,
            Request::RenamePath { .. } => Opcode::RenamePath,
            Request::MakeLink { .. } => Opcode::MakeLink,
            Request::Truncate { .. } => Opcode::Truncate,
            Request::SetFileTime { .. } => Opcode::SetFileTime,
            Request::FileOpen { .. } => Opcode::FileOpen,
            Request::Read { .. } => Opcode::Read,
            Request::Write { .. } => Opcode::Write,
            Request::FileSeek { .. } => Opcode::FileSeek,
            Request::FileTell { .. } => Opcode::FileTell,
            Request::FileClose { .. } => Opcode::FileClose,
            Request::FileSetSize { .. } => Opcode::FileSetSize,
            Request::FileLock { .. } => Opcode::FileLock,
            Request::Raw { opcode, .. } => *opcode,
        }
    }

    /// Builds the packet for this request.
    ///
    /// Fixed fields and paths travel in the header payload; only `WRITE`
    /// carries content.
    pub fn to_packet(&self, packet_num: u64) -> Result<Packet, ProtocolError> {
        let mut buf = BytesMut::new();
        let mut content = Bytes::new();

        match self {
            Request::ReadDir { path }
            | Request::GetFileInfo { path }
            | Request::MakeDir { path }
            | Request::RemovePath { path } => put_path(&mut buf, path)?,
            Request::GetDevInfo => {}
            Request::RenamePath { from, to } => {
                put_path(&mut buf, from)?;
                put_path(&mut buf, to)?;
            }
            Request::MakeLink {
                kind,
                target,
                link_path,
            } => {
                buf.put_u64_le(*kind as u64);
                put_path(&mut buf, target)?;
                put_path(&mut buf, link_path)?;
            }
            Request::Truncate { path, size } => {
                buf.put_u64_le(*size);
                put_path(&mut buf, path)?;
            }
            Request::SetFileTime { path, mtime } => {
                buf.put_u64_le(*mtime);
                put_path(&mut buf, path)?;
            }
            Request::FileOpen { path, mode } => {
                buf.put_u64_le(*mode as u64);
                put_path(&mut buf, path)?;
            }
            Request::Read { handle, len } => {
                buf.put_u64_le(*handle);
                buf.put_u64_le(*len);
            }
            Request::Write { handle, data } => {
                buf.put_u64_le(*handle);
                content = data.clone();
            }
            Request::FileSeek {
                handle,
                offset,
                whence,
            } => {
                buf.put_u64_le(*handle);
                buf.put_u64_le(*whence as u64);
                buf.put_i64_le(*offset);
            }
            Request::FileTell { handle } | Request::FileClose { handle } => {
                buf.put_u64_le(*handle);
            }
            Request::FileSetSize { handle, size } => {
                buf.put_u64_le(*handle);
                buf.put_u64_le(*size);
            }
            Request::FileLock { handle, op } => {
                buf.put_u64_le(*handle);
                buf.put_u64_le(*op as u64);
            }
            Request::Raw {
                header_payload,
                content: raw_content,
                ..
            } => {
                buf.put_slice(header_payload);
                content = raw_content.clone();
            }
        }

        Ok(Packet::new(packet_num, self.opcode())
            .with_header_payload(buf.freeze())
            .with_content(content))
    }
}

fn put_path(buf: &mut BytesMut, path: &str) -> Result<(), ProtocolError> {
    if path.contains('\0') {
        return Err(ProtocolError::InvalidValue {
            key: "path",
            value: path.to_string(),
        });
    }
    buf.put_slice(path.as_bytes());
    buf.put_u8(0);
    Ok(())
}

/// A classified response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `STATUS` response.
    Status(StatusCode),
    /// Data-bearing response: `DATA`, or the request's dedicated result opcode.
    Data(Bytes),
}

impl Reply {
    /// Classifies the response to a request with opcode `request`.
    pub fn classify(request: Opcode, packet: &Packet) -> Result<Self, ProtocolError> {
        match packet.opcode {
            Opcode::Status => {
                let payload = packet.payload();
                if payload.len() != STATUS_PAYLOAD_SIZE {
                    return Err(ProtocolError::InvalidStatusLength(payload.len()));
                }
                // Upper 4 bytes are reserved
                let code = (&payload[..4]).get_u32_le();
                Ok(Reply::Status(StatusCode::from_code(code)))
            }
            Opcode::Data => Ok(Reply::Data(packet.payload())),
            received if request.result_opcode() == Some(received) => {
                Ok(Reply::Data(packet.payload()))
            }
            received => Err(ProtocolError::UnexpectedOpcode { request, received }),
        }
    }
}

/// Decodes a response payload that holds a single u64 (handle or position).
pub fn parse_u64(opcode: Opcode, data: &[u8]) -> Result<u64, ProtocolError> {
    if data.len() != 8 {
        return Err(ProtocolError::InvalidPayloadLength {
            opcode,
            expected: 8,
            actual: data.len(),
        });
    }
    let mut data = data;
    Ok(data.get_u64_le())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_packet(code: u32) -> Packet {
        let mut payload = BytesMut::new();
        payload.put_u64_le(code as u64);
        Packet::new(0, Opcode::Status).with_header_payload(payload.freeze())
    }

    #[test]
    fn test_path_request_payload() {
        let packet = Request::GetFileInfo {
            path: "/DCIM".to_string(),
        }
        .to_packet(4)
        .unwrap();

        assert_eq!(packet.opcode, Opcode::GetFileInfo);
        assert_eq!(packet.packet_num, 4);
        assert_eq!(packet.header_payload.as_ref(), b"/DCIM\0");
        assert!(packet.content.is_empty());
    }

    #[test]
    fn test_rename_payload() {
        let packet = Request::RenamePath {
            from: "/a".to_string(),
            to: "/b".to_string(),
        }
        .to_packet(0)
        .unwrap();
        assert_eq!(packet.header_payload.as_ref(), b"/a\0/b\0");
    }

    #[test]
    fn test_make_link_payload() {
        let packet = Request::MakeLink {
            kind: LinkKind::Symbolic,
            target: "/t".to_string(),
            link_path: "/l".to_string(),
        }
        .to_packet(0)
        .unwrap();

        let payload = packet.header_payload.as_ref();
        assert_eq!(&payload[..8], &2u64.to_le_bytes());
        assert_eq!(&payload[8..], b"/t\0/l\0");
    }

    #[test]
    fn test_open_payload() {
        let packet = Request::FileOpen {
            path: "/f".to_string(),
            mode: FileMode::WriteOnly,
        }
        .to_packet(0)
        .unwrap();

        let payload = packet.header_payload.as_ref();
        assert_eq!(&payload[..8], &3u64.to_le_bytes());
        assert_eq!(&payload[8..], b"/f\0");
    }

    #[test]
    fn test_write_uses_content() {
        let packet = Request::Write {
            handle: 9,
            data: Bytes::from_static(b"payload"),
        }
        .to_packet(0)
        .unwrap();

        assert_eq!(packet.header_payload.as_ref(), &9u64.to_le_bytes());
        assert_eq!(packet.content.as_ref(), b"payload");
        assert_eq!(packet.header().unwrap().this_length, 48);
    }

    #[test]
    fn test_seek_payload() {
        let packet = Request::FileSeek {
            handle: 1,
            offset: -16,
            whence: SeekWhence::End,
        }
        .to_packet(0)
        .unwrap();

        let mut payload = packet.header_payload.clone();
        assert_eq!(payload.get_u64_le(), 1);
        assert_eq!(payload.get_u64_le(), 2);
        assert_eq!(payload.get_i64_le(), -16);
    }

    #[test]
    fn test_lock_values() {
        assert_eq!(LockOp::Shared as u64, 5);
        assert_eq!(LockOp::Exclusive as u64, 6);
        assert_eq!(LockOp::Unlock as u64, 12);
    }

    #[test]
    fn test_path_with_nul_rejected() {
        let result = Request::MakeDir {
            path: "/bad\0path".to_string(),
        }
        .to_packet(0);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidValue { key: "path", .. })
        ));
    }

    #[test]
    fn test_classify_status_success() {
        let reply = Reply::classify(Opcode::MakeDir, &status_packet(0)).unwrap();
        assert_eq!(reply, Reply::Status(StatusCode::Success));
    }

    #[test]
    fn test_classify_status_not_found() {
        let reply = Reply::classify(Opcode::GetFileInfo, &status_packet(8)).unwrap();
        assert_eq!(reply, Reply::Status(StatusCode::ObjectNotFound));
    }

    #[test]
    fn test_classify_status_ignores_upper_bytes() {
        let mut payload = BytesMut::new();
        payload.put_u32_le(10);
        payload.put_u32_le(0xffff_ffff);
        let packet = Packet::new(0, Opcode::Status).with_header_payload(payload.freeze());

        let reply = Reply::classify(Opcode::RemovePath, &packet).unwrap();
        assert_eq!(reply, Reply::Status(StatusCode::PermDenied));
    }

    #[test]
    fn test_classify_status_bad_length() {
        let packet =
            Packet::new(0, Opcode::Status).with_header_payload(Bytes::from_static(&[0u8; 4]));
        let result = Reply::classify(Opcode::MakeDir, &packet);
        assert!(matches!(result, Err(ProtocolError::InvalidStatusLength(4))));
    }

    #[test]
    fn test_classify_data() {
        let packet = Packet::new(0, Opcode::Data).with_content(Bytes::from_static(b"a\0b\0"));
        let reply = Reply::classify(Opcode::GetFileInfo, &packet).unwrap();
        assert_eq!(reply, Reply::Data(Bytes::from_static(b"a\0b\0")));
    }

    #[test]
    fn test_classify_dedicated_result_opcode() {
        let packet = Packet::new(0, Opcode::FileOpenRes)
            .with_header_payload(Bytes::from_static(&[3, 0, 0, 0, 0, 0, 0, 0]));
        let reply = Reply::classify(Opcode::FileOpen, &packet).unwrap();
        assert_eq!(
            reply,
            Reply::Data(Bytes::from_static(&[3, 0, 0, 0, 0, 0, 0, 0]))
        );

        // Only valid for the matching request
        let result = Reply::classify(Opcode::GetFileInfo, &packet);
        assert!(matches!(
            result,
            Err(ProtocolError::UnexpectedOpcode {
                request: Opcode::GetFileInfo,
                received: Opcode::FileOpenRes,
            })
        ));
    }

    #[test]
    fn test_classify_unexpected_opcode() {
        let packet = Packet::new(0, Opcode::ReadDir);
        let result = Reply::classify(Opcode::ReadDir, &packet);
        assert!(matches!(result, Err(ProtocolError::UnexpectedOpcode { .. })));
    }

    #[test]
    fn test_parse_u64() {
        assert_eq!(
            parse_u64(Opcode::FileTell, &42u64.to_le_bytes()).unwrap(),
            42
        );
        assert!(matches!(
            parse_u64(Opcode::FileOpen, &[1, 2, 3]),
            Err(ProtocolError::InvalidPayloadLength { actual: 3, .. })
        ));
    }
}
