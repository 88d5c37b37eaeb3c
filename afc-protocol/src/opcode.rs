//! AFC operation codes.

use crate::error::ProtocolError;
use serde::Serialize;
use std::fmt;

/// Operation code carried in every packet header.
///
/// `Status` and `Data` only ever appear in responses; the `*Res` variants are
/// the dedicated result opcodes devices use for open and tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u64)]
pub enum Opcode {
    Status = 0x01,
    Data = 0x02,
    ReadDir = 0x03,
    ReadFile = 0x04,
    WriteFile = 0x05,
    WritePart = 0x06,
    Truncate = 0x07,
    RemovePath = 0x08,
    MakeDir = 0x09,
    GetFileInfo = 0x0a,
    GetDevInfo = 0x0b,
    WriteFileAtom = 0x0c,
    FileOpen = 0x0d,
    FileOpenRes = 0x0e,
    Read = 0x0f,
    Write = 0x10,
    FileSeek = 0x11,
    FileTell = 0x12,
    FileTellRes = 0x13,
    FileClose = 0x14,
    FileSetSize = 0x15,
    GetConInfo = 0x16,
    SetConOptions = 0x17,
    RenamePath = 0x18,
    SetFsBs = 0x19,
    SetSocketBs = 0x1a,
    FileLock = 0x1b,
    MakeLink = 0x1c,
    SetFileTime = 0x1e,
}

impl Opcode {
    pub fn from_u64(value: u64) -> Result<Self, ProtocolError> {
        let op = match value {
            0x01 => Opcode::Status,
            0x02 => Opcode::Data,
            0x03 => Opcode::ReadDir,
            0x04 => Opcode::ReadFile,
            0x05 => Opcode::WriteFile,
            0x06 => Opcode::WritePart,
            0x07 => Opcode::Truncate,
            0x08 => Opcode::RemovePath,
            0x09 => Opcode::MakeDir,
            0x0a => Opcode::GetFileInfo,
            0x0b => Opcode::GetDevInfo,
            0x0c => Opcode::WriteFileAtom,
            0x0d => Opcode::FileOpen,
            0x0e => Opcode::FileOpenRes,
            0x0f => Opcode::Read,
            0x10 => Opcode::Write,
            0x11 => Opcode::FileSeek,
            0x12 => Opcode::FileTell,
            0x13 => Opcode::FileTellRes,
            0x14 => Opcode::FileClose,
            0x15 => Opcode::FileSetSize,
            0x16 => Opcode::GetConInfo,
            0x17 => Opcode::SetConOptions,
            0x18 => Opcode::RenamePath,
            0x19 => Opcode::SetFsBs,
            0x1a => Opcode::SetSocketBs,
            0x1b => Opcode::FileLock,
            0x1c => Opcode::MakeLink,
            0x1e => Opcode::SetFileTime,
            other => return Err(ProtocolError::UnknownOpcode(other)),
        };
        Ok(op)
    }

    pub fn as_u64(self) -> u64 {
        self as u64
    }

    /// Dedicated result opcode a device may answer this request with instead of `DATA`.
    pub fn result_opcode(self) -> Option<Opcode> {
        match self {
            Opcode::FileOpen => Some(Opcode::FileOpenRes),
            Opcode::FileTell => Some(Opcode::FileTellRes),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Status => "STATUS",
            Opcode::Data => "DATA",
            Opcode::ReadDir => "READ_DIR",
            Opcode::ReadFile => "READ_FILE",
            Opcode::WriteFile => "WRITE_FILE",
            Opcode::WritePart => "WRITE_PART",
            Opcode::Truncate => "TRUNCATE",
            Opcode::RemovePath => "REMOVE_PATH",
            Opcode::MakeDir => "MAKE_DIR",
            Opcode::GetFileInfo => "GET_FILE_INFO",
            Opcode::GetDevInfo => "GET_DEVINFO",
            Opcode::WriteFileAtom => "WRITE_FILE_ATOM",
            Opcode::FileOpen => "FILE_OPEN",
            Opcode::FileOpenRes => "FILE_OPEN_RES",
            Opcode::Read => "READ",
            Opcode::Write => "WRITE",
            Opcode::FileSeek => "FILE_SEEK",
            Opcode::FileTell => "FILE_TELL",
            Opcode::FileTellRes => "FILE_TELL_RES",
            Opcode::FileClose => "FILE_CLOSE",
            Opcode::FileSetSize => "FILE_SET_SIZE",
            Opcode::GetConInfo => "GET_CON_INFO",
            Opcode::SetConOptions => "SET_CON_OPTIONS",
            Opcode::RenamePath => "RENAME_PATH",
            Opcode::SetFsBs => "SET_FS_BS",
            Opcode::SetSocketBs => "SET_SOCKET_BS",
            Opcode::FileLock => "FILE_LOCK",
            Opcode::MakeLink => "MAKE_LINK",
            Opcode::SetFileTime => "SET_FILE_TIME",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_values() {
        assert_eq!(Opcode::Status.as_u64(), 0x01);
        assert_eq!(Opcode::Data.as_u64(), 0x02);
        assert_eq!(Opcode::GetFileInfo.as_u64(), 0x0a);
        assert_eq!(Opcode::FileOpen.as_u64(), 0x0d);
        assert_eq!(Opcode::MakeLink.as_u64(), 0x1c);
        assert_eq!(Opcode::SetFileTime.as_u64(), 0x1e);
    }

    #[test]
    fn test_from_u64_covers_table() {
        for value in (0x01..=0x1c).chain(std::iter::once(0x1e)) {
            let op = Opcode::from_u64(value).unwrap();
            assert_eq!(op.as_u64(), value);
        }
    }

    #[test]
    fn test_unknown_opcode() {
        assert!(matches!(
            Opcode::from_u64(0),
            Err(ProtocolError::UnknownOpcode(0))
        ));
        // 0x1d is unassigned
        assert!(matches!(
            Opcode::from_u64(0x1d),
            Err(ProtocolError::UnknownOpcode(0x1d))
        ));
        assert!(Opcode::from_u64(u64::MAX).is_err());
    }

    #[test]
    fn test_result_opcode() {
        assert_eq!(Opcode::FileOpen.result_opcode(), Some(Opcode::FileOpenRes));
        assert_eq!(Opcode::FileTell.result_opcode(), Some(Opcode::FileTellRes));
        assert_eq!(Opcode::GetFileInfo.result_opcode(), None);
    }

    #[test]
    fn test_opcode_display() {
        assert_eq!(Opcode::GetDevInfo.to_string(), "GET_DEVINFO");
        assert_eq!(Opcode::FileSetSize.to_string(), "FILE_SET_SIZE");
    }
}
