//! Structured views of stat and device-info dictionaries.

use crate::dict::parse_dict;
use crate::error::ProtocolError;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// File type as reported in `st_ifmt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileType {
    Directory,
    Regular,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Unknown,
}

impl FileType {
    pub fn from_ifmt(ifmt: &str) -> Self {
        match ifmt {
            "S_IFDIR" => FileType::Directory,
            "S_IFREG" => FileType::Regular,
            "S_IFLNK" => FileType::Symlink,
            "S_IFCHR" => FileType::CharDevice,
            "S_IFBLK" => FileType::BlockDevice,
            "S_IFIFO" => FileType::Fifo,
            "S_IFSOCK" => FileType::Socket,
            _ => FileType::Unknown,
        }
    }
}

/// Result of a `GET_FILE_INFO` request.
///
/// Devices do not always send every key. Absent counts read as zero and
/// absent timestamps or type tags as `None`; only a value that is present
/// but unparsable is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatRecord {
    pub st_size: u64,
    pub st_blocks: u64,
    pub st_nlink: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub st_mtime: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub st_birthtime: Option<DateTime<Utc>>,
    /// Type tag such as `S_IFDIR`, kept verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub st_ifmt: Option<String>,
    /// Present for symbolic links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub st_linktarget: Option<String>,
    /// Keys this client does not interpret.
    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

impl StatRecord {
    /// Parses a raw stat dictionary payload.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        Self::from_dict(parse_dict(data)?)
    }

    pub fn from_dict(mut dict: HashMap<String, String>) -> Result<Self, ProtocolError> {
        Ok(Self {
            st_size: take_opt_u64(&mut dict, "st_size")?.unwrap_or(0),
            st_blocks: take_opt_u64(&mut dict, "st_blocks")?.unwrap_or(0),
            st_nlink: take_opt_u64(&mut dict, "st_nlink")?.unwrap_or(0),
            st_mtime: take_timestamp(&mut dict, "st_mtime")?,
            st_birthtime: take_timestamp(&mut dict, "st_birthtime")?,
            st_ifmt: dict.remove("st_ifmt"),
            st_linktarget: dict.remove("st_linktarget"),
            extra: dict,
        })
    }

    pub fn file_type(&self) -> FileType {
        self.st_ifmt
            .as_deref()
            .map_or(FileType::Unknown, FileType::from_ifmt)
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.file_type() == FileType::Regular
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type() == FileType::Symlink
    }
}

/// Result of a `GET_DEVINFO` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub model: String,
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub block_size: u64,
    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

impl DeviceInfo {
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut dict = parse_dict(data)?;
        Ok(Self {
            model: take(&mut dict, "Model")?,
            total_bytes: take_u64(&mut dict, "FSTotalBytes")?,
            free_bytes: take_u64(&mut dict, "FSFreeBytes")?,
            block_size: take_u64(&mut dict, "FSBlockSize")?,
            extra: dict,
        })
    }
}

fn take(dict: &mut HashMap<String, String>, key: &'static str) -> Result<String, ProtocolError> {
    dict.remove(key).ok_or(ProtocolError::MissingField(key))
}

fn take_u64(dict: &mut HashMap<String, String>, key: &'static str) -> Result<u64, ProtocolError> {
    take_opt_u64(dict, key)?.ok_or(ProtocolError::MissingField(key))
}

fn take_opt_u64(
    dict: &mut HashMap<String, String>,
    key: &'static str,
) -> Result<Option<u64>, ProtocolError> {
    dict.remove(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ProtocolError::InvalidValue { key, value })
        })
        .transpose()
}

/// Converts an optional nanoseconds-since-epoch field.
fn take_timestamp(
    dict: &mut HashMap<String, String>,
    key: &'static str,
) -> Result<Option<DateTime<Utc>>, ProtocolError> {
    let Some(nanos) = take_opt_u64(dict, key)? else {
        return Ok(None);
    };
    let secs = (nanos / NANOS_PER_SEC) as i64;
    let subsec = (nanos % NANOS_PER_SEC) as u32;
    Utc.timestamp_opt(secs, subsec)
        .single()
        .map(Some)
        .ok_or(ProtocolError::InvalidValue {
            key,
            value: nanos.to_string(),
        })
}
