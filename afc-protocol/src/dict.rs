//! NUL-separated string payloads: key/value dictionaries and name lists.

use crate::error::ProtocolError;
use std::collections::HashMap;

/// Splits a payload into its NUL-terminated segments.
///
/// Whatever follows the last terminator is dropped: the empty tail of a
/// well-formed payload, or an unterminated trailing segment.
fn segments(data: &[u8]) -> Result<Vec<&str>, ProtocolError> {
    let text = std::str::from_utf8(data).map_err(|_| ProtocolError::InvalidUtf8)?;
    let mut parts: Vec<&str> = text.split('\0').collect();
    parts.pop();
    Ok(parts)
}

/// Parses an alternating key/value list (`key\0value\0key\0value\0`).
pub fn parse_dict(data: &[u8]) -> Result<HashMap<String, String>, ProtocolError> {
    let parts = segments(data)?;
    if parts.len() % 2 != 0 {
        return Err(ProtocolError::OddDictionary(parts.len()));
    }

    Ok(parts
        .chunks_exact(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect())
}

/// Parses a plain list of NUL-terminated names.
pub fn parse_name_list(data: &[u8]) -> Result<Vec<String>, ProtocolError> {
    Ok(segments(data)?.into_iter().map(str::to_string).collect())
}
