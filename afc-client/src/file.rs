//! Open file handles.

/// A file opened with [`AfcClient::open`](crate::AfcClient::open).
///
/// Not `Clone`: [`AfcClient::close`](crate::AfcClient::close) consumes it, so
/// a closed handle cannot be used again. A handle is only valid on the
/// connection it was opened on; after a reconnect, operations on it fail
/// with [`ClientError::StaleHandle`](crate::ClientError::StaleHandle).
#[derive(Debug, PartialEq, Eq)]
pub struct FileHandle {
    raw: u64,
    generation: u64,
}

impl FileHandle {
    pub(crate) fn new(raw: u64, generation: u64) -> Self {
        Self { raw, generation }
    }

    /// The device-assigned handle number.
    pub fn raw(&self) -> u64 {
        self.raw
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}
