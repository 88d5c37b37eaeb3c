//! Binary packet format for AFC.
//!
//! Packet layout (40 bytes header + header payload + content):
//!
//! ```text
//! +----------+---------------+-------------+------------+----------+
//! |  magic   | entire_length | this_length | packet_num | opcode   |
//! | 8 bytes  |   u64 LE      |   u64 LE    |   u64 LE   |  u64 LE  |
//! +----------+---------------+-------------+------------+----------+
//! | header payload              | content                          |
//! | this_length - 40 bytes      | entire_length - this_length bytes|
//! +-----------------------------+----------------------------------+
//! ```

use crate::error::ProtocolError;
use crate::opcode::Opcode;
use crate::MAX_FRAME_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Magic bytes identifying AFC packets: "CFA6LPAA"
pub const MAGIC: [u8; 8] = *b"CFA6LPAA";

/// Size of the fixed packet header in bytes (5 * 8 = 40).
pub const HEADER_SIZE: usize = 40;

/// A parsed packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Header + header payload + content.
    pub entire_length: u64,
    /// Header + header payload; the offset at which content begins.
    pub this_length: u64,
    /// Sender-assigned sequence number.
    pub packet_num: u64,
    pub opcode: Opcode,
}

impl Header {
    /// Parses and validates a header from the first [`HEADER_SIZE`] bytes of `buf`.
    ///
    /// The magic is checked before any other field is interpreted.
    pub fn parse(buf: &[u8; HEADER_SIZE]) -> Result<Self, ProtocolError> {
        let magic: [u8; 8] = [
            buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
        ];
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic(magic));
        }

        let mut fields = &buf[8..];
        let entire_length = fields.get_u64_le();
        let this_length = fields.get_u64_le();
        let packet_num = fields.get_u64_le();
        let opcode = fields.get_u64_le();

        if this_length < HEADER_SIZE as u64 || this_length > entire_length {
            return Err(ProtocolError::InvalidLength {
                this_length,
                entire_length,
            });
        }

        if entire_length > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: entire_length,
                max: MAX_FRAME_SIZE,
            });
        }

        Ok(Self {
            entire_length,
            this_length,
            packet_num,
            opcode: Opcode::from_u64(opcode)?,
        })
    }

    /// Number of bytes that follow the header on the wire.
    pub fn payload_len(&self) -> usize {
        (self.entire_length - HEADER_SIZE as u64) as usize
    }

    /// Length of the header payload (operation-specific fixed fields).
    pub fn header_payload_len(&self) -> usize {
        (self.this_length - HEADER_SIZE as u64) as usize
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_slice(&MAGIC);
        buf.put_u64_le(self.entire_length);
        buf.put_u64_le(self.this_length);
        buf.put_u64_le(self.packet_num);
        buf.put_u64_le(self.opcode.as_u64());
    }
}

/// A complete AFC packet.
///
/// Lengths are not stored; they are derived from the buffers whenever the
/// packet is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_num: u64,
    pub opcode: Opcode,
    /// Operation-specific fixed fields (e.g. a handle and a size).
    pub header_payload: Bytes,
    /// Variable-length data (e.g. file contents).
    pub content: Bytes,
}

impl Packet {
    pub fn new(packet_num: u64, opcode: Opcode) -> Self {
        Self {
            packet_num,
            opcode,
            header_payload: Bytes::new(),
            content: Bytes::new(),
        }
    }

    pub fn with_header_payload(mut self, header_payload: Bytes) -> Self {
        self.header_payload = header_payload;
        self
    }

    pub fn with_content(mut self, content: Bytes) -> Self {
        self.content = content;
        self
    }

    /// Builds the header for this packet from the actual buffer sizes.
    pub fn header(&self) -> Result<Header, ProtocolError> {
        let this_length = (HEADER_SIZE + self.header_payload.len()) as u64;
        let entire_length = this_length + self.content.len() as u64;
        if entire_length > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: entire_length,
                max: MAX_FRAME_SIZE,
            });
        }

        Ok(Header {
            entire_length,
            this_length,
            packet_num: self.packet_num,
            opcode: self.opcode,
        })
    }

    /// Encodes the packet into bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let header = self.header()?;
        let mut buf = BytesMut::with_capacity(header.entire_length as usize);

        header.write(&mut buf);

        if !self.header_payload.is_empty() {
            buf.put_slice(&self.header_payload);
        }

        buf.put_slice(&self.content);

        Ok(buf)
    }

    /// Decodes a packet from bytes.
    ///
    /// Returns `Ok(Some(packet))` if a complete packet was decoded,
    /// `Ok(None)` if more data is needed, or `Err` on protocol errors.
    /// Bytes past `entire_length` are left in `buf`.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() >= MAGIC.len() && buf[..MAGIC.len()] != MAGIC {
            let mut magic = [0u8; 8];
            magic.copy_from_slice(&buf[..MAGIC.len()]);
            return Err(ProtocolError::InvalidMagic(magic));
        }

        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&buf[..HEADER_SIZE]);
        let header = Header::parse(&raw)?;

        if (buf.len() as u64) < header.entire_length {
            return Ok(None);
        }

        // Consume header
        buf.advance(HEADER_SIZE);

        let payload = buf.split_to(header.payload_len()).freeze();
        Self::from_parts(header, payload).map(Some)
    }

    /// Assembles a packet from a parsed header and the bytes that followed it.
    pub fn from_parts(header: Header, mut payload: Bytes) -> Result<Self, ProtocolError> {
        if payload.len() != header.payload_len() {
            return Err(ProtocolError::InvalidPayloadLength {
                opcode: header.opcode,
                expected: header.payload_len(),
                actual: payload.len(),
            });
        }

        let header_payload = payload.split_to(header.header_payload_len());

        Ok(Self {
            packet_num: header.packet_num,
            opcode: header.opcode,
            header_payload,
            content: payload,
        })
    }

    /// Header payload followed by content, i.e. everything after the header.
    pub fn payload(&self) -> Bytes {
        if self.header_payload.is_empty() {
            return self.content.clone();
        }
        if self.content.is_empty() {
            return self.header_payload.clone();
        }

        let mut buf = BytesMut::with_capacity(self.header_payload.len() + self.content.len());
        buf.put_slice(&self.header_payload);
        buf.put_slice(&self.content);
        buf.freeze()
    }
}
