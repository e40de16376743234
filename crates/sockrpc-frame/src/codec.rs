use bytes::{BufMut, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};

/// Frame header: marker (4) + payload size (4) + total size (4) = 12 bytes.
pub const HEADER_SIZE: usize = 12;

/// Validity marker: "SRPC".
pub const MAGIC: [u8; 4] = *b"SRPC";

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Fixed prefix of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub marker: [u8; 4],
    /// Exact byte length of the payload that follows the header.
    pub payload_size: u32,
    /// Header size plus payload size.
    pub total_size: u32,
}

impl Header {
    /// Header announcing a payload of `len` bytes.
    pub fn for_payload(len: usize) -> Result<Self> {
        let too_large = || FrameError::PayloadTooLarge {
            size: len,
            max: u32::MAX as usize - HEADER_SIZE,
        };
        let payload_size = u32::try_from(len).map_err(|_| too_large())?;
        let total_size = payload_size
            .checked_add(HEADER_SIZE as u32)
            .ok_or_else(too_large)?;
        Ok(Self {
            marker: MAGIC,
            payload_size,
            total_size,
        })
    }

    /// Read the header from the start of `src`; `None` until `HEADER_SIZE` bytes are present.
    pub fn parse(src: &[u8]) -> Option<Self> {
        let raw: &[u8; HEADER_SIZE] = src.get(..HEADER_SIZE)?.try_into().ok()?;
        let word = |at: usize| u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]);
        Some(Self {
            marker: [raw[0], raw[1], raw[2], raw[3]],
            payload_size: word(4),
            total_size: word(8),
        })
    }

    /// Check the marker, the size relation and the payload limit.
    pub fn validate(&self, max_payload: usize) -> Result<()> {
        if self.marker != MAGIC {
            return Err(FrameError::InvalidMagic { found: self.marker });
        }
        let payload = self.payload_size as usize;
        let total = self.total_size as usize;
        if total != HEADER_SIZE + payload {
            return Err(FrameError::SizeMismatch { payload, total });
        }
        if payload > max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: payload,
                max: max_payload,
            });
        }
        Ok(())
    }

    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_size as usize
    }

    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.put_slice(&self.marker);
        dst.put_u32_le(self.payload_size);
        dst.put_u32_le(self.total_size);
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬──────────────┬──────────────────────┐
/// │ Marker (4B)  │ Payload size │ Total size   │ Payload              │
/// │ "SRPC"       │ (4B LE)      │ (4B LE)      │ (Payload size bytes) │
/// └──────────────┴──────────────┴──────────────┴──────────────────────┘
/// ```
///
/// Header and payload land in `dst` contiguously so they go out in one write.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header = Header::for_payload(payload.len())?;
    dst.reserve(header.frame_len());
    header.write_to(dst);
    dst.put_slice(payload);
    Ok(())
}

/// How far a received buffer has progressed towards a complete frame.
#[derive(Debug)]
pub enum Progress {
    /// More bytes are needed.
    Incomplete,
    /// Header valid and the whole payload has arrived.
    Complete(Header),
    /// The header was rejected; no more bytes will make it valid.
    Invalid(FrameError),
}

impl Progress {
    /// True while a reader should keep receiving.
    pub fn wants_more(&self) -> bool {
        matches!(self, Progress::Incomplete)
    }
}

/// Classify the bytes received so far.
pub fn inspect(src: &[u8], max_payload: usize) -> Progress {
    let Some(header) = Header::parse(src) else {
        return Progress::Incomplete;
    };
    if let Err(err) = header.validate(max_payload) {
        return Progress::Invalid(err);
    }
    if src.len() < header.frame_len() {
        Progress::Incomplete
    } else {
        Progress::Complete(header)
    }
}

/// Decode the frame at the start of `src` and return its payload.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// Bytes after the declared frame are ignored.
pub fn decode_frame(src: &[u8], max_payload: usize) -> Result<Option<&[u8]>> {
    match inspect(src, max_payload) {
        Progress::Incomplete => Ok(None),
        Progress::Complete(header) => Ok(Some(&src[HEADER_SIZE..header.frame_len()])),
        Progress::Invalid(err) => {
            debug!(error = %err, received = src.len(), "rejected frame header");
            Err(err)
        }
    }
}

/// Decode a frame from bytes that will not grow any further.
///
/// A truncated frame is an error here rather than `Ok(None)`.
pub fn decode_complete(src: &[u8], max_payload: usize) -> Result<&[u8]> {
    match decode_frame(src, max_payload)? {
        Some(payload) => Ok(payload),
        None => Err(FrameError::Incomplete {
            expected: Header::parse(src).map_or(HEADER_SIZE, |header| header.frame_len()),
            received: src.len(),
        }),
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
