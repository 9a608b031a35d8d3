//! Length-prefix framing for the transport layer.
//!
//! A frame is a 4-byte big-endian length prefix followed by the payload.
//! Frames are bounded by [`MAX_FRAME_SIZE`]; anything larger is rejected
//! before allocation.

use bytes::{Buf, BufMut, BytesMut};

use crate::Error;

/// Maximum frame payload size (16 MB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Frame a payload with a length prefix.
pub fn encode_frame(payload: &[u8]) -> Result<BytesMut, Error> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(Error::InvalidMessage(format!(
            "payload size {} exceeds maximum {}",
            payload.len(),
            MAX_FRAME_SIZE
        )));
    }

    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);
    Ok(frame)
}

/// Extract the payload from a complete frame.
///
/// The frame must contain exactly the declared payload; trailing garbage is
/// rejected, since the transport delivers whole messages.
pub fn decode_frame(frame: &[u8]) -> Result<&[u8], Error> {
    if frame.len() < LENGTH_PREFIX_SIZE {
        return Err(Error::InvalidMessage(format!(
            "frame too short for length prefix: {} < {}",
            frame.len(),
            LENGTH_PREFIX_SIZE
        )));
    }

    let mut header = &frame[..LENGTH_PREFIX_SIZE];
    let len = header.get_u32() as usize;
    if len > MAX_FRAME_SIZE {
        return Err(Error::InvalidMessage(format!(
            "frame length {} exceeds maximum {}",
            len, MAX_FRAME_SIZE
        )));
    }

    let body = &frame[LENGTH_PREFIX_SIZE..];
    if body.len() != len {
        return Err(Error::InvalidMessage(format!(
            "frame length mismatch: declared {}, have {}",
            len,
            body.len()
        )));
    }

    Ok(body)
}
