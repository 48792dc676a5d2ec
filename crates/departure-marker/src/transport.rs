//! Length-prefixed marker framing for byte streams.
//!
//! A frame is a 4-byte big-endian length followed by that many bytes of
//! marker JSON. Framing carries no cryptography; receivers still verify.

use std::io::{Read, Write};

use crate::error::{MarkerError, Result};
use crate::marker::DepartureMarker;

/// Frame length prefix size in bytes.
pub const LENGTH_PREFIX: usize = 4;

/// Default cap on a declared frame body.
pub const DEFAULT_MAX_FRAME: usize = 1024 * 1024;

/// Encode a marker as one frame.
pub fn frame_marker(marker: &DepartureMarker) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(marker)?;
    let len = u32::try_from(body.len())
        .map_err(|_| MarkerError::Frame(format!("marker of {} bytes is too large", body.len())))?;
    let mut frame = Vec::with_capacity(LENGTH_PREFIX + body.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Write one framed marker to `writer`.
pub fn write_frame<W: Write>(writer: &mut W, marker: &DepartureMarker) -> Result<()> {
    writer.write_all(&frame_marker(marker)?)?;
    Ok(())
}

/// Read one frame body from `reader`.
///
/// A declared length above `max_len` is rejected before any body bytes are
/// read.
pub fn read_frame<R: Read>(reader: &mut R, max_len: usize) -> Result<Vec<u8>> {
    let mut len_bytes = [0u8; LENGTH_PREFIX];
    reader
        .read_exact(&mut len_bytes)
        .map_err(|e| MarkerError::Frame(format!("failed to read length: {e}")))?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > max_len {
        return Err(MarkerError::Frame(format!(
            "declared length {len} exceeds limit {max_len}"
        )));
    }

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .map_err(|e| MarkerError::Frame(format!("truncated frame body: {e}")))?;
    Ok(body)
}

/// Decode a single complete frame held in memory.
///
/// Trailing bytes after the declared body are an error.
pub fn unframe_marker(bytes: &[u8], max_len: usize) -> Result<DepartureMarker> {
    let mut cursor = bytes;
    let body = read_frame(&mut cursor, max_len)?;
    if !cursor.is_empty() {
        return Err(MarkerError::Frame(format!(
            "{} trailing bytes after frame",
            cursor.len()
        )));
    }
    Ok(serde_json::from_slice(&body)?)
}
