//! Fixed-length frame codec for the actuator controller
//!
//! Every command is written as a single 8-byte frame:
//! ```text
//! [ 0xE5 0xFE ][ 0x16 ][ 4 bytes: command code (u32, little-endian) ][ checksum ]
//! ```
//!
//! The checksum is the bitwise NOT of the sum of the first seven bytes,
//! truncated to 8 bits.

use bytes::BufMut;
use std::fmt;
use thiserror::Error;

use crate::registry::CommandCode;

/// Length of every frame on the wire
pub const FRAME_LEN: usize = 8;

/// Leading sync bytes
pub const SYNC: [u8; 2] = [0xE5, 0xFE];

/// Frame type byte for key commands
pub const FRAME_TYPE: u8 = 0x16;

/// Errors that can occur while validating a captured frame
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid frame length: {0} bytes (expected {FRAME_LEN})")]
    InvalidLength(usize),

    #[error("Invalid sync bytes: {0:#04x} {1:#04x}")]
    InvalidSync(u8, u8),

    #[error("Invalid frame type: {0:#04x}")]
    InvalidType(u8),

    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// A complete, checksummed command frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Raw bytes as written to the link
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Command code carried by this frame
    pub fn code(&self) -> CommandCode {
        u32::from_le_bytes([self.0[3], self.0[4], self.0[5], self.0[6]])
    }

    /// Trailing checksum byte
    pub fn checksum(&self) -> u8 {
        self.0[FRAME_LEN - 1]
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Checksum over a frame body (everything but the checksum byte)
pub fn checksum(body: &[u8]) -> u8 {
    let sum = body.iter().fold(0u32, |acc, &b| acc.wrapping_add(b as u32));
    (!sum & 0xFF) as u8
}

/// Build the frame for a command code
pub fn encode(code: CommandCode) -> Frame {
    let mut frame = [0u8; FRAME_LEN];

    {
        let mut buf = &mut frame[..FRAME_LEN - 1];
        buf.put_slice(&SYNC);
        buf.put_u8(FRAME_TYPE);
        buf.put_u32_le(code);
    }

    frame[FRAME_LEN - 1] = checksum(&frame[..FRAME_LEN - 1]);
    Frame(frame)
}

/// Validate a captured byte sequence as a complete frame
pub fn decode(buf: &[u8]) -> Result<Frame, CodecError> {
    let bytes: [u8; FRAME_LEN] = buf
        .try_into()
        .map_err(|_| CodecError::InvalidLength(buf.len()))?;

    if bytes[..2] != SYNC {
        return Err(CodecError::InvalidSync(bytes[0], bytes[1]));
    }

    if bytes[2] != FRAME_TYPE {
        return Err(CodecError::InvalidType(bytes[2]));
    }

    let expected = checksum(&bytes[..FRAME_LEN - 1]);
    let actual = bytes[FRAME_LEN - 1];
    if expected != actual {
        return Err(CodecError::ChecksumMismatch { expected, actual });
    }

    Ok(Frame(bytes))
}
