//! Proprietary "internal compression" stream format.
//!
//! A stream starts with a small header followed by a sequence of control
//! codes. The first control byte selects one of five code shapes:
//!
//! | first byte    | length | literals            | copy length                    | copy offset (minus one)                      |
//! |---------------|--------|---------------------|--------------------------------|----------------------------------------------|
//! | `0x00..=0x7F` | 2      | `cc0 & 3`           | `((cc0 & 0x1C) >> 2) + 3`      | `((cc0 & 0x60) << 3) + cc1`                  |
//! | `0x80..=0xBF` | 3      | `(cc1 & 0xC0) >> 6` | `(cc0 & 0x3F) + 4`             | `((cc1 & 0x3F) << 8) + cc2`                  |
//! | `0xC0..=0xDF` | 4      | `cc0 & 3`           | `((cc0 & 0x0C) << 6) + cc3 + 5`| `((cc0 & 0x10) << 12) + (cc1 << 8) + cc2`    |
//! | `0xE0..=0xFB` | 1      | `((cc0 & 0x1F) << 2) + 4` | none                     |                                              |
//! | `0xFC..=0xFF` | 1      | `cc0 & 3`           | none, ends the stream          |                                              |
//!
//! Literal bytes follow their control code directly. The back-reference copy
//! runs after the literals and may overlap the bytes it produces.

mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

use crate::error::DecodeError;

/// Second header byte of every stream.
pub const MAGIC: u8 = 0xFB;

/// Flag bit selecting 4-byte size fields instead of 3-byte ones.
pub const FLAG_LARGE_SIZES: u8 = 0x80;

/// Flag bit announcing a compressed-size field ahead of the decompressed size.
pub const FLAG_COMPRESSED_SIZE: u8 = 0x01;

/// Bits of the flag byte that must read `0x10`.
const FLAG_SIGNATURE_MASK: u8 = 0x3E;

/// Expected value of the signature bits.
const FLAG_SIGNATURE: u8 = 0x10;

/// Parsed stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// The raw flag byte.
    pub flags: u8,
    /// Compressed size, when the stream records one.
    pub compressed_size: Option<usize>,
    /// Decompressed size recorded in the stream.
    pub decompressed_size: usize,
    /// Number of header bytes preceding the first control code.
    pub len: usize,
}

impl Header {
    /// Parses the header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let [flags, magic] = read_array::<2>(data, 0)?;
        if magic != MAGIC {
            return Err(DecodeError::InvalidHeader {
                reason: format!("expected magic 0x{MAGIC:02X}, found 0x{magic:02X}"),
            });
        }
        if flags & FLAG_SIGNATURE_MASK != FLAG_SIGNATURE {
            return Err(DecodeError::InvalidHeader {
                reason: format!("unrecognised flag byte 0x{flags:02X}"),
            });
        }

        let width = if flags & FLAG_LARGE_SIZES != 0 { 4 } else { 3 };
        let mut pos = 2;
        let compressed_size = if flags & FLAG_COMPRESSED_SIZE != 0 {
            let size = read_be(data, pos, width)?;
            pos += width;
            Some(size)
        } else {
            None
        };
        let decompressed_size = read_be(data, pos, width)?;
        pos += width;

        Ok(Self {
            flags,
            compressed_size,
            decompressed_size,
            len: pos,
        })
    }

    /// Writes the header for a stream of `decompressed_size` bytes.
    ///
    /// Sizes that do not fit in 24 bits switch to 4-byte size fields.
    pub(crate) fn write(out: &mut Vec<u8>, decompressed_size: u32) {
        if decompressed_size < 1 << 24 {
            out.push(FLAG_SIGNATURE);
            out.push(MAGIC);
            out.extend_from_slice(&decompressed_size.to_be_bytes()[1..]);
        } else {
            out.push(FLAG_SIGNATURE | FLAG_LARGE_SIZES);
            out.push(MAGIC);
            out.extend_from_slice(&decompressed_size.to_be_bytes());
        }
    }
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], DecodeError> {
    data.get(offset..offset + N)
        .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
        .ok_or(DecodeError::UnexpectedEof {
            offset,
            needed: offset + N - data.len().min(offset + N),
        })
}

fn read_be(data: &[u8], offset: usize, width: usize) -> Result<usize, DecodeError> {
    let bytes = data
        .get(offset..offset + width)
        .ok_or(DecodeError::UnexpectedEof {
            offset,
            needed: offset + width - data.len().min(offset + width),
        })?;
    Ok(bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize))
}
