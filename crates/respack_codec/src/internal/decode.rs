//! Control-code decoder.

use crate::error::DecodeError;

use super::Header;

/// Most output a single input byte can produce: a 4-byte code copying 1028.
const MAX_EXPANSION: usize = 1028 / 4 + 1;

/// A back-reference decoded from a control code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BackRef {
    len: usize,
    /// Distance back from the write position, minus one.
    offset: usize,
}

/// Bounds-checked reader over the compressed input.
struct Input<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Input<'a> {
    fn next(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }

    fn byte(&mut self) -> Result<usize, DecodeError> {
        self.next().map(usize::from).ok_or(DecodeError::UnexpectedEof {
            offset: self.pos,
            needed: 1,
        })
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos + len;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(DecodeError::UnexpectedEof {
                offset: self.pos,
                needed: end - self.data.len(),
            })?;
        self.pos = end;
        Ok(bytes)
    }
}

/// Bounded output buffer.
struct Output {
    bytes: Vec<u8>,
    capacity: usize,
}

impl Output {
    fn reserve(&self, len: usize) -> Result<(), DecodeError> {
        if self.bytes.len().saturating_add(len) > self.capacity {
            return Err(DecodeError::OutputOverflow {
                offset: self.bytes.len(),
                len,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn literals(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        self.reserve(bytes.len())?;
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn copy(&mut self, back_ref: BackRef) -> Result<(), DecodeError> {
        let position = self.bytes.len();
        let distance = back_ref.offset + 1;
        if distance > position {
            return Err(DecodeError::BackReferenceOutOfRange { position, distance });
        }
        self.reserve(back_ref.len)?;

        // Byte by byte: the source range may overlap the bytes being written.
        let start = position - distance;
        for i in 0..back_ref.len {
            let byte = self.bytes[start + i];
            self.bytes.push(byte);
        }
        Ok(())
    }
}

/// Decodes an internal-compression stream into exactly `decompressed_size` bytes.
///
/// The size recorded in the stream header is informational; the caller's
/// `decompressed_size` bounds every write. Each loop iteration consumes at
/// least one input byte, so decoding terminates on any input.
pub fn decode(data: &[u8], decompressed_size: usize) -> Result<Vec<u8>, DecodeError> {
    let header = Header::parse(data)?;
    if header.decompressed_size != decompressed_size {
        tracing::warn!(
            header_size = header.decompressed_size,
            decompressed_size,
            "internal compression header disagrees with declared size"
        );
    }

    let mut input = Input {
        data,
        pos: header.len,
    };
    let mut output = Output {
        bytes: Vec::with_capacity(
            decompressed_size.min(data.len().saturating_mul(MAX_EXPANSION)),
        ),
        capacity: decompressed_size,
    };

    while let Some(cc0) = input.next() {
        let cc0 = usize::from(cc0);
        let (literals, back_ref) = match cc0 {
            0x00..=0x7F => {
                let cc1 = input.byte()?;
                let back_ref = BackRef {
                    len: ((cc0 & 0x1C) >> 2) + 3,
                    offset: ((cc0 & 0x60) << 3) + cc1,
                };
                (cc0 & 0x03, Some(back_ref))
            }
            0x80..=0xBF => {
                let cc1 = input.byte()?;
                let cc2 = input.byte()?;
                let back_ref = BackRef {
                    len: (cc0 & 0x3F) + 4,
                    offset: ((cc1 & 0x3F) << 8) + cc2,
                };
                ((cc1 & 0xC0) >> 6, Some(back_ref))
            }
            0xC0..=0xDF => {
                let cc1 = input.byte()?;
                let cc2 = input.byte()?;
                let cc3 = input.byte()?;
                let back_ref = BackRef {
                    len: ((cc0 & 0x0C) << 6) + cc3 + 5,
                    offset: ((cc0 & 0x10) << 12) + (cc1 << 8) + cc2,
                };
                (cc0 & 0x03, Some(back_ref))
            }
            0xE0..=0xFB => (((cc0 & 0x1F) << 2) + 4, None),
            _ => {
                output.literals(input.take(cc0 & 0x03)?)?;
                break;
            }
        };

        output.literals(input.take(literals)?)?;
        if let Some(back_ref) = back_ref {
            output.copy(back_ref)?;
        }
    }

    if output.bytes.len() != decompressed_size {
        return Err(DecodeError::LengthMismatch {
            expected: decompressed_size,
            actual: output.bytes.len(),
        });
    }
    Ok(output.bytes)
}
