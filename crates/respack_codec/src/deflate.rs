//! zlib backend built on `flate2`.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{CodecError, DecodeError};

/// Upper bound on deflate's expansion ratio, used to size the output buffer.
const MAX_EXPANSION: usize = 1032;

/// Compresses data into a zlib stream.
pub(crate) fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>, CodecError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflates a zlib stream that must expand to exactly `decompressed_size` bytes.
///
/// At most one byte past the declared size is read from the decoder, so a
/// stream that expands further is rejected without being fully inflated.
pub(crate) fn inflate(data: &[u8], decompressed_size: usize) -> Result<Vec<u8>, CodecError> {
    let limit = u64::try_from(decompressed_size)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut output =
        Vec::with_capacity(decompressed_size.min(data.len().saturating_mul(MAX_EXPANSION)));
    ZlibDecoder::new(data).take(limit).read_to_end(&mut output)?;

    if output.len() > decompressed_size {
        return Err(DecodeError::OutputOverflow {
            offset: decompressed_size,
            len: 1,
            capacity: decompressed_size,
        }
        .into());
    }
    if output.len() != decompressed_size {
        return Err(DecodeError::LengthMismatch {
            expected: decompressed_size,
            actual: output.len(),
        }
        .into());
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let data = b"test data for zlib compression test data for zlib compression";
        let compressed = deflate(data, 6).unwrap();
        assert_eq!(compressed[0], 0x78, "zlib header expected");
        let back = inflate(&compressed, data.len()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn level_zero_stores() {
        let data = b"abcabcabcabc";
        let compressed = deflate(data, 0).unwrap();
        assert!(compressed.len() > data.len());
        assert_eq!(inflate(&compressed, data.len()).unwrap(), data);
    }

    #[test]
    fn short_declared_size_overflows() {
        let data = vec![7u8; 100];
        let compressed = deflate(&data, 6).unwrap();
        let err = inflate(&compressed, 50).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Decode(DecodeError::OutputOverflow { capacity: 50, .. })
        ));
    }

    #[test]
    fn long_declared_size_mismatches() {
        let data = vec![7u8; 100];
        let compressed = deflate(&data, 6).unwrap();
        let err = inflate(&compressed, 120).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Decode(DecodeError::LengthMismatch {
                expected: 120,
                actual: 100
            })
        ));
    }

    #[test]
    fn huge_declared_size_is_an_error() {
        let compressed = deflate(b"abc", 6).unwrap();
        let err = inflate(&compressed, usize::MAX).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Decode(DecodeError::LengthMismatch {
                expected: usize::MAX,
                actual: 3
            })
        ));
    }

    #[test]
    fn garbage_is_deflate_error() {
        let err = inflate(&[0x12, 0x34, 0x56, 0x78], 10).unwrap_err();
        assert!(matches!(err, CodecError::Deflate(_)));
    }
}
