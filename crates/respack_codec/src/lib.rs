//! Compression and decompression of resource payloads.
//!
//! Resource records inside a package carry a compression tag next to their
//! bytes. This crate maps those tags to codecs:
//!
//! - [`CompressionType::Uncompressed`] and [`CompressionType::DeletedRecord`]
//!   pass bytes through unchanged.
//! - [`CompressionType::ZLib`] is a zlib-wrapped deflate stream.
//! - [`CompressionType::InternalCompression`] is a byte-oriented LZ77 format
//!   with five control-code ranges (see [`internal`]).
//!
//! All functions are pure: they never touch shared state, so independent
//! payloads can be decoded on separate threads (see [`decompress_all`]).
//!
//! # Usage
//!
//! ```
//! use respack_codec::{compress, decompress, CompressionType};
//!
//! let data = b"hello hello hello hello";
//! let packed = compress(data, CompressionType::InternalCompression).unwrap();
//! let unpacked = decompress(&packed, CompressionType::InternalCompression, data.len()).unwrap();
//! assert_eq!(unpacked, data);
//! ```

#![warn(missing_docs)]

mod deflate;
pub mod error;
pub mod internal;
pub mod kind;
pub mod options;
pub mod payload;

pub use error::{CodecError, DecodeError};
pub use kind::CompressionType;
pub use options::CompressOptions;
pub use payload::{decompress_all, CompressedPayload};

/// Compresses `data` with the given algorithm using default options.
///
/// Fails with [`CodecError::UnsupportedAlgorithm`] for algorithms that have no
/// encoder ([`CompressionType::DeletedRecord`], [`CompressionType::Streamable`]).
pub fn compress(data: &[u8], algorithm: CompressionType) -> Result<Vec<u8>, CodecError> {
    compress_with(data, algorithm, &CompressOptions::default())
}

/// Compresses `data` with the given algorithm and explicit options.
pub fn compress_with(
    data: &[u8],
    algorithm: CompressionType,
    options: &CompressOptions,
) -> Result<Vec<u8>, CodecError> {
    tracing::debug!(algorithm = %algorithm, len = data.len(), "compressing payload");
    match algorithm {
        CompressionType::Uncompressed => Ok(data.to_vec()),
        CompressionType::ZLib => deflate::deflate(data, options.deflate_level),
        CompressionType::InternalCompression => internal::encode(data, options.internal_max_chain),
        CompressionType::DeletedRecord | CompressionType::Streamable => {
            Err(CodecError::unsupported(algorithm.tag()))
        }
    }
}

/// Decompresses `data` that was stored with the given algorithm.
///
/// `decompressed_size` is the size recorded next to the payload. Codecs that
/// expand data verify their output against it and never write past it.
pub fn decompress(
    data: &[u8],
    algorithm: CompressionType,
    decompressed_size: usize,
) -> Result<Vec<u8>, CodecError> {
    tracing::debug!(
        algorithm = %algorithm,
        len = data.len(),
        decompressed_size,
        "decompressing payload"
    );
    let result = match algorithm {
        CompressionType::Uncompressed | CompressionType::DeletedRecord => Ok(data.to_vec()),
        CompressionType::ZLib => deflate::inflate(data, decompressed_size),
        CompressionType::InternalCompression => {
            internal::decode(data, decompressed_size).map_err(CodecError::from)
        }
        CompressionType::Streamable => Err(CodecError::unsupported(algorithm.tag())),
    };
    if let Err(err) = &result {
        tracing::debug!(algorithm = %algorithm, "decompression failed: {err}");
    }
    result
}

/// Decompresses `data` stored under a raw on-disk compression tag.
///
/// Unknown tags fail with [`CodecError::UnsupportedAlgorithm`] naming the tag.
pub fn decompress_tagged(
    data: &[u8],
    tag: u16,
    decompressed_size: usize,
) -> Result<Vec<u8>, CodecError> {
    decompress(data, CompressionType::from_tag(tag)?, decompressed_size)
}
