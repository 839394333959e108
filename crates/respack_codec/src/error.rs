//! Error types for compression and decompression.

/// Errors returned by [`compress`](crate::compress) and
/// [`decompress`](crate::decompress).
///
/// Each error is fatal to the single call that produced it; codec functions
/// hold no state, so the next call starts fresh.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The compression tag is unknown, or known but not handled by this codec.
    #[error("unsupported compression algorithm {name} (0x{tag:04X})")]
    UnsupportedAlgorithm {
        /// The raw on-disk compression tag.
        tag: u16,
        /// Human readable name of the tag, or `"unknown"`.
        name: &'static str,
    },

    /// The payload is not a valid stream for its algorithm.
    #[error("malformed payload: {0}")]
    Decode(#[from] DecodeError),

    /// The input is too large for the stream header to describe.
    #[error("input of {len} bytes exceeds the {max} byte limit")]
    InputTooLarge {
        /// Length of the rejected input.
        len: usize,
        /// Largest supported input length.
        max: usize,
    },

    /// The deflate backend reported an error.
    #[error("deflate stream error: {0}")]
    Deflate(#[from] std::io::Error),
}

impl CodecError {
    /// Builds an [`CodecError::UnsupportedAlgorithm`] for a raw tag.
    pub fn unsupported(tag: u16) -> Self {
        Self::UnsupportedAlgorithm {
            tag,
            name: crate::kind::tag_name(tag),
        }
    }
}

/// Structural problems found while decoding a compressed payload.
///
/// Decoders check every read against the input and every write against the
/// declared output size, so malformed or hostile input surfaces as one of
/// these variants instead of reading garbage or writing out of bounds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The stream header is missing or malformed.
    #[error("invalid header: {reason}")]
    InvalidHeader {
        /// Description of the header problem.
        reason: String,
    },

    /// The input ended in the middle of a header, control code, or literal run.
    #[error("unexpected end of input at offset {offset}: {needed} more byte(s) required")]
    UnexpectedEof {
        /// Input offset where the read was attempted.
        offset: usize,
        /// Number of bytes the read required beyond the end of input.
        needed: usize,
    },

    /// Writing the decoded bytes would exceed the declared output size.
    #[error("output overflow at offset {offset}: {len} byte(s) exceed declared size {capacity}")]
    OutputOverflow {
        /// Output offset where the write was attempted.
        offset: usize,
        /// Number of bytes the write required.
        len: usize,
        /// The declared decompressed size.
        capacity: usize,
    },

    /// A back-reference points before the start of the output.
    #[error("back-reference at output offset {position} reaches {distance} byte(s) back")]
    BackReferenceOutOfRange {
        /// Output offset of the copy.
        position: usize,
        /// Distance back from `position` the copy starts at.
        distance: usize,
    },

    /// The stream ended before producing the declared number of bytes.
    #[error("decoded {actual} byte(s), expected {expected}")]
    LengthMismatch {
        /// The declared decompressed size.
        expected: usize,
        /// The number of bytes actually produced.
        actual: usize,
    },
}
