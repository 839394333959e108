//! On-disk compression tags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Compression algorithm of a resource record.
///
/// The discriminants are the 16-bit tags written by the container format and
/// are part of the wire contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
#[repr(u16)]
pub enum CompressionType {
    /// Bytes are stored as-is.
    Uncompressed = 0x0000,
    /// The record marks a deleted resource; its bytes are passed through.
    DeletedRecord = 0xFFE0,
    /// Streamable compression. Recognised, but not handled by this codec.
    Streamable = 0xFFFE,
    /// Proprietary LZ77-family compression.
    InternalCompression = 0xFFFF,
    /// zlib-wrapped deflate (tag `0x5A42`, decimal 23106).
    ZLib = 0x5A42,
}

impl CompressionType {
    /// Returns the raw on-disk tag.
    pub const fn tag(self) -> u16 {
        self as u16
    }

    /// Resolves a raw on-disk tag.
    ///
    /// Fails with [`CodecError::UnsupportedAlgorithm`] for tags that name no
    /// known algorithm.
    pub fn from_tag(tag: u16) -> Result<Self, CodecError> {
        match tag {
            0x0000 => Ok(Self::Uncompressed),
            0xFFE0 => Ok(Self::DeletedRecord),
            0xFFFE => Ok(Self::Streamable),
            0xFFFF => Ok(Self::InternalCompression),
            0x5A42 => Ok(Self::ZLib),
            other => Err(CodecError::unsupported(other)),
        }
    }

    /// Returns the display name of the algorithm.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uncompressed => "Uncompressed",
            Self::DeletedRecord => "DeletedRecord",
            Self::Streamable => "Streamable",
            Self::InternalCompression => "InternalCompression",
            Self::ZLib => "ZLib",
        }
    }
}

/// Returns the name for a raw tag, or `"unknown"`.
pub(crate) fn tag_name(tag: u16) -> &'static str {
    match CompressionType::from_tag(tag) {
        Ok(kind) => kind.name(),
        Err(_) => "unknown",
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u16> for CompressionType {
    type Error = CodecError;

    fn try_from(tag: u16) -> Result<Self, Self::Error> {
        Self::from_tag(tag)
    }
}

impl From<CompressionType> for u16 {
    fn from(kind: CompressionType) -> Self {
        kind.tag()
    }
}
