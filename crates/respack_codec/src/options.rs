//! Tunable encoder settings.

use serde::{Deserialize, Serialize};

/// Default zlib compression level.
pub const DEFAULT_DEFLATE_LEVEL: u32 = 6;

/// Default number of earlier positions the internal encoder examines per match.
pub const DEFAULT_INTERNAL_MAX_CHAIN: usize = 32;

/// Settings for [`compress_with`](crate::compress_with).
///
/// Decoding takes no options: every stream is self-describing apart from its
/// decompressed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressOptions {
    /// zlib level, `0` (store) through `9` (best).
    pub deflate_level: u32,
    /// Hash-chain search depth of the internal-compression encoder.
    ///
    /// Larger values find longer matches at the cost of encoding speed.
    pub internal_max_chain: usize,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            deflate_level: DEFAULT_DEFLATE_LEVEL,
            internal_max_chain: DEFAULT_INTERNAL_MAX_CHAIN,
        }
    }
}
