//! Configuration types deserialized from `respack.toml`.

use respack_codec::options::{DEFAULT_DEFLATE_LEVEL, DEFAULT_INTERNAL_MAX_CHAIN};
use respack_codec::CompressOptions;
use respack_model::GraphOptions;
use serde::{Deserialize, Serialize};

/// The top-level settings parsed from `respack.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespackConfig {
    /// Compression settings.
    #[serde(default)]
    pub codec: CodecConfig,
    /// Model graph caching settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// The `[codec]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// zlib compression level, `0..=9`.
    pub deflate_level: u32,
    /// Match candidates the internal encoder examines per position; at least 1.
    pub internal_max_chain: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            deflate_level: DEFAULT_DEFLATE_LEVEL,
            internal_max_chain: DEFAULT_INTERNAL_MAX_CHAIN,
        }
    }
}

/// The `[cache]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Create graph nodes that never keep serialized bytes.
    pub never_cache: bool,
}

impl RespackConfig {
    /// Options for [`respack_codec::compress_with`].
    pub fn compress_options(&self) -> CompressOptions {
        CompressOptions {
            deflate_level: self.codec.deflate_level,
            internal_max_chain: self.codec.internal_max_chain,
        }
    }

    /// Options for [`respack_model::ModelGraph::with_options`].
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            never_cache: self.cache.never_cache,
        }
    }
}
