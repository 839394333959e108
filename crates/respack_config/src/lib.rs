//! Parsing and validation of `respack.toml` settings.
//!
//! The file tunes the codec (deflate level, encoder search depth) and the
//! default caching mode of the model graph. Every key is optional.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, load_config_or_default, CONFIG_FILE};
pub use types::*;
