//! Memoized serialized bytes.

use std::sync::Arc;

/// Options accepted by [`Serializable::get_buffer`](crate::Serializable::get_buffer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferOptions {
    /// Discard the cached bytes and serialize again.
    pub force_uncache: bool,
}

impl BufferOptions {
    /// Options that force a fresh serialization.
    pub fn force_uncache() -> Self {
        Self {
            force_uncache: true,
        }
    }
}

/// A lazily computed byte representation with change tracking.
///
/// The buffer is either present (nothing changed since it was computed) or
/// absent. When `never_cache` is set, stored bytes are discarded on arrival and
/// every read serializes again.
#[derive(Debug, Clone, Default)]
pub struct CachedBuffer {
    bytes: Option<Arc<[u8]>>,
    never_cache: bool,
}

impl CachedBuffer {
    /// Creates an empty buffer that caches normally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer that never retains bytes.
    pub fn never_cached() -> Self {
        Self {
            bytes: None,
            never_cache: true,
        }
    }

    /// Returns `true` if the buffer must be recomputed before use.
    pub fn has_changed(&self) -> bool {
        self.bytes.is_none()
    }

    /// Returns `true` if this buffer never retains bytes.
    pub fn never_cache(&self) -> bool {
        self.never_cache
    }

    /// Switches caching off or on. Turning caching off drops the stored bytes.
    pub fn set_never_cache(&mut self, never_cache: bool) {
        self.never_cache = never_cache;
        if never_cache {
            self.bytes = None;
        }
    }

    /// Returns the cached bytes, if present.
    pub fn get(&self) -> Option<&Arc<[u8]>> {
        self.bytes.as_ref()
    }

    /// Stores freshly serialized bytes. Ignored when `never_cache` is set.
    pub fn store(&mut self, bytes: Arc<[u8]>) {
        if !self.never_cache {
            self.bytes = Some(bytes);
        }
    }

    /// Clears the cached bytes. Does not propagate anywhere.
    pub fn uncache(&mut self) {
        self.bytes = None;
    }

    /// Returns the cached bytes, serializing with `serialize` when needed.
    pub fn get_or_serialize<E>(
        &mut self,
        options: BufferOptions,
        serialize: impl FnOnce() -> Result<Vec<u8>, E>,
    ) -> Result<Arc<[u8]>, E> {
        if self.never_cache {
            return serialize().map(Arc::from);
        }
        if options.force_uncache {
            self.uncache();
        }
        if let Some(bytes) = &self.bytes {
            return Ok(Arc::clone(bytes));
        }
        let bytes: Arc<[u8]> = serialize()?.into();
        self.bytes = Some(Arc::clone(&bytes));
        Ok(bytes)
    }
}
