//! Opaque handle newtypes.
//!
//! Handles are small `Copy` values that are `Hash`, `Ord`, and
//! `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a generational handle type implementing [`ArenaId`](crate::arena::ArenaId).
///
/// The handle pairs a `u32` slot index with the generation of the slot it
/// was issued for. `from_raw` builds a first-generation handle.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Debug,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl $name {
            /// Creates a first-generation handle from a raw slot index.
            pub fn from_raw(index: u32) -> Self {
                Self {
                    index,
                    generation: 0,
                }
            }

            /// Returns the raw slot index.
            pub fn as_raw(self) -> u32 {
                self.index
            }

            /// Returns the slot generation this handle was issued for.
            pub fn generation(self) -> u32 {
                self.generation
            }
        }

        impl $crate::arena::ArenaId for $name {
            fn new(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            fn index(self) -> u32 {
                self.index
            }

            fn generation(self) -> u32 {
                self.generation
            }
        }
    };
}

define_id!(
    /// Handle of a model node inside a model graph.
    ModelId
);

/// Identifier of an entry inside one keyed entry collection.
///
/// Assigned from a per-collection counter at creation and never reused by
/// that collection, even after the entry is deleted.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct EntryId(u32);

impl EntryId {
    /// Creates an entry identifier from its raw value.
    pub fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Returns the identifier following this one, or `None` once the
    /// `u32` range is used up.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.generation {
            0 => write!(f, "model {}", self.index),
            generation => write!(f, "model {}/{generation}", self.index),
        }
    }
}
