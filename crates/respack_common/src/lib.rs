//! Shared foundational types used across the respack crates.
//!
//! This crate provides the dense ID-indexed [`Arena`], the handle newtypes that
//! address models and entries, and the internal error type used to report
//! broken invariants.

#![warn(missing_docs)]

pub mod arena;
pub mod ids;
pub mod result;

pub use arena::{Arena, ArenaId};
pub use ids::{EntryId, ModelId};
pub use result::{InternalError, RespackResult};
