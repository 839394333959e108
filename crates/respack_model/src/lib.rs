//! Mutable resource models with lazily cached serialized forms.
//!
//! Every model participates in a [`ModelGraph`]: an arena of nodes addressed by
//! [`ModelId`] handles. Each node holds an optional owner edge, the set of
//! children naming it as owner, and a [`CachedBuffer`] with the model's last
//! serialization. Because an owner's bytes embed its children's bytes, a
//! mutation anywhere clears the cache of the mutated node and of every
//! ancestor, and of nothing else.
//!
//! Mutation happens through explicit APIs that perform the invalidation:
//!
//! - [`ModelGraph::set_watched`] for scalar fields declared in [`Model::WATCHED`];
//! - [`TrackedList`] and [`TrackedMap`] for collections held by a model;
//! - [`MappedModel`] for sets of uniquely identified key/value entries.
//!
//! The graph has no locking. A `&mut ModelGraph` is the single-mutator guarantee.

#![warn(missing_docs)]

pub mod buffer;
pub mod error;
pub mod graph;
pub mod mapped;
pub mod model;
pub mod tracked;

pub use buffer::{BufferOptions, CachedBuffer};
pub use error::{ModelError, ValidationError, Violation};
pub use graph::{GraphOptions, ModelGraph};
pub use mapped::{Entry, EntryKey, EntryValue, MappedModel};
pub use model::{GraphNode, Model, Serializable};
pub use respack_common::{EntryId, ModelId};
pub use tracked::{CollectionChange, IntoTracked, TrackedList, TrackedMap};
