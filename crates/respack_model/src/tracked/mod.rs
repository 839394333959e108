//! Collections whose mutations invalidate their owning model.
//!
//! A model that holds a list or map of values keeps it in a [`TrackedList`] or
//! [`TrackedMap`]. Reads go straight to the underlying container through
//! `Deref`. Every mutator takes the [`ModelGraph`] and, after changing the
//! container:
//!
//! 1. reports a [`CollectionChange`] to the optional change hook;
//! 2. makes each stored value that is a model a child of the owning model,
//!    and detaches each removed one;
//! 3. uncaches the owning model (and so its ancestors).

mod list;
mod map;

pub use list::TrackedList;
pub use map::TrackedMap;

use respack_common::ModelId;

use crate::graph::ModelGraph;
use crate::model::GraphNode;

/// A mutation reported to a collection's change hook.
#[derive(Debug)]
pub struct CollectionChange<'a, K, T> {
    /// The model the collection reports to.
    pub owner: ModelId,
    /// Index or key of the changed slot; `None` for whole-collection changes
    /// such as sorting or clearing.
    pub key: Option<&'a K>,
    /// The value that was replaced or removed.
    pub previous: Option<&'a T>,
    /// The value now stored in the slot.
    pub current: Option<&'a T>,
}

/// Callback invoked for every reported mutation.
pub type ChangeHook<K, T> = Box<dyn FnMut(&CollectionChange<'_, K, T>)>;

/// Conversion into a tracked collection.
///
/// Wrapping is idempotent: converting a collection that is already tracked
/// returns it unchanged, so a collection never gains a second layer of
/// invalidation.
pub trait IntoTracked<C> {
    /// Wraps `self` so that its mutations invalidate `owner`.
    fn into_tracked(self, graph: &mut ModelGraph, owner: ModelId) -> C;
}

fn notify<K, T>(hook: &mut Option<ChangeHook<K, T>>, change: CollectionChange<'_, K, T>) {
    if let Some(hook) = hook {
        hook(&change);
    }
}

/// Makes a stored model a child of the collection's owner.
fn adopt<T: GraphNode>(graph: &mut ModelGraph, owner: ModelId, value: &T) {
    if let Some(node) = value.graph_node() {
        graph.set_owner(node, Some(owner));
    }
}

/// Detaches a removed model, unless it moved elsewhere or is still stored.
fn release<T: GraphNode>(graph: &mut ModelGraph, owner: ModelId, value: &T, still_held: bool) {
    if let Some(node) = value.graph_node() {
        if !still_held && graph.owner(node) == Some(owner) {
            graph.set_owner(node, None);
            graph.clear_cache(node);
        }
    }
}
