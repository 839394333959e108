//! The ownership graph.
//!
//! Nodes live in a generational [`Arena`] and refer to each other by
//! [`ModelId`]. An owner edge means "my bytes are embedded in the owner's
//! bytes": invalidation flows from a node to its owner, then its owner's
//! owner, up to the root. Children never see their owner's invalidation and
//! siblings never see each other's.

use std::collections::BTreeSet;
use std::sync::Arc;

use respack_common::{Arena, InternalError, ModelId, RespackResult};
use serde::{Deserialize, Serialize};

use crate::buffer::{BufferOptions, CachedBuffer};

/// Defaults applied to nodes created by a [`ModelGraph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// Create nodes whose buffers never retain bytes.
    pub never_cache: bool,
}

/// Per-model graph state: edges plus the cached serialization.
#[derive(Debug, Clone, Default)]
struct ModelNode {
    owner: Option<ModelId>,
    children: BTreeSet<ModelId>,
    buffer: CachedBuffer,
}

/// Arena of model nodes with owner/child edges and cached buffers.
///
/// The graph stores no model payloads. A model struct keeps its [`ModelId`]
/// and routes every mutation through the graph so the right caches are
/// cleared. `&mut ModelGraph` is required for every mutation; there is no
/// internal locking.
#[derive(Debug, Clone, Default)]
pub struct ModelGraph {
    nodes: Arena<ModelId, ModelNode>,
    options: GraphOptions,
}

impl ModelGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty graph whose new nodes follow `options`.
    pub fn with_options(options: GraphOptions) -> Self {
        Self {
            nodes: Arena::new(),
            options,
        }
    }

    /// Returns the options applied to new nodes.
    pub fn options(&self) -> GraphOptions {
        self.options
    }

    /// Creates a node, attached to `owner` when given.
    pub fn insert(&mut self, owner: Option<ModelId>) -> ModelId {
        self.insert_with(owner, self.options.never_cache)
    }

    /// Creates a node with an explicit caching mode.
    pub fn insert_with(&mut self, owner: Option<ModelId>, never_cache: bool) -> ModelId {
        let buffer = if never_cache {
            CachedBuffer::never_cached()
        } else {
            CachedBuffer::new()
        };
        let id = self.nodes.alloc(ModelNode {
            owner: None,
            children: BTreeSet::new(),
            buffer,
        });
        self.set_owner(id, owner);
        id
    }

    /// Returns the number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph holds no live node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if `id` is a live node of this graph.
    pub fn contains(&self, id: ModelId) -> bool {
        self.nodes.contains(id)
    }

    /// Frees the node `id` so its slot can be reused.
    ///
    /// Only a detached node without children is freed. Returns `false` and
    /// leaves the graph untouched otherwise, or when `id` is already stale.
    pub fn remove(&mut self, id: ModelId) -> bool {
        match self.nodes.try_get(id) {
            Some(node) if node.owner.is_none() && node.children.is_empty() => {}
            _ => return false,
        }
        self.nodes.remove(id);
        tracing::trace!(model = id.as_raw(), "node freed");
        true
    }

    /// Returns the owner of `id`.
    pub fn owner(&self, id: ModelId) -> Option<ModelId> {
        self.nodes[id].owner
    }

    /// Iterates the nodes that currently name `id` as their owner.
    pub fn children(&self, id: ModelId) -> impl Iterator<Item = ModelId> + '_ {
        self.nodes[id].children.iter().copied()
    }

    /// Returns `true` if `child` currently names `id` as its owner.
    pub fn has_child(&self, id: ModelId, child: ModelId) -> bool {
        self.nodes[id].children.contains(&child)
    }

    /// Iterates the owners above `id`, nearest first.
    pub fn ancestors(&self, id: ModelId) -> impl Iterator<Item = ModelId> + '_ {
        std::iter::successors(self.owner(id), move |&node| self.owner(node)).take(self.nodes.len())
    }

    /// Moves `id` under `owner`, or detaches it with `None`.
    ///
    /// Keeps both sides of the edge in step: `id` leaves the previous owner's
    /// children and joins the new owner's. Re-parenting does not clear any
    /// cache; only content changes do. Setting the current owner again is a
    /// no-op.
    pub fn set_owner(&mut self, id: ModelId, owner: Option<ModelId>) {
        let previous = self.nodes[id].owner;
        if previous == owner {
            return;
        }
        debug_assert!(
            owner.map_or(true, |o| o != id && !self.ancestors(o).any(|a| a == id)),
            "setting owner of {id} would create an ownership cycle"
        );

        if let Some(previous) = previous {
            self.nodes[previous].children.remove(&id);
        }
        self.nodes[id].owner = owner;
        if let Some(owner) = owner {
            self.nodes[owner].children.insert(id);
        }
        tracing::trace!(model = id.as_raw(), ?previous, ?owner, "owner changed");
    }

    /// Clears the cached bytes of `id` and of every ancestor.
    ///
    /// Calling it on an already uncached node is harmless.
    pub fn uncache(&mut self, id: ModelId) {
        let mut current = Some(id);
        let mut depth = 0;
        while let Some(node) = current {
            // A cycle can only come from a broken set_owner; stop after visiting
            // every node once.
            if depth > self.nodes.len() {
                debug_assert!(false, "ownership cycle above {id}");
                break;
            }
            let node = &mut self.nodes[node];
            node.buffer.uncache();
            current = node.owner;
            depth += 1;
        }
        tracing::trace!(model = id.as_raw(), depth, "uncached");
    }

    /// Clears `id`, its ancestors, and every descendant.
    ///
    /// Automatic tracking should make this unnecessary; it exists for caches
    /// filled outside the graph's knowledge.
    pub fn deep_uncache(&mut self, id: ModelId) {
        self.uncache(id);
        let mut visited = BTreeSet::from([id]);
        let mut stack: Vec<ModelId> = self.children(id).collect();
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            self.nodes[node].buffer.uncache();
            stack.extend(self.nodes[node].children.iter().copied());
        }
        tracing::trace!(model = id.as_raw(), swept = visited.len(), "deep uncached");
    }

    /// Returns `true` if `id` has no cached bytes.
    pub fn has_changed(&self, id: ModelId) -> bool {
        self.nodes[id].buffer.has_changed()
    }

    /// Returns the cached bytes of `id`, if present.
    pub fn cached(&self, id: ModelId) -> Option<Arc<[u8]>> {
        self.nodes[id].buffer.get().cloned()
    }

    /// Stores serialized bytes for `id`.
    pub fn store(&mut self, id: ModelId, bytes: Arc<[u8]>) {
        self.nodes[id].buffer.store(bytes);
    }

    /// Clears only the cached bytes of `id`, without touching its ancestors.
    pub fn clear_cache(&mut self, id: ModelId) {
        self.nodes[id].buffer.uncache();
    }

    /// Returns `true` if `id` never retains serialized bytes.
    pub fn never_cache(&self, id: ModelId) -> bool {
        self.nodes[id].buffer.never_cache()
    }

    /// Switches caching of `id` off or on.
    pub fn set_never_cache(&mut self, id: ModelId, never_cache: bool) {
        self.nodes[id].buffer.set_never_cache(never_cache);
    }

    /// Returns the bytes of `id`, running `serialize` when the cache is empty.
    ///
    /// `serialize` receives the graph so it can fetch children's buffers.
    pub fn buffer<E>(
        &mut self,
        id: ModelId,
        options: BufferOptions,
        serialize: impl FnOnce(&mut Self) -> Result<Vec<u8>, E>,
    ) -> Result<Arc<[u8]>, E> {
        if self.never_cache(id) {
            return serialize(self).map(Arc::from);
        }
        if options.force_uncache {
            self.clear_cache(id);
        }
        if let Some(bytes) = self.cached(id) {
            return Ok(bytes);
        }
        let bytes: Arc<[u8]> = serialize(self)?.into();
        self.store(id, Arc::clone(&bytes));
        Ok(bytes)
    }

    /// Writes `value` into a watched field of `id`.
    ///
    /// When the value differs from the current one, the field is updated and
    /// `id` plus its ancestors are uncached. Returns whether anything changed.
    pub fn set_watched<T: PartialEq>(&mut self, id: ModelId, slot: &mut T, value: T) -> bool {
        if *slot == value {
            return false;
        }
        *slot = value;
        self.uncache(id);
        true
    }

    /// Deletes the value of an optional watched field of `id`.
    pub fn clear_watched<T: PartialEq>(&mut self, id: ModelId, slot: &mut Option<T>) -> bool {
        self.set_watched(id, slot, None)
    }

    /// Verifies that every owner edge has its matching child edge and back.
    pub fn check_consistency(&self) -> RespackResult<()> {
        for (id, node) in self.nodes.iter() {
            if let Some(owner) = node.owner {
                let registered = self
                    .nodes
                    .try_get(owner)
                    .is_some_and(|o| o.children.contains(&id));
                if !registered {
                    return Err(InternalError::new(format!(
                        "{id} names {owner} as owner but is not among its children"
                    )));
                }
            }
            for &child in &node.children {
                let owner = self.nodes.try_get(child).and_then(|c| c.owner);
                if owner != Some(id) {
                    return Err(InternalError::new(format!(
                        "{child} is a child of {id} but its owner is {owner:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_all(graph: &mut ModelGraph, ids: &[ModelId]) {
        for &id in ids {
            graph.store(id, Arc::from(vec![id.as_raw() as u8]));
        }
    }

    /// root <- mid <- leaf, root <- sibling
    fn tree() -> (ModelGraph, [ModelId; 4]) {
        let mut graph = ModelGraph::new();
        let root = graph.insert(None);
        let mid = graph.insert(Some(root));
        let leaf = graph.insert(Some(mid));
        let sibling = graph.insert(Some(root));
        (graph, [root, mid, leaf, sibling])
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: GraphOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, GraphOptions::default());
        let options: GraphOptions = serde_json::from_str(r#"{"never_cache": true}"#).unwrap();
        let mut graph = ModelGraph::with_options(options);
        let id = graph.insert(None);
        assert!(graph.never_cache(id));
    }

    #[test]
    fn insert_registers_child() {
        let (graph, [root, mid, leaf, sibling]) = tree();
        assert_eq!(graph.owner(mid), Some(root));
        assert!(graph.has_child(root, mid));
        assert!(graph.has_child(root, sibling));
        assert_eq!(graph.children(mid).collect::<Vec<_>>(), vec![leaf]);
        assert!(graph.check_consistency().is_ok());
    }

    #[test]
    fn set_owner_moves_between_child_sets() {
        let (mut graph, [root, mid, leaf, sibling]) = tree();
        graph.set_owner(leaf, Some(sibling));
        assert!(!graph.has_child(mid, leaf));
        assert!(graph.has_child(sibling, leaf));
        assert_eq!(graph.ancestors(leaf).collect::<Vec<_>>(), vec![sibling, root]);
        assert!(graph.check_consistency().is_ok());
    }

    #[test]
    fn detach_clears_both_sides() {
        let (mut graph, [_, mid, leaf, _]) = tree();
        graph.set_owner(leaf, None);
        assert_eq!(graph.owner(leaf), None);
        assert_eq!(graph.children(mid).count(), 0);
        assert!(graph.check_consistency().is_ok());
    }

    #[test]
    fn set_owner_does_not_uncache() {
        let (mut graph, ids) = tree();
        let [root, mid, leaf, sibling] = ids;
        cache_all(&mut graph, &ids);
        graph.set_owner(leaf, Some(sibling));
        graph.set_owner(leaf, Some(sibling));
        for id in [root, mid, leaf, sibling] {
            assert!(!graph.has_changed(id));
        }
    }

    #[test]
    fn uncache_flows_up_only() {
        let (mut graph, ids) = tree();
        let [root, mid, leaf, sibling] = ids;
        cache_all(&mut graph, &ids);
        graph.uncache(mid);
        assert!(graph.has_changed(mid));
        assert!(graph.has_changed(root));
        assert!(!graph.has_changed(leaf), "children keep their cache");
        assert!(!graph.has_changed(sibling), "siblings keep their cache");
    }

    #[test]
    fn uncache_twice_is_same_as_once() {
        let (mut graph, ids) = tree();
        cache_all(&mut graph, &ids);
        graph.uncache(ids[2]);
        graph.uncache(ids[2]);
        assert!(graph.has_changed(ids[2]));
        assert!(!graph.has_changed(ids[3]));
    }

    #[test]
    fn deep_uncache_sweeps_descendants() {
        let (mut graph, ids) = tree();
        let [root, mid, leaf, sibling] = ids;
        let unrelated = graph.insert(None);
        cache_all(&mut graph, &ids);
        cache_all(&mut graph, &[unrelated]);
        graph.deep_uncache(root);
        for id in [root, mid, leaf, sibling] {
            assert!(graph.has_changed(id));
        }
        assert!(!graph.has_changed(unrelated));
    }

    #[test]
    fn deep_uncache_of_subtree_clears_ancestors_too() {
        let (mut graph, ids) = tree();
        let [root, mid, leaf, sibling] = ids;
        cache_all(&mut graph, &ids);
        graph.deep_uncache(mid);
        assert!(graph.has_changed(leaf));
        assert!(graph.has_changed(root));
        assert!(!graph.has_changed(sibling));
    }

    #[test]
    fn set_watched_skips_equal_values() {
        let (mut graph, ids) = tree();
        cache_all(&mut graph, &ids);
        let mut name = String::from("buff");
        assert!(!graph.set_watched(ids[2], &mut name, "buff".to_string()));
        assert!(!graph.has_changed(ids[0]));
        assert!(graph.set_watched(ids[2], &mut name, "trait".to_string()));
        assert_eq!(name, "trait");
        assert!(graph.has_changed(ids[0]));
    }

    #[test]
    fn clear_watched_deletes() {
        let (mut graph, ids) = tree();
        cache_all(&mut graph, &ids);
        let mut slot = Some(7u32);
        assert!(graph.clear_watched(ids[1], &mut slot));
        assert_eq!(slot, None);
        assert!(graph.has_changed(ids[0]));
        cache_all(&mut graph, &ids);
        assert!(!graph.clear_watched(ids[1], &mut slot));
        assert!(!graph.has_changed(ids[0]));
    }

    #[test]
    fn buffer_caches_until_uncached() {
        let mut graph = ModelGraph::new();
        let id = graph.insert(None);
        let mut calls = 0;
        let mut serialize = |_: &mut ModelGraph| -> Result<Vec<u8>, ()> {
            calls += 1;
            Ok(vec![1, 2])
        };
        let a = graph.buffer(id, BufferOptions::default(), &mut serialize).unwrap();
        let b = graph.buffer(id, BufferOptions::default(), &mut serialize).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        graph.uncache(id);
        let c = graph.buffer(id, BufferOptions::default(), &mut serialize).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(calls, 2);
    }

    #[test]
    fn force_uncache_only_clears_own_cache() {
        let mut graph = ModelGraph::new();
        let root = graph.insert(None);
        let leaf = graph.insert(Some(root));
        graph.store(root, Arc::from(vec![0u8]));
        let serialize = |_: &mut ModelGraph| -> Result<Vec<u8>, ()> { Ok(vec![5]) };
        graph
            .buffer(leaf, BufferOptions::force_uncache(), serialize)
            .unwrap();
        assert!(!graph.has_changed(root));
        assert!(!graph.has_changed(leaf));
    }

    #[test]
    fn graph_options_never_cache() {
        let mut graph = ModelGraph::with_options(GraphOptions { never_cache: true });
        let id = graph.insert(None);
        assert!(graph.never_cache(id));
        graph.store(id, Arc::from(vec![1u8]));
        assert!(graph.cached(id).is_none());
        let cached = graph.insert_with(None, false);
        assert!(!graph.never_cache(cached));
    }

    #[test]
    fn never_cache_serializes_every_time() {
        let mut graph = ModelGraph::new();
        let id = graph.insert_with(None, true);
        let mut calls = 0;
        let mut serialize = |_: &mut ModelGraph| -> Result<Vec<u8>, ()> {
            calls += 1;
            Ok(vec![calls])
        };
        let a = graph.buffer(id, BufferOptions::default(), &mut serialize).unwrap();
        let b = graph.buffer(id, BufferOptions::default(), &mut serialize).unwrap();
        assert_eq!(&*a, &[1]);
        assert_eq!(&*b, &[2]);
    }

    #[test]
    fn remove_frees_only_detached_leaves() {
        let (mut graph, [root, mid, leaf, sibling]) = tree();
        assert!(!graph.remove(leaf));
        assert!(!graph.remove(root));

        graph.set_owner(mid, None);
        assert!(!graph.remove(mid));

        graph.set_owner(sibling, None);
        assert!(graph.remove(sibling));
        assert!(!graph.contains(sibling));
        assert!(!graph.remove(sibling));
        assert_eq!(graph.len(), 3);
        assert!(graph.check_consistency().is_ok());

        let reused = graph.insert(Some(root));
        assert_eq!(reused.as_raw(), sibling.as_raw());
        assert_ne!(reused, sibling);
        assert!(!graph.has_child(root, sibling));
        assert!(graph.has_child(root, reused));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "ownership cycle")]
    fn cycle_is_rejected_in_debug() {
        let (mut graph, [root, _, leaf, _]) = tree();
        graph.set_owner(root, Some(leaf));
    }
}
