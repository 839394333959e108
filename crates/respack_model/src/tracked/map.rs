//! Keyed tracked collection.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use respack_common::ModelId;

use super::{adopt, notify, release, ChangeHook, CollectionChange, IntoTracked};
use crate::graph::ModelGraph;
use crate::model::GraphNode;

/// A `BTreeMap` whose mutations uncache its owning model.
pub struct TrackedMap<K, V> {
    owner: ModelId,
    map: BTreeMap<K, V>,
    on_change: Option<ChangeHook<K, V>>,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TrackedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedMap")
            .field("owner", &self.owner)
            .field("map", &self.map)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl<K: Ord, V: GraphNode> TrackedMap<K, V> {
    /// Creates an empty map reporting to `owner`.
    pub fn new(owner: ModelId) -> Self {
        Self {
            owner,
            map: BTreeMap::new(),
            on_change: None,
        }
    }

    /// Wraps `map`, adopting every model among its values. Does not uncache.
    pub fn from_map(graph: &mut ModelGraph, owner: ModelId, map: BTreeMap<K, V>) -> Self {
        for value in map.values() {
            adopt(graph, owner, value);
        }
        Self {
            owner,
            map,
            on_change: None,
        }
    }

    /// Installs a change hook, replacing any previous one.
    pub fn set_on_change(&mut self, hook: impl FnMut(&CollectionChange<'_, K, V>) + 'static) {
        self.on_change = Some(Box::new(hook));
    }

    /// The model this map reports mutations to.
    pub fn collection_owner(&self) -> ModelId {
        self.owner
    }

    /// Reports to `owner` from now on, moving every stored model under it.
    pub fn rebind(&mut self, graph: &mut ModelGraph, owner: ModelId) {
        self.owner = owner;
        for value in self.map.values() {
            adopt(graph, owner, value);
        }
    }

    /// Unwraps the map. Stored models keep their owner.
    pub fn into_inner(self) -> BTreeMap<K, V> {
        self.map
    }

    fn holds(&self, node: Option<ModelId>) -> bool {
        node.is_some() && self.map.values().any(|value| value.graph_node() == node)
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, graph: &mut ModelGraph, key: K, value: V) -> Option<V> {
        notify(
            &mut self.on_change,
            CollectionChange {
                owner: self.owner,
                key: Some(&key),
                previous: self.map.get(&key),
                current: Some(&value),
            },
        );
        adopt(graph, self.owner, &value);
        let previous = self.map.insert(key, value);
        if let Some(previous) = &previous {
            let still_held = self.holds(previous.graph_node());
            release(graph, self.owner, previous, still_held);
        }
        graph.uncache(self.owner);
        previous
    }

    /// Removes the value under `key`. A missing key leaves the map untouched.
    pub fn remove(&mut self, graph: &mut ModelGraph, key: &K) -> Option<V> {
        let (key, previous) = self.map.remove_entry(key)?;
        notify(
            &mut self.on_change,
            CollectionChange {
                owner: self.owner,
                key: Some(&key),
                previous: Some(&previous),
                current: None,
            },
        );
        let still_held = self.holds(previous.graph_node());
        release(graph, self.owner, &previous, still_held);
        graph.uncache(self.owner);
        Some(previous)
    }

    /// Mutates the value under `key` in place.
    ///
    /// Returns `None`, without uncaching, when the key is absent.
    pub fn update<R>(
        &mut self,
        graph: &mut ModelGraph,
        key: &K,
        f: impl FnOnce(&mut V) -> R,
    ) -> Option<R> {
        let slot = self.map.get_mut(key)?;
        let result = f(slot);
        adopt(graph, self.owner, &*slot);
        if let Some((key, current)) = self.map.get_key_value(key) {
            notify(
                &mut self.on_change,
                CollectionChange {
                    owner: self.owner,
                    key: Some(key),
                    previous: None,
                    current: Some(current),
                },
            );
        }
        graph.uncache(self.owner);
        Some(result)
    }

    /// Keeps only the entries for which `keep` returns `true`.
    ///
    /// The owner is uncached once, and only if something was removed.
    pub fn retain(&mut self, graph: &mut ModelGraph, mut keep: impl FnMut(&K, &V) -> bool) {
        let map = std::mem::take(&mut self.map);
        let mut removed = Vec::new();
        for (key, value) in map {
            if keep(&key, &value) {
                self.map.insert(key, value);
            } else {
                removed.push((key, value));
            }
        }
        self.released_all(graph, removed);
    }

    /// Removes every entry.
    pub fn clear(&mut self, graph: &mut ModelGraph) {
        let removed: Vec<(K, V)> = std::mem::take(&mut self.map).into_iter().collect();
        self.released_all(graph, removed);
    }

    fn released_all(&mut self, graph: &mut ModelGraph, removed: Vec<(K, V)>) {
        if removed.is_empty() {
            return;
        }
        for (key, value) in &removed {
            notify(
                &mut self.on_change,
                CollectionChange {
                    owner: self.owner,
                    key: Some(key),
                    previous: Some(value),
                    current: None,
                },
            );
            let still_held = self.holds(value.graph_node());
            release(graph, self.owner, value, still_held);
        }
        graph.uncache(self.owner);
    }
}

impl<K, V> Deref for TrackedMap<K, V> {
    type Target = BTreeMap<K, V>;

    fn deref(&self) -> &BTreeMap<K, V> {
        &self.map
    }
}

impl<K: Ord, V: GraphNode> IntoTracked<TrackedMap<K, V>> for BTreeMap<K, V> {
    fn into_tracked(self, graph: &mut ModelGraph, owner: ModelId) -> TrackedMap<K, V> {
        TrackedMap::from_map(graph, owner, self)
    }
}

impl<K: Ord, V: GraphNode> IntoTracked<TrackedMap<K, V>> for TrackedMap<K, V> {
    fn into_tracked(self, _graph: &mut ModelGraph, _owner: ModelId) -> TrackedMap<K, V> {
        self
    }
}
