//! Collections of uniquely identified key/value entries.
//!
//! A [`MappedModel`] is the storage behind table-like resources: string
//! tables, name maps, lookup lists. Keys are not unique. Each [`Entry`] gets an
//! [`EntryId`] from a per-collection counter that never goes backwards, so an
//! id identifies one entry for the whole life of the collection.
//!
//! Entries are models with their own graph nodes. Deleting an entry frees its
//! node, so add/delete churn does not grow the graph.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::hash::Hash;

use respack_common::{EntryId, ModelId};

use crate::error::{ModelError, ValidationError, Violation};
use crate::graph::ModelGraph;
use crate::model::{GraphNode, Model};
use crate::tracked::TrackedList;

/// Keys storable in a [`MappedModel`].
pub trait EntryKey: Clone + Eq + Hash {
    /// Reports why this key is malformed, if it is.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Values storable in a [`MappedModel`].
pub trait EntryValue: Clone {
    /// Reports why this value is malformed, if it is.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

macro_rules! plain_entry_data {
    ($($ty:ty),* $(,)?) => {
        $(
            impl EntryKey for $ty {}
            impl EntryValue for $ty {}
        )*
    };
}

plain_entry_data!(
    bool, char, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, String, &'static str,
    Vec<u8>,
);

impl EntryValue for f32 {}
impl EntryValue for f64 {}

/// One key/value pair of a [`MappedModel`], itself a model owned by the
/// collection.
#[derive(Debug)]
pub struct Entry<K, V> {
    id: EntryId,
    node: ModelId,
    key: K,
    value: V,
}

impl<K: EntryKey, V: EntryValue> Entry<K, V> {
    /// The entry's id, stable for the life of the collection.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The entry's key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The entry's value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Checks the key and value, reporting both problems when both are bad.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check(self.violations())
    }

    fn violations(&self) -> Vec<Violation> {
        [self.key.check(), self.value.check()]
            .into_iter()
            .filter_map(Result::err)
            .map(|reason| Violation::entry(self.id, reason))
            .collect()
    }
}

impl<K, V> GraphNode for Entry<K, V> {
    fn graph_node(&self) -> Option<ModelId> {
        Some(self.node)
    }
}

impl<K, V> Model for Entry<K, V> {
    const WATCHED: &'static [&'static str] = &["key", "value"];

    fn model_id(&self) -> ModelId {
        self.node
    }
}

/// Ordered collection of entries with a lazily built key index.
///
/// Entries are kept in insertion order. Ids increase with insertion, so
/// lookup by id is a binary search. Lookup by key goes through an index that
/// is built on the first keyed read and then maintained entry by entry; bulk
/// operations drop it so the next keyed read rebuilds it.
#[derive(Debug)]
pub struct MappedModel<K, V> {
    id: ModelId,
    entries: TrackedList<Entry<K, V>>,
    /// `None` once every representable id has been handed out.
    next_id: Option<EntryId>,
    key_index: OnceCell<HashMap<K, Vec<EntryId>>>,
}

impl<K, V> Model for MappedModel<K, V> {
    const WATCHED: &'static [&'static str] = &["entries"];

    fn model_id(&self) -> ModelId {
        self.id
    }
}

impl<K: EntryKey, V: EntryValue> MappedModel<K, V> {
    /// Creates an empty collection, attached to `owner` when given.
    pub fn new(graph: &mut ModelGraph, owner: Option<ModelId>) -> Self {
        let id = graph.insert(owner);
        Self {
            id,
            entries: TrackedList::new(id),
            next_id: Some(EntryId::from_raw(0)),
            key_index: OnceCell::new(),
        }
    }

    /// The collection's graph node.
    pub fn model_id(&self) -> ModelId {
        self.id
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries in insertion order.
    pub fn entries(&self) -> &[Entry<K, V>] {
        &self.entries
    }

    /// Iterates the entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry<K, V>> {
        self.entries.iter()
    }

    fn take_id(&mut self) -> Result<EntryId, ModelError> {
        let id = self.next_id.ok_or(ModelError::EntryIdsExhausted {
            collection: self.id,
        })?;
        self.next_id = id.next();
        Ok(id)
    }

    /// Frees the graph nodes of entries that were just taken out.
    fn free_nodes(graph: &mut ModelGraph, nodes: Vec<ModelId>) {
        for node in nodes {
            if !graph.remove(node) {
                tracing::debug!(model = node.as_raw(), "entry node still referenced, kept");
            }
        }
    }

    fn index(&self) -> &HashMap<K, Vec<EntryId>> {
        self.key_index.get_or_init(|| {
            let mut index: HashMap<K, Vec<EntryId>> = HashMap::new();
            for entry in self.entries.iter() {
                index.entry(entry.key.clone()).or_default().push(entry.id);
            }
            tracing::trace!(model = self.id.as_raw(), keys = index.len(), "key index built");
            index
        })
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.binary_search_by_key(&id, |entry| entry.id).ok()
    }

    fn unindex(&mut self, key: &K, id: EntryId) {
        if let Some(index) = self.key_index.get_mut() {
            if let Some(ids) = index.get_mut(key) {
                ids.retain(|&other| other != id);
                if ids.is_empty() {
                    index.remove(key);
                }
            }
        }
    }

    fn reindex(&mut self, key: &K, id: EntryId) {
        if let Some(index) = self.key_index.get_mut() {
            let ids = index.entry(key.clone()).or_default();
            if let Err(at) = ids.binary_search(&id) {
                ids.insert(at, id);
            }
        }
    }

    /// Appends a new entry and returns it.
    ///
    /// The entry receives the next id and becomes a child of this collection.
    /// Fails only when the collection has used up its id range.
    pub fn add(
        &mut self,
        graph: &mut ModelGraph,
        key: K,
        value: V,
    ) -> Result<&Entry<K, V>, ModelError> {
        let id = self.take_id()?;
        let node = graph.insert(None);
        self.reindex(&key, id);
        self.entries.push(
            graph,
            Entry {
                id,
                node,
                key,
                value,
            },
        );
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Returns the entry with `id`.
    pub fn get(&self, id: EntryId) -> Option<&Entry<K, V>> {
        self.position(id).map(|at| &self.entries[at])
    }

    /// Returns the earliest entry stored under `key`.
    pub fn get_by_key(&self, key: &K) -> Option<&Entry<K, V>> {
        let id = *self.index().get(key)?.first()?;
        self.get(id)
    }

    /// Returns every entry stored under `key`, in insertion order.
    pub fn get_all_by_key(&self, key: &K) -> Vec<&Entry<K, V>> {
        self.index()
            .get(key)
            .map(|ids| ids.iter().filter_map(|&id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// Removes the entry with `id`. Returns whether it existed.
    pub fn delete(&mut self, graph: &mut ModelGraph, id: EntryId) -> bool {
        let Some(at) = self.position(id) else {
            return false;
        };
        let entry = self.entries.remove(graph, at);
        self.unindex(&entry.key, entry.id);
        Self::free_nodes(graph, vec![entry.node]);
        true
    }

    /// Removes every entry stored under `key`. Returns how many were removed.
    pub fn delete_by_key(&mut self, graph: &mut ModelGraph, key: &K) -> usize {
        let nodes: Vec<ModelId> = self
            .entries
            .iter()
            .filter(|entry| entry.key == *key)
            .map(|entry| entry.node)
            .collect();
        let removed = nodes.len();
        self.entries.retain(graph, |entry| entry.key != *key);
        if let Some(index) = self.key_index.get_mut() {
            index.remove(key);
        }
        Self::free_nodes(graph, nodes);
        removed
    }

    /// Changes the key of entry `id`.
    ///
    /// Returns `false` when the entry does not exist or already has `key`.
    pub fn set_key(&mut self, graph: &mut ModelGraph, id: EntryId, key: K) -> bool {
        let Some(at) = self.position(id) else {
            return false;
        };
        let entry = self.entries.slot_mut(at);
        let previous = entry.key.clone();
        if !Entry::<K, V>::write_watched(graph, entry.node, "key", &mut entry.key, key) {
            return false;
        }
        let key = self.entries[at].key.clone();
        self.unindex(&previous, id);
        self.reindex(&key, id);
        true
    }

    /// Changes the value of entry `id`.
    ///
    /// Returns `false` when the entry does not exist or already has `value`.
    pub fn set_value(&mut self, graph: &mut ModelGraph, id: EntryId, value: V) -> bool
    where
        V: PartialEq,
    {
        let Some(at) = self.position(id) else {
            return false;
        };
        let entry = self.entries.slot_mut(at);
        Entry::<K, V>::write_watched(graph, entry.node, "value", &mut entry.value, value)
    }

    /// Adds a copy of every entry of `other` under fresh ids.
    ///
    /// The collection is uncached once, after all entries are in. If the id
    /// range runs out part way, nothing is added.
    pub fn merge(
        &mut self,
        graph: &mut ModelGraph,
        other: &MappedModel<K, V>,
    ) -> Result<(), ModelError> {
        if other.is_empty() {
            return Ok(());
        }
        let ids = other
            .entries
            .iter()
            .map(|_| self.take_id())
            .collect::<Result<Vec<_>, _>>()?;
        let copies: Vec<Entry<K, V>> = other
            .entries
            .iter()
            .zip(ids)
            .map(|(entry, id)| Entry {
                id,
                node: graph.insert(None),
                key: entry.key.clone(),
                value: entry.value.clone(),
            })
            .collect();
        let merged = copies.len();
        self.entries.extend(graph, copies);
        self.key_index = OnceCell::new();
        tracing::debug!(model = self.id.as_raw(), merged, "merged entries");
        Ok(())
    }

    /// Removes every entry. Ids already handed out are not reused.
    pub fn clear(&mut self, graph: &mut ModelGraph) {
        let nodes: Vec<ModelId> = self.entries.iter().map(|entry| entry.node).collect();
        self.entries.clear(graph);
        self.key_index = OnceCell::new();
        Self::free_nodes(graph, nodes);
    }

    /// Checks every entry, collecting all problems instead of stopping at the
    /// first.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let violations: Vec<Violation> =
            self.entries.iter().flat_map(Entry::violations).collect();
        if !violations.is_empty() {
            tracing::debug!(
                model = self.id.as_raw(),
                count = violations.len(),
                "validation failed"
            );
        }
        ValidationError::check(violations)
    }
}

impl<'a, K: EntryKey, V: EntryValue> IntoIterator for &'a MappedModel<K, V> {
    type Item = &'a Entry<K, V>;
    type IntoIter = std::slice::Iter<'a, Entry<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
