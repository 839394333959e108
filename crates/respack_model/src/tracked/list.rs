//! Ordered tracked collection.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

use respack_common::ModelId;

use super::{adopt, notify, release, ChangeHook, CollectionChange, IntoTracked};
use crate::graph::ModelGraph;
use crate::model::GraphNode;

/// A `Vec` whose mutations uncache its owning model.
///
/// Index-based mutators panic on out-of-range indices exactly like the
/// corresponding `Vec` methods.
pub struct TrackedList<T> {
    owner: ModelId,
    items: Vec<T>,
    on_change: Option<ChangeHook<usize, T>>,
}

impl<T: fmt::Debug> fmt::Debug for TrackedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedList")
            .field("owner", &self.owner)
            .field("items", &self.items)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl<T: GraphNode> TrackedList<T> {
    /// Creates an empty list reporting to `owner`.
    pub fn new(owner: ModelId) -> Self {
        Self {
            owner,
            items: Vec::new(),
            on_change: None,
        }
    }

    /// Wraps `items`, adopting every model among them. Does not uncache.
    pub fn from_vec(graph: &mut ModelGraph, owner: ModelId, items: Vec<T>) -> Self {
        for item in &items {
            adopt(graph, owner, item);
        }
        Self {
            owner,
            items,
            on_change: None,
        }
    }

    /// Installs a change hook, replacing any previous one.
    pub fn set_on_change(&mut self, hook: impl FnMut(&CollectionChange<'_, usize, T>) + 'static) {
        self.on_change = Some(Box::new(hook));
    }

    /// Builder form of [`set_on_change`](Self::set_on_change).
    pub fn with_on_change(
        mut self,
        hook: impl FnMut(&CollectionChange<'_, usize, T>) + 'static,
    ) -> Self {
        self.set_on_change(hook);
        self
    }

    /// The model this list reports mutations to.
    pub fn collection_owner(&self) -> ModelId {
        self.owner
    }

    /// Reports to `owner` from now on, moving every stored model under it.
    pub fn rebind(&mut self, graph: &mut ModelGraph, owner: ModelId) {
        self.owner = owner;
        for item in &self.items {
            adopt(graph, owner, item);
        }
    }

    /// Returns the items as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Unwraps the list. Stored models keep their owner.
    pub fn into_inner(self) -> Vec<T> {
        self.items
    }

    /// Mutable access that bypasses tracking. Callers invalidate themselves.
    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }

    fn holds(&self, node: Option<ModelId>) -> bool {
        node.is_some() && self.items.iter().any(|item| item.graph_node() == node)
    }

    fn detach(&self, graph: &mut ModelGraph, previous: &T) {
        let still_held = self.holds(previous.graph_node());
        release(graph, self.owner, previous, still_held);
    }

    /// Reports a removal from slot `index`, then detaches the removed item.
    fn released(&mut self, graph: &mut ModelGraph, index: usize, previous: &T) {
        notify(
            &mut self.on_change,
            CollectionChange {
                owner: self.owner,
                key: Some(&index),
                previous: Some(previous),
                current: None,
            },
        );
        self.detach(graph, previous);
    }

    /// Appends an item.
    pub fn push(&mut self, graph: &mut ModelGraph, item: T) {
        let index = self.items.len();
        self.insert(graph, index, item);
    }

    /// Inserts an item at `index`, shifting later items.
    pub fn insert(&mut self, graph: &mut ModelGraph, index: usize, item: T) {
        self.items.insert(index, item);
        notify(
            &mut self.on_change,
            CollectionChange {
                owner: self.owner,
                key: Some(&index),
                previous: None,
                current: self.items.get(index),
            },
        );
        adopt(graph, self.owner, &self.items[index]);
        graph.uncache(self.owner);
    }

    /// Replaces the item at `index`, returning the previous one.
    pub fn set(&mut self, graph: &mut ModelGraph, index: usize, item: T) -> T {
        let previous = std::mem::replace(&mut self.items[index], item);
        notify(
            &mut self.on_change,
            CollectionChange {
                owner: self.owner,
                key: Some(&index),
                previous: Some(&previous),
                current: self.items.get(index),
            },
        );
        self.detach(graph, &previous);
        adopt(graph, self.owner, &self.items[index]);
        graph.uncache(self.owner);
        previous
    }

    /// Removes and returns the item at `index`.
    pub fn remove(&mut self, graph: &mut ModelGraph, index: usize) -> T {
        let previous = self.items.remove(index);
        self.released(graph, index, &previous);
        graph.uncache(self.owner);
        previous
    }

    /// Removes and returns the last item. An empty list is left untouched.
    pub fn pop(&mut self, graph: &mut ModelGraph) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.remove(graph, self.items.len() - 1))
    }

    /// Swaps two items.
    pub fn swap(&mut self, graph: &mut ModelGraph, a: usize, b: usize) {
        self.items.swap(a, b);
        self.reordered(graph);
    }

    /// Reverses the order of the items.
    pub fn reverse(&mut self, graph: &mut ModelGraph) {
        self.items.reverse();
        self.reordered(graph);
    }

    /// Sorts the items in place with a comparator.
    pub fn sort_by(&mut self, graph: &mut ModelGraph, compare: impl FnMut(&T, &T) -> Ordering) {
        self.items.sort_by(compare);
        self.reordered(graph);
    }

    /// Sorts the items in place by a key.
    pub fn sort_by_key<K: Ord>(&mut self, graph: &mut ModelGraph, key: impl FnMut(&T) -> K) {
        self.items.sort_by_key(key);
        self.reordered(graph);
    }

    fn reordered(&mut self, graph: &mut ModelGraph) {
        notify(
            &mut self.on_change,
            CollectionChange {
                owner: self.owner,
                key: None,
                previous: None,
                current: None,
            },
        );
        graph.uncache(self.owner);
    }

    /// Mutates the item at `index` in place and returns the closure's result.
    ///
    /// The owner is uncached unconditionally.
    pub fn update<R>(
        &mut self,
        graph: &mut ModelGraph,
        index: usize,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        let result = f(&mut self.items[index]);
        notify(
            &mut self.on_change,
            CollectionChange {
                owner: self.owner,
                key: Some(&index),
                previous: None,
                current: self.items.get(index),
            },
        );
        adopt(graph, self.owner, &self.items[index]);
        graph.uncache(self.owner);
        result
    }

    /// Keeps only the items for which `keep` returns `true`.
    ///
    /// The owner is uncached once, and only if something was removed.
    pub fn retain(&mut self, graph: &mut ModelGraph, mut keep: impl FnMut(&T) -> bool) {
        let items = std::mem::take(&mut self.items);
        let mut removed = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            if keep(&item) {
                self.items.push(item);
            } else {
                removed.push((index, item));
            }
        }
        if removed.is_empty() {
            return;
        }
        for (index, item) in &removed {
            self.released(graph, *index, item);
        }
        graph.uncache(self.owner);
    }

    /// Shortens the list to `len` items. Does nothing if it is already shorter.
    pub fn truncate(&mut self, graph: &mut ModelGraph, len: usize) {
        if len >= self.items.len() {
            return;
        }
        let removed = self.items.split_off(len);
        for (offset, item) in removed.iter().enumerate() {
            self.released(graph, len + offset, item);
        }
        graph.uncache(self.owner);
    }

    /// Removes every item.
    pub fn clear(&mut self, graph: &mut ModelGraph) {
        self.truncate(graph, 0);
    }

    /// Appends every item of `iter`, uncaching the owner once at the end.
    pub fn extend(&mut self, graph: &mut ModelGraph, iter: impl IntoIterator<Item = T>) {
        let start = self.items.len();
        self.items.extend(iter);
        if self.items.len() == start {
            return;
        }
        for index in start..self.items.len() {
            notify(
                &mut self.on_change,
                CollectionChange {
                    owner: self.owner,
                    key: Some(&index),
                    previous: None,
                    current: self.items.get(index),
                },
            );
            adopt(graph, self.owner, &self.items[index]);
        }
        graph.uncache(self.owner);
    }
}

impl<T> Deref for TrackedList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T: GraphNode> IntoTracked<TrackedList<T>> for Vec<T> {
    fn into_tracked(self, graph: &mut ModelGraph, owner: ModelId) -> TrackedList<T> {
        TrackedList::from_vec(graph, owner, self)
    }
}

impl<T: GraphNode> IntoTracked<TrackedList<T>> for TrackedList<T> {
    fn into_tracked(self, _graph: &mut ModelGraph, _owner: ModelId) -> TrackedList<T> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn setup() -> (ModelGraph, ModelId, ModelId) {
        let mut graph = ModelGraph::new();
        let root = graph.insert(None);
        let owner = graph.insert(Some(root));
        (graph, root, owner)
    }

    fn cache(graph: &mut ModelGraph, ids: &[ModelId]) {
        for &id in ids {
            graph.store(id, Arc::from(vec![0u8]));
        }
    }

    #[test]
    fn push_uncaches_owner_chain() {
        let (mut graph, root, owner) = setup();
        let mut list: TrackedList<u32> = TrackedList::new(owner);
        cache(&mut graph, &[root, owner]);
        list.push(&mut graph, 5);
        assert_eq!(&list[..], &[5]);
        assert!(graph.has_changed(owner));
        assert!(graph.has_changed(root));
    }

    #[test]
    fn reads_do_not_uncache() {
        let (mut graph, _, owner) = setup();
        let mut list = TrackedList::new(owner);
        list.push(&mut graph, 1u8);
        cache(&mut graph, &[owner]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().copied().sum::<u8>(), 1);
        assert!(!graph.has_changed(owner));
    }

    #[test]
    fn stored_models_are_adopted() {
        let (mut graph, _, owner) = setup();
        let child = graph.insert(None);
        let mut list = TrackedList::new(owner);
        list.push(&mut graph, child);
        assert_eq!(graph.owner(child), Some(owner));
        assert!(graph.check_consistency().is_ok());
    }

    #[test]
    fn removed_models_are_detached() {
        let (mut graph, _, owner) = setup();
        let a = graph.insert(None);
        let b = graph.insert(None);
        let mut list: TrackedList<_> = vec![a, b].into_tracked(&mut graph, owner);
        assert_eq!(graph.owner(a), Some(owner));
        let removed = list.remove(&mut graph, 0);
        assert_eq!(removed, a);
        assert_eq!(graph.owner(a), None);
        assert_eq!(graph.owner(b), Some(owner));
        assert!(graph.check_consistency().is_ok());
    }

    #[test]
    fn duplicate_handle_stays_attached_until_last_removed() {
        let (mut graph, _, owner) = setup();
        let a = graph.insert(None);
        let mut list: TrackedList<_> = vec![a, a].into_tracked(&mut graph, owner);
        list.remove(&mut graph, 0);
        assert_eq!(graph.owner(a), Some(owner));
        list.remove(&mut graph, 0);
        assert_eq!(graph.owner(a), None);
    }

    #[test]
    fn model_moved_elsewhere_is_not_detached() {
        let (mut graph, root, owner) = setup();
        let a = graph.insert(None);
        let mut list: TrackedList<_> = vec![a].into_tracked(&mut graph, owner);
        graph.set_owner(a, Some(root));
        list.clear(&mut graph);
        assert_eq!(graph.owner(a), Some(root));
    }

    #[test]
    fn set_reparents_and_returns_previous() {
        let (mut graph, _, owner) = setup();
        let a = graph.insert(None);
        let b = graph.insert(None);
        let mut list: TrackedList<_> = vec![a].into_tracked(&mut graph, owner);
        let previous = list.set(&mut graph, 0, b);
        assert_eq!(previous, a);
        assert_eq!(graph.owner(a), None);
        assert_eq!(graph.owner(b), Some(owner));
    }

    #[test]
    fn hook_sees_previous_and_current() {
        let (mut graph, _, owner) = setup();
        let seen: Rc<RefCell<Vec<(Option<usize>, Option<u32>, Option<u32>)>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut list = TrackedList::<u32>::new(owner).with_on_change(move |change| {
            assert_eq!(change.owner, owner);
            sink.borrow_mut().push((
                change.key.copied(),
                change.previous.copied(),
                change.current.copied(),
            ));
        });
        list.push(&mut graph, 10u32);
        list.set(&mut graph, 0, 20);
        list.sort_by_key(&mut graph, |v| *v);
        list.pop(&mut graph);
        assert_eq!(
            *seen.borrow(),
            vec![
                (Some(0), None, Some(10)),
                (Some(0), Some(10), Some(20)),
                (None, None, None),
                (Some(0), Some(20), None),
            ]
        );

        seen.borrow_mut().clear();
        list.extend(&mut graph, [1, 2, 3, 4]);
        seen.borrow_mut().clear();
        list.remove(&mut graph, 0);
        list.retain(&mut graph, |v| v % 2 == 0);
        assert_eq!(
            *seen.borrow(),
            vec![(Some(0), Some(1), None), (Some(1), Some(3), None)]
        );
        assert_eq!(&*list, &[2, 4]);
    }

    #[test]
    fn set_reports_before_detaching_replaced_model() {
        let (mut graph, _, owner) = setup();
        let a = graph.insert(None);
        let b = graph.insert(None);
        let seen: Rc<RefCell<Vec<(Option<ModelId>, Option<ModelId>)>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut list = TrackedList::from_vec(&mut graph, owner, vec![a]).with_on_change(
            move |change| {
                sink.borrow_mut()
                    .push((change.previous.copied(), change.current.copied()))
            },
        );
        cache(&mut graph, &[a]);
        list.set(&mut graph, 0, b);
        assert_eq!(*seen.borrow(), vec![(Some(a), Some(b))]);
        assert_eq!(graph.owner(a), None);
        assert!(graph.cached(a).is_none());
        assert!(graph.check_consistency().is_ok());
    }

    #[test]
    fn removed_model_drops_its_cached_bytes() {
        let (mut graph, _, owner) = setup();
        let a = graph.insert(None);
        let b = graph.insert(None);
        let mut list: TrackedList<_> = vec![a, b].into_tracked(&mut graph, owner);
        cache(&mut graph, &[a, b]);
        list.remove(&mut graph, 0);
        assert!(graph.cached(a).is_none());
        assert!(graph.cached(b).is_some());
    }

    #[test]
    fn pop_on_empty_is_noop() {
        let (mut graph, _, owner) = setup();
        let mut list: TrackedList<u8> = TrackedList::new(owner);
        cache(&mut graph, &[owner]);
        assert_eq!(list.pop(&mut graph), None);
        assert!(!graph.has_changed(owner));
    }

    #[test]
    fn reorder_uncaches() {
        let (mut graph, _, owner) = setup();
        let mut list: TrackedList<_> = vec![3u8, 1, 2].into_tracked(&mut graph, owner);
        cache(&mut graph, &[owner]);
        list.sort_by(&mut graph, |a, b| a.cmp(b));
        assert_eq!(&list[..], &[1, 2, 3]);
        assert!(graph.has_changed(owner));

        cache(&mut graph, &[owner]);
        list.reverse(&mut graph);
        assert_eq!(&list[..], &[3, 2, 1]);
        assert!(graph.has_changed(owner));

        cache(&mut graph, &[owner]);
        list.swap(&mut graph, 0, 2);
        assert_eq!(&list[..], &[1, 2, 3]);
        assert!(graph.has_changed(owner));
    }

    #[test]
    fn update_mutates_in_place() {
        let (mut graph, _, owner) = setup();
        let mut list: TrackedList<_> = vec![String::from("a")].into_tracked(&mut graph, owner);
        cache(&mut graph, &[owner]);
        let len = list.update(&mut graph, 0, |s| {
            s.push('b');
            s.len()
        });
        assert_eq!(len, 2);
        assert_eq!(list[0], "ab");
        assert!(graph.has_changed(owner));
    }

    #[test]
    fn retain_uncaches_only_when_something_removed() {
        let (mut graph, _, owner) = setup();
        let mut list: TrackedList<_> = vec![1u32, 2, 3, 4].into_tracked(&mut graph, owner);
        cache(&mut graph, &[owner]);
        list.retain(&mut graph, |_| true);
        assert!(!graph.has_changed(owner));
        list.retain(&mut graph, |v| v % 2 == 0);
        assert_eq!(&list[..], &[2, 4]);
        assert!(graph.has_changed(owner));
    }

    #[test]
    fn extend_uncaches_once_and_adopts() {
        let (mut graph, _, owner) = setup();
        let children: Vec<ModelId> = (0..3).map(|_| graph.insert(None)).collect();
        let mut list = TrackedList::new(owner);
        list.extend(&mut graph, children.clone());
        assert_eq!(list.len(), 3);
        for child in children {
            assert_eq!(graph.owner(child), Some(owner));
        }
    }

    #[test]
    fn wrapping_twice_returns_same_list() {
        let (mut graph, root, owner) = setup();
        let list: TrackedList<_> = vec![1u8].into_tracked(&mut graph, owner);
        let again: TrackedList<u8> = list.into_tracked(&mut graph, root);
        assert_eq!(again.collection_owner(), owner);
    }

    #[test]
    fn rebind_moves_models() {
        let (mut graph, root, owner) = setup();
        let a = graph.insert(None);
        let mut list: TrackedList<_> = vec![a].into_tracked(&mut graph, owner);
        list.rebind(&mut graph, root);
        assert_eq!(list.collection_owner(), root);
        assert_eq!(graph.owner(a), Some(root));
        assert!(!graph.has_child(owner, a));
    }

    #[test]
    #[should_panic]
    fn out_of_range_set_panics_like_vec() {
        let (mut graph, _, owner) = setup();
        let mut list: TrackedList<u8> = TrackedList::new(owner);
        list.set(&mut graph, 3, 1);
    }
}
