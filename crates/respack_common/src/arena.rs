//! Generic arena for handle-indexed storage with slot reuse.
//!
//! The [`Arena`] backs every structure that needs stable integer handles in
//! place of references, most importantly the model graph, where owner and
//! child links would otherwise form reference cycles.
//!
//! A handle pairs a slot index with the slot's generation. Removing an item
//! bumps the generation and recycles the slot, so a handle kept past removal
//! no longer resolves instead of silently addressing the slot's next tenant.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque handle types used as arena keys.
pub trait ArenaId: Copy {
    /// Creates a handle addressing `index` at `generation`.
    fn new(index: u32, generation: u32) -> Self;

    /// Returns the slot index.
    fn index(self) -> u32;

    /// Returns the slot generation the handle was issued for.
    fn generation(self) -> u32;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Handle-indexed storage whose freed slots are reused.
///
/// Handles stay valid until their item is removed. After that, lookups with
/// the old handle return `None` (or panic, for the indexing forms).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<I: ArenaId, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            _marker: PhantomData,
        }
    }

    /// Stores `item`, reusing a freed slot when one exists.
    pub fn alloc(&mut self, item: T) -> I {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(item);
            return I::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(item),
        });
        I::new(index, 0)
    }

    /// Removes the item behind `id` and frees its slot.
    ///
    /// Returns `None` if `id` is stale or was never allocated here. A slot
    /// whose generation is exhausted is retired instead of reused.
    pub fn remove(&mut self, id: I) -> Option<T> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let item = slot.value.take()?;
        self.live -= 1;
        if let Some(generation) = slot.generation.checked_add(1) {
            slot.generation = generation;
            self.free.push(id.index());
        }
        Some(item)
    }

    /// Returns the item behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale or was not allocated by this arena.
    pub fn get(&self, id: I) -> &T {
        match self.try_get(id) {
            Some(item) => item,
            None => panic!(
                "handle {} (generation {}) is not live in this arena",
                id.index(),
                id.generation()
            ),
        }
    }

    /// Returns the item behind `id` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale or was not allocated by this arena.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        match self.try_get_mut(id) {
            Some(item) => item,
            None => panic!(
                "handle {} (generation {}) is not live in this arena",
                id.index(),
                id.generation()
            ),
        }
    }

    /// Returns the item behind `id`, or `None` if the handle is not live.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    /// Mutable form of [`try_get`](Self::try_get).
    pub fn try_get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Returns `true` if `id` addresses a live item of this arena.
    pub fn contains(&self, id: I) -> bool {
        self.try_get(id).is_some()
    }

    /// Returns the number of live items.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the arena holds no live items.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the number of slots ever created, live or free.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Iterates live `(handle, item)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|item| (I::new(index as u32, slot.generation), item))
        })
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
    }
}
