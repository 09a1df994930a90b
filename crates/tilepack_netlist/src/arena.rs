//! Slot arena for ID-indexed storage with stable IDs and removal.
//!
//! The [`SlotArena`] provides O(1) insertion, lookup and removal by opaque
//! [`ArenaId`] keys. Removed slots are never reused, so an ID always refers to
//! the entity it was created for and iteration follows creation order.

use std::marker::PhantomData;

/// Trait for opaque ID types used as arena keys.
///
/// Implementors must provide a bijection between `u32` indices and the ID type.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// An ID-indexed container whose entries can be removed.
#[derive(Debug, Clone)]
pub struct SlotArena<I: ArenaId, T> {
    slots: Vec<Option<T>>,
    live: usize,
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for SlotArena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> SlotArena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            _marker: PhantomData,
        }
    }

    /// Allocates a new item in the arena and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.slots.len() as u32);
        self.slots.push(Some(item));
        self.live += 1;
        id
    }

    /// Returns the item with the given ID, or `None` if it was removed.
    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.as_raw() as usize)?.as_ref()
    }

    /// Returns the item with the given ID mutably, or `None` if it was removed.
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.as_raw() as usize)?.as_mut()
    }

    /// Removes the item with the given ID and returns it.
    pub fn remove(&mut self, id: I) -> Option<T> {
        let item = self.slots.get_mut(id.as_raw() as usize)?.take();
        if item.is_some() {
            self.live -= 1;
        }
        item
    }

    /// Returns `true` if the ID refers to a live item.
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Returns the number of live items.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the arena contains no live items.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over live `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (I::from_raw(i as u32), item)))
    }

    /// Returns the IDs of all live items in allocation order.
    pub fn ids(&self) -> Vec<I> {
        self.iter().map(|(id, _)| id).collect()
    }
}
