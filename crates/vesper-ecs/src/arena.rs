//! Growable slot storage with free-list reuse.
//!
//! A [`ComponentArena`] keeps records in one contiguous `Vec<T>` and hands
//! out [`Handle`]s instead of addresses: growth relocates the backing
//! storage, so a raw pointer into the arena is only valid until the next
//! `add`, while a slot index stays valid until that slot is removed.
//! Removed slots go onto a free list and are the first candidates reused by
//! a later `add`; removal never compacts, so no other slot's index moves.

use crate::handle::Handle;

/// A growable store of `T` records addressed by [`Handle<T>`].
///
/// Slot `0` is reserved at construction (it holds `T::default()` and is
/// never handed out), so `0` can serve as the universal "no slot" sentinel
/// in sparse tables and hierarchy links.
#[derive(Debug, Clone)]
pub struct ComponentArena<T> {
    records: Vec<T>,
    /// LIFO free list of reusable slots.
    free: Vec<u32>,
}

impl<T: Default> ComponentArena<T> {
    /// Create an arena with only the reserved slot `0`.
    pub fn new() -> Self {
        Self {
            records: vec![T::default()],
            free: Vec::new(),
        }
    }

    /// Store `value` in a slot and return its handle.
    ///
    /// Reuses the most recently freed slot if any, else appends (the backing
    /// `Vec` doubles its capacity when full). The returned slot is never `0`.
    pub fn add(&mut self, value: T) -> Handle<T> {
        if let Some(slot) = self.free.pop() {
            self.records[slot as usize] = value;
            Handle::from_index(slot)
        } else {
            let slot = self.records.len() as u32;
            self.records.push(value);
            Handle::from_index(slot)
        }
    }

    /// Release `handle`'s slot back to the free list.
    ///
    /// The record is overwritten with `T::default()` so freed slots hold no
    /// stale data; other slots are untouched and keep their indices.
    pub fn remove(&mut self, handle: Handle<T>) {
        debug_assert!(handle.is_some(), "slot 0 is reserved and never removed");
        self.records[handle.index() as usize] = T::default();
        self.free.push(handle.index());
    }
}

impl<T> ComponentArena<T> {
    /// Borrow the record at `handle`, or `None` if the index is out of
    /// range or null.
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        if handle.is_none() {
            return None;
        }
        self.records.get(handle.index() as usize)
    }

    /// Mutably borrow the record at `handle`.
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        if handle.is_none() {
            return None;
        }
        self.records.get_mut(handle.index() as usize)
    }

    /// Number of slots in use (excluding the reserved slot and free slots).
    pub fn live_len(&self) -> usize {
        self.records.len() - 1 - self.free.len()
    }

    /// Total slots allocated, including slot 0 and freed slots.
    pub fn slot_count(&self) -> usize {
        self.records.len()
    }

    /// The raw record array, slot 0 included (for snapshot capture).
    pub(crate) fn records(&self) -> &[T] {
        &self.records
    }

    /// The free list, most recently freed last (for snapshot capture).
    pub(crate) fn free_list(&self) -> &[u32] {
        &self.free
    }

    /// Replace the arena contents wholesale (for snapshot restore). The
    /// caller has already validated lengths and free-list entries.
    pub(crate) fn restore(&mut self, records: Vec<T>, free: Vec<u32>) {
        self.records = records;
        self.free = free;
    }
}

impl<T: Default> Default for ComponentArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Direct indexing for code that holds a handle it knows to be live
/// (e.g., a store enforcing its own mapping invariants). Panics on an
/// out-of-range index, like slice indexing.
impl<T> std::ops::Index<Handle<T>> for ComponentArena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        &self.records[handle.index() as usize]
    }
}

impl<T> std::ops::IndexMut<Handle<T>> for ComponentArena<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        &mut self.records[handle.index() as usize]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
