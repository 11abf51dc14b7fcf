//! Sparse entity-to-slot index tables.
//!
//! A [`SparseIndexTable`] maps a sparse key space (entity ids) to a compact
//! one (dense arena slots) in O(1), with geometric growth. `N` independent
//! component "families" share one table: each family gets its own block of
//! `u32` slots, all blocks sized to the same capacity.
//!
//! Slot `0` doubles as the "unmapped" sentinel -- an unmapped `(entity,
//! family)` pair always reads back as `0`, which is why arenas never assign
//! slot `0` to a live component.

use crate::entity::Entity;
use crate::EcsError;

/// A mapping from `(entity id, family n in [0, N))` to a dense slot index.
///
/// Each family is backed by one contiguous `u32` block sized to
/// `next_power_of_two(largest mapped id + 1)`. Growth reallocates every
/// block, copies previous mappings verbatim, and zero-fills the new range,
/// so `map` is amortized O(1) by the usual geometric-growth argument.
#[derive(Debug, Clone)]
pub struct SparseIndexTable<const N: usize> {
    /// One slot block per family, all `capacity` entries long.
    blocks: [Vec<u32>; N],
    capacity: usize,
}

impl<const N: usize> SparseIndexTable<N> {
    /// Create an empty table. No capacity is reserved until the first `map`.
    pub fn new() -> Self {
        Self {
            blocks: std::array::from_fn(|_| Vec::new()),
            capacity: 0,
        }
    }

    /// Current capacity in entity-id slots (identical for every family).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` iff `entity` has a slot mapped in `family`.
    pub fn has_in(&self, entity: Entity, family: usize) -> bool {
        let id = entity.id() as usize;
        id < self.capacity && self.blocks[family][id] != 0
    }

    /// The slot mapped for `entity` in `family`.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if the pair is unmapped.
    pub fn get_in(&self, entity: Entity, family: usize) -> Result<u32, EcsError> {
        if !self.has_in(entity, family) {
            return Err(EcsError::MissingComponent { entity, family });
        }
        Ok(self.blocks[family][entity.id() as usize])
    }

    /// Record that `entity` owns dense `slot` in `family`, growing the table
    /// if the id lies past the current capacity.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`] for the sentinel id `0`;
    /// [`EcsError::DuplicateComponent`] if the pair is already mapped.
    pub fn map_in(&mut self, entity: Entity, family: usize, slot: u32) -> Result<(), EcsError> {
        if entity.is_none() {
            return Err(EcsError::InvalidEntity { entity });
        }
        if self.has_in(entity, family) {
            return Err(EcsError::DuplicateComponent { entity, family });
        }
        let id = entity.id() as usize;
        if id >= self.capacity {
            self.grow(id);
        }
        self.blocks[family][id] = slot;
        Ok(())
    }

    /// Remove the mapping for `entity` in `family`, writing back the `0`
    /// sentinel.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if the pair is unmapped.
    pub fn unmap_in(&mut self, entity: Entity, family: usize) -> Result<(), EcsError> {
        if !self.has_in(entity, family) {
            return Err(EcsError::MissingComponent { entity, family });
        }
        self.blocks[family][entity.id() as usize] = 0;
        Ok(())
    }

    /// Reset every family to fully unmapped. O(capacity * N); capacity is
    /// retained.
    pub fn clear(&mut self) {
        for block in &mut self.blocks {
            block.fill(0);
        }
    }

    /// Grow every family block to `next_power_of_two(max_id + 1)` entries.
    /// Previous mappings are preserved verbatim; the new range reads as
    /// unmapped.
    fn grow(&mut self, max_id: usize) {
        let new_capacity = (max_id + 1).next_power_of_two();
        tracing::debug!(
            old_capacity = self.capacity,
            new_capacity,
            families = N,
            "growing sparse index table"
        );
        for block in &mut self.blocks {
            block.resize(new_capacity, 0);
        }
        self.capacity = new_capacity;
    }

    /// Borrow a family's raw slot block (for snapshot capture).
    pub(crate) fn block(&self, family: usize) -> &[u32] {
        &self.blocks[family]
    }

    /// Replace a family's slot block wholesale (for snapshot restore).
    /// All families must end up the same length; the caller validates.
    pub(crate) fn restore_block(&mut self, family: usize, slots: Vec<u32>) {
        self.capacity = slots.len();
        self.blocks[family] = slots;
    }
}

impl<const N: usize> Default for SparseIndexTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Single-family shorthand
// ---------------------------------------------------------------------------

/// Family-less convenience surface for the common `N = 1` case.
impl SparseIndexTable<1> {
    /// [`Self::has_in`] on family 0.
    pub fn has(&self, entity: Entity) -> bool {
        self.has_in(entity, 0)
    }

    /// [`Self::get_in`] on family 0.
    pub fn get(&self, entity: Entity) -> Result<u32, EcsError> {
        self.get_in(entity, 0)
    }

    /// [`Self::map_in`] on family 0.
    pub fn map(&mut self, entity: Entity, slot: u32) -> Result<(), EcsError> {
        self.map_in(entity, 0, slot)
    }

    /// [`Self::unmap_in`] on family 0.
    pub fn unmap(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.unmap_in(entity, 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
