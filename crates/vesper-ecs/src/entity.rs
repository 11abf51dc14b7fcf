//! Entity identifiers and allocation.
//!
//! An [`Entity`] is an opaque 32-bit identifier for a game object. The value
//! `0` is reserved as the "no entity" sentinel and is never issued. Ids come
//! from a monotonically increasing counter starting at 1 and are never
//! reused, even after every component referencing them has been removed --
//! component lifetime and id validity are independent.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::EcsError;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An opaque 32-bit entity identifier.
///
/// Serializes as its bare integer value. Freely copyable and comparable by
/// id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u32);

impl Entity {
    /// The reserved "no entity" sentinel.
    pub const NONE: Entity = Entity(0);

    /// Reconstruct an entity from a raw id (e.g., from a save file).
    #[inline]
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// The raw id value.
    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }

    /// Returns `true` for the sentinel value `0`.
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Issues unique [`Entity`] ids from a monotonically increasing counter.
///
/// The allocator is an explicit value owned by the simulation context -- not
/// a process-wide global -- so independent simulations (and tests) each get
/// their own id space. Ids are never recycled; exhausting the 32-bit space
/// surfaces as [`EcsError::CapacityOverflow`], which callers should treat as
/// fatal since it signals a violated lifetime assumption of the whole engine.
#[derive(Debug, Clone)]
pub struct EntityAllocator {
    /// The id the next `create` call will return.
    next_id: u32,
}

impl EntityAllocator {
    /// Create a fresh allocator. The first issued id is `1`.
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Issue a fresh [`Entity`].
    ///
    /// # Errors
    ///
    /// [`EcsError::CapacityOverflow`] once the 32-bit id space is exhausted.
    pub fn create(&mut self) -> Result<Entity, EcsError> {
        if self.next_id == u32::MAX {
            return Err(EcsError::CapacityOverflow {
                issued: self.next_id - 1,
            });
        }
        let entity = Entity(self.next_id);
        self.next_id += 1;
        Ok(entity)
    }

    /// Number of ids issued so far.
    pub fn issued_count(&self) -> u32 {
        self.next_id - 1
    }

    /// Capture the allocator state for snapshot/restore.
    pub fn snapshot_state(&self) -> u32 {
        self.next_id
    }

    /// Restore an allocator from a previously captured state.
    ///
    /// # Errors
    ///
    /// [`EcsError::SnapshotCorrupted`] if `next_id` is `0`, which no live
    /// allocator can ever hold.
    pub fn restore_from_snapshot(next_id: u32) -> Result<Self, EcsError> {
        if next_id == 0 {
            return Err(EcsError::SnapshotCorrupted {
                details: "allocator next_id is 0 (first issued id is always 1)".to_owned(),
            });
        }
        Ok(Self { next_id })
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
