//! Transform store snapshot and restore support.
//!
//! Provides [`StoreSnapshot`] -- a fully serializable representation of a
//! [`TransformStore`]'s state (mapping table, both arenas, free list) that
//! can be captured, serialized, and used to restore a store so that every
//! `has`/`get`/TRS/hierarchy query -- and the cached matrices -- reproduce
//! bit-for-bit. The exact on-disk encoding is owned by the caller; these
//! types just derive `serde`.

use serde::{Deserialize, Serialize};

use crate::transform::{HierarchyLink, TransformData, TransformStore};
use crate::EcsError;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Serializable snapshot of an [`EntityAllocator`](crate::entity::EntityAllocator).
///
/// Captured separately from the store because the allocator is owned by the
/// simulation context, not by any one component store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorSnapshot {
    /// The id the next `create` call will return.
    pub next_id: u32,
}

/// A complete, serializable snapshot of a [`TransformStore`].
///
/// All four parts are captured verbatim: the sparse mapping block, both
/// index-aligned arenas (slot 0 included), and the shared free list.
/// Matrices are stored rather than recomputed on restore so round-trips are
/// exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// The sparse entity-id -> slot block (index = entity id, 0 = unmapped).
    pub slots: Vec<u32>,
    /// TRS + cached matrices per slot, slot 0 being the reserved record.
    pub transforms: Vec<TransformData>,
    /// Hierarchy links per slot, index-aligned with `transforms`.
    pub links: Vec<HierarchyLink>,
    /// Free slots, most recently freed last.
    pub free: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Capture / restore impl
// ---------------------------------------------------------------------------

impl TransformStore {
    /// Capture a complete snapshot of the store state.
    pub fn capture_snapshot(&self) -> StoreSnapshot {
        let (table, transforms, links) = self.parts();
        debug_assert_eq!(
            transforms.free_list(),
            links.free_list(),
            "transform arenas out of lockstep"
        );
        StoreSnapshot {
            slots: table.block(0).to_vec(),
            transforms: transforms.records().to_vec(),
            links: links.records().to_vec(),
            free: transforms.free_list().to_vec(),
        }
    }

    /// Restore the store from a previously captured snapshot, replacing all
    /// current contents.
    ///
    /// The snapshot is validated in full before any state is touched, so a
    /// failed restore leaves the store exactly as it was.
    ///
    /// # Errors
    ///
    /// [`EcsError::SnapshotCorrupted`] if the snapshot's parts are
    /// internally inconsistent (mismatched arena lengths, out-of-range or
    /// duplicated slots, free-list entries that are still mapped, hierarchy
    /// links pointing at dead slots, or a child chain that disagrees with
    /// the parent back-pointers).
    pub fn restore_from_snapshot(&mut self, snapshot: &StoreSnapshot) -> Result<(), EcsError> {
        validate_snapshot(snapshot)?;

        let (table, transforms, links) = self.parts_mut();
        table.restore_block(0, snapshot.slots.clone());
        transforms.restore(snapshot.transforms.clone(), snapshot.free.clone());
        links.restore(snapshot.links.clone(), snapshot.free.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn corrupted(details: impl Into<String>) -> EcsError {
    EcsError::SnapshotCorrupted {
        details: details.into(),
    }
}

/// Check every structural invariant the store relies on, without touching
/// any store state.
fn validate_snapshot(snapshot: &StoreSnapshot) -> Result<(), EcsError> {
    let slot_count = snapshot.transforms.len();

    // 1. Arena shape: index-aligned, slot 0 present.
    if snapshot.links.len() != slot_count {
        return Err(corrupted(format!(
            "arena length mismatch: {} transform records vs {} hierarchy links",
            slot_count,
            snapshot.links.len()
        )));
    }
    if slot_count == 0 {
        return Err(corrupted("arenas are empty (slot 0 must always exist)"));
    }

    // 2. Table shape: capacity is a growth-produced power of two and the
    //    sentinel id 0 is unmapped.
    if !snapshot.slots.is_empty() && !snapshot.slots.len().is_power_of_two() {
        return Err(corrupted(format!(
            "table capacity {} is not a power of two",
            snapshot.slots.len()
        )));
    }
    if snapshot.slots.first().is_some_and(|&s| s != 0) {
        return Err(corrupted("entity id 0 has a mapped slot"));
    }

    // 3. Mapped slots: in range, never slot 0 (implied by non-zero), unique.
    let mut owner_count = vec![0u32; slot_count];
    for (id, &slot) in snapshot.slots.iter().enumerate() {
        if slot == 0 {
            continue;
        }
        if slot as usize >= slot_count {
            return Err(corrupted(format!(
                "entity {id} maps to slot {slot}, but only {slot_count} slots exist"
            )));
        }
        owner_count[slot as usize] += 1;
        if owner_count[slot as usize] > 1 {
            return Err(corrupted(format!("slot {slot} is mapped by more than one entity")));
        }
    }

    // 4. Free list: in range, never slot 0, unique, not mapped.
    let mut is_free = vec![false; slot_count];
    for &slot in &snapshot.free {
        if slot == 0 || slot as usize >= slot_count {
            return Err(corrupted(format!("free list contains invalid slot {slot}")));
        }
        if is_free[slot as usize] {
            return Err(corrupted(format!("free list contains slot {slot} twice")));
        }
        if owner_count[slot as usize] != 0 {
            return Err(corrupted(format!(
                "slot {slot} is both mapped and on the free list"
            )));
        }
        is_free[slot as usize] = true;
    }

    // 5. Every slot past 0 is either mapped or free.
    for slot in 1..slot_count {
        if owner_count[slot] == 0 && !is_free[slot] {
            return Err(corrupted(format!(
                "slot {slot} is neither mapped by an entity nor on the free list"
            )));
        }
    }

    // 6. Hierarchy links of live slots point at live slots; freed slots
    //    carrying link data are unreachable, so just note them.
    let live = |slot: u32| slot != 0 && owner_count[slot as usize] != 0;
    for slot in 1..slot_count {
        let link = &snapshot.links[slot];
        if is_free[slot] {
            if *link != HierarchyLink::default() {
                tracing::warn!(slot, "freed slot carries hierarchy link data");
            }
            continue;
        }
        for (name, target) in [
            ("parent", link.parent),
            ("first_child", link.first_child),
            ("next_sibling", link.next_sibling),
        ] {
            if target != 0 && !live(target) {
                return Err(corrupted(format!(
                    "live slot {slot} has {name} link to dead slot {target}"
                )));
            }
        }
    }

    // 7. Child chains agree with parent back-pointers: every live slot with
    //    a parent is visited exactly once by walking that parent's chain,
    //    and no chain loops.
    let mut chain_parent = vec![0u32; slot_count];
    for slot in 1..slot_count {
        if is_free[slot] {
            continue;
        }
        let mut child = snapshot.links[slot].first_child;
        let mut steps = 0usize;
        while child != 0 {
            steps += 1;
            if steps > slot_count {
                return Err(corrupted(format!("child chain of slot {slot} loops")));
            }
            if chain_parent[child as usize] != 0 {
                return Err(corrupted(format!(
                    "slot {child} appears in more than one child chain"
                )));
            }
            chain_parent[child as usize] = slot as u32;
            child = snapshot.links[child as usize].next_sibling;
        }
    }
    for slot in 1..slot_count {
        if is_free[slot] {
            continue;
        }
        let parent = snapshot.links[slot].parent;
        if chain_parent[slot] != parent {
            return Err(corrupted(format!(
                "slot {slot} has parent {parent} but the child chains say {}",
                chain_parent[slot]
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityAllocator;
    use glam::{Quat, Vec3};

    #[test]
    fn empty_store_roundtrip() {
        let store = TransformStore::new();
        let snapshot = store.capture_snapshot();
        assert!(snapshot.slots.is_empty());
        assert_eq!(snapshot.transforms.len(), 1); // reserved slot 0
        assert!(snapshot.free.is_empty());

        let mut restored = TransformStore::new();
        restored.restore_from_snapshot(&snapshot).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn validation_rejects_mismatched_arenas() {
        let mut alloc = EntityAllocator::new();
        let mut store = TransformStore::new();
        let e = alloc.create().unwrap();
        store.add(e, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE).unwrap();

        let mut snapshot = store.capture_snapshot();
        snapshot.links.pop();
        let mut target = TransformStore::new();
        assert!(matches!(
            target.restore_from_snapshot(&snapshot),
            Err(EcsError::SnapshotCorrupted { .. })
        ));
    }

    #[test]
    fn validation_rejects_doubly_mapped_slot() {
        let mut alloc = EntityAllocator::new();
        let mut store = TransformStore::new();
        let e1 = alloc.create().unwrap();
        let e2 = alloc.create().unwrap();
        store.add(e1, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE).unwrap();
        store.add(e2, Vec3::ONE, Quat::IDENTITY, Vec3::ONE).unwrap();

        let mut snapshot = store.capture_snapshot();
        // Point e2 at e1's slot.
        snapshot.slots[e2.id() as usize] = snapshot.slots[e1.id() as usize];
        let mut target = TransformStore::new();
        assert!(target.restore_from_snapshot(&snapshot).is_err());
    }

    #[test]
    fn failed_restore_leaves_store_untouched() {
        let mut alloc = EntityAllocator::new();
        let mut store = TransformStore::new();
        let e = alloc.create().unwrap();
        store
            .add(e, Vec3::new(4.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
            .unwrap();

        let mut bad = store.capture_snapshot();
        bad.free.push(9999);
        assert!(store.restore_from_snapshot(&bad).is_err());

        // Original contents still intact.
        assert!(store.has(e));
        assert_eq!(store.get(e).unwrap().position(), Vec3::new(4.0, 0.0, 0.0));
    }
}
