//! Hierarchical spatial transforms.
//!
//! A [`TransformStore`] owns two index-aligned arenas -- one for TRS data
//! plus cached matrices, one for hierarchy links -- and a
//! [`SparseIndexTable`] resolving an [`Entity`] to its slot. The hierarchy
//! is encoded as `parent` / `first_child` / `next_sibling` links (slot `0`
//! meaning "none") instead of per-node child lists, so linking and
//! unlinking never allocate.
//!
//! Matrix recomputation is eager: every TRS mutation or re-parenting
//! immediately restores the invariant
//! `world[i] = world[parent(i)] * T(pos) * R(rot) * S(scale)` (identity for
//! roots) and `local[i] = world[i]^-1` for the mutated slot and its whole
//! subtree. The cost is O(subtree) per mutation, traded against
//! lazily-dirtied matrices for the simpler consistency story: a
//! [`Transform::world_matrix`] read is valid the instant any mutation
//! returns.
//!
//! Callers never see slots or references into the arenas. They hold
//! [`Transform`] / [`TransformMut`] views whose lifetimes are tied to the
//! store borrow, so a view cannot outlive the store or survive a mutation
//! that might relocate backing storage; matrices are returned by value.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::arena::ComponentArena;
use crate::entity::Entity;
use crate::handle::Handle;
use crate::sparse::SparseIndexTable;
use crate::EcsError;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Local TRS and the cached composed matrices for one transform slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformData {
    /// Local translation.
    pub position: Vec3,
    /// Local rotation (unit quaternion).
    pub rotation: Quat,
    /// Local scale.
    pub scale: Vec3,
    /// Composed with every ancestor, up to the root.
    pub world: Mat4,
    /// Inverse of `world`; transforms world space into this node's space.
    pub local: Mat4,
}

impl Default for TransformData {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            world: Mat4::IDENTITY,
            local: Mat4::IDENTITY,
        }
    }
}

/// Sibling-chain hierarchy links for one transform slot. `0` = none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HierarchyLink {
    /// Parent slot, `0` for roots.
    pub parent: u32,
    /// Head of the child chain, `0` if childless.
    pub first_child: u32,
    /// Next slot in the parent's child chain, `0` if last.
    pub next_sibling: u32,
}

// ---------------------------------------------------------------------------
// TransformStore
// ---------------------------------------------------------------------------

/// Owns transform storage and implements the hierarchy/matrix algorithms.
///
/// All mutation must happen on the thread that owns the simulation step;
/// there is no internal locking. Other consumers (e.g., a render pass) read
/// `world_matrix()` values copied out at a frame boundary.
#[derive(Debug, Default)]
pub struct TransformStore {
    transforms: ComponentArena<TransformData>,
    links: ComponentArena<HierarchyLink>,
    table: SparseIndexTable<1>,
}

impl TransformStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform for `entity` and return a mutable view of it.
    ///
    /// The new transform is a root (`world = T * R * S`).
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`] for the sentinel id `0`;
    /// [`EcsError::DuplicateComponent`] if `entity` already has a transform.
    pub fn add(
        &mut self,
        entity: Entity,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<TransformMut<'_>, EcsError> {
        if entity.is_none() {
            return Err(EcsError::InvalidEntity { entity });
        }
        if self.table.has(entity) {
            return Err(EcsError::DuplicateComponent { entity, family: 0 });
        }

        let world = Mat4::from_scale_rotation_translation(scale, rotation, position);
        let data = TransformData {
            position,
            rotation,
            scale,
            world,
            local: world.inverse(),
        };

        // The two arenas see identical add/remove sequences, which keeps
        // record i in both describing the same logical component.
        let t = self.transforms.add(data);
        let l = self.links.add(HierarchyLink::default());
        debug_assert_eq!(t.index(), l.index(), "transform arenas out of lockstep");

        self.table.map(entity, t.index())?;
        Ok(TransformMut {
            slot: t.index(),
            entity,
            store: self,
        })
    }

    /// Remove `entity`'s transform.
    ///
    /// The slot is unlinked from its parent's child chain. Its direct
    /// children are orphaned to roots: each keeps its local TRS, gets
    /// `parent = 0`, and has its subtree's matrices recomputed. (The
    /// alternatives -- re-parenting to the grandparent or cascading the
    /// removal -- would attach children to a node the caller never chose,
    /// or destroy components the caller never asked to destroy.)
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if `entity` has no transform.
    pub fn remove(&mut self, entity: Entity) -> Result<(), EcsError> {
        let slot = self.table.get(entity)?;
        self.detach(slot);

        // Orphan every direct child; the sibling chain is dismantled as we
        // go since roots are not chained.
        let mut child = self.link(slot).first_child;
        self.link_mut(slot).first_child = 0;
        while child != 0 {
            let next = self.link(child).next_sibling;
            let l = self.link_mut(child);
            l.parent = 0;
            l.next_sibling = 0;
            self.update_matrices(child);
            child = next;
        }

        self.transforms.remove(Handle::from_index(slot));
        self.links.remove(Handle::from_index(slot));
        self.table.unmap(entity)?;
        Ok(())
    }

    /// Make `child`'s transform a child of `parent`'s.
    ///
    /// If `child` already has a parent it is detached first (re-parenting).
    /// The child is prepended to the parent's child chain and its subtree's
    /// matrices are recomputed against the new ancestor chain.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if either entity has no transform;
    /// [`EcsError::InvalidEntity`] if the link would create a cycle
    /// (`parent == child`, or `parent` is a descendant of `child`).
    pub fn add_child(&mut self, parent: Entity, child: Entity) -> Result<(), EcsError> {
        let parent_slot = self.table.get(parent)?;
        let child_slot = self.table.get(child)?;

        // Walk parent's ancestor chain; finding the child there means the
        // link would close a cycle.
        let mut ancestor = parent_slot;
        while ancestor != 0 {
            if ancestor == child_slot {
                return Err(EcsError::InvalidEntity { entity: child });
            }
            ancestor = self.link(ancestor).parent;
        }

        self.detach(child_slot);
        let first = self.link(parent_slot).first_child;
        self.link_mut(child_slot).next_sibling = first;
        self.link_mut(child_slot).parent = parent_slot;
        self.link_mut(parent_slot).first_child = child_slot;

        self.update_matrices(child_slot);
        Ok(())
    }

    /// Returns `true` iff `entity` has a transform.
    pub fn has(&self, entity: Entity) -> bool {
        self.table.has(entity)
    }

    /// A read-only view of `entity`'s transform.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if `entity` has no transform.
    pub fn get(&self, entity: Entity) -> Result<Transform<'_>, EcsError> {
        let slot = self.table.get(entity)?;
        Ok(Transform {
            slot,
            entity,
            store: self,
        })
    }

    /// A mutable view of `entity`'s transform.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if `entity` has no transform.
    pub fn get_mut(&mut self, entity: Entity) -> Result<TransformMut<'_>, EcsError> {
        let slot = self.table.get(entity)?;
        Ok(TransformMut {
            slot,
            entity,
            store: self,
        })
    }

    /// Number of live transforms.
    pub fn len(&self) -> usize {
        self.transforms.live_len()
    }

    /// Returns `true` if the store holds no transforms.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- hierarchy internals -------------------------------------------------

    fn link(&self, slot: u32) -> HierarchyLink {
        self.links[Handle::from_index(slot)]
    }

    fn link_mut(&mut self, slot: u32) -> &mut HierarchyLink {
        &mut self.links[Handle::from_index(slot)]
    }

    /// Unlink `slot` from its parent's child chain. No-op for roots. The
    /// slot's own `first_child` chain is untouched.
    fn detach(&mut self, slot: u32) {
        let parent = self.link(slot).parent;
        if parent != 0 {
            let next = self.link(slot).next_sibling;
            let first = self.link(parent).first_child;
            if first == slot {
                self.link_mut(parent).first_child = next;
            } else {
                // Find the previous sibling and patch it past us. The chain
                // invariant guarantees we appear in it exactly once.
                let mut prev = first;
                while self.link(prev).next_sibling != slot {
                    prev = self.link(prev).next_sibling;
                }
                self.link_mut(prev).next_sibling = next;
            }
        }
        let l = self.link_mut(slot);
        l.parent = 0;
        l.next_sibling = 0;
    }

    /// Restore the matrix invariant for `slot` and its entire subtree.
    ///
    /// Explicit worklist instead of recursion: hierarchies can be
    /// arbitrarily deep and the sibling-chain encoding makes pushing
    /// children cheap. A slot is only processed after its parent, so every
    /// `world` read below is already up to date.
    pub(crate) fn update_matrices(&mut self, slot: u32) {
        let mut worklist = vec![slot];
        while let Some(current) = worklist.pop() {
            let parent = self.link(current).parent;
            let parent_world = if parent == 0 {
                Mat4::IDENTITY
            } else {
                self.transforms[Handle::from_index(parent)].world
            };

            let data = &mut self.transforms[Handle::from_index(current)];
            data.world = parent_world
                * Mat4::from_scale_rotation_translation(data.scale, data.rotation, data.position);
            data.local = data.world.inverse();

            let mut child = self.link(current).first_child;
            while child != 0 {
                worklist.push(child);
                child = self.link(child).next_sibling;
            }
        }
    }

    // -- snapshot internals --------------------------------------------------

    pub(crate) fn parts(
        &self,
    ) -> (
        &SparseIndexTable<1>,
        &ComponentArena<TransformData>,
        &ComponentArena<HierarchyLink>,
    ) {
        (&self.table, &self.transforms, &self.links)
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (
        &mut SparseIndexTable<1>,
        &mut ComponentArena<TransformData>,
        &mut ComponentArena<HierarchyLink>,
    ) {
        (&mut self.table, &mut self.transforms, &mut self.links)
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A read-only view of one entity's transform.
///
/// Borrows the store, so it cannot outlive it and cannot coexist with a
/// mutation -- stale-handle bugs are compile errors rather than silent
/// corruption. All accessors return values, never references into the
/// store's arenas.
#[derive(Clone, Copy)]
pub struct Transform<'a> {
    slot: u32,
    entity: Entity,
    store: &'a TransformStore,
}

impl Transform<'_> {
    /// The entity this transform belongs to.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Local translation, as last set (never decomposed from a matrix).
    pub fn position(&self) -> Vec3 {
        self.data().position
    }

    /// Local rotation, as last set.
    pub fn rotation(&self) -> Quat {
        self.data().rotation
    }

    /// Local scale, as last set.
    pub fn scale(&self) -> Vec3 {
        self.data().scale
    }

    /// The cached world matrix. Valid immediately after any mutation
    /// because recomputation is eager.
    pub fn world_matrix(&self) -> Mat4 {
        self.data().world
    }

    /// The cached inverse of the world matrix.
    pub fn local_matrix(&self) -> Mat4 {
        self.data().local
    }

    /// The parent entity's slot is internal; expose only whether one exists.
    pub fn has_parent(&self) -> bool {
        self.store.link(self.slot).parent != 0
    }

    fn data(&self) -> &TransformData {
        &self.store.transforms[Handle::from_index(self.slot)]
    }
}

/// A mutable view of one entity's transform.
///
/// Setters write the field and eagerly recompute the whole subtree's
/// matrices before returning.
pub struct TransformMut<'a> {
    slot: u32,
    entity: Entity,
    store: &'a mut TransformStore,
}

impl TransformMut<'_> {
    /// The entity this transform belongs to.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Set the local translation and recompute the subtree.
    pub fn set_position(&mut self, position: Vec3) {
        self.data_mut().position = position;
        self.store.update_matrices(self.slot);
    }

    /// Set the local rotation and recompute the subtree.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.data_mut().rotation = rotation;
        self.store.update_matrices(self.slot);
    }

    /// Set the local scale and recompute the subtree.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.data_mut().scale = scale;
        self.store.update_matrices(self.slot);
    }

    /// Local translation.
    pub fn position(&self) -> Vec3 {
        self.data().position
    }

    /// Local rotation.
    pub fn rotation(&self) -> Quat {
        self.data().rotation
    }

    /// Local scale.
    pub fn scale(&self) -> Vec3 {
        self.data().scale
    }

    /// The cached world matrix.
    pub fn world_matrix(&self) -> Mat4 {
        self.data().world
    }

    /// The cached inverse of the world matrix.
    pub fn local_matrix(&self) -> Mat4 {
        self.data().local
    }

    fn data(&self) -> &TransformData {
        &self.store.transforms[Handle::from_index(self.slot)]
    }

    fn data_mut(&mut self) -> &mut TransformData {
        &mut self.store.transforms[Handle::from_index(self.slot)]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
