//! Vesper ECS -- entity identity and hierarchical spatial transforms.
//!
//! This crate is the entity/component backbone of the Vesper engine: an
//! [`EntityAllocator`](entity::EntityAllocator) issuing opaque 32-bit ids, a
//! generic sparse-to-dense [`SparseIndexTable`](sparse::SparseIndexTable),
//! slot-reuse [`ComponentArena`](arena::ComponentArena) storage, and a
//! [`TransformStore`](transform::TransformStore) implementing a
//! parent/first-child/next-sibling hierarchy with eagerly recomputed world
//! matrices. Renderers pull `world_matrix()` values once per frame; the
//! snapshot layer persists and restores the whole store exactly.
//!
//! # Quick Start
//!
//! ```
//! use vesper_ecs::prelude::*;
//! use glam::{Quat, Vec3};
//!
//! let mut alloc = EntityAllocator::new();
//! let mut store = TransformStore::new();
//!
//! let root = alloc.create()?;
//! let child = alloc.create()?;
//! store.add(root, Vec3::new(10.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)?;
//! store.add(child, Vec3::new(9.0, 1.0, 0.0), Quat::IDENTITY, Vec3::ONE)?;
//! store.add_child(root, child)?;
//!
//! // The child's world matrix composes with its ancestors eagerly.
//! let translation = store.get(child)?.world_matrix().w_axis;
//! assert_eq!(translation.truncate(), Vec3::new(19.0, 1.0, 0.0));
//! # Ok::<(), vesper_ecs::EcsError>(())
//! ```

#![deny(unsafe_code)]

pub mod arena;
pub mod entity;
pub mod handle;
pub mod snapshot;
pub mod sparse;
pub mod transform;

use entity::Entity;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity is the `0` sentinel, or the requested operation would
    /// violate a structural invariant (e.g., a hierarchy cycle).
    #[error("invalid entity {entity:?}: sentinel id or structurally invalid operation")]
    InvalidEntity {
        entity: Entity,
    },

    /// `add`/`map` was called for an entity that already has the component.
    #[error("entity {entity:?} already has a component in family {family}")]
    DuplicateComponent {
        entity: Entity,
        family: usize,
    },

    /// `get`/`remove`/a mutation was called for an entity without the
    /// component.
    #[error("entity {entity:?} has no component in family {family}")]
    MissingComponent {
        entity: Entity,
        family: usize,
    },

    /// The 32-bit entity id space is exhausted. Unrecoverable: it signals a
    /// violated lifetime assumption of the whole engine.
    #[error("entity id space exhausted after issuing {issued} ids")]
    CapacityOverflow {
        issued: u32,
    },

    /// A snapshot failed validation during restore; the target store was
    /// left untouched.
    #[error("snapshot corrupted: {details}")]
    SnapshotCorrupted {
        details: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::arena::ComponentArena;
    pub use crate::entity::{Entity, EntityAllocator};
    pub use crate::handle::Handle;
    pub use crate::snapshot::{AllocatorSnapshot, StoreSnapshot};
    pub use crate::sparse::SparseIndexTable;
    pub use crate::transform::{Transform, TransformMut, TransformStore};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use glam::{Mat4, Quat, Vec3};

    const EPS: f32 = 1e-4;

    fn setup() -> (EntityAllocator, TransformStore) {
        (EntityAllocator::new(), TransformStore::new())
    }

    // The full caller-facing flow: create, register, link, mutate, read.

    #[test]
    fn simulation_step_end_to_end() {
        let (mut alloc, mut store) = setup();

        let e1 = alloc.create().unwrap();
        store
            .add(e1, Vec3::new(10.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
            .unwrap();
        let e2 = alloc.create().unwrap();
        store
            .add(e2, Vec3::new(9.0, 1.0, 0.0), Quat::IDENTITY, Vec3::ONE)
            .unwrap();
        store.add_child(e1, e2).unwrap();

        store
            .get_mut(e1)
            .unwrap()
            .set_position(Vec3::new(11.0, 0.0, 0.0));

        let w = store.get(e2).unwrap().world_matrix().w_axis.truncate();
        assert!((w - Vec3::new(20.0, 1.0, 0.0)).length() < EPS);
    }

    #[test]
    fn render_pass_copies_matrices_out() {
        let (mut alloc, mut store) = setup();

        let mut renderables = Vec::new();
        for i in 0..16 {
            let e = alloc.create().unwrap();
            store
                .add(e, Vec3::new(i as f32, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
                .unwrap();
            renderables.push(e);
        }

        // A frame's render pass: pull world matrices by value, once each.
        let frame: Vec<Mat4> = renderables
            .iter()
            .map(|&e| store.get(e).unwrap().world_matrix())
            .collect();

        // Later mutations don't invalidate the copied values.
        store
            .get_mut(renderables[0])
            .unwrap()
            .set_position(Vec3::splat(100.0));
        assert_eq!(frame[0].w_axis.x, 0.0);
    }

    #[test]
    fn growth_far_beyond_capacity_preserves_all_queries() {
        let (mut alloc, mut store) = setup();

        let mut early = Vec::new();
        for i in 0..8 {
            let e = alloc.create().unwrap();
            store
                .add(e, Vec3::new(i as f32, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
                .unwrap();
            early.push(e);
        }

        // An id far past the table's current capacity forces a large grow.
        let distant = Entity::from_raw(100_000);
        store
            .add(distant, Vec3::new(-1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
            .unwrap();

        for (i, &e) in early.iter().enumerate() {
            assert!(store.has(e));
            assert_eq!(store.get(e).unwrap().position().x, i as f32);
        }
        assert_eq!(store.get(distant).unwrap().position().x, -1.0);
    }

    #[test]
    fn snapshot_roundtrip_reproduces_every_query() {
        let (mut alloc, mut store) = setup();

        let root = alloc.create().unwrap();
        let mid = alloc.create().unwrap();
        let leaf = alloc.create().unwrap();
        let loner = alloc.create().unwrap();
        let removed = alloc.create().unwrap();

        store
            .add(
                root,
                Vec3::new(1.0, 2.0, 3.0),
                Quat::from_rotation_y(0.4),
                Vec3::splat(2.0),
            )
            .unwrap();
        store
            .add(mid, Vec3::new(0.5, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
            .unwrap();
        store
            .add(leaf, Vec3::new(0.0, 0.25, 0.0), Quat::IDENTITY, Vec3::ONE)
            .unwrap();
        store
            .add(loner, Vec3::new(-9.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
            .unwrap();
        store
            .add(removed, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
            .unwrap();
        store.add_child(root, mid).unwrap();
        store.add_child(mid, leaf).unwrap();
        store.remove(removed).unwrap();

        let snapshot = store.capture_snapshot();

        let mut restored = TransformStore::new();
        restored.restore_from_snapshot(&snapshot).unwrap();

        for &e in &[root, mid, leaf, loner] {
            assert!(restored.has(e));
            let a = store.get(e).unwrap();
            let b = restored.get(e).unwrap();
            assert_eq!(a.position(), b.position());
            assert_eq!(a.rotation(), b.rotation());
            assert_eq!(a.scale(), b.scale());
            assert_eq!(a.world_matrix(), b.world_matrix());
            assert_eq!(a.local_matrix(), b.local_matrix());
        }
        assert!(!restored.has(removed));

        // The restored hierarchy still propagates.
        restored
            .get_mut(root)
            .unwrap()
            .set_position(Vec3::new(50.0, 2.0, 3.0));
        let before = store.get(leaf).unwrap().world_matrix();
        let after = restored.get(leaf).unwrap().world_matrix();
        assert_ne!(before, after);
    }

    #[test]
    fn allocator_snapshot_restores_id_issuance() {
        let mut alloc = EntityAllocator::new();
        for _ in 0..3 {
            alloc.create().unwrap();
        }
        let snap = AllocatorSnapshot {
            next_id: alloc.snapshot_state(),
        };

        let mut restored = EntityAllocator::restore_from_snapshot(snap.next_id).unwrap();
        assert_eq!(restored.create().unwrap().id(), 4);
    }
}
