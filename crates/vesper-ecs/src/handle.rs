//! Typed slot handles.
//!
//! A [`Handle`] is the engine-wide replacement for raw pointers into
//! growable storage: an opaque 32-bit index into a dense array, tagged with
//! the record type it refers to so a mesh handle cannot be passed where a
//! transform handle is expected. Storage growth relocates backing memory but
//! never invalidates an index, which is why every cross-component reference
//! in the engine is a handle re-resolved through its owning store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// An opaque 32-bit slot reference into an arena of `T` records.
///
/// Index `0` is the null sentinel ([`Handle::NONE`]); arenas reserve slot 0
/// so it can never refer to a live record.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle<T> {
    index: u32,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The null handle.
    pub const NONE: Handle<T> = Handle {
        index: 0,
        _marker: PhantomData,
    };

    /// Construct a handle from a raw slot index.
    #[inline]
    pub fn from_index(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// The raw slot index.
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns `true` for the null handle.
    #[inline]
    pub fn is_none(self) -> bool {
        self.index == 0
    }

    /// Returns `true` for any non-null handle.
    #[inline]
    pub fn is_some(self) -> bool {
        self.index != 0
    }
}

// Manual impls: derived Clone/Copy/etc. would demand `T: Clone` and friends,
// but the marker carries no data of type T.

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::NONE
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}
