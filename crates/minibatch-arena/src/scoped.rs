//! RAII handle for a typed arena allocation.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ops::{Deref, DerefMut};

use bytemuck::Pod;

use crate::error::raise;
use crate::stack::{AllocationId, TempVectorArena};

/// A temporary vector of `T` carved from a [`TempVectorArena`].
///
/// The handle borrows the arena, so it cannot outlive it and the arena
/// cannot be re-initialized while it exists. Dropping the handle releases
/// the allocation; handles must therefore be dropped in reverse order of
/// creation, which nested scopes guarantee.
///
/// ```
/// use minibatch_arena::{ArenaConfig, ScopedVector, SystemPool, TempVectorArena};
///
/// let config = ArenaConfig::for_allocations(&[1024 * 2]);
/// let arena = TempVectorArena::with_config(&SystemPool::new(), config)?;
/// let mut indexes = ScopedVector::<u16>::new(&arena, 1024);
/// indexes[0] = 7;
/// assert_eq!(indexes.len(), 1024);
/// # Ok::<(), minibatch_arena::ArenaError>(())
/// ```
pub struct ScopedVector<'a, T: Pod> {
    arena: &'a TempVectorArena,
    payload: &'a mut [u8],
    id: AllocationId,
    len: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Pod> ScopedVector<'a, T> {
    const LAYOUT_OK: () = assert!(
        align_of::<T>() <= 8 && size_of::<T>() > 0,
        "ScopedVector element type must be non-zero-sized with alignment of at most 8"
    );

    /// Allocate room for `num_elements` values of `T`.
    ///
    /// Contents are unspecified: freshly initialized memory holds the poison
    /// byte, reused memory holds whatever the previous user left. Panics if
    /// the arena is out of space.
    pub fn new(arena: &'a TempVectorArena, num_elements: usize) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::LAYOUT_OK;
        let num_bytes = num_elements.saturating_mul(size_of::<T>());
        let (payload, id) = arena.alloc(num_bytes);
        Self {
            arena,
            payload,
            id,
            len: num_elements,
            _marker: PhantomData,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Identity of the underlying allocation.
    pub fn id(&self) -> AllocationId {
        self.id
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        bytemuck::cast_slice(&self.payload[..self.id.size()])
    }

    /// The elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let size = self.id.size();
        bytemuck::cast_slice_mut(&mut self.payload[..size])
    }

    /// The whole payload as bytes, including rounding slack and the tail pad.
    ///
    /// Kernels that store full SIMD registers past the last element write
    /// here; anything inside this slice is safe to overwrite.
    pub fn padded_bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.payload
    }
}

impl<T: Pod> Deref for ScopedVector<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Pod> DerefMut for ScopedVector<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Pod> Drop for ScopedVector<'_, T> {
    fn drop(&mut self) {
        if let Err(fault) = self.arena.try_release(self.id, self.id.size()) {
            if std::thread::panicking() {
                log::error!("{fault}");
            } else {
                raise(fault);
            }
        }
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for ScopedVector<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedVector")
            .field("id", &self.id)
            .field("data", &self.as_slice())
            .finish()
    }
}
