//! Per-worker kernel state.

use minibatch_arena::{ArenaConfig, ArenaError, MemoryPool, TempVectorArena};
use minibatch_bits::BitUtil;
use minibatch_core::HardwareFlags;

/// One worker's scratch arena and bit-transform strategy.
///
/// Create one per worker thread when the worker starts, then call
/// [`reset`](Self::reset) whenever the next batch needs a different arena
/// size.
#[derive(Debug)]
pub struct KernelContext {
    arena: TempVectorArena,
    bit_util: BitUtil,
}

impl KernelContext {
    /// Allocate an arena of `capacity_bytes` from `pool` and select the
    /// transform path allowed by `flags`.
    pub fn new(
        pool: &dyn MemoryPool,
        capacity_bytes: usize,
        flags: HardwareFlags,
    ) -> Result<Self, ArenaError> {
        let arena = TempVectorArena::with_config(pool, ArenaConfig::new(capacity_bytes))?;
        let bit_util = BitUtil::new(flags);
        log::debug!(
            "kernel context ready: {capacity_bytes} byte arena, {} path",
            bit_util.path()
        );
        Ok(Self { arena, bit_util })
    }

    /// The scratch arena. Borrow it to create
    /// [`ScopedVector`](minibatch_arena::ScopedVector)s.
    pub fn arena(&self) -> &TempVectorArena {
        &self.arena
    }

    /// Mutable access to the arena, for re-initialization.
    pub fn arena_mut(&mut self) -> &mut TempVectorArena {
        &mut self.arena
    }

    /// The bit-transform strategy.
    pub fn bit_util(&self) -> BitUtil {
        self.bit_util
    }

    /// Re-initialize the arena with a new capacity.
    ///
    /// Panics if a leaked handle still holds an allocation.
    pub fn reset(&mut self, pool: &dyn MemoryPool, capacity_bytes: usize) -> Result<(), ArenaError> {
        self.arena.init(pool, capacity_bytes)
    }
}
