//! LIFO scratch arena with guard words around every allocation.
//!
//! Layout of one allocation, growing upward from `top`:
//!
//! ```text
//! [ GUARD_LEADING : 8 ][ payload : round_up(n, 8) + PADDING ][ GUARD_TRAILING : 8 ]
//! ```
//!
//! The tail padding lets SIMD kernels store a full register past the last
//! element without touching the trailing guard. Guards are checked on
//! release; a mismatch means something wrote outside its payload.

use std::cell::Cell;
use std::fmt;

use crate::config::ArenaConfig;
use crate::error::{raise, ArenaError, ArenaFault, GuardPosition};
use crate::pool::{MemoryPool, PoolBuffer};

/// Sentinel written immediately before every payload.
pub const GUARD_LEADING: u64 = 0x3141_5926_5358_9793;

/// Sentinel written immediately after every padded payload.
pub const GUARD_TRAILING: u64 = 0x0577_2156_6490_1532;

/// Writable bytes appended to every payload.
pub const PADDING: usize = 64;

const GUARD_SIZE: usize = std::mem::size_of::<u64>();

/// Identifies one live allocation in a [`TempVectorArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationId {
    ordinal: usize,
    offset: usize,
    size: usize,
}

impl AllocationId {
    /// Position in the allocation stack, starting at 0.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Byte offset of the payload within the arena buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Requested payload size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Stack allocator for short-lived temporary vectors.
///
/// Allocations are made through [`ScopedVector`](crate::ScopedVector) and
/// must be released in reverse order of creation, which falls out naturally
/// from lexical scoping. The arena is `Send` but not `Sync`: use one arena
/// per worker thread.
pub struct TempVectorArena {
    buffer: Option<PoolBuffer>,
    capacity: usize,
    poison_byte: u8,
    top: Cell<usize>,
    live_count: Cell<usize>,
}

impl TempVectorArena {
    /// Create an arena with no backing buffer.
    ///
    /// Every allocation fails until [`init`](Self::init) succeeds.
    pub fn new() -> Self {
        Self {
            buffer: None,
            capacity: 0,
            poison_byte: ArenaConfig::DEFAULT_POISON_BYTE,
            top: Cell::new(0),
            live_count: Cell::new(0),
        }
    }

    /// Create and initialize an arena from `config`.
    pub fn with_config(pool: &dyn MemoryPool, config: ArenaConfig) -> Result<Self, ArenaError> {
        let mut arena = Self::new();
        arena.poison_byte = config.poison_byte;
        arena.init(pool, config.capacity_bytes)?;
        Ok(arena)
    }

    /// Payload bytes reserved for a request of `num_bytes`.
    pub const fn padded_size(num_bytes: usize) -> usize {
        num_bytes.next_multiple_of(GUARD_SIZE) + PADDING
    }

    /// Total arena footprint of one allocation of `num_bytes`, guards included.
    pub const fn estimated_allocation_size(num_bytes: usize) -> usize {
        Self::padded_size(num_bytes) + 2 * GUARD_SIZE
    }

    /// (Re)initialize the arena with room for `size_bytes` of allocations.
    ///
    /// The previous buffer is returned to its pool first. On failure the
    /// arena is left empty. Panics if any allocation is still live.
    pub fn init(&mut self, pool: &dyn MemoryPool, size_bytes: usize) -> Result<(), ArenaError> {
        let live_count = self.live_count.get();
        if live_count > 0 {
            raise(ArenaFault::LiveAllocations { live_count });
        }
        self.buffer = None;
        self.capacity = 0;
        self.top.set(0);

        let buffer_size = size_bytes
            .checked_add(GUARD_SIZE - 1 + PADDING + 2 * GUARD_SIZE)
            .map(|_| Self::estimated_allocation_size(size_bytes))
            .ok_or(ArenaError::AllocationFailed {
                requested: size_bytes,
            })?;
        let mut buffer = pool.allocate(buffer_size)?;
        buffer.region_mut().fill(self.poison_byte);
        log::debug!(
            "arena initialized: capacity {size_bytes} bytes, buffer {buffer_size} bytes"
        );
        self.buffer = Some(buffer);
        self.capacity = size_bytes;
        Ok(())
    }

    /// Whether a backing buffer is present.
    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    /// Capacity passed to the last successful [`init`](Self::init).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of the backing buffer in bytes, 0 when uninitialized.
    pub fn buffer_size(&self) -> usize {
        self.buffer.as_ref().map_or(0, PoolBuffer::len)
    }

    /// Current bump offset.
    pub fn top(&self) -> usize {
        self.top.get()
    }

    /// Bytes left above `top`.
    pub fn remaining(&self) -> usize {
        self.buffer_size() - self.top.get()
    }

    /// Number of allocations not yet released.
    pub fn live_count(&self) -> usize {
        self.live_count.get()
    }

    /// Push a new allocation and return its padded payload.
    ///
    /// The payload is `padded_size(num_bytes)` bytes long and is disjoint
    /// from every other live payload.
    #[allow(clippy::mut_from_ref)]
    pub(crate) fn alloc(&self, num_bytes: usize) -> (&mut [u8], AllocationId) {
        let top = self.top.get();
        let buffer_size = self.buffer_size();
        let fits = num_bytes <= buffer_size
            && Self::estimated_allocation_size(num_bytes) <= buffer_size - top;
        let buffer = match &self.buffer {
            Some(buffer) if fits => buffer,
            _ => raise(ArenaFault::CapacityExceeded {
                requested: num_bytes,
                top,
                buffer_size,
            }),
        };

        let region = buffer.region();
        let payload_offset = top + GUARD_SIZE;
        let payload_len = Self::padded_size(num_bytes);
        region.write_word(top, GUARD_LEADING);
        region.write_word(payload_offset + payload_len, GUARD_TRAILING);

        let id = AllocationId {
            ordinal: self.live_count.get(),
            offset: payload_offset,
            size: num_bytes,
        };
        self.top.set(top + Self::estimated_allocation_size(num_bytes));
        self.live_count.set(id.ordinal + 1);

        // SAFETY: `payload_offset..payload_offset + payload_len` lies below
        // the new `top`, so no other live payload overlaps it until this
        // allocation is released. The buffer cannot be dropped or replaced
        // while `&self` is borrowed.
        #[allow(unsafe_code)]
        let payload = unsafe { region.bytes_mut(payload_offset, payload_len) };
        (payload, id)
    }

    /// Pop the allocation `id`, checking order and both guards first.
    ///
    /// Arena state is untouched when a check fails.
    pub(crate) fn try_release(&self, id: AllocationId, num_bytes: usize) -> Result<(), ArenaFault> {
        let top = self.top.get();
        let live_count = self.live_count.get();
        let region_start = id.offset - GUARD_SIZE;
        let region_end = region_start + Self::estimated_allocation_size(num_bytes);
        let out_of_order = ArenaFault::OutOfOrderRelease {
            ordinal: id.ordinal,
            live_count,
            region_end,
            top,
        };
        if live_count == 0 || id.ordinal != live_count - 1 || region_end != top {
            return Err(out_of_order);
        }
        let Some(buffer) = &self.buffer else {
            return Err(out_of_order);
        };

        let region = buffer.region();
        let trailing = region_end - GUARD_SIZE;
        check_guard(region.read_word(trailing), GUARD_TRAILING, GuardPosition::Trailing, trailing)?;
        check_guard(
            region.read_word(region_start),
            GUARD_LEADING,
            GuardPosition::Leading,
            region_start,
        )?;

        self.top.set(region_start);
        self.live_count.set(live_count - 1);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn corrupt_byte(&self, offset: usize, value: u8) {
        if let Some(buffer) = &self.buffer {
            buffer.region().write_byte(offset, value);
        }
    }
}

fn check_guard(
    observed: u64,
    expected: u64,
    position: GuardPosition,
    offset: usize,
) -> Result<(), ArenaFault> {
    if observed == expected {
        Ok(())
    } else {
        Err(ArenaFault::GuardCorrupted {
            position,
            offset,
            expected,
            observed,
        })
    }
}

impl Default for TempVectorArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempVectorArena {
    fn drop(&mut self) {
        let live_count = self.live_count.get();
        if live_count > 0 && !std::thread::panicking() {
            log::warn!("arena dropped with {live_count} live allocations");
        }
    }
}

impl fmt::Debug for TempVectorArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TempVectorArena")
            .field("capacity", &self.capacity)
            .field("buffer_size", &self.buffer_size())
            .field("top", &self.top.get())
            .field("live_count", &self.live_count.get())
            .finish()
    }
}
