//! Memory pools that back arena buffers.
//!
//! A [`MemoryPool`] hands out word-aligned [`PoolBuffer`]s. Each buffer
//! returns its bytes to the pool's accounting when dropped, so
//! [`MemoryPool::bytes_allocated`] always reflects outstanding buffers.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::ArenaError;
use crate::raw::RawRegion;

/// Source of backing memory for arenas.
pub trait MemoryPool: Send + Sync {
    /// Allocate an 8-byte aligned buffer of at least `num_bytes` bytes.
    fn allocate(&self, num_bytes: usize) -> Result<PoolBuffer, ArenaError>;

    /// Bytes currently held by live buffers from this pool.
    fn bytes_allocated(&self) -> usize;
}

/// A word-aligned buffer obtained from a [`MemoryPool`].
pub struct PoolBuffer {
    region: RawRegion,
    len: usize,
    in_use: Arc<AtomicUsize>,
}

impl PoolBuffer {
    fn new(region: RawRegion, len: usize, in_use: Arc<AtomicUsize>) -> Self {
        Self {
            region,
            len,
            in_use,
        }
    }

    /// Number of bytes requested from the pool.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn region(&self) -> &RawRegion {
        &self.region
    }

    pub(crate) fn region_mut(&mut self) -> &mut RawRegion {
        &mut self.region
    }
}

impl Drop for PoolBuffer {
    fn drop(&mut self) {
        self.in_use.fetch_sub(self.len, Ordering::Relaxed);
    }
}

impl fmt::Debug for PoolBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuffer").field("len", &self.len).finish()
    }
}

/// Pool backed by the global allocator, with fallible reservation.
#[derive(Debug, Default)]
pub struct SystemPool {
    in_use: Arc<AtomicUsize>,
}

impl SystemPool {
    /// Create a pool with no outstanding buffers.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryPool for SystemPool {
    fn allocate(&self, num_bytes: usize) -> Result<PoolBuffer, ArenaError> {
        let region = RawRegion::try_new(num_bytes).ok_or(ArenaError::AllocationFailed {
            requested: num_bytes,
        })?;
        self.in_use.fetch_add(num_bytes, Ordering::Relaxed);
        Ok(PoolBuffer::new(region, num_bytes, Arc::clone(&self.in_use)))
    }

    fn bytes_allocated(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }
}

/// Pool that refuses requests once `limit` bytes are outstanding.
#[derive(Debug)]
pub struct LimitedPool {
    limit: usize,
    in_use: Arc<AtomicUsize>,
}

impl LimitedPool {
    /// Create a pool that allows at most `limit` outstanding bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            in_use: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The configured byte limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    fn reserve(&self, num_bytes: usize) -> Result<(), ArenaError> {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |in_use| {
                in_use
                    .checked_add(num_bytes)
                    .filter(|&total| total <= self.limit)
            })
            .map(|_| ())
            .map_err(|in_use| ArenaError::PoolLimitExceeded {
                requested: num_bytes,
                limit: self.limit,
                in_use,
            })
    }
}

impl MemoryPool for LimitedPool {
    fn allocate(&self, num_bytes: usize) -> Result<PoolBuffer, ArenaError> {
        self.reserve(num_bytes)?;
        match RawRegion::try_new(num_bytes) {
            Some(region) => Ok(PoolBuffer::new(region, num_bytes, Arc::clone(&self.in_use))),
            None => {
                self.in_use.fetch_sub(num_bytes, Ordering::AcqRel);
                Err(ArenaError::AllocationFailed {
                    requested: num_bytes,
                })
            }
        }
    }

    fn bytes_allocated(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }
}
