//! Guarded LIFO scratch arena for per-batch temporary vectors.
//!
//! Vectorized kernels need short-lived buffers (selection indexes, byte
//! masks) on every mini-batch. [`TempVectorArena`] bump-allocates them from
//! one pre-sized buffer and [`ScopedVector`] returns them on drop, so the
//! hot loop never touches the global allocator.
//!
//! # Architecture
//!
//! ```text
//! MemoryPool (SystemPool | LimitedPool)
//! └── PoolBuffer (8-byte aligned, poisoned at init)
//!     └── TempVectorArena (bump offset + live count)
//!         └── ScopedVector<T> × N (LIFO, guard word on each side)
//! ```
//!
//! # Faults
//!
//! Pool failures are ordinary [`ArenaError`]s. Running out of arena space,
//! releasing out of order, and damaged guard words are [`ArenaFault`]s: they
//! are logged at `error` level and then panic.
//!
//! This crate contains `unsafe` code only in its private `raw` module and at
//! the single payload carve in [`TempVectorArena`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod pool;
mod raw;
pub mod scoped;
pub mod stack;

// Public re-exports for the primary API surface.
pub use config::ArenaConfig;
pub use error::{ArenaError, ArenaFault, GuardPosition};
pub use pool::{LimitedPool, MemoryPool, PoolBuffer, SystemPool};
pub use scoped::ScopedVector;
pub use stack::{AllocationId, TempVectorArena, GUARD_LEADING, GUARD_TRAILING, PADDING};
