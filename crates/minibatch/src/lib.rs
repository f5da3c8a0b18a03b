//! Minibatch: scratch memory and bitmap transforms for vectorized kernels.
//!
//! This is the facade crate that re-exports the public API of the
//! `minibatch-*` sub-crates and adds [`KernelContext`], the per-worker
//! bundle of arena and transform strategy.
//!
//! # Quick start
//!
//! ```rust
//! use minibatch::prelude::*;
//!
//! let ctx = KernelContext::new(&SystemPool::new(), 8 * 1024, HardwareFlags::detect())?;
//! let util = ctx.bit_util();
//!
//! // Selection bitmap for rows 0, 4, 5 and 7.
//! let bits = [0b1011_0001u8];
//! let mut selected = ScopedVector::<u16>::new(ctx.arena(), 8);
//! let n = util.bits_to_indexes(true, BitView::from_bytes(&bits, 8), 0, &mut selected);
//! assert_eq!(&selected[..n], &[0, 4, 5, 7]);
//! # Ok::<(), ArenaError>(())
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `minibatch-arena` | Memory pools, `TempVectorArena`, `ScopedVector` |
//! | [`bits`] | `minibatch-bits` | `BitUtil`, bitmap views |
//! | [`types`] | `minibatch-core` | Batch constants, hardware flags |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;

/// Scratch arena and memory pools (`minibatch-arena`).
pub use minibatch_arena as arena;

/// Bitmap, index and byte-mask transforms (`minibatch-bits`).
pub use minibatch_bits as bits;

/// Batch constants and hardware capability flags (`minibatch-core`).
pub use minibatch_core as types;

pub use context::KernelContext;

/// Common imports for kernel code.
///
/// ```rust
/// use minibatch::prelude::*;
/// ```
pub mod prelude {
    // Arena
    pub use minibatch_arena::{
        ArenaConfig, ArenaError, LimitedPool, MemoryPool, ScopedVector, SystemPool,
        TempVectorArena,
    };

    // Bits
    pub use minibatch_bits::{BitUtil, BitView, BitViewMut};

    // Core
    pub use minibatch_core::{HardwareFlags, KernelPath, MINI_BATCH_LENGTH};

    pub use crate::KernelContext;
}
