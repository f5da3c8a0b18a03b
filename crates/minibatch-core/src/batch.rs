//! Mini-batch sizing constants.
//!
//! Every per-batch working vector holds at most [`MINI_BATCH_LENGTH`]
//! logical elements. Index-producing kernels emit `u16` indexes, so this
//! bound is also what keeps every emitted index representable.

/// Base-2 logarithm of [`MINI_BATCH_LENGTH`].
pub const LOG_MINI_BATCH_LENGTH: u32 = 10;

/// Maximum number of rows processed together by a batch kernel.
pub const MINI_BATCH_LENGTH: usize = 1 << LOG_MINI_BATCH_LENGTH;
