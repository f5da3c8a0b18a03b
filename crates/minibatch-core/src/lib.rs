//! Core constants and capability types for the minibatch workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! mini-batch size bound shared by every kernel and the opaque hardware
//! capability mask used to pick between scalar and accelerated code paths.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod hardware;

pub use batch::{LOG_MINI_BATCH_LENGTH, MINI_BATCH_LENGTH};
pub use hardware::{HardwareFlags, KernelPath};
