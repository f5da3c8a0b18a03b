//! Bitmap / selection-index / byte-mask transforms for batch kernels.
//!
//! Converts between three representations of up to
//! [`MINI_BATCH_LENGTH`](minibatch_core::MINI_BATCH_LENGTH) boolean flags:
//!
//! ```text
//!   packed bitmap  ──bits_to_indexes──►  ascending u16 index list
//!        │   ▲
//! bits_to_bytes  bytes_to_bits
//!        ▼   │
//!   byte mask (0x00 / 0xFF)
//! ```
//!
//! Bit `i` of a bitmap is bit `i % 8` of byte `i / 8` (LSB-first).
//!
//! Every transform lives on [`BitUtil`], a small `Copy` strategy object that
//! fixes the [`KernelPath`](minibatch_core::KernelPath) once. The scalar and
//! accelerated paths produce identical output for every input.
//!
//! # Unsafe code
//!
//! The `avx2` module holds the `std::arch` intrinsics. Its entry points are
//! `unsafe fn`s called only from [`BitUtil`] dispatch on a path that was
//! selected from detected CPU capabilities.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

#[cfg(target_arch = "x86_64")]
mod avx2;
mod scalar;
pub mod util;
pub mod view;
mod word;

pub use util::BitUtil;
pub use view::{BitView, BitViewMut};
