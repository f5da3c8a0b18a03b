//! Benchmark inputs for the minibatch transforms.
//!
//! Every profile is one full mini-batch of [`MINI_BATCH_LENGTH`] rows,
//! generated from a fixed seed so runs are comparable.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use minibatch_core::MINI_BATCH_LENGTH;
use minibatch_test_utils::{random_bitmap, random_bytes, seeded_rng};

/// Selection densities swept by the bitmap benchmarks.
pub const BENCH_DENSITIES: [f64; 4] = [0.01, 0.25, 0.5, 0.99];

/// A selection bitmap covering one mini-batch.
pub fn selection_bitmap(density: f64, seed: u64) -> Vec<u8> {
    random_bitmap(&mut seeded_rng(seed), MINI_BATCH_LENGTH, density)
}

/// One mini-batch of arbitrary bytes, as produced by a comparison kernel.
pub fn byte_mask(seed: u64) -> Vec<u8> {
    random_bytes(&mut seeded_rng(seed), MINI_BATCH_LENGTH)
}

/// The identity selection list `0..MINI_BATCH_LENGTH`.
pub fn identity_selection() -> Vec<u16> {
    (0..MINI_BATCH_LENGTH as u16).collect()
}
