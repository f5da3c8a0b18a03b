//! Test utilities and reference oracles for minibatch development.
//!
//! Provides seeded bitmap generators and deliberately naive, bit-by-bit
//! reference implementations of the bitmap transforms. Kernel tests check
//! every execution path against these oracles.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use minibatch_core::MINI_BATCH_LENGTH;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Deterministic RNG for reproducible test inputs.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Random bitmap with `num_bits` bits, each set with probability `density`.
///
/// Padding bits in the last byte are random too, so kernels that fail to
/// mask the tail are caught.
pub fn random_bitmap(rng: &mut impl Rng, num_bits: usize, density: f64) -> Vec<u8> {
    let mut bytes: Vec<u8> = (0..num_bits.div_ceil(8)).map(|_| rng.random()).collect();
    for i in 0..num_bits {
        set_bit(&mut bytes, i, rng.random_bool(density));
    }
    bytes
}

/// Random byte mask of `len` bytes drawing from the whole `u8` range.
pub fn random_bytes(rng: &mut impl Rng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.random()).collect()
}

/// Densities worth exercising: empty, sparse, half, dense, full.
pub const DENSITIES: [f64; 5] = [0.0, 0.05, 0.5, 0.95, 1.0];

/// Bit lengths worth exercising around word and chunk boundaries.
pub fn interesting_lengths() -> Vec<usize> {
    let mut lengths: Vec<usize> = (0..=130).collect();
    for edge in [191, 192, 193, 255, 256, 257, 511, 512, 513, 1000, 1023] {
        lengths.push(edge);
    }
    lengths.push(MINI_BATCH_LENGTH);
    lengths
}

/// Value of bit `i` (LSB-first).
pub fn get_bit(bytes: &[u8], i: usize) -> bool {
    bytes[i / 8] >> (i % 8) & 1 == 1
}

/// Set bit `i` (LSB-first) to `value`.
pub fn set_bit(bytes: &mut [u8], i: usize, value: bool) {
    let mask = 1u8 << (i % 8);
    if value {
        bytes[i / 8] |= mask;
    } else {
        bytes[i / 8] &= !mask;
    }
}

/// Pack a bool slice into an LSB-first bitmap.
pub fn pack_bools(values: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len().div_ceil(8)];
    for (i, &v) in values.iter().enumerate() {
        set_bit(&mut bytes, i, v);
    }
    bytes
}

/// Reference for `bits_to_indexes`.
pub fn reference_indexes(
    target: bool,
    bits: &[u8],
    offset: usize,
    len: usize,
    base_index: u16,
) -> Vec<u16> {
    (0..len)
        .filter(|&i| get_bit(bits, offset + i) == target)
        .map(|i| base_index + i as u16)
        .collect()
}

/// Reference for `bits_filter_indexes`.
pub fn reference_filter(
    target: bool,
    bits: &[u8],
    offset: usize,
    input: &[u16],
) -> Vec<u16> {
    input
        .iter()
        .enumerate()
        .filter(|&(i, _)| get_bit(bits, offset + i) == target)
        .map(|(_, &idx)| idx)
        .collect()
}

/// Reference for `bits_to_bytes`.
pub fn reference_bytes(bits: &[u8], offset: usize, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| if get_bit(bits, offset + i) { 0xFF } else { 0x00 })
        .collect()
}

/// Reference for `bytes_to_bits`: applies the high bit of each byte onto a
/// copy of `existing` at `offset`.
pub fn reference_pack(bytes: &[u8], existing: &[u8], offset: usize) -> Vec<u8> {
    let mut out = existing.to_vec();
    for (i, &b) in bytes.iter().enumerate() {
        set_bit(&mut out, offset + i, b & 0x80 != 0);
    }
    out
}
