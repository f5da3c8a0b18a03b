//! Portable kernels over byte-aligned bitmaps.
//!
//! Each kernel takes the index of the first 64-bit word (or byte) to
//! process so an accelerated path can hand over whatever it did not cover.
//! All kernels read only within the bytes implied by `num_bits`.

use crate::word::{
    for_each_set_bit, load_up_to_8, load_word, low_mask, pack_high_bits, store_up_to_8,
    unpack_byte,
};

/// Visit the 64-bit words covering `num_bits` bits, starting at word
/// `first_word`.
///
/// `f` receives the bit position of the word's bit 0 and the word with
/// out-of-range bits cleared, together with the mask of in-range bits.
#[inline]
pub(crate) fn for_each_word(
    bytes: &[u8],
    first_word: usize,
    num_bits: usize,
    mut f: impl FnMut(usize, u64, u64),
) {
    let full_words = num_bits / 64;
    for w in first_word..full_words {
        f(w * 64, load_word(bytes, w), u64::MAX);
    }
    let tail = num_bits % 64;
    if tail != 0 {
        let start = full_words * 8;
        let mask = low_mask(tail);
        let word = load_up_to_8(&bytes[start..start + tail.div_ceil(8)]) & mask;
        f(full_words * 64, word, mask);
    }
}

/// Call `sink` with every position below `num_bits` whose bit equals
/// `target`, in ascending order, starting at word `first_word`.
#[inline]
pub(crate) fn scan(
    target: bool,
    bytes: &[u8],
    first_word: usize,
    num_bits: usize,
    mut sink: impl FnMut(usize),
) {
    for_each_word(bytes, first_word, num_bits, |base, word, mask| {
        let word = if target { word } else { !word & mask };
        for_each_set_bit(word, |bit| sink(base + bit));
    });
}

/// Single-pass partition of positions into zero and one lists.
pub(crate) fn split(
    bytes: &[u8],
    first_word: usize,
    num_bits: usize,
    mut zero: impl FnMut(usize),
    mut one: impl FnMut(usize),
) {
    for_each_word(bytes, first_word, num_bits, |base, word, mask| {
        for_each_set_bit(!word & mask, |bit| zero(base + bit));
        for_each_set_bit(word, |bit| one(base + bit));
    });
}

/// Expand bits to `0x00`/`0xFF` bytes, starting at input byte `first_byte`.
pub(crate) fn bits_to_bytes(bits: &[u8], num_bits: usize, bytes: &mut [u8], first_byte: usize) {
    let full = num_bits / 8;
    for i in first_byte..full {
        bytes[i * 8..i * 8 + 8].copy_from_slice(&unpack_byte(bits[i]).to_le_bytes());
    }
    let tail = num_bits % 8;
    if tail != 0 {
        store_up_to_8(&mut bytes[full * 8..full * 8 + tail], unpack_byte(bits[full]));
    }
}

/// Pack the high bit of each byte, starting at output byte `first_byte`.
///
/// Output bits past `num_bits` in the last byte are left unchanged.
pub(crate) fn bytes_to_bits(bytes: &[u8], num_bits: usize, bits: &mut [u8], first_byte: usize) {
    let full = num_bits / 8;
    for i in first_byte..full {
        bits[i] = pack_high_bits(load_word(bytes, i));
    }
    let tail = num_bits % 8;
    if tail != 0 {
        let packed = pack_high_bits(load_up_to_8(&bytes[full * 8..full * 8 + tail]));
        let mask = low_mask(tail) as u8;
        bits[full] = (bits[full] & !mask) | (packed & mask);
    }
}

/// Whether every byte is zero. Stops at the first non-zero block.
pub(crate) fn are_all_bytes_zero(bytes: &[u8]) -> bool {
    bytes
        .chunks(64)
        .all(|block| block.iter().fold(0u8, |acc, &b| acc | b) == 0)
}
