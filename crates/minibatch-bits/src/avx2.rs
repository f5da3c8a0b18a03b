//! AVX2 + BMI2 kernels over byte-aligned bitmaps.
//!
//! Every function here is `unsafe` because it is compiled with
//! `#[target_feature]`: callers must have verified that the CPU supports
//! AVX2 and BMI2. [`BitUtil`](crate::BitUtil) only calls in here on a
//! [`KernelPath::Avx2`](minibatch_core::KernelPath) that was selected from
//! detected flags.
//!
//! Kernels cover whole 64-bit words (index kernels) or whole 32-bit chunks
//! (byte kernels); the caller finishes the remainder on the scalar path.

#![allow(unsafe_code)]

use std::arch::x86_64::*;

use crate::word::load_word;

const EACH_BYTE_IS_1: u64 = 0x0101_0101_0101_0101;
const EACH_BYTE_IS_8: u64 = 0x0808_0808_0808_0808;
const BYTE_SEQUENCE_0_TO_7: u64 = 0x0706_0504_0302_0100;
/// Byte `k` holds `1 << (k % 8)`.
const BIT_IN_BYTE: u64 = 0x8040_2010_0804_0201;

/// Per-call staging buffers.
///
/// `positions` has 8 bytes of slack past 64 because each step of
/// [`word_positions`] writes a full 8-byte group.
struct Scratch {
    positions: [u8; 72],
    indexes: [u16; 64],
}

impl Scratch {
    fn new() -> Self {
        Self {
            positions: [0; 72],
            indexes: [0; 64],
        }
    }
}

/// Write the positions (0..64) of the set bits of `word` ascending into
/// `positions`; returns how many there are.
#[inline]
#[target_feature(enable = "bmi2,popcnt")]
unsafe fn word_positions(mut word: u64, positions: &mut [u8; 72]) -> usize {
    let mut base = 0u64;
    let mut count = 0;
    while word != 0 {
        // Spread the low byte of `word` to one 0x00/0xFF byte per bit, then
        // pull out the matching byte offsets 0..8 packed at the bottom.
        let spread = _pdep_u64(word, EACH_BYTE_IS_1) * 0xff;
        let next = _pext_u64(BYTE_SEQUENCE_0_TO_7, spread) + base;
        positions[count..count + 8].copy_from_slice(&next.to_le_bytes());
        base += EACH_BYTE_IS_8;
        count += (word & 0xff).count_ones() as usize;
        word >>= 8;
    }
    count
}

/// Append `word_base + p` for every set-bit position `p` of `word`.
#[inline]
#[target_feature(enable = "avx2,bmi2,popcnt")]
unsafe fn word_to_indexes(
    word: u64,
    word_base: u16,
    out: &mut [u16],
    n: usize,
    scratch: &mut Scratch,
) -> usize {
    let count = word_positions(word, &mut scratch.positions);
    let offset = _mm256_set1_epi16(word_base as i16);
    for j in 0..count.div_ceil(16) {
        // SAFETY: j < 4, so the 16-byte load ends at or before byte 64 of
        // `positions` and the 32-byte store ends at index 64 of `indexes`.
        let lanes = _mm_loadu_si128(scratch.positions.as_ptr().add(j * 16).cast());
        let wide = _mm256_add_epi16(_mm256_cvtepu8_epi16(lanes), offset);
        _mm256_storeu_si256(scratch.indexes.as_mut_ptr().add(j * 16).cast(), wide);
    }
    out[n..n + count].copy_from_slice(&scratch.indexes[..count]);
    n + count
}

/// Append `base + i` to `out` for every position `i` in the first
/// `num_words` words of `bytes` whose bit equals `target`.
#[target_feature(enable = "avx2,bmi2,popcnt")]
pub(crate) unsafe fn bits_to_indexes(
    target: bool,
    bytes: &[u8],
    num_words: usize,
    base: u16,
    out: &mut [u16],
    mut n: usize,
) -> usize {
    let mut scratch = Scratch::new();
    for w in 0..num_words {
        let word = load_word(bytes, w);
        let word = if target { word } else { !word };
        let word_base = (usize::from(base) + w * 64) as u16;
        n = word_to_indexes(word, word_base, out, n, &mut scratch);
    }
    n
}

/// Call `f` with every position in the first `num_words` words of `bytes`
/// whose bit equals `target`, ascending.
///
/// All positions of a word are computed before `f` sees the first one, and
/// `f` never sees a position below one it was already given.
#[target_feature(enable = "avx2,bmi2,popcnt")]
pub(crate) unsafe fn for_each_position(
    target: bool,
    bytes: &[u8],
    num_words: usize,
    mut f: impl FnMut(usize),
) {
    let mut positions = [0u8; 72];
    for w in 0..num_words {
        let word = load_word(bytes, w);
        let word = if target { word } else { !word };
        let count = word_positions(word, &mut positions);
        for &p in &positions[..count] {
            f(w * 64 + usize::from(p));
        }
    }
}

/// Single pass over `num_words` words appending zero positions to `zeros`
/// and one positions to `ones`, each offset by `base`.
#[target_feature(enable = "avx2,bmi2,popcnt")]
pub(crate) unsafe fn split(
    bytes: &[u8],
    num_words: usize,
    base: u16,
    zeros: &mut [u16],
    mut n0: usize,
    ones: &mut [u16],
    mut n1: usize,
) -> (usize, usize) {
    let mut scratch = Scratch::new();
    for w in 0..num_words {
        let word = load_word(bytes, w);
        let word_base = (usize::from(base) + w * 64) as u16;
        n0 = word_to_indexes(!word, word_base, zeros, n0, &mut scratch);
        n1 = word_to_indexes(word, word_base, ones, n1, &mut scratch);
    }
    (n0, n1)
}

/// Expand `num_chunks` 32-bit chunks of `bits` into `0x00`/`0xFF` bytes.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn bits_to_bytes(bits: &[u8], num_chunks: usize, bytes: &mut [u8]) {
    assert!(bytes.len() >= num_chunks * 32, "byte mask too short");
    let shuffle = _mm256_setr_epi64x(
        0,
        EACH_BYTE_IS_1 as i64,
        (2 * EACH_BYTE_IS_1) as i64,
        (3 * EACH_BYTE_IS_1) as i64,
    );
    let bit_mask = _mm256_set1_epi64x(BIT_IN_BYTE as i64);
    for i in 0..num_chunks {
        let mut chunk = [0u8; 4];
        chunk.copy_from_slice(&bits[i * 4..i * 4 + 4]);
        // Byte k of the result is source byte k / 8, tested against bit k % 8.
        let spread = _mm256_shuffle_epi8(_mm256_set1_epi32(i32::from_le_bytes(chunk)), shuffle);
        let unpacked = _mm256_cmpeq_epi8(_mm256_and_si256(spread, bit_mask), bit_mask);
        // SAFETY: bytes.len() >= num_chunks * 32 was asserted above.
        _mm256_storeu_si256(bytes.as_mut_ptr().add(i * 32).cast(), unpacked);
    }
}

/// Pack the high bit of `num_chunks * 32` bytes into `num_chunks * 4` bytes.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn bytes_to_bits(bytes: &[u8], num_chunks: usize, bits: &mut [u8]) {
    assert!(bytes.len() >= num_chunks * 32, "byte mask too short");
    for i in 0..num_chunks {
        // SAFETY: bytes.len() >= num_chunks * 32 was asserted above.
        let v = _mm256_loadu_si256(bytes.as_ptr().add(i * 32).cast());
        let mask = _mm256_movemask_epi8(v) as u32;
        bits[i * 4..i * 4 + 4].copy_from_slice(&mask.to_le_bytes());
    }
}

/// Whether every byte is zero. Stops at the first non-zero 128-byte block.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn are_all_bytes_zero(bytes: &[u8]) -> bool {
    let mut blocks = bytes.chunks_exact(128);
    for block in &mut blocks {
        let p = block.as_ptr();
        // SAFETY: `block` is exactly 128 bytes.
        let a = _mm256_or_si256(
            _mm256_loadu_si256(p.cast()),
            _mm256_loadu_si256(p.add(32).cast()),
        );
        let b = _mm256_or_si256(
            _mm256_loadu_si256(p.add(64).cast()),
            _mm256_loadu_si256(p.add(96).cast()),
        );
        let acc = _mm256_or_si256(a, b);
        if _mm256_testz_si256(acc, acc) == 0 {
            return false;
        }
    }
    let mut chunks = blocks.remainder().chunks_exact(32);
    for chunk in &mut chunks {
        // SAFETY: `chunk` is exactly 32 bytes.
        let v = _mm256_loadu_si256(chunk.as_ptr().cast());
        if _mm256_testz_si256(v, v) == 0 {
            return false;
        }
    }
    chunks.remainder().iter().all(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> bool {
        is_x86_feature_detected!("avx2") && is_x86_feature_detected!("bmi2")
    }

    #[test]
    fn word_positions_lists_set_bits() {
        if !supported() {
            return;
        }
        let mut positions = [0u8; 72];
        let word = 0x8000_0001_0000_0031u64;
        let count = unsafe { word_positions(word, &mut positions) };
        assert_eq!(&positions[..count], &[0, 4, 5, 32, 63]);
    }

    #[test]
    fn word_positions_dense_word() {
        if !supported() {
            return;
        }
        let mut positions = [0u8; 72];
        let count = unsafe { word_positions(u64::MAX, &mut positions) };
        assert_eq!(count, 64);
        let expected: Vec<u8> = (0..64).collect();
        assert_eq!(&positions[..64], expected.as_slice());
    }

    #[test]
    fn indexes_carry_word_base() {
        if !supported() {
            return;
        }
        let mut bytes = [0u8; 16];
        bytes[0] = 0b10;
        bytes[8] = 0b1;
        let mut out = [0u16; 128];
        let n = unsafe { bits_to_indexes(true, &bytes, 2, 100, &mut out, 0) };
        assert_eq!(&out[..n], &[101, 164]);
    }

    #[test]
    fn bytes_round_trip_one_chunk() {
        if !supported() {
            return;
        }
        let bits = [0b1011_0001u8, 0xFF, 0x00, 0x5A];
        let mut bytes = [0u8; 32];
        let mut back = [0u8; 4];
        unsafe {
            bits_to_bytes(&bits, 1, &mut bytes);
            bytes_to_bits(&bytes, 1, &mut back);
        }
        assert_eq!(&bytes[..8], &[0xFF, 0, 0, 0, 0xFF, 0xFF, 0, 0xFF]);
        assert_eq!(back, bits);
    }

    #[test]
    fn zero_check_sees_last_byte() {
        if !supported() {
            return;
        }
        let mut bytes = vec![0u8; 1000];
        assert!(unsafe { are_all_bytes_zero(&bytes) });
        bytes[999] = 1;
        assert!(!unsafe { are_all_bytes_zero(&bytes) });
        bytes[999] = 0;
        bytes[130] = 0x80;
        assert!(!unsafe { are_all_bytes_zero(&bytes) });
    }
}
