//! Word-level helpers shared by the scalar and accelerated kernels.

/// Mask with the low `n` bits set, for `n` in `0..=64`.
pub(crate) const fn low_mask(n: usize) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Load the `index`-th little-endian 64-bit word of `bytes`.
#[inline]
pub(crate) fn load_word(bytes: &[u8], index: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[index * 8..index * 8 + 8]);
    u64::from_le_bytes(buf)
}

/// Load up to 8 bytes little-endian, zero-filling the missing high bytes.
///
/// Never reads past the end of `bytes`.
#[inline]
pub(crate) fn load_up_to_8(bytes: &[u8]) -> u64 {
    let n = bytes.len().min(8);
    let mut buf = [0u8; 8];
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_le_bytes(buf)
}

/// Store the low `min(bytes.len(), 8)` bytes of `value` little-endian.
#[inline]
pub(crate) fn store_up_to_8(bytes: &mut [u8], value: u64) {
    let n = bytes.len().min(8);
    bytes[..n].copy_from_slice(&value.to_le_bytes()[..n]);
}

/// Call `f` with the position of every set bit of `word`, lowest first.
#[inline]
pub(crate) fn for_each_set_bit(mut word: u64, mut f: impl FnMut(usize)) {
    while word != 0 {
        f(word.trailing_zeros() as usize);
        word &= word - 1;
    }
}

/// Expand the 8 bits of `bits` into 8 bytes, `1 → 0xFF` and `0 → 0x00`.
///
/// Bit 0 lands in the lowest byte.
#[inline]
pub(crate) const fn unpack_byte(bits: u8) -> u64 {
    const SPREAD: u64 =
        (1 << 7) | (1 << 14) | (1 << 21) | (1 << 28) | (1 << 35) | (1 << 42) | (1 << 49);
    let bits = bits as u64;
    // Bit k (k >= 1) times 1 << 7k lands on bit 8k; no two partial products collide.
    let mut unpacked = (bits & 0xfe) * SPREAD;
    unpacked |= bits & 1;
    unpacked &= 0x0101_0101_0101_0101;
    unpacked * 0xff
}

/// Gather the high bit of each of the 8 bytes of `word` into one byte.
///
/// Byte 0's high bit becomes bit 0 of the result.
#[inline]
pub(crate) const fn pack_high_bits(word: u64) -> u8 {
    let mut v = (word >> 7) & 0x0101_0101_0101_0101;
    v |= v >> 7;
    v |= v >> 14;
    v |= v >> 28;
    v as u8
}
