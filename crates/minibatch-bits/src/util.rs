//! The [`BitUtil`] strategy object and its transforms.

use minibatch_core::{HardwareFlags, KernelPath};

use crate::scalar;
use crate::view::{BitView, BitViewMut};
use crate::word::{for_each_set_bit, load_up_to_8, low_mask, pack_high_bits, unpack_byte};

#[cfg(target_arch = "x86_64")]
use crate::avx2;

/// Bitmap transforms bound to one execution path.
///
/// Build one per worker (or per process) and reuse it: the path is fixed at
/// construction, so no call re-checks CPU capabilities.
///
/// Index-producing methods emit `u16` indexes. Callers keep
/// `base_index + bits.len()` within `1 << 16`; in practice `bits.len()` is
/// at most [`MINI_BATCH_LENGTH`](minibatch_core::MINI_BATCH_LENGTH).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitUtil {
    path: KernelPath,
}

impl BitUtil {
    /// Pick the best path the given flags allow on this CPU.
    pub fn new(flags: HardwareFlags) -> Self {
        let path = KernelPath::select(flags);
        log::debug!("bit transforms using the {path} path");
        Self { path }
    }

    /// Use the portable path regardless of hardware.
    pub fn scalar() -> Self {
        Self {
            path: KernelPath::Scalar,
        }
    }

    /// Use the best path for the detected hardware.
    pub fn detect() -> Self {
        Self::new(HardwareFlags::detect())
    }

    /// The path this instance dispatches to.
    pub fn path(&self) -> KernelPath {
        self.path
    }

    /// Write, in ascending order, `base_index + i` for every bit `i` of
    /// `bits` equal to `target`. Returns the number of indexes written.
    ///
    /// # Panics
    ///
    /// Panics if `indexes` is shorter than `bits.len()`.
    #[allow(unsafe_code)]
    pub fn bits_to_indexes(
        &self,
        target: bool,
        bits: BitView<'_>,
        base_index: u16,
        indexes: &mut [u16],
    ) -> usize {
        let num_bits = bits.len();
        assert!(
            indexes.len() >= num_bits,
            "index buffer of {} cannot hold {num_bits} indexes",
            indexes.len()
        );
        debug_assert!(
            usize::from(base_index) + num_bits <= 1 << 16,
            "indexes {base_index}..{base_index}+{num_bits} overflow u16"
        );

        let (head, body, body_bits) = bits.split_head();
        let mut n = 0;
        let mut base = base_index;
        if let Some(head) = head {
            let word = select(target, u64::from(head.byte), low_mask(head.len));
            for_each_set_bit(word, |i| {
                indexes[n] = base.wrapping_add(i as u16);
                n += 1;
            });
            base = base.wrapping_add(head.len as u16);
        }

        let first_word = match self.path {
            #[cfg(target_arch = "x86_64")]
            KernelPath::Avx2 => {
                let words = body_bits / 64;
                // SAFETY: the Avx2 path is only selected when the CPU reports
                // AVX2 and BMI2.
                n = unsafe { avx2::bits_to_indexes(target, body, words, base, indexes, n) };
                words
            }
            _ => 0,
        };
        scalar::scan(target, body, first_word, body_bits, |i| {
            indexes[n] = base.wrapping_add(i as u16);
            n += 1;
        });
        n
    }

    /// Keep `input_indexes[i]` for every bit `i` of `bits` equal to
    /// `target`, writing survivors in order to `indexes`. Returns the
    /// number kept.
    ///
    /// # Panics
    ///
    /// Panics if either index buffer is shorter than `bits.len()`.
    pub fn bits_filter_indexes(
        &self,
        target: bool,
        bits: BitView<'_>,
        input_indexes: &[u16],
        indexes: &mut [u16],
    ) -> usize {
        let num_bits = bits.len();
        assert!(
            input_indexes.len() >= num_bits && indexes.len() >= num_bits,
            "index buffers of {} and {} cannot hold {num_bits} indexes",
            input_indexes.len(),
            indexes.len()
        );
        let mut n = 0;
        self.for_each_match(target, bits, |i| {
            indexes[n] = input_indexes[i];
            n += 1;
        });
        n
    }

    /// In-place form of [`bits_filter_indexes`](Self::bits_filter_indexes):
    /// compacts the survivors to the front of `indexes`.
    ///
    /// # Panics
    ///
    /// Panics if `indexes` is shorter than `bits.len()`.
    pub fn bits_filter_indexes_in_place(
        &self,
        target: bool,
        bits: BitView<'_>,
        indexes: &mut [u16],
    ) -> usize {
        let num_bits = bits.len();
        assert!(
            indexes.len() >= num_bits,
            "index buffer of {} cannot hold {num_bits} indexes",
            indexes.len()
        );
        let mut n = 0;
        // Positions arrive ascending and n never passes them, so each slot is
        // read before anything overwrites it.
        self.for_each_match(target, bits, |i| {
            indexes[n] = indexes[i];
            n += 1;
        });
        n
    }

    /// Partition every position of `bits` into `indexes_bit0` (bit clear)
    /// and `indexes_bit1` (bit set) in one scan. Both lists are ascending.
    /// Returns the number of zero positions; the one count is
    /// `bits.len()` minus that.
    ///
    /// # Panics
    ///
    /// Panics if either output is shorter than `bits.len()`.
    #[allow(unsafe_code)]
    pub fn bits_split_indexes(
        &self,
        bits: BitView<'_>,
        indexes_bit0: &mut [u16],
        indexes_bit1: &mut [u16],
    ) -> usize {
        let num_bits = bits.len();
        assert!(
            indexes_bit0.len() >= num_bits && indexes_bit1.len() >= num_bits,
            "split outputs of {} and {} cannot hold {num_bits} indexes",
            indexes_bit0.len(),
            indexes_bit1.len()
        );
        debug_assert!(num_bits <= 1 << 16, "{num_bits} positions overflow u16");

        let (head, body, body_bits) = bits.split_head();
        let mut n0 = 0;
        let mut n1 = 0;
        let mut base = 0u16;
        if let Some(head) = head {
            let mask = low_mask(head.len);
            let word = u64::from(head.byte) & mask;
            for_each_set_bit(!word & mask, |i| {
                indexes_bit0[n0] = i as u16;
                n0 += 1;
            });
            for_each_set_bit(word, |i| {
                indexes_bit1[n1] = i as u16;
                n1 += 1;
            });
            base = head.len as u16;
        }

        let first_word = match self.path {
            #[cfg(target_arch = "x86_64")]
            KernelPath::Avx2 => {
                let words = body_bits / 64;
                // SAFETY: see `bits_to_indexes`.
                (n0, n1) = unsafe {
                    avx2::split(body, words, base, indexes_bit0, n0, indexes_bit1, n1)
                };
                words
            }
            _ => 0,
        };
        scalar::split(
            body,
            first_word,
            body_bits,
            |i| {
                indexes_bit0[n0] = base.wrapping_add(i as u16);
                n0 += 1;
            },
            |i| {
                indexes_bit1[n1] = base.wrapping_add(i as u16);
                n1 += 1;
            },
        );
        n0
    }

    /// Expand each bit of `bits` to one byte of `bytes`: `1 → 0xFF`,
    /// `0 → 0x00`. Exactly `bits.len()` bytes are written.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than `bits.len()`.
    #[allow(unsafe_code)]
    pub fn bits_to_bytes(&self, bits: BitView<'_>, bytes: &mut [u8]) {
        let num_bits = bits.len();
        assert!(
            bytes.len() >= num_bits,
            "byte mask of {} cannot hold {num_bits} bytes",
            bytes.len()
        );
        let (head, body, body_bits) = bits.split_head();
        let out = match head {
            Some(head) => {
                let unpacked = unpack_byte(head.byte).to_le_bytes();
                bytes[..head.len].copy_from_slice(&unpacked[..head.len]);
                &mut bytes[head.len..num_bits]
            }
            None => &mut bytes[..num_bits],
        };

        let first_byte = match self.path {
            #[cfg(target_arch = "x86_64")]
            KernelPath::Avx2 => {
                let chunks = body_bits / 32;
                // SAFETY: see `bits_to_indexes`.
                unsafe { avx2::bits_to_bytes(body, chunks, out) };
                chunks * 4
            }
            _ => 0,
        };
        scalar::bits_to_bytes(body, body_bits, out, first_byte);
    }

    /// Pack the high bit (`0x80`) of each of the first `bits.len()` bytes
    /// into `bits`. Bits outside the view keep their value.
    ///
    /// Only bit 7 of each byte matters: `0x80` and `0xFF` both pack to 1,
    /// `0x7F` packs to 0.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than `bits.len()`.
    #[allow(unsafe_code)]
    pub fn bytes_to_bits(&self, bytes: &[u8], mut bits: BitViewMut<'_>) {
        let num_bits = bits.len();
        assert!(
            bytes.len() >= num_bits,
            "byte mask of {} cannot supply {num_bits} bits",
            bytes.len()
        );
        let (head, body, body_bits) = bits.split_head_mut();
        let input = match head {
            Some(head) => {
                let packed = pack_high_bits(load_up_to_8(&bytes[..head.len]));
                let mask = (low_mask(head.len) as u8) << head.shift;
                *head.byte = (*head.byte & !mask) | ((packed << head.shift) & mask);
                &bytes[head.len..num_bits]
            }
            None => &bytes[..num_bits],
        };

        let first_byte = match self.path {
            #[cfg(target_arch = "x86_64")]
            KernelPath::Avx2 => {
                let chunks = body_bits / 32;
                // SAFETY: see `bits_to_indexes`.
                unsafe { avx2::bytes_to_bits(input, chunks, body) };
                chunks * 4
            }
            _ => 0,
        };
        scalar::bytes_to_bits(input, body_bits, body, first_byte);
    }

    /// Whether every byte of `bytes` is zero. `true` for an empty slice.
    #[allow(unsafe_code)]
    pub fn are_all_bytes_zero(&self, bytes: &[u8]) -> bool {
        match self.path {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: see `bits_to_indexes`.
            KernelPath::Avx2 => unsafe { avx2::are_all_bytes_zero(bytes) },
            _ => scalar::are_all_bytes_zero(bytes),
        }
    }

    /// Call `f` with every position of `bits` whose bit equals `target`,
    /// in ascending order.
    #[allow(unsafe_code)]
    fn for_each_match(&self, target: bool, bits: BitView<'_>, mut f: impl FnMut(usize)) {
        let (head, body, body_bits) = bits.split_head();
        let mut skip = 0;
        if let Some(head) = head {
            let word = select(target, u64::from(head.byte), low_mask(head.len));
            for_each_set_bit(word, &mut f);
            skip = head.len;
        }

        let first_word = match self.path {
            #[cfg(target_arch = "x86_64")]
            KernelPath::Avx2 => {
                let words = body_bits / 64;
                // SAFETY: see `bits_to_indexes`.
                unsafe { avx2::for_each_position(target, body, words, |i| f(skip + i)) };
                words
            }
            _ => 0,
        };
        scalar::scan(target, body, first_word, body_bits, |i| f(skip + i));
    }
}

impl Default for BitUtil {
    fn default() -> Self {
        Self::detect()
    }
}

/// `word` if searching for ones, its complement otherwise, limited to `mask`.
#[inline]
fn select(target: bool, word: u64, mask: u64) -> u64 {
    if target {
        word & mask
    } else {
        !word & mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both() -> [BitUtil; 2] {
        [BitUtil::scalar(), BitUtil::detect()]
    }

    #[test]
    fn worked_example() {
        let bitmap = [0b1011_0001u8];
        for util in both() {
            let view = BitView::from_bytes(&bitmap, 8);
            let mut indexes = [0u16; 8];
            let n = util.bits_to_indexes(true, view, 0, &mut indexes);
            assert_eq!(&indexes[..n], &[0, 4, 5, 7]);

            let mut bytes = [0u8; 8];
            util.bits_to_bytes(view, &mut bytes);
            assert_eq!(bytes, [0xFF, 0, 0, 0, 0xFF, 0xFF, 0, 0xFF]);

            let mut back = [0u8; 1];
            util.bytes_to_bits(&bytes, BitViewMut::from_bytes(&mut back, 8));
            assert_eq!(back, bitmap);
        }
    }

    #[test]
    fn zeros_with_base_index() {
        let bitmap = [0b1011_0001u8];
        for util in both() {
            let mut indexes = [0u16; 8];
            let n = util.bits_to_indexes(false, BitView::from_bytes(&bitmap, 8), 10, &mut indexes);
            assert_eq!(&indexes[..n], &[11, 12, 13, 16]);
        }
    }

    #[test]
    fn unaligned_offset_counts_from_view_start() {
        // Bits 3.. of [0b1010_1000, 0b0000_0011] are 1,0,1,0,1,1,1,0,...
        let bitmap = [0b1010_1000u8, 0b0000_0011];
        for util in both() {
            let mut indexes = [0u16; 10];
            let view = BitView::new(&bitmap, 3, 7);
            let n = util.bits_to_indexes(true, view, 0, &mut indexes);
            assert_eq!(&indexes[..n], &[0, 2, 4, 5, 6]);
        }
    }

    #[test]
    fn empty_view_writes_nothing() {
        for util in both() {
            let mut indexes = [7u16; 4];
            assert_eq!(util.bits_to_indexes(true, BitView::from_bytes(&[], 0), 0, &mut indexes), 0);
            assert_eq!(indexes, [7; 4]);
            let (mut z, mut o) = ([0u16; 0], [0u16; 0]);
            assert_eq!(util.bits_split_indexes(BitView::from_bytes(&[], 0), &mut z, &mut o), 0);
        }
    }

    #[test]
    fn filter_selects_by_list_position() {
        let bitmap = [0b0000_0110u8];
        let input = [40u16, 41, 42, 43];
        for util in both() {
            let mut out = [0u16; 4];
            let n = util.bits_filter_indexes(true, BitView::from_bytes(&bitmap, 4), &input, &mut out);
            assert_eq!(&out[..n], &[41, 42]);
            let n = util.bits_filter_indexes(false, BitView::from_bytes(&bitmap, 4), &input, &mut out);
            assert_eq!(&out[..n], &[40, 43]);
        }
    }

    #[test]
    fn filter_in_place_compacts_front() {
        let bitmap = [0b1010_1010u8, 0xFF];
        for util in both() {
            let mut indexes: Vec<u16> = (100..116).collect();
            let n = util.bits_filter_indexes_in_place(true, BitView::from_bytes(&bitmap, 16), &mut indexes);
            assert_eq!(
                &indexes[..n],
                &[101, 103, 105, 107, 108, 109, 110, 111, 112, 113, 114, 115]
            );
        }
    }

    #[test]
    fn split_example() {
        let bitmap = [0b1011_0001u8];
        for util in both() {
            let mut zeros = [0u16; 8];
            let mut ones = [0u16; 8];
            let n0 = util.bits_split_indexes(BitView::from_bytes(&bitmap, 8), &mut zeros, &mut ones);
            assert_eq!(n0, 4);
            assert_eq!(&zeros[..4], &[1, 2, 3, 6]);
            assert_eq!(&ones[..4], &[0, 4, 5, 7]);
        }
    }

    #[test]
    fn bytes_to_bits_uses_high_bit_not_equality() {
        let bytes = [0x80u8, 0x7F, 0xC3, 0x01, 0xFF, 0x00, 0x90, 0x7E];
        for util in both() {
            let mut bits = [0u8; 1];
            util.bytes_to_bits(&bytes, BitViewMut::from_bytes(&mut bits, 8));
            assert_eq!(bits[0], 0b0101_0101);
        }
    }

    #[test]
    fn bytes_to_bits_unaligned_preserves_neighbours() {
        let bytes = [0xFFu8; 6];
        for util in both() {
            let mut bits = [0u8; 2];
            util.bytes_to_bits(&bytes, BitViewMut::new(&mut bits, 5, 6));
            assert_eq!(bits, [0b1110_0000, 0b0000_0111]);

            let mut bits = [0b0101_0101u8; 2];
            util.bytes_to_bits(&[0, 0], BitViewMut::new(&mut bits, 2, 2));
            assert_eq!(bits, [0b0101_0001, 0b0101_0101]);
        }
    }

    #[test]
    fn bits_to_bytes_unaligned() {
        let bitmap = [0b1000_0000u8, 0b0000_0001];
        for util in both() {
            let mut bytes = [0x55u8; 4];
            util.bits_to_bytes(BitView::new(&bitmap, 7, 3), &mut bytes);
            assert_eq!(bytes, [0xFF, 0xFF, 0x00, 0x55]);
        }
    }

    #[test]
    fn all_zero_examples() {
        for util in both() {
            assert!(util.are_all_bytes_zero(&[]));
            let mut bytes = vec![0u8; 1000];
            assert!(util.are_all_bytes_zero(&bytes));
            for pos in [0, 31, 32, 127, 128, 500, 999] {
                bytes[pos] = 0x01;
                assert!(!util.are_all_bytes_zero(&bytes), "missed byte {pos}");
                bytes[pos] = 0;
            }
        }
    }

    #[test]
    #[should_panic(expected = "cannot hold")]
    fn short_output_is_rejected() {
        let bitmap = [0xFFu8; 2];
        let mut indexes = [0u16; 15];
        BitUtil::scalar().bits_to_indexes(true, BitView::from_bytes(&bitmap, 16), 0, &mut indexes);
    }

    #[test]
    fn scalar_constructor_and_empty_flags_agree() {
        assert_eq!(BitUtil::scalar(), BitUtil::new(HardwareFlags::empty()));
        assert_eq!(BitUtil::scalar().path(), KernelPath::Scalar);
    }
}
