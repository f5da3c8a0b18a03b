//! Scalar and detected paths must agree with each other and with the
//! naive reference oracles for every input.

use minibatch_bits::{BitUtil, BitView, BitViewMut};
use minibatch_test_utils::{
    interesting_lengths, random_bitmap, random_bytes, reference_bytes, reference_filter,
    reference_indexes, reference_pack, seeded_rng, DENSITIES,
};
use proptest::prelude::*;

const OFFSETS: [usize; 5] = [0, 1, 3, 8, 13];

fn paths() -> [BitUtil; 2] {
    [BitUtil::scalar(), BitUtil::detect()]
}

fn to_indexes(util: BitUtil, target: bool, bits: &[u8], offset: usize, len: usize) -> Vec<u16> {
    let mut out = vec![0u16; len];
    let n = util.bits_to_indexes(target, BitView::new(bits, offset, len), 0, &mut out);
    out.truncate(n);
    out
}

#[test]
fn exhaustive_small_bitmaps() {
    for len in 0..=10usize {
        for pattern in 0u32..(1 << len) {
            let bits = pattern.to_le_bytes();
            for target in [false, true] {
                let expected = reference_indexes(target, &bits, 0, len, 0);
                for util in paths() {
                    let got = to_indexes(util, target, &bits, 0, len);
                    assert_eq!(got, expected, "len {len} pattern {pattern:#b} target {target}");
                }
            }
        }
    }
}

#[test]
fn exhaustive_small_bitmaps_at_every_offset() {
    for offset in 0..8usize {
        for len in 0..=9usize {
            for pattern in 0u32..(1 << len) {
                let bits = (pattern << offset).to_le_bytes();
                let expected = reference_indexes(true, &bits, offset, len, 0);
                for util in paths() {
                    assert_eq!(to_indexes(util, true, &bits, offset, len), expected);
                }
            }
        }
    }
}

#[test]
fn randomized_indexes_match_reference() {
    let mut rng = seeded_rng(0x5eed);
    for len in interesting_lengths() {
        for density in DENSITIES {
            for offset in OFFSETS {
                let bits = random_bitmap(&mut rng, offset + len, density);
                for target in [false, true] {
                    let expected = reference_indexes(target, &bits, offset, len, 0);
                    let view = BitView::new(&bits, offset, len);
                    assert_eq!(expected.len(), view.count(target));
                    for util in paths() {
                        let got = to_indexes(util, target, &bits, offset, len);
                        assert_eq!(got, expected, "len {len} offset {offset} density {density}");
                    }
                }
            }
        }
    }
}

#[test]
fn base_index_shifts_every_index() {
    let mut rng = seeded_rng(11);
    let bits = random_bitmap(&mut rng, 1024, 0.3);
    for util in paths() {
        let mut out = vec![0u16; 1024];
        let n = util.bits_to_indexes(true, BitView::from_bytes(&bits, 1024), 1024, &mut out);
        assert_eq!(&out[..n], reference_indexes(true, &bits, 0, 1024, 1024).as_slice());
    }
}

#[test]
fn filter_identity_list_equals_to_indexes() {
    let mut rng = seeded_rng(21);
    for len in interesting_lengths() {
        let bits = random_bitmap(&mut rng, len, 0.4);
        let identity: Vec<u16> = (0..len as u16).collect();
        for util in paths() {
            for target in [false, true] {
                let mut out = vec![0u16; len];
                let n = util.bits_filter_indexes(
                    target,
                    BitView::from_bytes(&bits, len),
                    &identity,
                    &mut out,
                );
                assert_eq!(&out[..n], to_indexes(util, target, &bits, 0, len).as_slice());
            }
        }
    }
}

#[test]
fn filter_arbitrary_lists_in_and_out_of_place() {
    let mut rng = seeded_rng(31);
    for len in interesting_lengths() {
        for offset in OFFSETS {
            let bits = random_bitmap(&mut rng, offset + len, 0.6);
            let mut input: Vec<u16> = (0..len as u16).map(|i| i * 3 % 1024).collect();
            input.sort_unstable();
            let expected = reference_filter(true, &bits, offset, &input);
            for util in paths() {
                let view = BitView::new(&bits, offset, len);
                let mut out = vec![0u16; len];
                let n = util.bits_filter_indexes(true, view, &input, &mut out);
                assert_eq!(&out[..n], expected.as_slice());
                assert!(n <= len);

                let mut in_place = input.clone();
                let n = util.bits_filter_indexes_in_place(true, view, &mut in_place);
                assert_eq!(&in_place[..n], expected.as_slice());
            }
        }
    }
}

#[test]
fn split_is_disjoint_ascending_and_complete() {
    let mut rng = seeded_rng(41);
    for len in interesting_lengths() {
        for offset in OFFSETS {
            let bits = random_bitmap(&mut rng, offset + len, 0.5);
            for util in paths() {
                let mut zeros = vec![0u16; len];
                let mut ones = vec![0u16; len];
                let n0 = util.bits_split_indexes(BitView::new(&bits, offset, len), &mut zeros, &mut ones);
                let zeros = &zeros[..n0];
                let ones = &ones[..len - n0];
                assert_eq!(zeros, reference_indexes(false, &bits, offset, len, 0).as_slice());
                assert_eq!(ones, reference_indexes(true, &bits, offset, len, 0).as_slice());
                assert!(zeros.windows(2).all(|w| w[0] < w[1]));
                assert!(ones.windows(2).all(|w| w[0] < w[1]));
                let mut all: Vec<u16> = zeros.iter().chain(ones).copied().collect();
                all.sort_unstable();
                assert_eq!(all, (0..len as u16).collect::<Vec<_>>());
            }
        }
    }
}

#[test]
fn bits_to_bytes_matches_reference() {
    let mut rng = seeded_rng(51);
    for len in interesting_lengths() {
        for offset in OFFSETS {
            let bits = random_bitmap(&mut rng, offset + len, 0.5);
            let expected = reference_bytes(&bits, offset, len);
            for util in paths() {
                let mut bytes = vec![0x5Au8; len + 1];
                util.bits_to_bytes(BitView::new(&bits, offset, len), &mut bytes);
                assert_eq!(&bytes[..len], expected.as_slice(), "len {len} offset {offset}");
                assert_eq!(bytes[len], 0x5A, "wrote past len {len}");
            }
        }
    }
}

#[test]
fn bytes_to_bits_matches_reference() {
    let mut rng = seeded_rng(61);
    for len in interesting_lengths() {
        for offset in OFFSETS {
            let bytes = random_bytes(&mut rng, len);
            let existing = random_bitmap(&mut rng, offset + len + 8, 0.5);
            let expected = reference_pack(&bytes, &existing, offset);
            for util in paths() {
                let mut bits = existing.clone();
                util.bytes_to_bits(&bytes, BitViewMut::new(&mut bits, offset, len));
                assert_eq!(bits, expected, "len {len} offset {offset}");
            }
        }
    }
}

#[test]
fn round_trip_through_bytes() {
    let mut rng = seeded_rng(71);
    for len in interesting_lengths() {
        let bits = random_bitmap(&mut rng, len, 0.5);
        for util in paths() {
            let mut bytes = vec![0u8; len];
            util.bits_to_bytes(BitView::from_bytes(&bits, len), &mut bytes);
            let mut back = vec![0u8; len.div_ceil(8)];
            util.bytes_to_bits(&bytes, BitViewMut::from_bytes(&mut back, len));
            assert_eq!(
                reference_indexes(true, &back, 0, len, 0),
                reference_indexes(true, &bits, 0, len, 0)
            );
        }
    }
}

#[test]
fn all_bytes_zero_single_byte_anywhere() {
    for util in paths() {
        let mut bytes = vec![0u8; 1000];
        assert!(util.are_all_bytes_zero(&bytes));
        for pos in 0..bytes.len() {
            bytes[pos] = 0x01;
            assert!(!util.are_all_bytes_zero(&bytes), "missed byte {pos}");
            bytes[pos] = 0;
        }
    }
}

proptest! {
    #[test]
    fn paths_agree_on_random_bitmaps(
        bytes in proptest::collection::vec(any::<u8>(), 0..130),
        offset in 0usize..16,
        target in any::<bool>(),
    ) {
        let total = bytes.len() * 8;
        prop_assume!(offset <= total);
        let len = (total - offset).min(1024);
        let [scalar, detected] = paths();
        let view = BitView::new(&bytes, offset, len);

        let mut a = vec![0u16; len];
        let mut b = vec![0u16; len];
        let na = scalar.bits_to_indexes(target, view, 0, &mut a);
        let nb = detected.bits_to_indexes(target, view, 0, &mut b);
        prop_assert_eq!(&a[..na], &b[..nb]);
        prop_assert_eq!(na, view.count(target));

        let mut ba = vec![0u8; len];
        let mut bb = vec![0u8; len];
        scalar.bits_to_bytes(view, &mut ba);
        detected.bits_to_bytes(view, &mut bb);
        prop_assert_eq!(ba, bb);

        prop_assert_eq!(
            scalar.are_all_bytes_zero(&bytes),
            detected.are_all_bytes_zero(&bytes)
        );
    }
}
