//! Low-level primitives for arena memory operations.
//!
//! This is the only module in the crate allowed to use `unsafe`. It owns a
//! word-aligned heap region through a raw pointer so that the arena can hand
//! out disjoint mutable payload slices while it is itself shared-borrowed.

#![allow(unsafe_code)]

use std::ptr::{self, NonNull};

/// An owned, 8-byte aligned heap region addressed by byte offset.
pub(crate) struct RawRegion {
    ptr: NonNull<u64>,
    words: usize,
}

// SAFETY: `RawRegion` uniquely owns its allocation, like a `Box<[u64]>`.
unsafe impl Send for RawRegion {}

impl RawRegion {
    /// Allocate at least `num_bytes` bytes, rounded up to whole words.
    ///
    /// Returns `None` if the allocator refuses the request.
    pub(crate) fn try_new(num_bytes: usize) -> Option<Self> {
        let words = num_bytes.div_ceil(8);
        let mut storage: Vec<u64> = Vec::new();
        storage.try_reserve_exact(words).ok()?;
        storage.resize(words, 0);
        let boxed = storage.into_boxed_slice();
        let words = boxed.len();
        let ptr = NonNull::from(Box::leak(boxed)).cast::<u64>();
        Some(Self { ptr, words })
    }

    /// Size of the region in bytes.
    pub(crate) fn len_bytes(&self) -> usize {
        self.words * 8
    }

    /// Overwrite every byte of the region with `byte`.
    pub(crate) fn fill(&mut self, byte: u8) {
        // SAFETY: the region spans exactly `len_bytes()` writable bytes, and
        // `&mut self` rules out outstanding payload slices.
        unsafe { ptr::write_bytes(self.ptr.as_ptr().cast::<u8>(), byte, self.len_bytes()) }
    }

    /// Store a native-endian word at a word-aligned byte offset.
    pub(crate) fn write_word(&self, offset: usize, value: u64) {
        let index = self.word_index(offset);
        // SAFETY: `word_index` checked alignment and bounds. Guard words are
        // never covered by a payload slice.
        unsafe { self.ptr.as_ptr().add(index).write(value) }
    }

    /// Load a native-endian word from a word-aligned byte offset.
    pub(crate) fn read_word(&self, offset: usize) -> u64 {
        let index = self.word_index(offset);
        // SAFETY: as for `write_word`.
        unsafe { self.ptr.as_ptr().add(index).read() }
    }

    /// Borrow `len` bytes starting at `offset` mutably.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that no other live reference overlaps
    /// `offset..offset + len` for the whole of `'a`, and that the region
    /// outlives `'a`.
    pub(crate) unsafe fn bytes_mut<'a>(&self, offset: usize, len: usize) -> &'a mut [u8] {
        assert!(
            offset.checked_add(len).is_some_and(|end| end <= self.len_bytes()),
            "byte range {offset}+{len} outside region of {} bytes",
            self.len_bytes()
        );
        // SAFETY: in bounds (checked above); exclusivity is the caller's
        // obligation.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<u8>().add(offset), len) }
    }

    /// Overwrite a single byte. Used by tests to simulate stray writes.
    #[cfg(test)]
    pub(crate) fn write_byte(&self, offset: usize, value: u8) {
        assert!(offset < self.len_bytes());
        // SAFETY: in bounds; tests only target guard bytes.
        unsafe { self.ptr.as_ptr().cast::<u8>().add(offset).write(value) }
    }

    fn word_index(&self, offset: usize) -> usize {
        assert!(offset % 8 == 0, "unaligned word offset {offset}");
        let index = offset / 8;
        assert!(index < self.words, "word offset {offset} outside region");
        index
    }
}

impl Drop for RawRegion {
    fn drop(&mut self) {
        let slice = ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.words);
        // SAFETY: `ptr`/`words` came from `Box::leak` in `try_new` and are
        // released exactly once here.
        drop(unsafe { Box::from_raw(slice) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_whole_words() {
        let region = RawRegion::try_new(13).unwrap();
        assert_eq!(region.len_bytes(), 16);
    }

    #[test]
    fn empty_region_is_valid() {
        let region = RawRegion::try_new(0).unwrap();
        assert_eq!(region.len_bytes(), 0);
    }

    #[test]
    fn fill_then_read_words() {
        let mut region = RawRegion::try_new(32).unwrap();
        region.fill(0xFF);
        assert_eq!(region.read_word(24), u64::MAX);
        region.write_word(8, 0x1234);
        assert_eq!(region.read_word(8), 0x1234);
        assert_eq!(region.read_word(0), u64::MAX);
    }

    #[test]
    fn byte_slices_see_word_writes() {
        let region = RawRegion::try_new(16).unwrap();
        region.write_word(8, u64::from_ne_bytes([1, 2, 3, 4, 5, 6, 7, 8]));
        let bytes = unsafe { region.bytes_mut(8, 8) };
        assert_eq!(bytes, &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn oversized_request_fails() {
        assert!(RawRegion::try_new(usize::MAX).is_none());
    }

    #[test]
    #[should_panic(expected = "unaligned word offset")]
    fn unaligned_word_access_panics() {
        let region = RawRegion::try_new(16).unwrap();
        region.read_word(3);
    }

    #[test]
    #[should_panic(expected = "outside region")]
    fn out_of_bounds_slice_panics() {
        let region = RawRegion::try_new(16).unwrap();
        let _ = unsafe { region.bytes_mut(8, 9) };
    }
}
