//! Bounds-carrying bitmap views.
//!
//! A view pairs a byte slice with a bit range inside it. The constructors
//! check that the bytes actually cover the range, so the transforms never
//! need to trust a caller-supplied length.

/// Read-only range of bits inside a byte slice.
#[derive(Clone, Copy, Debug)]
pub struct BitView<'a> {
    bits: &'a [u8],
    offset: usize,
    len: usize,
}

/// Writable range of bits inside a byte slice.
#[derive(Debug)]
pub struct BitViewMut<'a> {
    bits: &'a mut [u8],
    offset: usize,
    len: usize,
}

/// First, partial byte of a view whose offset is not byte-aligned.
///
/// `byte` is already shifted down so that the view's first bit is bit 0.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Head {
    pub(crate) byte: u8,
    pub(crate) len: usize,
}

/// Writable counterpart of [`Head`].
pub(crate) struct HeadMut<'a> {
    pub(crate) byte: &'a mut u8,
    pub(crate) shift: usize,
    pub(crate) len: usize,
}

fn check_covers(bytes: usize, offset: usize, len: usize) {
    let end = offset.checked_add(len);
    assert!(
        end.is_some_and(|end| end.div_ceil(8) <= bytes),
        "bitmap of {bytes} bytes cannot hold bits {offset}..{offset}+{len}"
    );
}

impl<'a> BitView<'a> {
    /// View `len` bits starting at bit `offset` of `bits`.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is shorter than `ceil((offset + len) / 8)` bytes.
    pub fn new(bits: &'a [u8], offset: usize, len: usize) -> Self {
        check_covers(bits.len(), offset, len);
        Self { bits, offset, len }
    }

    /// View the first `len` bits of `bits`.
    pub fn from_bytes(bits: &'a [u8], len: usize) -> Self {
        Self::new(bits, 0, len)
    }

    /// Number of bits in the view.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view covers no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit offset of the view within its byte slice.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The underlying bytes.
    pub fn bytes(&self) -> &'a [u8] {
        self.bits
    }

    /// Value of the view's `i`-th bit.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "bit {i} out of range for view of {} bits", self.len);
        let bit = self.offset + i;
        (self.bits[bit / 8] >> (bit % 8)) & 1 == 1
    }

    /// Number of bits in the view equal to `target`.
    pub fn count(&self, target: bool) -> usize {
        (0..self.len).filter(|&i| self.get(i) == target).count()
    }

    /// Split into an unaligned head byte (if any), the byte-aligned
    /// remainder, and the number of bits in that remainder.
    pub(crate) fn split_head(&self) -> (Option<Head>, &'a [u8], usize) {
        let start = self.offset / 8;
        let shift = self.offset % 8;
        if shift == 0 || self.len == 0 {
            return (None, &self.bits[start..], self.len);
        }
        let head_len = self.len.min(8 - shift);
        let head = Head {
            byte: self.bits[start] >> shift,
            len: head_len,
        };
        (Some(head), &self.bits[start + 1..], self.len - head_len)
    }
}

impl<'a> BitViewMut<'a> {
    /// Writable view of `len` bits starting at bit `offset` of `bits`.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is shorter than `ceil((offset + len) / 8)` bytes.
    pub fn new(bits: &'a mut [u8], offset: usize, len: usize) -> Self {
        check_covers(bits.len(), offset, len);
        Self { bits, offset, len }
    }

    /// Writable view of the first `len` bits of `bits`.
    pub fn from_bytes(bits: &'a mut [u8], len: usize) -> Self {
        Self::new(bits, 0, len)
    }

    /// Number of bits in the view.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view covers no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit offset of the view within its byte slice.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Read-only view over the same range.
    pub fn as_view(&self) -> BitView<'_> {
        BitView {
            bits: self.bits,
            offset: self.offset,
            len: self.len,
        }
    }

    pub(crate) fn split_head_mut(&mut self) -> (Option<HeadMut<'_>>, &mut [u8], usize) {
        let start = self.offset / 8;
        let shift = self.offset % 8;
        let len = self.len;
        let bytes = &mut self.bits[start..];
        if shift == 0 || len == 0 {
            return (None, bytes, len);
        }
        let head_len = len.min(8 - shift);
        let (first, rest) = bytes.split_at_mut(1);
        let head = HeadMut {
            byte: &mut first[0],
            shift,
            len: head_len,
        };
        (Some(head), rest, len - head_len)
    }
}
