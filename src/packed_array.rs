//! Width-parameterized packed array (§4.A): fixed-width integers packed
//! tightely into a backing `Vec<u64>`, with straddling-word reads/writes.

use crate::bits::mask64;
use crate::wire::{Reader, WireResult, Writer};

/// `width ∈ [0, 64]` integers packed into a 64-bit-word backing store.
///
/// Invariant: `data.len() == ceil(width * n / 64)`. `width == 0` is a
/// permitted sentinel (every `get` returns `0`); an empty input encodes as
/// `width = 1, n = 0` (§4.A edge-case policy).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackedArray {
    data: Vec<u64>,
    width: u32,
    n: usize,
}

impl PackedArray {
    /// Allocates a zero-initialized backing store sized for `n` elements of
    /// `width` bits each.
    pub fn new_zeroed(width: u32, n: usize) -> Self {
        assert!(width <= 64, "PackedArray width must be <= 64");
        let words = ((width as usize) * n + 63) / 64;
        Self {
            data: vec![0u64; words],
            width,
            n,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn data(&self) -> &[u64] {
        &self.data
    }

    /// `get(i)`: the low-`width` bits of a straddling read at bit offset
    /// `i * width`.
    #[inline]
    pub fn get(&self, i: usize) -> u64 {
        debug_assert!(i < self.n);
        if self.width == 0 {
            return 0;
        }
        let p = i * self.width as usize;
        let block = p >> 6;
        let shift = (p & 63) as u32;
        let m = mask64(self.width);
        if shift + self.width <= 64 {
            (self.data[block] >> shift) & m
        } else {
            (self.data[block] >> shift) | ((self.data[block + 1] << (64 - shift)) & m)
        }
    }

    /// Precondition: the target bits are currently zero. ORs `v`'s low
    /// `width` bits into place (§4.A).
    #[inline]
    pub fn set_from_zero(&mut self, i: usize, v: u64) {
        debug_assert!(i < self.n);
        if self.width == 0 {
            return;
        }
        let m = mask64(self.width);
        debug_assert_eq!(v & !m, 0, "value does not fit in `width` bits");
        let p = i * self.width as usize;
        let block = p >> 6;
        let shift = (p & 63) as u32;
        self.data[block] |= (v & m) << shift;
        if shift + self.width > 64 {
            self.data[block + 1] |= (v & m) >> (64 - shift);
        }
    }

    /// Clears the `width` bits at position `i`, leaving neighbouring bits
    /// (including padding within the same words) untouched.
    #[inline]
    pub fn set_to_zero(&mut self, i: usize) {
        debug_assert!(i < self.n);
        if self.width == 0 {
            return;
        }
        let m = mask64(self.width);
        let p = i * self.width as usize;
        let block = p >> 6;
        let shift = (p & 63) as u32;
        self.data[block] &= !(m << shift);
        if shift + self.width > 64 {
            self.data[block + 1] &= !(m >> (64 - shift));
        }
    }

    /// Overwrites slot `i` unconditionally (zero-then-rewrite).
    #[inline]
    pub fn set(&mut self, i: usize, v: u64) {
        self.set_to_zero(i);
        self.set_from_zero(i, v);
    }

    /// Encodes `values` at the minimal width needed to hold the largest
    /// element (`width = floor(log2(max)) + 1`, `1` for an all-zero or
    /// empty input).
    pub fn encode(values: &[u64]) -> Self {
        if values.is_empty() {
            return Self {
                data: Vec::new(),
                width: 1,
                n: 0,
            };
        }
        let max = values.iter().copied().max().unwrap_or(0);
        let width = crate::bits::log2_ceil_width(max);
        let mut arr = Self::new_zeroed(width, values.len());
        for (i, &v) in values.iter().enumerate() {
            arr.set_from_zero(i, v);
        }
        arr
    }

    /// §6 wire format: `u64 width`, then `slice(u64) data` (length-prefixed,
    /// 8-byte aligned). `n` is not stored directly — callers that need it
    /// standalone wrap it in their own struct (e.g. `RibbonTable`); embedding
    /// containers reconstruct `n` from their own fields, per §6's struct
    /// table.
    pub fn write_to(&self, w: &mut Writer) {
        w.write_u64(self.width as u64);
        w.write_u64_slice(&self.data);
    }

    /// Reads a `PackedArray` back, given the logical element count `n`
    /// (supplied by the embedding structure, since the wire format does not
    /// repeat it — see [`PackedArray::write_to`]).
    pub fn read_from(r: &mut Reader, n: usize) -> WireResult<Self> {
        let width = r.read_u64()? as u32;
        let data = r.read_u64_slice()?;
        Ok(Self { data, width, n })
    }

    /// Zero-copy variant of [`PackedArray::read_from`]: aliases the input
    /// buffer instead of copying `data`. See [`Reader::read_u64_slice_borrowed`]
    /// for the alignment precondition.
    pub fn read_from_borrowed<'a>(r: &mut Reader<'a>, n: usize) -> WireResult<PackedArrayView<'a>> {
        let width = r.read_u64()? as u32;
        let data = r.read_u64_slice_borrowed()?;
        Ok(PackedArrayView { data, width, n })
    }
}

/// A borrowed, read-only view into an externally-owned byte buffer,
/// produced by [`PackedArray::read_from_borrowed`]. Lifetime is bounded by
/// the buffer it aliases (§5: "an aliasing container must not outlive the
/// buffer").
#[derive(Debug, Clone, Copy)]
pub struct PackedArrayView<'a> {
    data: &'a [u64],
    width: u32,
    n: usize,
}

impl<'a> PackedArrayView<'a> {
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, i: usize) -> u64 {
        debug_assert!(i < self.n);
        if self.width == 0 {
            return 0;
        }
        let p = i * self.width as usize;
        let block = p >> 6;
        let shift = (p & 63) as u32;
        let m = mask64(self.width);
        if shift + self.width <= 64 {
            (self.data[block] >> shift) & m
        } else {
            (self.data[block] >> shift) | ((self.data[block + 1] << (64 - shift)) & m)
        }
    }

    /// Copies this view into an owned `PackedArray`.
    pub fn to_owned(&self) -> PackedArray {
        PackedArray {
            data: self.data.to_vec(),
            width: self.width,
            n: self.n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_encode_is_width_one_n_zero() {
        let arr = PackedArray::encode(&[]);
        assert_eq!(arr.width(), 1);
        assert_eq!(arr.len(), 0);
        assert!(arr.data().is_empty());
    }

    #[test]
    fn mixed_widths_round_trip() {
        let values = [5u64, 2, 9, 100, 0, 5, 10, 90, 9, 1, 65, 10];
        let arr = PackedArray::encode(&values);
        assert_eq!(arr.width(), 7);
        assert_eq!(arr.data().len(), 2);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(arr.get(i), v);
        }
    }

    #[test]
    fn width_64_crosses_no_second_word() {
        let mut arr = PackedArray::new_zeroed(64, 3);
        arr.set_from_zero(0, u64::MAX);
        arr.set_from_zero(1, 0x1234_5678_9abc_def0);
        arr.set_from_zero(2, 42);
        assert_eq!(arr.get(0), u64::MAX);
        assert_eq!(arr.get(1), 0x1234_5678_9abc_def0);
        assert_eq!(arr.get(2), 42);
        assert_eq!(arr.data().len(), 3);
    }

    #[test]
    fn set_to_zero_preserves_neighbours() {
        let values = [3u64, 5, 7, 1];
        let mut arr = PackedArray::encode(&values);
        arr.set_to_zero(1);
        assert_eq!(arr.get(0), 3);
        assert_eq!(arr.get(1), 0);
        assert_eq!(arr.get(2), 7);
        assert_eq!(arr.get(3), 1);
        arr.set_from_zero(1, 6);
        assert_eq!(arr.get(1), 6);
    }

    #[test]
    fn wire_round_trip() {
        let values = [5u64, 2, 9, 100, 0, 5, 10, 90, 9, 1, 65, 10];
        let arr = PackedArray::encode(&values);
        let mut w = Writer::new();
        arr.write_to(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len() % 8, 0);
        let mut r = Reader::new(&bytes);
        let back = PackedArray::read_from(&mut r, arr.len()).unwrap();
        assert_eq!(back, arr);
    }
}
