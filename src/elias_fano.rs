//! Elias-Fano encoding of a monotone non-decreasing `u64` sequence (§4.D):
//! a unary "high bits" bitset (indexed by a [`DArray`] for constant-time
//! select) plus a [`PackedArray`] of low bits.

use crate::darray::{DArray, Polarity};
use crate::packed_array::PackedArray;
use crate::wire::{Reader, WireResult, Writer};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EliasFano {
    n: usize,
    universe: u64,
    low_width: u32,
    low_bits: PackedArray,
    high_bits: Vec<u64>,
    darray: DArray,
}

impl EliasFano {
    /// Encodes `values`, which must be sorted non-decreasing. `universe` is
    /// the exclusive upper bound (every value `< universe`).
    pub fn encode(values: &[u64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self {
                n: 0,
                universe: 0,
                low_width: 0,
                low_bits: PackedArray::new_zeroed(0, 0),
                high_bits: vec![0u64; 1],
                darray: DArray::build(&[0u64], 1, Polarity::Set),
            };
        }

        debug_assert!(
            values.windows(2).all(|w| w[0] <= w[1]),
            "EliasFano input must be sorted non-decreasing"
        );

        let max_value = values[n - 1];
        let universe = max_value + 1;
        let low_width = if max_value >= n as u64 {
            64 - (max_value / n as u64).leading_zeros()
        } else {
            0
        };

        let mut low_bits = PackedArray::new_zeroed(low_width, n);
        let low_mask = if low_width == 0 { 0 } else { crate::bits::mask64(low_width) };
        for (i, &v) in values.iter().enumerate() {
            low_bits.set_from_zero(i, v & low_mask);
        }

        let max_high = values[n - 1] >> low_width;
        let bit_len = n + max_high as usize + 1;
        let mut high_bits = vec![0u64; (bit_len + 63) / 64];
        for (i, &v) in values.iter().enumerate() {
            let high = v >> low_width;
            let pos = high as usize + i;
            high_bits[pos / 64] |= 1u64 << (pos % 64);
        }

        let darray = DArray::build(&high_bits, bit_len, Polarity::Set);

        Self {
            n,
            universe,
            low_width,
            low_bits,
            high_bits,
            darray,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn universe(&self) -> u64 {
        self.universe
    }

    /// `get(i) = ((select(i) - i) << low_width) | low_bits.get(i)`.
    #[inline]
    pub fn get(&self, i: usize) -> u64 {
        debug_assert!(i < self.n);
        let pos = self.darray.select(&self.high_bits, i);
        let high = pos - i as u64;
        (high << self.low_width) | self.low_bits.get(i)
    }

    pub fn write_to(&self, w: &mut Writer) {
        w.write_u64(self.n as u64);
        w.write_u64(self.universe);
        self.low_bits.write_to(w);
        w.write_u64_slice(&self.high_bits);
        self.darray.write_to(w);
    }

    pub fn read_from(r: &mut Reader) -> WireResult<Self> {
        let n = r.read_u64()? as usize;
        let universe = r.read_u64()?;
        let low_bits = PackedArray::read_from(r, n)?;
        let low_width = low_bits.width();
        let high_bits = r.read_u64_slice()?;
        let darray = DArray::read_from(r, Polarity::Set)?;
        Ok(Self {
            n,
            universe,
            low_width,
            low_bits,
            high_bits,
            darray,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotone_sequence_round_trips() {
        let values: Vec<u64> = (0..1000u64).map(|i| i * 97 % 100_000).scan(0u64, |acc, x| {
            *acc += x % 50;
            Some(*acc)
        }).collect();
        let ef = EliasFano::encode(&values);
        assert_eq!(ef.len(), values.len());
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(ef.get(i), v, "mismatch at {i}");
        }
    }

    #[test]
    fn single_element() {
        let ef = EliasFano::encode(&[42]);
        assert_eq!(ef.len(), 1);
        assert_eq!(ef.get(0), 42);
    }

    #[test]
    fn empty_sequence() {
        let ef = EliasFano::encode(&[]);
        assert_eq!(ef.len(), 0);
        assert!(ef.is_empty());
    }

    #[test]
    fn repeated_values() {
        let values = [3u64, 3, 3, 5, 5, 100];
        let ef = EliasFano::encode(&values);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(ef.get(i), v);
        }
    }

    #[test]
    fn large_monotone_sequence_of_100000() {
        let mut v = 0u64;
        let values: Vec<u64> = (0..100_000u64)
            .map(|i| {
                v += (i % 7) + 1;
                v
            })
            .collect();
        let ef = EliasFano::encode(&values);
        assert_eq!(ef.universe(), values[values.len() - 1] + 1);
        for (i, &expected) in values.iter().enumerate().step_by(997) {
            assert_eq!(ef.get(i), expected);
        }
    }

    #[test]
    fn wire_round_trip() {
        let values = [3u64, 3, 3, 5, 5, 100];
        let ef = EliasFano::encode(&values);
        let mut w = Writer::new();
        ef.write_to(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let back = EliasFano::read_from(&mut r).unwrap();
        assert_eq!(back, ef);
    }
}
