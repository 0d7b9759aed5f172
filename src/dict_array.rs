//! Dictionary-encoded `u64` sequence (§4.B): deduplicates a sequence into a
//! small `dict` PackedArray plus a PackedArray of indices into it. Chosen
//! over a plain [`crate::packed_array::PackedArray`] when values repeat
//! heavily — notably MPHF pivots at large α (§9 "Optional pivot encoding").

use std::collections::HashMap;

use crate::packed_array::PackedArray;
use crate::wire::{Reader, WireResult, Writer};

/// Invariant: every `arr[i] < dict.len()`; `dict` holds each distinct value
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DictArray {
    dict: PackedArray,
    arr: PackedArray,
}

impl DictArray {
    /// Linear pass with a transient dedup map (§4.B), finalized into two
    /// packed arrays.
    pub fn encode(values: &[u64]) -> Self {
        let mut map: HashMap<u64, u64> = HashMap::new();
        let mut dict_values: Vec<u64> = Vec::new();
        let mut indices: Vec<u64> = Vec::with_capacity(values.len());
        for &v in values {
            let idx = *map.entry(v).or_insert_with(|| {
                let idx = dict_values.len() as u64;
                dict_values.push(v);
                idx
            });
            indices.push(idx);
        }
        Self {
            dict: PackedArray::encode(&dict_values),
            arr: PackedArray::encode(&indices),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.arr.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arr.is_empty()
    }

    #[inline]
    pub fn dict_len(&self) -> usize {
        self.dict.len()
    }

    /// `get(i) = dict.get(arr.get(i))`.
    #[inline]
    pub fn get(&self, i: usize) -> u64 {
        self.dict.get(self.arr.get(i) as usize)
    }

    pub fn write_to(&self, w: &mut Writer) {
        self.dict.write_to(w);
        self.arr.write_to(w);
    }

    pub fn read_from(r: &mut Reader, dict_len: usize, n: usize) -> WireResult<Self> {
        let dict = PackedArray::read_from(r, dict_len)?;
        let arr = PackedArray::read_from(r, n)?;
        Ok(Self { dict, arr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_repeated_values() {
        let values = [7u64, 7, 3, 7, 9, 3, 0];
        let d = DictArray::encode(&values);
        assert_eq!(d.len(), values.len());
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(d.get(i), v);
        }
    }

    #[test]
    fn empty_input() {
        let d = DictArray::encode(&[]);
        assert_eq!(d.len(), 0);
    }

    #[test]
    fn wire_round_trip() {
        let values = [1u64, 1, 2, 3, 1, 2];
        let d = DictArray::encode(&values);
        let mut w = Writer::new();
        d.write_to(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let dict_len = {
            // dict width-from-max(1,2,3)=2 bits; count of distinct values.
            let distinct: std::collections::HashSet<u64> = values.iter().copied().collect();
            distinct.len()
        };
        let back = DictArray::read_from(&mut r, dict_len, values.len()).unwrap();
        assert_eq!(back, d);
    }
}
