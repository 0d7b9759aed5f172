//! Constant-time `select` over a dense bitset (§4.C), the "darray".
//!
//! A block inventory samples every 1024th matching bit; a subblock
//! inventory samples every 32nd; blocks whose span exceeds 2^16 fall back
//! to storing every absolute position verbatim (`overflow_positions`).
//! [`EliasFano`](crate::elias_fano::EliasFano) uses a `DArray` in `Set`
//! polarity to reconstruct high bits from their unary encoding.

use crate::bits::{mask64, popcount64, select_in_word};
use crate::wire::{Reader, WireResult, Writer};

const BLOCK_SIZE: usize = 1024;
const SUBBLOCK_SIZE: usize = 32;
const MAX_IN_BLOCK_DISTANCE: u64 = 1 << 16;
const OVERFLOW_FLAG: u64 = 1 << 63;
const POS_MASK: u64 = OVERFLOW_FLAG - 1;

/// Which value `DArray` indexes: the set (`1`) bits or the unset (`0`) bits
/// of the same underlying bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Set,
    Unset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DArray {
    polarity_is_set: bool,
    block_inventory: Vec<u64>,
    subblock_inventory: Vec<u16>,
    overflow_positions: Vec<u64>,
}

impl DArray {
    /// Builds a select index over `words` (a little-endian-within-word
    /// bitset of exactly `bit_len` logical bits; `words.len() ==
    /// ceil(bit_len / 64)`), indexing the bits matching `polarity`.
    pub fn build(words: &[u64], bit_len: usize, polarity: Polarity) -> Self {
        let polarity_is_set = polarity == Polarity::Set;
        let mut block_inventory = Vec::new();
        let mut subblock_inventory = Vec::new();
        let mut overflow_positions = Vec::new();

        let mut scratch: Vec<u64> = Vec::with_capacity(BLOCK_SIZE);
        for pos in 0..bit_len {
            let word = words[pos / 64];
            let bit = (word >> (pos % 64)) & 1;
            let matching = if polarity_is_set { bit == 1 } else { bit == 0 };
            if matching {
                scratch.push(pos as u64);
                if scratch.len() == BLOCK_SIZE {
                    flush_block(&scratch, &mut block_inventory, &mut subblock_inventory, &mut overflow_positions);
                    scratch.clear();
                }
            }
        }
        if !scratch.is_empty() {
            flush_block(&scratch, &mut block_inventory, &mut subblock_inventory, &mut overflow_positions);
        }

        Self {
            polarity_is_set,
            block_inventory,
            subblock_inventory,
            overflow_positions,
        }
    }

    /// Position of the `i`-th (0-indexed) matching bit, scanning forward
    /// through `words` (the same bitset this index was built over).
    pub fn select(&self, words: &[u64], i: usize) -> u64 {
        let blk = i / BLOCK_SIZE;
        let entry = self.block_inventory[blk];
        let overflow = entry & OVERFLOW_FLAG != 0;
        let pos_field = entry & POS_MASK;

        if overflow {
            let local = (i % BLOCK_SIZE) as u64;
            return self.overflow_positions[(pos_field + local) as usize];
        }

        let start = pos_field + self.subblock_inventory[i / SUBBLOCK_SIZE] as u64;
        let rank_in_subblock = (i % SUBBLOCK_SIZE) as u32;
        if rank_in_subblock == 0 {
            return start;
        }
        self.scan_from(words, start, rank_in_subblock)
    }

    #[inline]
    fn word_for_polarity(&self, w: u64) -> u64 {
        if self.polarity_is_set {
            w
        } else {
            !w
        }
    }

    fn scan_from(&self, words: &[u64], start: u64, mut rank: u32) -> u64 {
        let mut word_idx = (start >> 6) as usize;
        let bit_off = (start & 63) as u32;
        let mut window = self.word_for_polarity(words[word_idx]) & !mask64(bit_off);
        loop {
            let ones = popcount64(window);
            if ones > rank {
                return (word_idx as u64) * 64 + select_in_word(window, rank) as u64;
            }
            rank -= ones;
            word_idx += 1;
            window = self.word_for_polarity(words[word_idx]);
        }
    }

    pub fn write_to(&self, w: &mut Writer) {
        w.write_u64_slice(&self.block_inventory);
        w.write_u16_slice(&self.subblock_inventory);
        w.write_u64_slice(&self.overflow_positions);
    }

    pub fn read_from(r: &mut Reader, polarity: Polarity) -> WireResult<Self> {
        let block_inventory = r.read_u64_slice()?;
        let subblock_inventory = r.read_u16_slice()?;
        let overflow_positions = r.read_u64_slice()?;
        Ok(Self {
            polarity_is_set: polarity == Polarity::Set,
            block_inventory,
            subblock_inventory,
            overflow_positions,
        })
    }
}

/// Flushes one block (up to 1024 ascending matching positions) into the
/// three inventories, choosing the overflow representation when the span
/// exceeds `MAX_IN_BLOCK_DISTANCE`.
fn flush_block(
    scratch: &[u64],
    block_inventory: &mut Vec<u64>,
    subblock_inventory: &mut Vec<u16>,
    overflow_positions: &mut Vec<u64>,
) {
    let first = scratch[0];
    let last = *scratch.last().unwrap();
    let overflow = last - first >= MAX_IN_BLOCK_DISTANCE;

    if overflow {
        let base = overflow_positions.len() as u64;
        block_inventory.push(OVERFLOW_FLAG | base);
        overflow_positions.extend_from_slice(scratch);
    } else {
        block_inventory.push(first & POS_MASK);
    }

    // One subblock delta per 32 matching bits, real when non-overflow,
    // a dummy placeholder (kept at 0) when overflow — this keeps the
    // global `i / 32` indexing used by `select` aligned across blocks.
    let subblocks = (scratch.len() + SUBBLOCK_SIZE - 1) / SUBBLOCK_SIZE;
    for s in 0..subblocks {
        if overflow {
            subblock_inventory.push(0);
        } else {
            let chunk_first = scratch[s * SUBBLOCK_SIZE];
            subblock_inventory.push((chunk_first - first) as u16);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn words_for(bit_len: usize, positions: &[u64]) -> Vec<u64> {
        let mut words = vec![0u64; (bit_len + 63) / 64];
        for &p in positions {
            words[(p / 64) as usize] |= 1u64 << (p % 64);
        }
        words
    }

    #[test]
    fn select_small_example() {
        let positions = [2u64, 7, 15, 25, 33, 47, 60, 61];
        let words = words_for(64, &positions);
        let da = DArray::build(&words, 64, Polarity::Set);
        for (i, &p) in positions.iter().enumerate() {
            assert_eq!(da.select(&words, i), p);
        }
    }

    #[test]
    fn select_dense_bitset_matches_brute_force_both_polarities() {
        let mut rng = StdRng::seed_from_u64(0x0194_f614_c152_27ba);
        let bit_len = 10_000usize;
        let mut ones = Vec::new();
        let mut zeros = Vec::new();
        let mut words = vec![0u64; (bit_len + 63) / 64];
        for i in 0..bit_len {
            if rng.gen_bool(0.5) {
                words[i / 64] |= 1u64 << (i % 64);
                ones.push(i as u64);
            } else {
                zeros.push(i as u64);
            }
        }

        let da1 = DArray::build(&words, bit_len, Polarity::Set);
        for (i, &p) in ones.iter().enumerate() {
            assert_eq!(da1.select(&words, i), p);
        }

        let da0 = DArray::build(&words, bit_len, Polarity::Unset);
        for (i, &p) in zeros.iter().enumerate() {
            assert_eq!(da0.select(&words, i), p);
        }
    }

    #[test]
    fn overflow_block_round_trips() {
        // Force a sparse block: only two matching bits, 2^17 apart.
        let bit_len = 1 << 18;
        let positions = [0u64, 1 << 17];
        let words = words_for(bit_len, &positions);
        let da = DArray::build(&words, bit_len, Polarity::Set);
        assert_eq!(da.select(&words, 0), 0);
        assert_eq!(da.select(&words, 1), 1 << 17);
    }

    #[test]
    fn wire_round_trip() {
        let positions = [2u64, 7, 15, 25, 33, 47, 60, 61];
        let words = words_for(64, &positions);
        let da = DArray::build(&words, 64, Polarity::Set);
        let mut w = Writer::new();
        da.write_to(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let back = DArray::read_from(&mut r, Polarity::Set).unwrap();
        assert_eq!(back, da);
    }
}
