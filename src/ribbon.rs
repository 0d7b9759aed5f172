//! Bumped Ribbon Retrieval's core linear-algebra layer (§4.F): a banded
//! GF(2) XOR system, solved by staircase elimination as rows are inserted
//! and a single back-substitution pass once insertion finishes.
//!
//! Each row ties a `result_width`-bit value to a contiguous `r`-bit window
//! of table columns starting at `start`: `XOR_{i : coeffs bit i set}
//! table[start + i] == value`. [`bumped_ribbon`](crate::bumped_ribbon)
//! layers this with bumping to get a retrieval structure that never fails.

use thiserror::Error;

use crate::bits::mask64;
use crate::bitset::BitSet;
use crate::wire::{Reader, WireResult, Writer};

#[derive(Debug, Error)]
pub enum RibbonError {
    #[error("ribbon system is inconsistent: a row reduced to zero coefficients with a nonzero value")]
    Inconsistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// The row became the pivot for this column.
    Success(usize),
    /// The row reduced to all-zero coefficients and a zero value — already
    /// implied by earlier rows, nothing to store.
    Redundant,
    /// The row reduced to all-zero coefficients but a nonzero value — the
    /// system has no solution with the rows inserted so far.
    Failure,
}

/// A banded XOR system under construction. `m` columns, rows each spanning
/// `r` contiguous columns.
#[derive(Debug, Clone)]
pub struct RibbonBandingSystem {
    m: usize,
    r: u32,
    result_width: u32,
    pivot_used: BitSet,
    pivot_coeffs: Vec<u64>,
    pivot_value: Vec<u64>,
}

impl RibbonBandingSystem {
    pub fn new(m: usize, r: u32, result_width: u32) -> Self {
        assert!(r > 0 && r <= 64, "ribbon band width must be in 1..=64");
        Self {
            m,
            r,
            result_width,
            pivot_used: BitSet::new(m),
            pivot_coeffs: vec![0u64; m],
            pivot_value: vec![0u64; m],
        }
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.m
    }

    /// Inserts one row: `coeffs`'s low `r` bits are the band starting at
    /// column `start` (`start + r <= m`), and `value` is the desired XOR
    /// result (low `result_width` bits significant).
    pub fn insert(&mut self, mut start: usize, mut coeffs: u64, mut value: u64) -> InsertResult {
        debug_assert!(start + self.r as usize <= self.m);
        coeffs &= mask64(self.r);
        loop {
            if coeffs == 0 {
                return if value == 0 {
                    InsertResult::Redundant
                } else {
                    InsertResult::Failure
                };
            }
            let tz = coeffs.trailing_zeros();
            let col = start + tz as usize;
            coeffs >>= tz;
            start = col;

            if !self.pivot_used.test(col) {
                self.pivot_coeffs[col] = coeffs;
                self.pivot_value[col] = value;
                self.pivot_used.set(col);
                return InsertResult::Success(col);
            }
            coeffs ^= self.pivot_coeffs[col];
            value ^= self.pivot_value[col];
        }
    }

    /// [`Self::insert`], but turns [`InsertResult::Failure`] into
    /// [`RibbonError::Inconsistent`] for callers that have no bumping
    /// strategy to fall back on (a plain, non-bumped ribbon build).
    pub fn insert_checked(&mut self, start: usize, coeffs: u64, value: u64) -> Result<InsertResult, RibbonError> {
        match self.insert(start, coeffs, value) {
            InsertResult::Failure => Err(RibbonError::Inconsistent),
            ok => Ok(ok),
        }
    }

    /// Zeros the pivot row at `col`, undoing a prior `Success(col)` insertion.
    /// BuRR uses this to speculatively insert a bucket's rows and then undo
    /// the ones that fall below its chosen bump threshold (§4.G).
    pub fn clear_row(&mut self, col: usize) {
        self.pivot_coeffs[col] = 0;
        self.pivot_value[col] = 0;
        self.pivot_used.clear(col);
    }

    /// Back-substitutes into a dense `m`-entry table, descending from the
    /// highest column. Columns with no pivot row are free variables, left
    /// at zero.
    pub fn solve(self) -> RibbonTable {
        let mut table = vec![0u64; self.m];
        for col in (0..self.m).rev() {
            if !self.pivot_used.test(col) {
                continue;
            }
            let mut v = self.pivot_value[col];
            let mut c = self.pivot_coeffs[col] >> 1;
            let mut i = 1usize;
            while c != 0 {
                if c & 1 != 0 {
                    v ^= table[col + i];
                }
                c >>= 1;
                i += 1;
            }
            table[col] = v;
        }
        RibbonTable {
            r: self.r,
            result_width: self.result_width,
            table,
        }
    }
}

/// The solved static function: `query(start, coeffs)` reconstructs the
/// value tied to a row's band without needing the original rows.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RibbonTable {
    r: u32,
    result_width: u32,
    table: Vec<u64>,
}

impl RibbonTable {
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    #[inline]
    pub fn result_width(&self) -> u32 {
        self.result_width
    }

    #[inline]
    pub fn band_width(&self) -> u32 {
        self.r
    }

    #[inline]
    pub fn query(&self, start: usize, coeffs: u64) -> u64 {
        let mut v = 0u64;
        let mut c = coeffs & mask64(self.r);
        let mut i = 0usize;
        while c != 0 {
            if c & 1 != 0 {
                v ^= self.table[start + i];
            }
            c >>= 1;
            i += 1;
        }
        v & mask64(self.result_width.max(1))
    }

    /// §6 wire format: band width, result width, then the table as a plain
    /// length-prefixed `u64` slice (one entry per column; values already
    /// fit in `result_width` bits, so no further packing is attempted here
    /// — a caller optimizing for space can always re-pack the returned
    /// table through [`PackedArray::encode`]).
    pub fn write_to(&self, w: &mut Writer) {
        w.write_u64(self.r as u64);
        w.write_u64(self.result_width as u64);
        w.write_u64_slice(&self.table);
    }

    pub fn read_from(r: &mut Reader) -> WireResult<Self> {
        let band_width = r.read_u64()? as u32;
        let result_width = r.read_u64()? as u32;
        let table = r.read_u64_slice()?;
        Ok(Self {
            r: band_width,
            result_width,
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_a_small_consistent_system() {
        let mut sys = RibbonBandingSystem::new(16, 4, 3);
        assert!(matches!(sys.insert(0, 0b1011, 5), InsertResult::Success(_)));
        assert!(matches!(sys.insert(2, 0b0110, 2), InsertResult::Success(_)));
        assert!(matches!(sys.insert(5, 0b1001, 7), InsertResult::Success(_)));
        let table = sys.solve();
        assert_eq!(table.query(0, 0b1011), 5);
        assert_eq!(table.query(2, 0b0110), 2);
        assert_eq!(table.query(5, 0b1001), 7);
    }

    #[test]
    fn detects_inconsistency() {
        let mut sys = RibbonBandingSystem::new(8, 2, 1);
        assert!(matches!(sys.insert(0, 0b11, 1), InsertResult::Success(_)));
        assert!(matches!(sys.insert(0, 0b11, 1), InsertResult::Redundant));
        assert!(matches!(sys.insert(0, 0b11, 0), InsertResult::Failure));
    }

    #[test]
    fn redundant_row_does_not_disturb_solution() {
        let mut sys = RibbonBandingSystem::new(8, 2, 1);
        sys.insert(0, 0b11, 1);
        sys.insert(0, 0b11, 1);
        let table = sys.solve();
        assert_eq!(table.query(0, 0b11), 1);
    }

    #[test]
    fn insert_checked_surfaces_ribbon_error() {
        let mut sys = RibbonBandingSystem::new(8, 2, 1);
        sys.insert_checked(0, 0b11, 1).unwrap();
        assert!(matches!(sys.insert_checked(0, 0b11, 0), Err(RibbonError::Inconsistent)));
    }

    #[test]
    fn clear_row_undoes_a_speculative_insertion() {
        let mut sys = RibbonBandingSystem::new(8, 2, 1);
        let col = match sys.insert(4, 0b11, 1) {
            InsertResult::Success(col) => col,
            other => panic!("expected Success, got {other:?}"),
        };
        sys.clear_row(col);
        // The column is free again: a different row can claim it outright.
        assert!(matches!(sys.insert(4, 0b11, 0), InsertResult::Success(_)));
        let table = sys.solve();
        assert_eq!(table.query(4, 0b11), 0);
    }
}
