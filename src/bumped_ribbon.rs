//! Bumped Ribbon Retrieval (§4.G): a cascade of [`ribbon`](crate::ribbon)
//! layers where keys whose bucket can't fit cleanly are "bumped" down to
//! the next layer instead of failing the whole build, with a final plain
//! ribbon absorbing whatever survives the cascade.
//!
//! Each bucket spans a fixed-width column window. A key's rank within its
//! bucket — its `row_offset`, derived purely from its hash — decides
//! whether it resolves in this layer (`row_offset < threshold`) or gets
//! bumped; the threshold itself is stored as a 2-bit code selecting among
//! four candidates (`0`, `lower`, `upper`, `bucket_size`) so per-bucket
//! metadata stays compact.

use thiserror::Error;

use crate::bits::{log2_ceil_width, mask64};
use crate::hash::{key_hash, mix_seed, splitmix64, wy_mix};
use crate::packed_array::PackedArray;
use crate::ribbon::{InsertResult, RibbonBandingSystem, RibbonError, RibbonTable};
use crate::wire::{Reader, WireResult, Writer};

#[derive(Debug, Error)]
pub enum BumpedRibbonError {
    #[error(transparent)]
    Ribbon(#[from] RibbonError),
    #[error("fallback layer did not converge after {attempts} expansion attempts")]
    FallbackDidNotConverge { attempts: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct RibbonConfig {
    /// Width, in bits, of each row's coefficient band.
    pub band_width: u32,
    /// Number of candidate row-offset slots per bucket.
    pub bucket_size: usize,
    /// Layers attempted before the remaining keys go to the fallback table.
    pub max_layers: u32,
    /// Expansion retries for the fallback layer.
    pub max_fallback_attempts: u32,
    pub seed: Option<u64>,
}

impl Default for RibbonConfig {
    fn default() -> Self {
        Self {
            band_width: 32,
            bucket_size: 256,
            max_layers: 4,
            max_fallback_attempts: 50,
            seed: None,
        }
    }
}

const THRESHOLD_CODES: usize = 4;

fn threshold_candidates(bucket_size: usize) -> [usize; THRESHOLD_CODES] {
    [0, bucket_size / 4, (bucket_size * 3) / 4, bucket_size]
}

struct Placement {
    bucket_id: usize,
    row_offset: usize,
    start: usize,
    coeffs: u64,
}

fn place(seed: u64, band_width: u32, bucket_size: usize, num_buckets: usize, h: u64) -> Placement {
    let row_hash = wy_mix(seed, h);
    let space = (num_buckets * bucket_size) as u64;
    let global = row_hash % space.max(1);
    let bucket_id = (global / bucket_size as u64) as usize;
    let row_offset = (global % bucket_size as u64) as usize;

    let coeff_hash = wy_mix(splitmix64(seed), h);
    let coeffs = (coeff_hash | 1) & mask64(band_width);
    // The row's column within the ribbon is the bucket's own span offset by
    // its row_offset — not just the bucket's start — so rows spread across
    // the bucket's `[bucket_start, bucket_start + bucket_size)` window.
    let start = bucket_id * bucket_size + row_offset;
    Placement {
        bucket_id,
        row_offset,
        start,
        coeffs,
    }
}

struct BumpedLayer {
    seed: u64,
    bucket_size: usize,
    num_buckets: usize,
    thresholds: PackedArray,
    table: RibbonTable,
}

impl BumpedLayer {
    /// Builds one layer from `keys` (hash, value), returning the layer and
    /// the subset bumped to the next one.
    ///
    /// Per bucket: rows are inserted **in descending row-offset order**
    /// (easiest-to-hardest); the first failure fixes a `bump_offset`, the
    /// smallest threshold candidate `>= bump_offset` is chosen, and every
    /// row — inserted or not — whose offset falls below that threshold is
    /// bumped, undoing already-committed insertions via `clear_row` (§4.G).
    fn build(
        seed: u64,
        band_width: u32,
        bucket_size: usize,
        result_width: u32,
        keys: &[(u64, u64)],
    ) -> (Self, Vec<(u64, u64)>) {
        let num_buckets = (keys.len() / bucket_size.max(1)).max(1) + 1;
        let m = num_buckets * bucket_size + band_width as usize - 1;
        let mut sys = RibbonBandingSystem::new(m, band_width, result_width);

        // (row_offset, start, coeffs, hash, value), grouped by bucket.
        let mut by_bucket: Vec<Vec<(usize, usize, u64, u64, u64)>> = vec![Vec::new(); num_buckets];
        for &(h, value) in keys {
            let p = place(seed, band_width, bucket_size, num_buckets, h);
            by_bucket[p.bucket_id].push((p.row_offset, p.start, p.coeffs, h, value));
        }

        let candidates = threshold_candidates(bucket_size);
        let mut threshold_codes = vec![0u64; num_buckets];
        let mut bumped = Vec::new();

        for bucket_id in 0..num_buckets {
            let mut rows = std::mem::take(&mut by_bucket[bucket_id]);
            rows.sort_by_key(|&(off, ..)| std::cmp::Reverse(off));

            // Rows actually committed to `sys` so far: (offset, pivot column
            // if a column was claimed, hash, value). A `Redundant` row
            // claims no column, so it has nothing to undo if bumped.
            let mut inserted: Vec<(usize, Option<usize>, u64, u64)> = Vec::with_capacity(rows.len());
            let mut bump_offset = 0usize;
            let mut cursor = 0usize;
            while cursor < rows.len() {
                let (off, start, coeffs, h, value) = rows[cursor];
                match sys.insert(start, coeffs, value) {
                    InsertResult::Success(col) => inserted.push((off, Some(col), h, value)),
                    InsertResult::Redundant => inserted.push((off, None, h, value)),
                    InsertResult::Failure => {
                        bump_offset = off + 1;
                        break;
                    }
                }
                cursor += 1;
            }

            let code = candidates
                .iter()
                .enumerate()
                .find(|&(_, &t)| t >= bump_offset)
                .map(|(i, _)| i)
                .unwrap_or(THRESHOLD_CODES - 1);
            threshold_codes[bucket_id] = code as u64;
            let threshold = candidates[code];

            for (off, col, h, value) in inserted {
                if off < threshold {
                    if let Some(col) = col {
                        sys.clear_row(col);
                    }
                    bumped.push((h, value));
                }
            }
            // Rows at `cursor..` were never attempted (the bucket hit a
            // failure before reaching them): always bumped.
            for &(_, _, _, h, value) in &rows[cursor..] {
                bumped.push((h, value));
            }
        }

        let table = sys.solve();
        let layer = Self {
            seed,
            bucket_size,
            num_buckets,
            thresholds: PackedArray::encode(&threshold_codes),
            table,
        };
        (layer, bumped)
    }

    /// Returns `Some(value)` if `h` resolves in this layer, `None` if it's
    /// bumped to the next one.
    fn query(&self, h: u64) -> Option<u64> {
        let band_width = self.table.band_width();
        let p = place(self.seed, band_width, self.bucket_size, self.num_buckets, h);
        let code = self.thresholds.get(p.bucket_id) as usize;
        let threshold = threshold_candidates(self.bucket_size)[code];
        if p.row_offset < threshold {
            Some(self.table.query(p.start, p.coeffs))
        } else {
            None
        }
    }

    fn write_to(&self, w: &mut Writer) {
        w.write_u64(self.seed);
        w.write_u64(self.bucket_size as u64);
        w.write_u64(self.num_buckets as u64);
        self.thresholds.write_to(w);
        self.table.write_to(w);
    }

    fn read_from(r: &mut Reader) -> WireResult<Self> {
        let seed = r.read_u64()?;
        let bucket_size = r.read_u64()? as usize;
        let num_buckets = r.read_u64()? as usize;
        let thresholds = PackedArray::read_from(r, num_buckets)?;
        let table = RibbonTable::read_from(r)?;
        Ok(Self {
            seed,
            bucket_size,
            num_buckets,
            thresholds,
            table,
        })
    }
}

/// A bump-cascade retrieval structure over up to `config.max_layers`
/// ribbon layers, with a fallback plain ribbon absorbing any keys that
/// survive the cascade.
pub struct BumpedRibbon {
    /// Seed the key fingerprint itself is derived under — fixed for the
    /// whole cascade. Per-layer/fallback seeds only drive row placement
    /// (`place`/`wy_mix`); the fingerprint they place must match what
    /// `build` actually bumped between layers.
    base_seed: u64,
    layers: Vec<BumpedLayer>,
    fallback_seed: u64,
    fallback_table: RibbonTable,
}

impl BumpedRibbon {
    /// Builds a retrieval structure mapping each `keys[i]` to `values[i]`.
    pub fn build<K: AsRef<[u8]>>(keys: &[K], values: &[u64], config: RibbonConfig) -> Result<Self, BumpedRibbonError> {
        assert_eq!(keys.len(), values.len());
        let base_seed = config.seed.unwrap_or_else(|| splitmix64(0xD1B5_4A32_D192_ED03));
        let result_width = log2_ceil_width(values.iter().copied().max().unwrap_or(0));

        let mut remaining: Vec<(u64, u64)> = keys
            .iter()
            .zip(values.iter())
            .map(|(k, &v)| (key_hash(base_seed, k.as_ref()), v))
            .collect();

        let mut layers = Vec::new();
        for layer_idx in 0..config.max_layers {
            if remaining.is_empty() {
                break;
            }
            let seed = mix_seed(base_seed, layer_idx + 1);
            let (layer, bumped) = BumpedLayer::build(seed, config.band_width, config.bucket_size, result_width, &remaining);
            layers.push(layer);
            remaining = bumped;
        }

        let (fallback_seed, fallback_table) =
            build_fallback(base_seed, config.band_width, result_width, &remaining, config.max_fallback_attempts)?;

        Ok(Self {
            base_seed,
            layers,
            fallback_seed,
            fallback_table,
        })
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> u64 {
        let h = key_hash(self.base_seed, key.as_ref());
        for layer in &self.layers {
            if let Some(v) = layer.query(h) {
                return v;
            }
        }
        fallback_query(&self.fallback_table, self.fallback_seed, h)
    }

    pub fn write_to(&self, w: &mut Writer) {
        w.write_u64(self.base_seed);
        w.write_u64(self.layers.len() as u64);
        for layer in &self.layers {
            layer.write_to(w);
        }
        w.write_u64(self.fallback_seed);
        self.fallback_table.write_to(w);
    }

    pub fn read_from(r: &mut Reader) -> WireResult<Self> {
        let base_seed = r.read_u64()?;
        let num_layers = r.read_u64()? as usize;
        let mut layers = Vec::with_capacity(num_layers);
        for _ in 0..num_layers {
            layers.push(BumpedLayer::read_from(r)?);
        }
        let fallback_seed = r.read_u64()?;
        let fallback_table = RibbonTable::read_from(r)?;
        Ok(Self {
            base_seed,
            layers,
            fallback_seed,
            fallback_table,
        })
    }
}

fn fallback_query(table: &RibbonTable, seed: u64, h: u64) -> u64 {
    let band_width = table.band_width();
    let coeff_hash = wy_mix(splitmix64(seed), h);
    let coeffs = (coeff_hash | 1) & mask64(band_width);
    let span = table.len().saturating_sub(band_width as usize) + 1;
    let start = (wy_mix(seed, h) % span.max(1) as u64) as usize;
    table.query(start, coeffs)
}

fn build_fallback(
    base_seed: u64,
    band_width: u32,
    result_width: u32,
    remaining: &[(u64, u64)],
    max_attempts: u32,
) -> Result<(u64, RibbonTable), BumpedRibbonError> {
    let mut m = ((remaining.len() as f64 / 0.90).ceil() as usize + band_width as usize).max(band_width as usize + 1);
    let mut seed = mix_seed(base_seed, 0xF0F0);

    for attempt in 0..max_attempts.max(1) {
        let span = m.saturating_sub(band_width as usize) + 1;
        let mut sys = RibbonBandingSystem::new(m, band_width, result_width);
        let mut ok = true;
        for &(h, value) in remaining {
            let coeff_hash = wy_mix(splitmix64(seed), h);
            let coeffs = (coeff_hash | 1) & mask64(band_width);
            let start = (wy_mix(seed, h) % span.max(1) as u64) as usize;
            if matches!(sys.insert(start, coeffs, value), InsertResult::Failure) {
                ok = false;
                break;
            }
        }
        if ok {
            return Ok((seed, sys.solve()));
        }
        m = (m * 11 / 10).max(m + 1);
        seed = mix_seed(seed, attempt + 1);
    }
    Err(BumpedRibbonError::FallbackDidNotConverge { attempts: max_attempts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_set() {
        let keys: Vec<Vec<u8>> = (0..500u64).map(|i| i.to_le_bytes().to_vec()).collect();
        let values: Vec<u64> = (0..500u64).map(|i| i % 17).collect();
        let br = BumpedRibbon::build(&keys, &values, RibbonConfig::default()).unwrap();
        for (k, &v) in keys.iter().zip(values.iter()) {
            assert_eq!(br.get(k), v);
        }
    }

    #[test]
    fn small_bucket_forces_bumping() {
        let keys: Vec<Vec<u8>> = (0..2000u64).map(|i| i.to_le_bytes().to_vec()).collect();
        let values: Vec<u64> = (0..2000u64).map(|i| i % 3).collect();
        let config = RibbonConfig {
            bucket_size: 16,
            band_width: 8,
            ..Default::default()
        };
        let br = BumpedRibbon::build(&keys, &values, config).unwrap();
        for (k, &v) in keys.iter().zip(values.iter()) {
            assert_eq!(br.get(k), v);
        }
    }

    #[test]
    fn wire_round_trip() {
        let keys: Vec<Vec<u8>> = (0..200u64).map(|i| i.to_le_bytes().to_vec()).collect();
        let values: Vec<u64> = (0..200u64).map(|i| i % 5).collect();
        let br = BumpedRibbon::build(&keys, &values, RibbonConfig::default()).unwrap();
        let mut w = Writer::new();
        br.write_to(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let back = BumpedRibbon::read_from(&mut r).unwrap();
        for (k, &v) in keys.iter().zip(values.iter()) {
            assert_eq!(back.get(k), v);
        }
    }
}
