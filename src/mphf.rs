//! PTHash-style minimal perfect hash function (§4.E).
//!
//! Keys are grouped into skewed buckets ([`Bucketer`]), processed
//! densest-first, and each bucket searches for the smallest pivot that
//! places every one of its keys on a currently-free slot. When the load
//! factor `alpha < 1` leaves the working range `n' > n` larger than the
//! output range `n`, positions that land at or past `n` are rerouted
//! through `free_slots`, a monotone [`EliasFano`] sequence.

use thiserror::Error;

use crate::bitset::BitSet;
use crate::bucketer::Bucketer;
use crate::dict_array::DictArray;
use crate::elias_fano::EliasFano;
use crate::hash::{key_hash, mix_seed, pivot_position};
use crate::packed_array::PackedArray;
use crate::wire::{Reader, WireError, Writer};

#[derive(Debug, Error)]
pub enum MphError {
    #[error("no collision-free pivot assignment found after {attempts} attempts")]
    HashCollision { attempts: u32 },
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Tuning knobs for [`Builder::build`]. Defaults follow the PTHash paper's
/// recommended middle ground between build speed and space (`c ≈ 6`,
/// `alpha ≈ 0.94`).
#[derive(Debug, Clone, Copy)]
pub struct BuildConfig {
    /// Controls bucket count: `m = ceil(c * n / log2(n + 2))`.
    pub c: f64,
    /// Load factor; `n' = ceil(n / alpha)` is the internal working range.
    pub alpha: f64,
    /// Fixed seed, or `None` to derive one and retry with others on
    /// collision.
    pub seed: Option<u64>,
    /// Pivot values tried per bucket before giving up on the current seed.
    pub max_pivot_attempts: u64,
    /// Distinct seeds tried before returning [`MphError::HashCollision`].
    pub max_seed_attempts: u32,
    /// Encode pivots with [`DictArray`] instead of [`PackedArray`] — worth
    /// it when few distinct pivot values repeat across many buckets (§9
    /// "Optional pivot encoding").
    pub use_dict_pivots: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            c: 6.0,
            alpha: 0.94,
            seed: None,
            max_pivot_attempts: 10_000,
            max_seed_attempts: 16,
            use_dict_pivots: false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Builder {
    config: BuildConfig,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build<K: AsRef<[u8]>>(self, keys: &[K]) -> Result<Mphf, MphError> {
        Mphf::build(keys, self.config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum PivotEncoding {
    Packed(PackedArray),
    Dict(DictArray),
}

impl PivotEncoding {
    #[inline]
    fn get(&self, id: usize) -> u64 {
        match self {
            PivotEncoding::Packed(p) => p.get(id),
            PivotEncoding::Dict(d) => d.get(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mphf {
    seed: u64,
    n: usize,
    n_prime: usize,
    bucketer: Bucketer,
    pivots: PivotEncoding,
    free_slots: EliasFano,
}

impl Mphf {
    fn empty() -> Self {
        Self {
            seed: 0,
            n: 0,
            n_prime: 0,
            bucketer: Bucketer::new(0, 1),
            pivots: PivotEncoding::Packed(PackedArray::encode(&[])),
            free_slots: EliasFano::encode(&[]),
        }
    }

    pub fn build<K: AsRef<[u8]>>(keys: &[K], config: BuildConfig) -> Result<Self, MphError> {
        let n = keys.len();
        if n == 0 {
            return Ok(Self::empty());
        }

        let n_prime = ((n as f64) / config.alpha).floor() as usize;
        let n_prime = n_prime.max(n);
        let m = num_buckets(n_prime, config.c);

        let mut seed = config
            .seed
            .unwrap_or_else(|| crate::hash::splitmix64(0x9E37_79B9_7F4A_7C15));
        let attempts = config.max_seed_attempts.max(1);
        let mut last_err = MphError::HashCollision { attempts };

        for attempt in 0..attempts {
            let bucketer = Bucketer::new(n_prime as u64, m as u64);
            let hashes: Vec<u64> = keys.iter().map(|k| key_hash(seed, k.as_ref())).collect();
            match try_build(seed, n, n_prime, m, bucketer, &hashes, &config) {
                Ok(mphf) => return Ok(mphf),
                Err(e) => {
                    last_err = e;
                    seed = mix_seed(seed, attempt + 1);
                }
            }
        }
        Err(last_err)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Maps `key` to a slot in `[0, len())`. Behaviour is unspecified for
    /// keys outside the set this function was built over (§4.E "undefined
    /// for non-member keys").
    pub fn get(&self, key: impl AsRef<[u8]>) -> u64 {
        debug_assert!(self.n > 0, "Mphf::get called on an empty function");
        let h = key_hash(self.seed, key.as_ref());
        let bucket_id = self.bucketer.bucket_of(h) as usize;
        let pivot = self.pivots.get(bucket_id);
        let p = pivot_position(self.seed, pivot, h, self.n_prime as u64) as usize;
        if p < self.n {
            p as u64
        } else {
            self.free_slots.get(p - self.n)
        }
    }

    pub fn write_to(&self, w: &mut Writer) {
        w.write_u64(self.seed);
        w.write_u64(self.n as u64);
        w.write_u64(self.n_prime as u64);
        self.bucketer.write_to(w);
        match &self.pivots {
            PivotEncoding::Packed(p) => {
                w.write_u64(0);
                p.write_to(w);
            }
            PivotEncoding::Dict(d) => {
                w.write_u64(1);
                w.write_u64(d.dict_len() as u64);
                d.write_to(w);
            }
        }
        self.free_slots.write_to(w);
    }

    pub fn read_from(r: &mut Reader) -> Result<Self, MphError> {
        let seed = r.read_u64()?;
        let n = r.read_u64()? as usize;
        let n_prime = r.read_u64()? as usize;
        let bucketer = Bucketer::read_from(r)?;
        let m = bucketer.num_buckets() as usize;
        let tag = r.read_u64()?;
        let pivots = if tag == 0 {
            PivotEncoding::Packed(PackedArray::read_from(r, m)?)
        } else {
            let dict_len = r.read_u64()? as usize;
            PivotEncoding::Dict(DictArray::read_from(r, dict_len, m)?)
        };
        let free_slots = EliasFano::read_from(r)?;
        Ok(Self {
            seed,
            n,
            n_prime,
            bucketer,
            pivots,
            free_slots,
        })
    }
}

/// `m = ceil(c * n' / (floor(log2(n')) + 1))`, per the bucket-count formula
/// in §3 — `n'` here is the α-relaxed working range, not the raw key count.
fn num_buckets(n_prime: usize, c: f64) -> usize {
    let floor_log2 = if n_prime == 0 { 0 } else { 63 - (n_prime as u64).leading_zeros() };
    let denom = (floor_log2 + 1) as f64;
    (((c * n_prime as f64) / denom).ceil() as usize).max(1)
}

fn try_build(
    seed: u64,
    n: usize,
    n_prime: usize,
    m: usize,
    bucketer: Bucketer,
    hashes: &[u64],
    config: &BuildConfig,
) -> Result<Mphf, MphError> {
    let mut buckets: Vec<Vec<u64>> = vec![Vec::new(); m];
    for &h in hashes {
        buckets[bucketer.bucket_of(h) as usize].push(h);
    }

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| buckets[b].len().cmp(&buckets[a].len()).then(a.cmp(&b)));

    let mut taken = BitSet::new(n_prime);
    let mut attempted = BitSet::new(n_prime);
    let mut pivots = vec![0u64; m];

    for &bid in &order {
        let bucket = &buckets[bid];
        if bucket.is_empty() {
            continue;
        }

        let mut found = None;
        for pivot in 0..config.max_pivot_attempts {
            let mut touched: Vec<usize> = Vec::with_capacity(bucket.len());
            let mut ok = true;
            for &h in bucket {
                let pos = pivot_position(seed, pivot, h, n_prime as u64) as usize;
                if taken.test(pos) || attempted.test(pos) {
                    ok = false;
                    break;
                }
                attempted.set(pos);
                touched.push(pos);
            }
            if ok {
                for &p in &touched {
                    taken.set(p);
                    attempted.clear(p);
                }
                found = Some(pivot);
                break;
            }
            for &p in &touched {
                attempted.clear(p);
            }
        }

        match found {
            Some(p) => pivots[bid] = p,
            None => {
                return Err(MphError::HashCollision {
                    attempts: config.max_pivot_attempts as u32,
                })
            }
        }
    }

    let free_slots = build_free_slots(&taken, n, n_prime);
    let pivot_enc = if config.use_dict_pivots {
        PivotEncoding::Dict(DictArray::encode(&pivots))
    } else {
        PivotEncoding::Packed(PackedArray::encode(&pivots))
    };

    Ok(Mphf {
        seed,
        n,
        n_prime,
        bucketer,
        pivots: pivot_enc,
        free_slots,
    })
}

/// Builds the `n' - n`-long rerouting sequence: `free_slots[k]` is the
/// free slot `< n` that overflow offset `k` (i.e. raw position `n + k`)
/// should resolve to, for every `k` that is actually a taken position.
/// Untaken `k` never get queried, so they inherit the previous entry —
/// the whole sequence stays monotone non-decreasing, which is exactly
/// what `EliasFano` wants.
fn build_free_slots(taken: &BitSet, n: usize, n_prime: usize) -> EliasFano {
    let free: Vec<u64> = (0..n as u64).filter(|&p| !taken.test(p as usize)).collect();
    let mut seq = Vec::with_capacity(n_prime - n);
    let mut ptr = 0usize;
    let mut last = 0u64;
    for k in 0..(n_prime - n) {
        if taken.test(n + k) {
            last = free[ptr];
            ptr += 1;
        }
        seq.push(last);
    }
    EliasFano::encode(&seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_minimal_perfect_function_for_squares() {
        let keys: Vec<Vec<u8>> = (0..256u64).map(|i| (i * i).to_le_bytes().to_vec()).collect();
        let mphf = Builder::new().build(&keys).unwrap();
        assert_eq!(mphf.len(), keys.len());
        let mut seen = vec![false; keys.len()];
        for k in &keys {
            let p = mphf.get(k) as usize;
            assert!(p < keys.len());
            assert!(!seen[p], "position {p} assigned twice");
            seen[p] = true;
        }
        assert!(seen.iter().all(|&b| b));
    }

    #[test]
    fn single_key() {
        let keys = [b"only".to_vec()];
        let mphf = Builder::new().build(&keys).unwrap();
        assert_eq!(mphf.len(), 1);
        assert_eq!(mphf.get(&keys[0]), 0);
    }

    #[test]
    fn empty_key_set() {
        let keys: Vec<Vec<u8>> = Vec::new();
        let mphf = Builder::new().build(&keys).unwrap();
        assert!(mphf.is_empty());
    }

    #[test]
    fn low_alpha_exercises_free_slots_reroute() {
        let keys: Vec<Vec<u8>> = (0..2000u64).map(|i| i.to_le_bytes().to_vec()).collect();
        let config = BuildConfig {
            alpha: 0.80,
            ..Default::default()
        };
        let mphf = Builder::new().with_config(config).build(&keys).unwrap();
        let mut seen = vec![false; keys.len()];
        for k in &keys {
            let p = mphf.get(k) as usize;
            assert!(p < keys.len());
            assert!(!seen[p]);
            seen[p] = true;
        }
    }

    #[test]
    fn dict_pivot_encoding_round_trips_through_build() {
        let keys: Vec<Vec<u8>> = (0..500u64).map(|i| i.to_le_bytes().to_vec()).collect();
        let config = BuildConfig {
            use_dict_pivots: true,
            ..Default::default()
        };
        let mphf = Builder::new().with_config(config).build(&keys).unwrap();
        let mut seen = vec![false; keys.len()];
        for k in &keys {
            let p = mphf.get(k) as usize;
            assert!(!seen[p]);
            seen[p] = true;
        }
    }

    #[test]
    fn wire_round_trip() {
        let keys: Vec<Vec<u8>> = (0..300u64).map(|i| i.to_le_bytes().to_vec()).collect();
        let mphf = Builder::new().build(&keys).unwrap();
        let mut w = Writer::new();
        mphf.write_to(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let back = Mphf::read_from(&mut r).unwrap();
        for k in &keys {
            assert_eq!(back.get(k), mphf.get(k));
        }
    }
}
