//! Skewed bucket assignment (§3): 60% of keys are routed into the densest
//! 30% of buckets, so the per-bucket pivot search (§4.E) spends its effort
//! where collisions are most likely, finishing sparse buckets quickly.

use crate::wire::{Reader, WireResult, Writer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bucketer {
    n: u64,
    m: u64,
    p1: u64,
    p2: u64,
}

impl Bucketer {
    /// `n` keys hashed into `m` buckets. `p1 = floor(0.6n)` keys (by
    /// `hash % n`) land in the dense `p2 = floor(0.3m)` buckets; the rest
    /// spread over the remaining `m - p2` sparse buckets.
    pub fn new(n: u64, m: u64) -> Self {
        assert!(m > 0, "bucket count must be positive");
        let p1 = (n as f64 * 0.6) as u64;
        let p2 = ((m as f64 * 0.3) as u64).clamp(1, m.saturating_sub(1).max(1));
        Self {
            n,
            m,
            p1: p1.min(n),
            p2: p2.min(m),
        }
    }

    #[inline]
    pub fn num_buckets(&self) -> u64 {
        self.m
    }

    /// Maps a key's hash to a bucket id in `[0, m)`. `hash % n` only picks
    /// the dense/sparse branch; the bucket id itself is always a function
    /// of the raw `hash`, not the reduced remainder.
    #[inline]
    pub fn bucket_of(&self, hash: u64) -> u64 {
        if self.n == 0 {
            return 0;
        }
        if self.p2 == 0 || self.m == self.p2 {
            return hash % self.m;
        }
        if hash % self.n < self.p1 {
            hash % self.p2
        } else {
            self.p2 + hash % (self.m - self.p2)
        }
    }

    pub fn write_to(&self, w: &mut Writer) {
        w.write_u64(self.n);
        w.write_u64(self.m);
        w.write_u64(self.p1);
        w.write_u64(self.p2);
    }

    pub fn read_from(r: &mut Reader) -> WireResult<Self> {
        let n = r.read_u64()?;
        let m = r.read_u64()?;
        let p1 = r.read_u64()?;
        let p2 = r.read_u64()?;
        Ok(Self { n, m, p1, p2 })
    }
}
