//! A small growable/fixed-size mutable bitset used during builds for
//! occupancy tracking (MPHF's `taken`/`attempted_taken`, §4.E step 4) and
//! for staging the raw bit positions EliasFano/DArray are built from.
//!
//! This is distinct from the read-only [`crate::packed_array::PackedArray`]
//! family: it exists only while a structure is being built and is never
//! serialized.

#[derive(Debug, Clone)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0u64; (len + 63) / 64],
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Backing words, for handing off to [`crate::darray::DArray::build`].
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    pub fn test(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len);
        (self.words[idx / 64] >> (idx % 64)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, idx: usize) {
        debug_assert!(idx < self.len);
        self.words[idx / 64] |= 1u64 << (idx % 64);
    }

    #[inline]
    pub fn clear(&mut self, idx: usize) {
        debug_assert!(idx < self.len);
        self.words[idx / 64] &= !(1u64 << (idx % 64));
    }

    /// Clears every bit set since the set was last empty; used to reset the
    /// MPHF builder's `attempted_taken` scratch set between pivot attempts.
    pub fn clear_all(&mut self) {
        for w in &mut self.words {
            *w = 0;
        }
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Ascending positions of every unset bit, truncated to `self.len` bits.
    pub fn unset_positions(&self) -> Vec<u64> {
        let mut out = Vec::with_capacity(self.len - self.count_ones());
        for i in 0..self.len {
            if !self.test(i) {
                out.push(i as u64);
            }
        }
        out
    }
}
