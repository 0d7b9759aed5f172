//! Hashing primitives shared by the MPHF and ribbon builders.
//!
//! `key_hash` derives one 64-bit fingerprint per key (xxh3, seeded), and
//! `wy_mix`/`splitmix64` provide the two-level pivot mix PTHash needs
//! (§4.E: `pos(e, pivot) = Wyhash(Wyhash(seed, pivot), e.hash) mod n'`).

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Fingerprint a key under `seed`. Two distinct keys producing the same
/// fingerprint is the *HashCollision* condition builders must detect (§7).
#[inline]
pub fn key_hash(seed: u64, key: &[u8]) -> u64 {
    xxh3_64_with_seed(key, seed)
}

/// splitmix64, as used by the teacher (`bdz.rs::splitmix64`) for cheap,
/// well-avalanched secondary mixing.
#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// `wyhash(seed=a)` applied to the little-endian bytes of `b`: the one-shot
/// "Wyhash" mix referenced throughout §4.E. Two chained calls compose the
/// pivot independently of the key hash, as required by the position
/// function's contract.
#[inline]
pub fn wy_mix(a: u64, b: u64) -> u64 {
    wyhash::wyhash(&b.to_le_bytes(), a)
}

/// `pos(e, pivot) = Wyhash(Wyhash(seed, pivot), e.hash) mod n'`.
#[inline]
pub fn pivot_position(seed: u64, pivot: u64, key_hash: u64, n_prime: u64) -> u64 {
    debug_assert!(n_prime > 0);
    let inner = wy_mix(seed, pivot);
    wy_mix(inner, key_hash) % n_prime
}

/// Deterministically tweak a base salt/seed by a retry round, FNV-style —
/// the same scheme the teacher uses (`bdz.rs::mix_salt`) for rehash rounds.
#[inline]
pub fn mix_seed(base: u64, round: u32) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut h = FNV_OFFSET ^ base;
    h ^= round as u64;
    h = h.wrapping_mul(FNV_PRIME);
    h ^ (h >> 33)
}
