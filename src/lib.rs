//! succinct_ds — succinct data structures for static key/value workloads:
//! a PTHash-style minimal perfect hash function, Bumped Ribbon Retrieval,
//! and the bit-packed containers (`PackedArray`, `DictArray`, `EliasFano`,
//! `DArray`) they're built from.
//!
//! Every structure here is built once, from an immutable key set, and
//! queried many times; none of them supports insertion or deletion after
//! construction (§1).

pub mod bits;
pub mod bitset;
pub mod bucketer;
pub mod bumped_ribbon;
pub mod darray;
pub mod dict_array;
pub mod elias_fano;
pub mod hash;
pub mod mphf;
pub mod packed_array;
pub mod ribbon;
pub mod wire;

pub use bucketer::Bucketer;
pub use bumped_ribbon::{BumpedRibbon, BumpedRibbonError, RibbonConfig};
pub use darray::{DArray, Polarity};
pub use dict_array::DictArray;
pub use elias_fano::EliasFano;
pub use mphf::{BuildConfig, Builder, MphError, Mphf};
pub use packed_array::{PackedArray, PackedArrayView};
pub use ribbon::{InsertResult, RibbonBandingSystem, RibbonError, RibbonTable};
pub use wire::{Reader, WireError, WireResult, Writer};
