//! End-to-end scenarios spanning the public API, one per container.

use succinct_ds::{BuildConfig, Builder, BumpedRibbon, DArray, EliasFano, MphError, PackedArray, Polarity, RibbonConfig};

#[test]
fn packed_array_mixed_widths() {
    let values = [5u64, 2, 9, 100, 0, 5, 10, 90, 9, 1, 65, 10];
    let arr = PackedArray::encode(&values);
    assert_eq!(arr.width(), 7);
    for (i, &v) in values.iter().enumerate() {
        assert_eq!(arr.get(i), v);
    }
}

#[test]
fn darray_select_over_a_dense_seeded_bitset() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0x0194_f614_c152_27ba);
    let bit_len = 20_000usize;
    let mut words = vec![0u64; (bit_len + 63) / 64];
    let mut ones = Vec::new();
    for i in 0..bit_len {
        if rng.gen_bool(0.37) {
            words[i / 64] |= 1u64 << (i % 64);
            ones.push(i as u64);
        }
    }
    let da = DArray::build(&words, bit_len, Polarity::Set);
    for (i, &p) in ones.iter().enumerate() {
        assert_eq!(da.select(&words, i), p);
    }
}

#[test]
fn elias_fano_over_a_monotone_100000_sequence() {
    let mut acc = 0u64;
    let values: Vec<u64> = (0..100_000u64)
        .map(|i| {
            acc += (i % 11) + 1;
            acc
        })
        .collect();
    let ef = EliasFano::encode(&values);
    assert_eq!(ef.len(), values.len());
    for (i, &expected) in values.iter().enumerate().step_by(613) {
        assert_eq!(ef.get(i), expected);
    }
}

#[test]
fn mphf_is_bijective_over_squares() {
    let keys: Vec<Vec<u8>> = (0..256u64).map(|i| (i * i).to_le_bytes().to_vec()).collect();
    let mphf = Builder::new().build(&keys).unwrap();
    let mut seen = vec![false; keys.len()];
    for k in &keys {
        let p = mphf.get(k) as usize;
        assert!(p < keys.len());
        assert!(!seen[p]);
        seen[p] = true;
    }
}

#[test]
fn mphf_reports_hash_collision_on_duplicate_keys() {
    let keys = [5u64.to_le_bytes().to_vec(), 5u64.to_le_bytes().to_vec()];
    let config = BuildConfig {
        max_pivot_attempts: 64,
        max_seed_attempts: 2,
        ..Default::default()
    };
    let err = Builder::new().with_config(config).build(&keys).unwrap_err();
    assert!(matches!(err, MphError::HashCollision { .. }));
}

#[test]
fn burr_round_trips_under_incremental_iterative_and_bumped_configurations() {
    let keys: Vec<Vec<u8>> = (0..5_000u64).map(|i| i.to_le_bytes().to_vec()).collect();
    let values: Vec<u64> = (0..5_000u64).map(|i| i % 31).collect();

    // "incremental": a single generous layer, nothing bumped.
    let incremental = BumpedRibbon::build(
        &keys,
        &values,
        RibbonConfig {
            bucket_size: 4096,
            max_layers: 1,
            ..Default::default()
        },
    )
    .unwrap();

    // "iterative": several mid-sized layers.
    let iterative = BumpedRibbon::build(
        &keys,
        &values,
        RibbonConfig {
            bucket_size: 512,
            max_layers: 4,
            ..Default::default()
        },
    )
    .unwrap();

    // "bumped": deliberately tiny buckets force heavy cascading into the
    // fallback layer.
    let bumped = BumpedRibbon::build(
        &keys,
        &values,
        RibbonConfig {
            bucket_size: 8,
            band_width: 8,
            max_layers: 4,
            ..Default::default()
        },
    )
    .unwrap();

    for (k, &v) in keys.iter().zip(values.iter()) {
        assert_eq!(incremental.get(k), v);
        assert_eq!(iterative.get(k), v);
        assert_eq!(bumped.get(k), v);
    }
}
