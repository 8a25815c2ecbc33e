#![cfg(test)]

// Property tests for ChainedTable kept inside the crate so they can assert
// bucket-level invariants alongside the public surface.

use crate::caps::Comparator;
use crate::policy::{HashPolicy, KeyHasher};
use crate::table::{ChainedTable, TableBuilder};
use crate::Error;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::HashMap;

// Pool-indexed operations so shrinking lands on small scenarios: indices
// shrink toward earlier keys, op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i64),
    Remove(usize),
    Get(usize),
    Contains(usize),
    Resize(usize),
    Keys,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,6}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            (idx.clone(), any::<i64>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            idx.clone().prop_map(OpI::Remove),
            idx.clone().prop_map(OpI::Get),
            idx.clone().prop_map(OpI::Contains),
            (1usize..=16).prop_map(OpI::Resize),
            Just(OpI::Keys),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn bucket_sum(t: &ChainedTable<String, i64>) -> usize {
    let n = t.num_buckets().expect("live table");
    (0..n).map(|i| t.bucket_len(i).expect("in range")).sum()
}

fn run_model(mut sut: ChainedTable<String, i64>, pool: Vec<String>, ops: Vec<OpI>) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, i64> = HashMap::new();
    let mut expected_buckets = sut.num_buckets().expect("live table");

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                match sut.insert(k.clone(), v) {
                    Ok(()) => {
                        prop_assert!(!already, "insert must fail on duplicate");
                        model.insert(k, v);
                    }
                    Err(Error::AlreadyExists) => {
                        prop_assert!(already, "duplicate error only when key exists");
                    }
                    Err(other) => prop_assert!(false, "unexpected insert error {:?}", other),
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                match sut.remove(k) {
                    Ok(()) => {
                        prop_assert!(model.remove(k).is_some(), "remove only succeeds when present");
                    }
                    Err(Error::NotFound) => {
                        prop_assert!(!model.contains_key(k));
                    }
                    Err(other) => prop_assert!(false, "unexpected remove error {:?}", other),
                }
            }
            OpI::Get(i) => {
                let k = &pool[i];
                match (sut.get(k), model.get(k)) {
                    (Ok(v), Some(mv)) => prop_assert_eq!(v, mv),
                    (Err(Error::NotFound), None) => {}
                    (got, want) => {
                        prop_assert!(false, "get mismatch: {:?} vs model {:?}", got, want)
                    }
                }
            }
            OpI::Contains(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.contains_key(k).expect("live table"), model.contains_key(k));
            }
            OpI::Resize(n) => {
                sut.resize(n).expect("positive resize on a live table");
                expected_buckets = n;
            }
            OpI::Keys => {
                let mut keys: Vec<String> =
                    sut.keys().expect("live table").into_iter().cloned().collect();
                keys.sort();
                let mut want: Vec<String> = model.keys().cloned().collect();
                want.sort();
                prop_assert_eq!(keys, want);
            }
        }

        // Post-conditions after every op:
        // 1) size == model size == sum of bucket lengths
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(bucket_sum(&sut), sut.len());
        // 2) bucket count only changes through resize
        prop_assert_eq!(sut.num_buckets().expect("live table"), expected_buckets);
        // 3) load factor is size / buckets
        let lf = sut.load_factor().expect("live table");
        prop_assert!((lf - sut.len() as f64 / expected_buckets as f64).abs() < 1e-12);
    }

    // Full content parity at the end.
    for (k, v) in &model {
        prop_assert_eq!(sut.get(k).ok(), Some(v));
    }
    Ok(())
}

// Property: state-machine equivalence against std's HashMap across random
// insert/remove/get/resize sequences, with bucket-sum and bucket-count
// invariants checked after every operation.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut: ChainedTable<String, i64> = ChainedTable::new(4).expect("valid construction");
        run_model(sut, pool, ops)?;
    }
}

// Property: same invariants under the robust tier and a deliberately tiny
// bucket array (heavy chaining).
proptest! {
    #![proptest_config(ProptestConfig { cases: 48, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_robust_tiny((pool, ops) in arb_scenario()) {
        let sut: ChainedTable<String, i64> = TableBuilder::new(1)
            .policy(HashPolicy::Robust)
            .comparator(Comparator::from_ord())
            .build()
            .expect("valid construction");
        run_model(sut, pool, ops)?;
    }
}

// Property: worst-case collisions — a constant custom hasher funnels every
// key into one bucket, so correctness rests entirely on comparator scans.
proptest! {
    #![proptest_config(ProptestConfig { cases: 48, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_full_collision((pool, ops) in arb_scenario()) {
        let sut: ChainedTable<String, i64> = TableBuilder::new(4)
            .hasher(KeyHasher::custom(|_: &String| 0))
            .comparator(Comparator::from_ord())
            .build_custom()
            .expect("valid construction");
        run_model(sut, pool, ops)?;
    }
}
