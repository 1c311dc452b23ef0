//! # Property-Based Tests
//!
//! Routing and stepping invariants checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use stepchain_core::{PausedPromise, Promise, StepchainError};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("runtime")
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// `catch` on a success never changes the value.
    #[test]
    fn catch_on_success_is_identity(v in any::<i64>()) {
        let rt = runtime();
        let _guard = rt.enter();
        let outcome = rt.block_on(Promise::<i64, String>::resolve(v).catch(|_| 0).settle());
        prop_assert_eq!(outcome, Ok(v));
    }

    /// `then` on a failure never changes the error.
    #[test]
    fn then_on_failure_is_identity(e in "[a-z]{1,12}") {
        let rt = runtime();
        let _guard = rt.enter();
        let expected = e.clone();
        let outcome = rt.block_on(
            Promise::<i64, String>::reject(e).then(|v| v + 1).then(|v| v * 2).settle(),
        );
        prop_assert_eq!(outcome, Err(expected));
    }

    /// An eager chain equals folding its callbacks over the seed.
    #[test]
    fn eager_chain_matches_fold(seed in -1000i64..1000, deltas in vec(-50i64..50, 0..12)) {
        let rt = runtime();
        let expected = deltas.iter().fold(seed, |acc, d| acc + d);

        let outcome = rt.block_on(async move {
            let mut promise = Promise::<i64, String>::resolve(seed);
            for d in deltas {
                promise = promise.then(move |v| v + d);
            }
            promise.settle().await
        });
        prop_assert_eq!(outcome, Ok(expected));
    }

    /// Allocating exactly the stage count completes the chain; any overshoot
    /// is rejected first without issuing.
    #[test]
    fn exact_allocation_completes(stages in 1usize..10, extra in 1usize..5) {
        let rt = runtime();
        let outcome = rt.block_on(async move {
            let mut chain = PausedPromise::<usize, String>::paused(0);
            for _ in 0..stages {
                chain = chain.then(|v| v + 1);
            }
            let gate = chain.gate();

            let overshoot = gate.allocate(stages + extra).err();
            gate.allocate(stages).expect("exact allocation");
            let settled = chain.settle().await;
            (overshoot, settled, gate.snapshot())
        });

        let (overshoot, settled, snapshot) = outcome;
        prop_assert_eq!(
            overshoot,
            Some(StepchainError::Overshoot { requested: stages + extra, available: stages })
        );
        prop_assert_eq!(settled, Ok(stages));
        prop_assert_eq!(snapshot.issued, stages as u64);
        prop_assert_eq!(snapshot.consumed, stages as u64);
    }

    /// Interleaved steps across independent lineages never cross over.
    #[test]
    fn independent_lineages(order in vec(any::<bool>(), 0..16)) {
        let rt = runtime();
        let (left, right) = rt.block_on(async move {
            let steps_left = order.iter().filter(|b| **b).count();
            let steps_right = order.len() - steps_left;

            let mut left = PausedPromise::<Vec<u8>, String>::paused(Vec::new());
            for i in 0..steps_left {
                left = left.then(move |mut v| { v.push(i as u8); v });
            }
            let mut right = PausedPromise::<Vec<u8>, String>::paused(Vec::new());
            for i in 0..steps_right {
                right = right.then(move |mut v| { v.push(i as u8); v });
            }

            for pick_left in order {
                if pick_left {
                    left.step().expect("left stage");
                } else {
                    right.step().expect("right stage");
                }
            }
            (left.settle().await, right.settle().await)
        });

        let left = left.expect("left value");
        let right = right.expect("right value");
        prop_assert!(left.iter().enumerate().all(|(i, v)| *v as usize == i));
        prop_assert!(right.iter().enumerate().all(|(i, v)| *v as usize == i));
    }
}
