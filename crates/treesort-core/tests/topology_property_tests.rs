// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestCaseError, TestRng, TestRunner};

use treesort_core::{Topology, TopologyPolicy, WorkerId};

const SEED_BYTES: [u8; 32] = [
    0x7d, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0,
];

fn runner() -> TestRunner {
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES);
    TestRunner::new_with_rng(PropConfig::default(), rng)
}

fn policies() -> impl Strategy<Value = TopologyPolicy> {
    prop_oneof![
        Just(TopologyPolicy::FixedOffset),
        Just(TopologyPolicy::RecursiveDoubling),
    ]
}

#[test]
fn delegates_never_leave_the_rank_space() {
    // The worker-count mismatch guard: however small the pool, resolution
    // must degrade to "no delegate", never to an out-of-range address.
    let strategy = (policies(), 1usize..512, 0usize..512, 0u32..80);
    runner()
        .run(&strategy, |(policy, count, rank, level)| {
            let topo = Topology::new(policy, count).map_err(|err| {
                TestCaseError::fail(format!("topology rejected {count} workers: {err}"))
            })?;
            if let Some(delegate) = topo.delegate(WorkerId(rank), level) {
                prop_assert!(delegate.rank() < count);
                prop_assert!(delegate.rank() > rank, "delegation must move down-tree");
            }
            Ok(())
        })
        .expect("range-safety property should hold");
}

#[test]
fn start_level_is_the_first_level_that_can_reach_the_rank() {
    let strategy = 1usize..4096;
    runner()
        .run(&strategy, |rank| {
            let topo = Topology::new(TopologyPolicy::RecursiveDoubling, 8192)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            let level = topo.start_level(WorkerId(rank));
            // 2^level > rank, and the previous level could not reach it.
            prop_assert!(1usize << level > rank);
            prop_assert!(level == 0 || 1usize << (level - 1) <= rank);
            Ok(())
        })
        .expect("start-level property should hold");
}
