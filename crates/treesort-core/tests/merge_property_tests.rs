// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestCaseError, TestRng, TestRunner};

use treesort_core::merge_midpoint;

// Pinned seed so failures reproduce across machines and CI; override with
// PROPTEST_SEED locally when hunting a new counterexample.
const SEED_BYTES: [u8; 32] = [
    0x5b, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0,
];

fn runner() -> TestRunner {
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES);
    TestRunner::new_with_rng(PropConfig::default(), rng)
}

#[test]
fn merging_two_sorted_runs_equals_sorting_the_whole_buffer() {
    let strategy = prop::collection::vec(any::<i32>(), 0..200);
    runner()
        .run(&strategy, |values| {
            let mid = values.len() / 2;
            let mut buf = values;
            buf[..mid].sort_unstable();
            let len = buf.len();
            buf[mid..len].sort_unstable();

            let mut expected = buf.clone();
            expected.sort_unstable();

            merge_midpoint(&mut buf, mid).map_err(|err| {
                TestCaseError::fail(format!("merge failed: {err}"))
            })?;
            prop_assert_eq!(buf, expected);
            Ok(())
        })
        .expect("merge property should hold");
}

#[test]
fn merge_preserves_the_input_multiset() {
    let strategy = prop::collection::vec(-50i32..50, 2..120);
    runner()
        .run(&strategy, |values| {
            let mid = values.len() / 2;
            let mut buf = values;
            buf[..mid].sort_unstable();
            let len = buf.len();
            buf[mid..len].sort_unstable();

            let mut before = buf.clone();
            before.sort_unstable();

            merge_midpoint(&mut buf, mid).map_err(|err| {
                TestCaseError::fail(format!("merge failed: {err}"))
            })?;

            let mut after = buf.clone();
            after.sort_unstable();
            prop_assert_eq!(before, after);
            Ok(())
        })
        .expect("multiset property should hold");
}
