// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

mod common;

use common::RecordingSorter;
use rand::{rngs::StdRng, Rng, SeedableRng};
use treesort_core::{
    SortError, SortOrchestrator, StdSort, Topology, TopologyPolicy, TransportChannel,
    TransportError, WorkerContext, ROOT,
};
use treesort_mesh::{build_mesh, run_job};

fn assert_sorted_permutation(got: &[i32], original: &[i32]) {
    assert!(got.windows(2).all(|w| w[0] <= w[1]), "not sorted: {got:?}");
    let mut want = original.to_vec();
    want.sort_unstable();
    assert_eq!(got, want, "not a permutation of the input");
}

#[test]
fn concrete_scenario_four_workers_fixed_offset() {
    // size=8, worker_count=4, Δ=2: the recursion bottoms out at pairs and
    // the sub-merges produce [1,2,5,8] and [3,4,7,9].
    let sorter = RecordingSorter::default();
    let mut data = vec![5, 2, 8, 1, 9, 3, 7, 4];
    run_job(&mut data, 4, 2, TopologyPolicy::FixedOffset, &sorter).unwrap();
    assert_eq!(data, vec![1, 2, 3, 4, 5, 7, 8, 9]);
    assert_eq!(sorter.sizes(), vec![2, 2, 2, 2]);
}

#[test]
fn degenerate_inputs_sort_on_a_real_cluster() {
    let cases: &[&[i32]] = &[
        &[],
        &[42],
        &[3, 3, 3, 3, 3, 3, 3],
        &[1, 2, 3, 4, 5, 6, 7, 8],
        &[8, 7, 6, 5, 4, 3, 2, 1],
    ];
    for policy in [TopologyPolicy::FixedOffset, TopologyPolicy::RecursiveDoubling] {
        for case in cases {
            let mut data = case.to_vec();
            run_job(&mut data, 4, 2, policy, &StdSort).unwrap();
            assert_sorted_permutation(&data, case);
        }
    }
}

#[test]
fn single_worker_sorts_the_whole_array_regardless_of_threshold() {
    let sorter = RecordingSorter::default();
    let mut rng = StdRng::seed_from_u64(314159);
    let original: Vec<i32> = (0..256).map(|_| rng.gen_range(0..256)).collect();
    let mut data = original.clone();
    run_job(&mut data, 1, 1, TopologyPolicy::FixedOffset, &sorter).unwrap();
    assert_sorted_permutation(&data, &original);
    assert_eq!(sorter.sizes(), vec![256]);
}

#[test]
fn threshold_boundary_exactly_at_delta_sorts_locally() {
    let sorter = RecordingSorter::default();
    let mut data = vec![6, 5, 4, 3, 2, 1];
    run_job(&mut data, 2, 6, TopologyPolicy::FixedOffset, &sorter).unwrap();
    assert_eq!(data, vec![1, 2, 3, 4, 5, 6]);
    // size == Δ: the root must not delegate.
    assert_eq!(sorter.sizes(), vec![6]);
}

#[test]
fn threshold_boundary_one_past_delta_delegates() {
    let sorter = RecordingSorter::default();
    let mut data = vec![7, 6, 5, 4, 3, 2, 1];
    run_job(&mut data, 2, 6, TopologyPolicy::FixedOffset, &sorter).unwrap();
    assert_eq!(data, vec![1, 2, 3, 4, 5, 6, 7]);
    // size == Δ + 1 with a valid delegate: split 3/4 across the two workers.
    assert_eq!(sorter.sizes(), vec![3, 4]);
}

#[test]
fn oversized_pools_release_their_idle_workers() {
    // A tiny array on a big pool: most helpers are never reached by the
    // topology and must exit on the end-of-job release instead of hanging.
    let mut data = vec![4, 2, 5, 1, 3];
    run_job(&mut data, 16, 4, TopologyPolicy::FixedOffset, &StdSort).unwrap();
    assert_eq!(data, vec![1, 2, 3, 4, 5]);
}

#[test]
fn distributed_result_matches_a_trusted_local_sort() {
    let mut rng = StdRng::seed_from_u64(20260806);
    for policy in [TopologyPolicy::FixedOffset, TopologyPolicy::RecursiveDoubling] {
        for &size in &[0usize, 1, 7, 33, 128] {
            for &workers in &[1usize, 2, 3, 5, 8] {
                for &threshold in &[1usize, 4, 32] {
                    let original: Vec<i32> =
                        (0..size).map(|_| rng.gen_range(-1000..1000)).collect();
                    let mut data = original.clone();
                    run_job(&mut data, workers, threshold, policy, &StdSort).unwrap_or_else(
                        |err| {
                            panic!(
                                "{policy:?} size={size} workers={workers} Δ={threshold}: {err}"
                            )
                        },
                    );
                    assert_sorted_permutation(&data, &original);
                }
            }
        }
    }
}

#[test]
fn recursive_doubling_three_workers_bottoms_out_as_expected() {
    // Rank 1 takes [n/2, n) whole (its next delegate, rank 3, does not
    // exist); rank 2 takes [n/4, n/2); the root keeps the first quarter.
    let sorter = RecordingSorter::default();
    let mut data = vec![12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1];
    run_job(&mut data, 3, 2, TopologyPolicy::RecursiveDoubling, &sorter).unwrap();
    assert_eq!(data, (1..=12).collect::<Vec<_>>());
    assert_eq!(sorter.sizes(), vec![3, 3, 6]);
}

#[test]
fn zero_threshold_is_rejected_before_any_thread_spawns() {
    let mut data = vec![2, 1];
    assert!(matches!(
        run_job(&mut data, 2, 0, TopologyPolicy::FixedOffset, &StdSort),
        Err(SortError::ZeroThreshold)
    ));
}

#[test]
fn zero_workers_is_rejected_before_any_thread_spawns() {
    let mut data = vec![2, 1];
    assert!(matches!(
        run_job(&mut data, 0, 4, TopologyPolicy::FixedOffset, &StdSort),
        Err(SortError::ZeroWorkers)
    ));
}

#[test]
fn an_abort_broadcast_kills_a_blocked_root() {
    let mut mesh = build_mesh(2);
    let mut helper_channel = mesh.remove(1);
    let mut root_channel = mesh.remove(0);

    // The helper dies before serving anything.
    helper_channel.abort("synthetic failure");

    let topology = Topology::new(TopologyPolicy::FixedOffset, 2).unwrap();
    let ctx = WorkerContext::new(ROOT, topology, 2).unwrap();
    let mut data = vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0];
    let err = SortOrchestrator::new(ctx, &mut root_channel, &StdSort)
        .run_root(&mut data)
        .unwrap_err();
    match err {
        SortError::Transport {
            source: TransportError::Aborted { origin, reason },
            ..
        } => {
            assert_eq!(origin.rank(), 1);
            assert_eq!(reason, "synthetic failure");
        }
        other => panic!("expected an abort, got {other}"),
    }
}
