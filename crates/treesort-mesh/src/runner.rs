// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scoped-thread cluster runner.
//!
//! Helper ranks run on scoped threads; the root runs on the calling thread
//! so the caller's buffer is sorted in place without crossing a thread
//! boundary. Configuration is validated before any thread exists, so a bad
//! job aborts immediately and no worker ever blocks on it.

use std::thread;

use tracing::{debug, info};

use treesort_core::{
    HelperReport, SequentialSorter, SortError, SortOrchestrator, Topology, TopologyPolicy,
    TransportChannel, WorkerContext, ROOT,
};

use crate::channel::{build_mesh, MeshChannel};

/// Sorts `data` in place on an in-process cluster of `worker_count` workers.
///
/// Any worker's failure aborts the whole job: the originating error is
/// broadcast over the mesh, every blocked worker surfaces it, and the
/// primary fault (not its echoes) is returned, wrapped with the identity of
/// the worker that raised it.
///
/// # Errors
///
/// Configuration errors before any thread spawns; otherwise the first
/// primary [`SortError`] any worker hit.
///
/// # Panics
///
/// Re-raises a panic from a worker thread (a panicking sequential sorter is
/// a bug, not a job error).
pub fn run_job<S>(
    data: &mut [i32],
    worker_count: usize,
    threshold: usize,
    policy: TopologyPolicy,
    sorter: &S,
) -> Result<(), SortError>
where
    S: SequentialSorter + Sync + ?Sized,
{
    let topology = Topology::new(policy, worker_count)?;
    // Shared configuration is validated here, before any thread exists.
    let root_ctx = WorkerContext::new(ROOT, topology, threshold)?;

    info!(
        size = data.len(),
        workers = worker_count,
        threshold,
        ?policy,
        sorter = sorter.name(),
        "starting in-process sort job"
    );

    let mut channels = build_mesh(worker_count);
    let mut root_channel = channels.remove(0);

    thread::scope(|s| {
        let handles: Vec<_> = channels
            .into_iter()
            .map(|mut channel| {
                s.spawn(move || {
                    let id = channel.id();
                    let outcome = helper_main(&mut channel, topology, threshold, sorter);
                    if let Err(err) = &outcome {
                        if !err.is_abort_echo() {
                            channel.abort(&err.to_string());
                        }
                    }
                    (id, outcome)
                })
            })
            .collect();

        let root_outcome = {
            let mut orch = SortOrchestrator::new(root_ctx, &mut root_channel, sorter);
            orch.run_root(data)
        };
        if let Err(err) = &root_outcome {
            if !err.is_abort_echo() {
                root_channel.abort(&err.to_string());
            }
        }

        let mut failure: Option<SortError> = root_outcome.err();
        for handle in handles {
            let (id, outcome) = match handle.join() {
                Ok(pair) => pair,
                Err(payload) => std::panic::resume_unwind(payload),
            };
            match outcome {
                Ok(report) => debug!(worker = %id, ?report, "helper finished"),
                Err(err) => {
                    let wrapped = SortError::Worker {
                        worker: id,
                        source: Box::new(err),
                    };
                    // Keep the primary fault; echoes of someone else's abort
                    // only stand in until the origin is seen.
                    let replace = match &failure {
                        None => true,
                        Some(existing) => existing.is_abort_echo() && !wrapped.is_abort_echo(),
                    };
                    if replace {
                        failure = Some(wrapped);
                    }
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => {
                info!(size = data.len(), "sort job complete");
                Ok(())
            }
        }
    })
}

fn helper_main<S>(
    channel: &mut MeshChannel,
    topology: Topology,
    threshold: usize,
    sorter: &S,
) -> Result<HelperReport, SortError>
where
    S: SequentialSorter + Sync + ?Sized,
{
    let ctx = WorkerContext::new(channel.id(), topology, threshold)?;
    SortOrchestrator::new(ctx, channel, sorter).run_helper()
}
