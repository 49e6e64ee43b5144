// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The per-worker recursive control loop.
//!
//! Every worker runs the same state machine per active recursive call:
//! receive (or originate) a sub-range, decide "delegate" vs "sort locally",
//! ship the upper half to the delegate if any, recurse on the lower half,
//! block for the delegate's sorted reply, merge at the split midpoint. The
//! split point is always `size / 2` on both sides of every edge, so the
//! merge always reunites exactly the two pieces that were split — there is
//! no reordering ambiguity anywhere in the fan-in.
//!
//! Each worker issues at most one delegation per recursive call and waits
//! for exactly that one reply before proceeding, so the two blocking points
//! (assignment wait, delegate-result wait) are the only synchronization in
//! the system. Transfers are strictly synchronous: no request handle ever
//! outlives its operation.

use std::time::Instant;

use tracing::debug;

use crate::error::{Phase, SortError, TransportError};
use crate::ident::{TreeLevel, WorkerId, ROOT};
use crate::merge::merge_midpoint;
use crate::seqsort::SequentialSorter;
use crate::topology::Topology;
use crate::transport::{Inbound, TransportChannel};

/// Per-worker immutable job parameters, passed explicitly instead of living
/// in process-wide globals.
#[derive(Debug, Clone, Copy)]
pub struct WorkerContext {
    /// This worker's rank.
    pub id: WorkerId,
    /// The job's process-tree resolver.
    pub topology: Topology,
    /// Minimum size above which a worker delegates when a delegate exists.
    pub threshold: usize,
}

impl WorkerContext {
    /// Validates and builds the context for one worker.
    ///
    /// # Errors
    ///
    /// [`SortError::ZeroThreshold`] for a threshold of zero and
    /// [`SortError::RankOutOfRange`] when `id` does not fit the topology's
    /// rank space. Both are configuration errors caught before any
    /// delegation happens.
    pub fn new(id: WorkerId, topology: Topology, threshold: usize) -> Result<Self, SortError> {
        if threshold == 0 {
            return Err(SortError::ZeroThreshold);
        }
        if id.0 >= topology.worker_count() {
            return Err(SortError::RankOutOfRange {
                worker: id,
                count: topology.worker_count(),
            });
        }
        Ok(Self {
            id,
            topology,
            threshold,
        })
    }
}

/// How a helper's participation in a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperReport {
    /// The helper served one assignment and replied to its parent.
    Served {
        /// Whoever sent the assignment.
        parent: WorkerId,
        /// Element count of the served sub-range.
        len: usize,
    },
    /// The topology never reached this helper; the root released it.
    Released,
}

/// The recursive control loop bound to one worker's channel and sorter.
pub struct SortOrchestrator<'a, C, S>
where
    C: TransportChannel,
    S: SequentialSorter + ?Sized,
{
    ctx: WorkerContext,
    channel: &'a mut C,
    sorter: &'a S,
}

impl<'a, C, S> SortOrchestrator<'a, C, S>
where
    C: TransportChannel,
    S: SequentialSorter + ?Sized,
{
    /// Binds the loop to a validated context, a transport endpoint, and a
    /// sequential sorter.
    pub fn new(ctx: WorkerContext, channel: &'a mut C, sorter: &'a S) -> Self {
        Self {
            ctx,
            channel,
            sorter,
        }
    }

    /// Runs the root's side of the job: sorts `data` in place, then releases
    /// workers the topology never reached.
    ///
    /// The root originates the data, so it enters the state machine with the
    /// full array instead of blocking for an assignment.
    ///
    /// # Errors
    ///
    /// [`SortError::RootOnly`] off the root worker, otherwise any fatal
    /// job error.
    pub fn run_root(&mut self, data: &mut [i32]) -> Result<(), SortError> {
        if self.ctx.id != ROOT {
            return Err(SortError::RootOnly {
                worker: self.ctx.id,
            });
        }
        self.sort_range(data, self.ctx.topology.start_level(self.ctx.id))?;
        self.channel
            .shutdown()
            .map_err(|source| self.fail(Phase::Release, source))?;
        Ok(())
    }

    /// Runs a helper's side of the job: block for the single inbound
    /// assignment, sort it (delegating further down the tree as the topology
    /// allows), and reply to whoever sent it.
    ///
    /// The parent is discovered structurally — it is simply the worker that
    /// sends first; under recursive doubling it is not derivable from the
    /// helper's own rank ahead of time.
    ///
    /// # Errors
    ///
    /// [`SortError::RootIsNotHelper`] on the root worker, otherwise any
    /// fatal job error.
    pub fn run_helper(&mut self) -> Result<HelperReport, SortError> {
        if self.ctx.id == ROOT {
            return Err(SortError::RootIsNotHelper);
        }
        let (parent, len) = match self
            .channel
            .probe()
            .map_err(|source| self.fail(Phase::Assignment, source))?
        {
            Inbound::Shutdown => {
                debug!(worker = %self.ctx.id, "released without an assignment");
                return Ok(HelperReport::Released);
            }
            Inbound::Work { from, len } => (from, len),
        };

        let mut buf: Vec<i32> = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|source| SortError::Allocation {
                elements: len,
                source,
            })?;
        buf.resize(len, 0);
        self.channel
            .recv(parent, &mut buf)
            .map_err(|source| self.fail(Phase::Assignment, source))?;
        debug!(worker = %self.ctx.id, %parent, size = len, "assignment received");

        self.sort_range(&mut buf, self.ctx.topology.start_level(self.ctx.id))?;

        self.channel
            .send(parent, &buf)
            .map_err(|source| self.fail(Phase::Reply, source))?;
        Ok(HelperReport::Served { parent, len })
    }

    /// One recursive call of the state machine over `buf` at `level`.
    fn sort_range(&mut self, buf: &mut [i32], level: TreeLevel) -> Result<(), SortError> {
        let size = buf.len();
        if size <= 1 {
            // Trivially sorted: no delegation, no merge.
            return Ok(());
        }

        let delegate = self.ctx.topology.delegate(self.ctx.id, level);
        match delegate {
            Some(delegate) if size > self.ctx.threshold => {
                let mid = size / 2;
                debug!(
                    worker = %self.ctx.id,
                    %delegate,
                    level,
                    size,
                    kept = mid,
                    "delegating upper half"
                );
                {
                    let (kept, shipped) = buf.split_at_mut(mid);
                    self.channel
                        .send(delegate, shipped)
                        .map_err(|source| self.fail(Phase::Delegation, source))?;
                    self.sort_range(kept, level + 1)?;
                    self.channel
                        .recv(delegate, shipped)
                        .map_err(|source| self.fail(Phase::AwaitResult, source))?;
                }
                merge_midpoint(buf, mid)
            }
            _ => {
                let started = Instant::now();
                self.sorter.sort(buf);
                debug!(
                    worker = %self.ctx.id,
                    size,
                    sorter = self.sorter.name(),
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "sorted locally"
                );
                Ok(())
            }
        }
    }

    fn fail(&self, phase: Phase, source: TransportError) -> SortError {
        SortError::Transport {
            worker: self.ctx.id,
            phase,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seqsort::StdSort;
    use crate::topology::TopologyPolicy;

    /// A channel for topologies that must never touch the transport.
    struct NullChannel;

    impl TransportChannel for NullChannel {
        fn send(&mut self, to: WorkerId, _payload: &[i32]) -> Result<(), TransportError> {
            Err(TransportError::UnknownPeer { peer: to })
        }

        fn probe(&mut self) -> Result<Inbound, TransportError> {
            Err(TransportError::Closed { worker: ROOT })
        }

        fn recv(&mut self, from: WorkerId, _into: &mut [i32]) -> Result<(), TransportError> {
            Err(TransportError::UnexpectedSender {
                expected: from,
                received: from,
            })
        }

        fn shutdown(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        fn abort(&mut self, _reason: &str) {}
    }

    fn single_worker_ctx(threshold: usize) -> WorkerContext {
        let topology = Topology::new(TopologyPolicy::FixedOffset, 1).unwrap();
        WorkerContext::new(ROOT, topology, threshold).unwrap()
    }

    #[test]
    fn single_worker_sorts_everything_locally() {
        // With one worker the topology is exhausted at the root, so the
        // whole array must be sorted without addressing any peer no matter
        // how small the threshold is.
        let mut ctx_channel = NullChannel;
        let ctx = single_worker_ctx(1);
        let mut orch = SortOrchestrator::new(ctx, &mut ctx_channel, &StdSort);
        let mut data = vec![5, 2, 8, 1, 9, 3, 7, 4];
        orch.run_root(&mut data).unwrap();
        assert_eq!(data, vec![1, 2, 3, 4, 5, 7, 8, 9]);
    }

    #[test]
    fn empty_and_singleton_inputs_are_trivially_sorted() {
        let mut channel = NullChannel;
        let ctx = single_worker_ctx(4);
        let mut orch = SortOrchestrator::new(ctx, &mut channel, &StdSort);
        let mut empty: Vec<i32> = vec![];
        orch.run_root(&mut empty).unwrap();
        assert!(empty.is_empty());

        let mut channel = NullChannel;
        let mut orch = SortOrchestrator::new(ctx, &mut channel, &StdSort);
        let mut one = vec![42];
        orch.run_root(&mut one).unwrap();
        assert_eq!(one, vec![42]);
    }

    #[test]
    fn zero_threshold_is_a_configuration_error() {
        let topology = Topology::new(TopologyPolicy::FixedOffset, 2).unwrap();
        assert!(matches!(
            WorkerContext::new(ROOT, topology, 0),
            Err(SortError::ZeroThreshold)
        ));
    }

    #[test]
    fn rank_outside_the_topology_is_rejected() {
        let topology = Topology::new(TopologyPolicy::FixedOffset, 2).unwrap();
        assert!(matches!(
            WorkerContext::new(WorkerId(2), topology, 8),
            Err(SortError::RankOutOfRange { .. })
        ));
    }

    #[test]
    fn run_root_rejects_helpers() {
        let topology = Topology::new(TopologyPolicy::FixedOffset, 2).unwrap();
        let ctx = WorkerContext::new(WorkerId(1), topology, 8).unwrap();
        let mut channel = NullChannel;
        let mut orch = SortOrchestrator::new(ctx, &mut channel, &StdSort);
        let mut data = vec![2, 1];
        assert!(matches!(
            orch.run_root(&mut data),
            Err(SortError::RootOnly { worker: WorkerId(1) })
        ));
    }

    #[test]
    fn run_helper_rejects_the_root() {
        let mut channel = NullChannel;
        let ctx = single_worker_ctx(8);
        let mut orch = SortOrchestrator::new(ctx, &mut channel, &StdSort);
        assert!(matches!(
            orch.run_helper(),
            Err(SortError::RootIsNotHelper)
        ));
    }
}
