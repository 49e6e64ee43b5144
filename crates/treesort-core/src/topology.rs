// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rank-space to process-tree address resolution.
//!
//! Given only `(identity, level, worker_count)`, every worker must arrive at
//! the same answer to "who is my delegate at this step, if anyone?" without
//! talking to any other worker. Two interchangeable policies are supported;
//! the orchestration loop is policy-agnostic.

use crate::error::SortError;
use crate::ident::{TreeLevel, WorkerId};

/// Addressing policy mapping `(identity, level)` to a delegate rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyPolicy {
    /// Static binary-heap addressing: a worker's delegates are its heap
    /// children, spent one per recursion level — `2·id + 1` at level 0,
    /// `2·id + 2` at level 1, nothing deeper. A worker discovers its
    /// sub-range size only from the length of the transfer it receives.
    FixedOffset,
    /// Recursive doubling: the delegate at `level` is `id + 2^level`. A
    /// worker first participates at the smallest level `L` with `2^L > id`
    /// (the level at which it became reachable from the root) and each
    /// recursive call increments the level from there.
    RecursiveDoubling,
}

/// Deterministic resolver for one job's process tree.
///
/// Cheap to copy; the orchestrator carries it by value in its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    policy: TopologyPolicy,
    worker_count: usize,
}

impl Topology {
    /// Builds a resolver for `worker_count` workers under `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`SortError::ZeroWorkers`] when `worker_count` is zero; a job
    /// without even a root is unreachable topology.
    pub fn new(policy: TopologyPolicy, worker_count: usize) -> Result<Self, SortError> {
        if worker_count == 0 {
            return Err(SortError::ZeroWorkers);
        }
        Ok(Self {
            policy,
            worker_count,
        })
    }

    /// The addressing policy in force.
    #[must_use]
    pub fn policy(&self) -> TopologyPolicy {
        self.policy
    }

    /// Total workers participating in the job.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// The level at which `id` starts its own recursion.
    ///
    /// Under `FixedOffset` every worker spends its delegates from level 0.
    /// Under `RecursiveDoubling` a worker resumes at its topmost
    /// participation level: the smallest `L` with `2^L > id`, which is the
    /// bit length of the rank.
    #[must_use]
    pub fn start_level(&self, id: WorkerId) -> TreeLevel {
        match self.policy {
            TopologyPolicy::FixedOffset => 0,
            TopologyPolicy::RecursiveDoubling => usize::BITS - id.0.leading_zeros(),
        }
    }

    /// Resolves the delegate for `id` at `level`, if one exists.
    ///
    /// `None` means the tree is exhausted for this call: either the policy
    /// has no child at this level or the resolved rank falls outside
    /// `[0, worker_count)`. Callers must fall through to a local sort —
    /// exhaustion is a normal terminal condition, never an error.
    #[must_use]
    pub fn delegate(&self, id: WorkerId, level: TreeLevel) -> Option<WorkerId> {
        let candidate = match self.policy {
            TopologyPolicy::FixedOffset => {
                let slot = match level {
                    0 => 1,
                    1 => 2,
                    _ => return None,
                };
                id.0.checked_mul(2)?.checked_add(slot)?
            }
            TopologyPolicy::RecursiveDoubling => {
                let step = 1usize.checked_shl(level)?;
                id.0.checked_add(step)?
            }
        };
        (candidate < self.worker_count).then_some(WorkerId(candidate))
    }
}
