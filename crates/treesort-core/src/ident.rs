// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Worker identity and tree-addressing primitives.

use std::fmt;

/// Rank of a worker in the flat `[0, worker_count)` identity space.
///
/// A `WorkerId` is immutable for a worker's lifetime and is the only piece of
/// identity a worker needs: its position in the binary process tree, whether
/// it has a delegate, and who that delegate is are all derived from the rank
/// by [`crate::Topology`] without any inter-worker agreement step.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkerId(pub usize);

impl WorkerId {
    /// Returns the raw rank value.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The distinguished root worker: originates the job and holds the final
/// sorted result.
pub const ROOT: WorkerId = WorkerId(0);

/// Depth of delegation authority of a recursive call in progress.
///
/// Not a property of a worker's identity alone: a worker's level increases
/// each time it retains a sub-range and recurses further.
pub type TreeLevel = u32;
