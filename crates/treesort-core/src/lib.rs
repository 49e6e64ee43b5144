// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! treesort-core: distributed divide-and-conquer sort orchestration.
//!
//! A fixed set of cooperating workers arranged in a binary process tree sorts
//! one integer sequence: work fans out along delegation edges (each worker
//! ships half of its range to a delegate and recurses on the rest), bottoms
//! out in a sequential sort below a size threshold, and fans back in through
//! deterministic midpoint merges. Every worker derives the same addressing
//! decisions from `(identity, level, worker_count)` alone — there is no
//! coordination beyond the initial dispatch.
//!
//! Transports are pluggable behind [`TransportChannel`]; see `treesort-mesh`
//! (in-process threads) and `treesort-net` (Unix sockets).
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

mod error;
mod ident;
mod merge;
mod orchestrator;
mod seqsort;
mod topology;
mod transport;

// Re-exports for stable public API
/// Error taxonomy: fatal job errors, transport failures, and failure phases.
pub use error::{Phase, SortError, TransportError};
/// Worker identity space and tree-level primitives.
pub use ident::{TreeLevel, WorkerId, ROOT};
/// Deterministic midpoint merge over two adjacent sorted runs.
pub use merge::merge_midpoint;
/// The per-worker recursive control loop and its context.
pub use orchestrator::{HelperReport, SortOrchestrator, WorkerContext};
/// Sequential sort seam used below the delegation threshold.
pub use seqsort::{BubbleSort, SequentialSorter, StdSort};
/// Rank-space to process-tree address resolution.
pub use topology::{Topology, TopologyPolicy};
/// Blocking point-to-point transport seam consumed by the orchestrator.
pub use transport::{Inbound, TransportChannel};
