// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for the distributed sort.
//!
//! Every error here is fatal to the whole job: there is no retry or local
//! recovery anywhere in the protocol, because a lost half of a split cannot
//! be reconstructed. The one condition that is deliberately NOT an error is
//! an out-of-range delegate — "no delegate available" is a normal terminal
//! state handled by [`crate::Topology`] returning `None`.

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

use crate::ident::WorkerId;

/// Phase of the per-worker state machine in which a failure occurred.
///
/// Carried in diagnostics so the operator can tell which wait point or
/// transfer went wrong on which worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Blocked on the single inbound assignment from the parent.
    Assignment,
    /// Shipping the upper half of a split to the delegate.
    Delegation,
    /// Blocked on the delegate's sorted reply.
    AwaitResult,
    /// Returning the sorted buffer to the parent.
    Reply,
    /// Broadcasting the end-of-job release to idle workers.
    Release,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Assignment => "awaiting assignment",
            Phase::Delegation => "delegating",
            Phase::AwaitResult => "awaiting the delegate result",
            Phase::Reply => "replying to the parent",
            Phase::Release => "releasing idle workers",
        };
        f.write_str(name)
    }
}

/// Failures raised by a [`crate::TransportChannel`] implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The worker's own inbox closed: every peer endpoint was dropped.
    #[error("worker {worker} inbox closed: all peers disconnected")]
    Closed {
        /// The worker whose inbox closed.
        worker: WorkerId,
    },
    /// The destination worker is no longer reachable.
    #[error("peer {peer} disconnected")]
    Disconnected {
        /// The unreachable destination.
        peer: WorkerId,
    },
    /// The destination rank does not exist in this job.
    #[error("no such peer: {peer}")]
    UnknownPeer {
        /// The out-of-range destination.
        peer: WorkerId,
    },
    /// Another worker hit a fatal error and aborted the whole job.
    #[error("job aborted by worker {origin}: {reason}")]
    Aborted {
        /// The worker that originated the abort.
        origin: WorkerId,
        /// Human-readable description of the originating failure.
        reason: String,
    },
    /// A message carried a different element count than the probe reported.
    #[error("expected {expected} elements from worker {from}, received {received}")]
    LengthMismatch {
        /// The sender of the mismatched message.
        from: WorkerId,
        /// Elements expected at the wait point.
        expected: usize,
        /// Elements actually received.
        received: usize,
    },
    /// A message arrived from a worker other than the awaited sender, on a
    /// transport that cannot retain it (defensive; selective-receive
    /// transports park such messages instead).
    #[error("expected a message from worker {expected}, received one from {received}")]
    UnexpectedSender {
        /// The awaited sender.
        expected: WorkerId,
        /// The actual sender.
        received: WorkerId,
    },
    /// The transport protocol was violated (malformed or out-of-order frame).
    #[error("transport protocol violation: {reason}")]
    Protocol {
        /// What was malformed.
        reason: String,
    },
    /// Underlying I/O failure.
    #[error("transport i/o failure")]
    Io(#[from] std::io::Error),
}

/// Fatal errors for a distributed sort job.
#[derive(Debug, Error)]
pub enum SortError {
    /// The delegation threshold must be a positive element count.
    #[error("delegation threshold must be positive")]
    ZeroThreshold,
    /// At least one worker (the root) must exist.
    #[error("worker count must be positive")]
    ZeroWorkers,
    /// A worker identity falls outside the job's rank space.
    #[error("worker {worker} outside the rank space of {count} workers")]
    RankOutOfRange {
        /// The out-of-range identity.
        worker: WorkerId,
        /// Total workers in the job.
        count: usize,
    },
    /// `run_root` was invoked on a non-root worker.
    #[error("run_root may only run on the root worker, not worker {worker}")]
    RootOnly {
        /// The offending worker.
        worker: WorkerId,
    },
    /// `run_helper` was invoked on the root worker.
    #[error("run_helper may not run on the root worker")]
    RootIsNotHelper,
    /// An auxiliary or receive buffer could not be reserved.
    #[error("could not reserve a buffer of {elements} elements")]
    Allocation {
        /// Requested element count.
        elements: usize,
        /// The allocator's refusal.
        #[source]
        source: TryReserveError,
    },
    /// A transport operation failed; the job cannot continue.
    #[error("worker {worker} failed while {phase}")]
    Transport {
        /// The worker that observed the failure.
        worker: WorkerId,
        /// The state-machine phase at the time of failure.
        phase: Phase,
        /// The underlying transport failure.
        #[source]
        source: TransportError,
    },
    /// A worker thread failed; wraps the worker-local error with its identity.
    #[error("worker {worker} failed")]
    Worker {
        /// The failing worker.
        worker: WorkerId,
        /// The worker-local failure.
        #[source]
        source: Box<SortError>,
    },
}

impl SortError {
    /// True when this failure is a secondary echo of another worker's abort
    /// broadcast rather than the originating fault.
    ///
    /// Runners use this to prefer the primary error when several workers
    /// report failures for the same job.
    #[must_use]
    pub fn is_abort_echo(&self) -> bool {
        match self {
            Self::Transport {
                source: TransportError::Aborted { .. },
                ..
            } => true,
            Self::Worker { source, .. } => source.is_abort_echo(),
            _ => false,
        }
    }
}
