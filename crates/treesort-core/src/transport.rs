// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Blocking point-to-point transport seam consumed by the orchestrator.
//!
//! The contract mirrors the protocol's needs exactly: ordered pairwise
//! delivery, a wildcard probe that reports sender and length without
//! consuming the message, and an exact-length receive. Sends may complete
//! eagerly (fire-and-forget) at the implementation's discretion; receives
//! always block. There are no timeouts — a lost message blocks forever by
//! design, so transport failures must surface as errors, never as silence.

use crate::error::TransportError;
use crate::ident::WorkerId;

/// What a wildcard probe found in the inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// A work or reply buffer is waiting. The message is NOT consumed: a
    /// subsequent [`TransportChannel::recv`] of exactly `len` elements from
    /// `from` takes it.
    Work {
        /// The sender — under wildcard assignment this is how a helper
        /// discovers its parent.
        from: WorkerId,
        /// Element count of the pending buffer.
        len: usize,
    },
    /// The root finished the job; an idle worker may exit its assignment
    /// wait instead of blocking forever.
    Shutdown,
}

/// One worker's endpoint of the point-to-point transport.
///
/// Implementations must preserve per-sender/receiver ordering and must hand
/// the receiver a fresh copy of every buffer: a transferred work item is
/// owned, never shared.
pub trait TransportChannel {
    /// Ships `payload` to worker `to`. Ordering per sender/receiver pair is
    /// preserved; delivery of a correct protocol's messages is guaranteed or
    /// the job dies with an error.
    ///
    /// # Errors
    ///
    /// Any [`TransportError`]; all are fatal to the job.
    fn send(&mut self, to: WorkerId, payload: &[i32]) -> Result<(), TransportError>;

    /// Blocks until something is inbound and describes it without consuming
    /// it.
    ///
    /// # Errors
    ///
    /// [`TransportError::Aborted`] when another worker killed the job, or
    /// any other fatal transport failure.
    fn probe(&mut self) -> Result<Inbound, TransportError>;

    /// Blocks until the matching message from `from` arrives and consumes it
    /// into `into`, whose length must equal the sent element count.
    ///
    /// Receives are selective: a buffer from any other sender (a delegate
    /// deeper in the tree replying early) must be retained for its own
    /// receive, not surfaced here.
    ///
    /// # Errors
    ///
    /// [`TransportError::LengthMismatch`] on a protocol violation, plus any
    /// fatal transport failure.
    fn recv(&mut self, from: WorkerId, into: &mut [i32]) -> Result<(), TransportError>;

    /// Root-side broadcast after the job completes, releasing workers the
    /// topology never reached. Peers that already exited are skipped.
    ///
    /// # Errors
    ///
    /// Fatal transport failures only; unreachable peers are not errors.
    fn shutdown(&mut self) -> Result<(), TransportError>;

    /// Best-effort fatal broadcast: tells every peer the job is dead and
    /// why. Never fails — a worker that cannot be told will observe a
    /// disconnect instead.
    fn abort(&mut self, reason: &str);
}
