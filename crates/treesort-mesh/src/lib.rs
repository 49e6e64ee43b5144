// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-process treesort cluster: one OS thread per worker, `mpsc` channels
//! between them.
//!
//! The mesh gives every worker the transport contract the orchestrator
//! needs — ordered pairwise delivery, wildcard probe, exact-length receive —
//! with deep-copied buffers so no two workers ever share a work item. The
//! runner spawns the helper ranks on scoped threads, runs the root on the
//! calling thread, and joins everything with fail-fast error aggregation.

mod channel;
mod runner;

/// The per-worker mesh endpoint and its constructor.
pub use channel::{build_mesh, MeshChannel};
/// The scoped-thread cluster runner.
pub use runner::run_job;
