// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire schema for the treesort multi-process transport.
//!
//! Work buffers, the end-of-job release, and fatal aborts travel between
//! worker processes as framed CBOR packets (see [`wire`]). The schema is
//! direction-agnostic on purpose: an assignment and a sorted reply are both
//! just `data` — the protocol phase of the receiver decides what a buffer
//! means, exactly as in the in-process transport.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use treesort_core::WorkerId;

pub mod wire;

/// Default directory for the per-rank listening sockets.
///
/// Prefers a per-user runtime dir (XDG_RUNTIME_DIR) and falls back to `/tmp`
/// when unavailable.
pub fn default_socket_dir() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
}

/// Listening socket path for one worker rank under `dir`.
pub fn socket_path(dir: &Path, id: WorkerId) -> PathBuf {
    dir.join(format!("treesort-{id}.sock"))
}

/// Envelope carried as the payload of every packet.
///
/// * `op` – operation name (`"data"`, `"shutdown"`, `"abort"`).
/// * `from` – rank of the sending worker.
/// * `payload` – operation-specific body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<P> {
    /// Operation name.
    pub op: String,
    /// Rank of the sending worker.
    pub from: WorkerId,
    /// Operation-specific body.
    pub payload: P,
}

/// Body of a `data` packet: one owned work buffer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataPayload {
    /// The transferred elements.
    pub values: Vec<i32>,
}

/// Body of an `abort` packet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbortPayload {
    /// Human-readable description of the originating failure.
    pub reason: String,
}

/// Wire message kinds carried inside envelope payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A work buffer: an assignment on the way down, a sorted reply on the
    /// way back up (op = "data").
    Data {
        /// The transferred elements.
        values: Vec<i32>,
    },
    /// End-of-job release for workers the topology never reached
    /// (op = "shutdown").
    Shutdown,
    /// Fatal job abort with the originating failure (op = "abort").
    Abort {
        /// Why the job died.
        reason: String,
    },
}

impl Message {
    /// Canonical op string for this message variant.
    pub fn op_name(&self) -> &'static str {
        match self {
            Message::Data { .. } => "data",
            Message::Shutdown => "shutdown",
            Message::Abort { .. } => "abort",
        }
    }
}
