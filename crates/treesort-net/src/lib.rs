// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Unix-socket transport for multi-process treesort clusters.
//!
//! Every worker rank binds one listening socket under a shared runtime
//! directory; a send is one connection carrying one framed packet (see
//! `treesort-proto`), datagram-style. Sends from one worker to another are
//! strictly sequential in the sender's control flow and each completes
//! before the next starts, so per-pair ordering is preserved without
//! persistent connections. All I/O is blocking `std`, matching the
//! protocol's single-threaded worker model.

use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use treesort_core::{Inbound, TransportChannel, TransportError, WorkerId};
use treesort_proto::wire::{decode_message, encode_message};
use treesort_proto::{socket_path, Message};

pub use treesort_proto::default_socket_dir;

/// Connection attempts against a peer that has not bound its socket yet.
///
/// Worker processes are launched independently and bind in any order; this
/// bounds the bootstrap race only. Once the cluster is up, a missing peer is
/// a dead peer and the job must die with it.
const CONNECT_ATTEMPTS: u32 = 100;
/// Pause between bootstrap connection attempts.
const CONNECT_BACKOFF: Duration = Duration::from_millis(50);

/// One worker's socket endpoint of a multi-process cluster.
///
/// Receives are selective by sender: a delegate deeper in the tree may
/// connect with its reply before the currently awaited one, so data
/// messages accepted while looking for a specific sender are parked in
/// `pending` in arrival order.
pub struct SocketChannel {
    id: WorkerId,
    worker_count: usize,
    dir: PathBuf,
    listener: UnixListener,
    pending: Vec<(WorkerId, Vec<i32>)>,
}

impl SocketChannel {
    /// Binds rank `id`'s listening socket under `dir`, replacing a stale
    /// socket file from a previous run.
    ///
    /// # Errors
    ///
    /// [`TransportError::Io`] when the socket cannot be bound.
    pub fn bind(id: WorkerId, worker_count: usize, dir: &Path) -> Result<Self, TransportError> {
        let path = socket_path(dir, id);
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path)?;
        debug!(worker = %id, path = %path.display(), "listening");
        Ok(Self {
            id,
            worker_count,
            dir: dir.to_path_buf(),
            listener,
            pending: Vec::new(),
        })
    }

    /// The rank this endpoint belongs to.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    fn connect(&self, to: WorkerId) -> Result<UnixStream, TransportError> {
        if to == self.id || to.rank() >= self.worker_count {
            return Err(TransportError::UnknownPeer { peer: to });
        }
        let path = socket_path(&self.dir, to);
        let mut attempt = 0;
        loop {
            match UnixStream::connect(&path) {
                Ok(stream) => return Ok(stream),
                Err(err)
                    if attempt < CONNECT_ATTEMPTS
                        && matches!(
                            err.kind(),
                            std::io::ErrorKind::NotFound
                                | std::io::ErrorKind::ConnectionRefused
                        ) =>
                {
                    attempt += 1;
                    std::thread::sleep(CONNECT_BACKOFF);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn transmit(&self, to: WorkerId, msg: &Message) -> Result<(), TransportError> {
        let bytes = encode_message(msg, self.id).map_err(|err| TransportError::Protocol {
            reason: err.to_string(),
        })?;
        let mut stream = self.connect(to)?;
        stream.write_all(&bytes)?;
        stream.shutdown(Shutdown::Write)?;
        Ok(())
    }

    /// Single-attempt transmit for best-effort broadcasts: a released or
    /// exited peer must be skipped immediately, not waited for.
    fn try_transmit(&self, to: WorkerId, msg: &Message) {
        let Ok(bytes) = encode_message(msg, self.id) else {
            return;
        };
        let path = socket_path(&self.dir, to);
        if let Ok(mut stream) = UnixStream::connect(&path) {
            let _ = stream.write_all(&bytes);
            let _ = stream.shutdown(Shutdown::Write);
        }
    }

    fn next_message(&mut self) -> Result<(WorkerId, Message), TransportError> {
        let (mut stream, _addr) = self.listener.accept()?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        let (msg, from, _used) =
            decode_message(&bytes).map_err(|err| TransportError::Protocol {
                reason: err.to_string(),
            })?;
        Ok((from, msg))
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(socket_path(&self.dir, self.id));
    }
}

impl TransportChannel for SocketChannel {
    fn send(&mut self, to: WorkerId, payload: &[i32]) -> Result<(), TransportError> {
        self.transmit(
            to,
            &Message::Data {
                values: payload.to_vec(),
            },
        )
    }

    fn probe(&mut self) -> Result<Inbound, TransportError> {
        if let Some((from, payload)) = self.pending.first() {
            return Ok(Inbound::Work {
                from: *from,
                len: payload.len(),
            });
        }
        match self.next_message()? {
            (from, Message::Data { values }) => {
                let len = values.len();
                self.pending.push((from, values));
                Ok(Inbound::Work { from, len })
            }
            (_, Message::Shutdown) => Ok(Inbound::Shutdown),
            (from, Message::Abort { reason }) => Err(TransportError::Aborted {
                origin: from,
                reason,
            }),
        }
    }

    fn recv(&mut self, from: WorkerId, into: &mut [i32]) -> Result<(), TransportError> {
        let payload = loop {
            if let Some(pos) = self.pending.iter().position(|(sender, _)| *sender == from) {
                break self.pending.remove(pos).1;
            }
            match self.next_message()? {
                // Replies arrive in completion order, not wait order; park
                // anything from another sender until its own receive.
                (sender, Message::Data { values }) => self.pending.push((sender, values)),
                (sender, Message::Shutdown) => {
                    return Err(TransportError::Protocol {
                        reason: format!("shutdown from worker {sender} while awaiting data"),
                    })
                }
                (origin, Message::Abort { reason }) => {
                    return Err(TransportError::Aborted { origin, reason })
                }
            }
        };
        if payload.len() != into.len() {
            return Err(TransportError::LengthMismatch {
                from,
                expected: into.len(),
                received: payload.len(),
            });
        }
        into.copy_from_slice(&payload);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), TransportError> {
        // Served workers exit as soon as they reply; their sockets being
        // gone is the expected case, not a failure.
        for rank in 0..self.worker_count {
            let to = WorkerId(rank);
            if to != self.id {
                self.try_transmit(to, &Message::Shutdown);
            }
        }
        Ok(())
    }

    fn abort(&mut self, reason: &str) {
        for rank in 0..self.worker_count {
            let to = WorkerId(rank);
            if to != self.id {
                self.try_transmit(
                    to,
                    &Message::Abort {
                        reason: reason.to_string(),
                    },
                );
            }
        }
    }
}
