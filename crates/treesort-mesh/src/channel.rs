// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The in-process mesh transport.

use std::sync::mpsc::{channel, Receiver, Sender};

use treesort_core::{Inbound, TransportChannel, TransportError, WorkerId};

/// A frame on the mesh. Data frames carry an owned copy of the buffer;
/// control frames carry the sender so diagnostics can name the origin.
#[derive(Debug)]
enum Frame {
    Data { from: WorkerId, payload: Vec<i32> },
    Shutdown { from: WorkerId },
    Abort { from: WorkerId, reason: String },
}

/// One worker's endpoint of the in-process mesh.
///
/// Holds a sender handle to every peer and the worker's own inbox. The inbox
/// is one FIFO across all senders, but receives are selective by sender (a
/// delegate deeper in the tree may reply before the one currently awaited),
/// so data frames pulled while looking for a specific sender are parked in
/// `pending` in arrival order. The probe stages frames the same way, so a
/// subsequent receive consumes exactly the message the probe reported.
pub struct MeshChannel {
    id: WorkerId,
    peers: Vec<Option<Sender<Frame>>>,
    inbox: Receiver<Frame>,
    pending: Vec<(WorkerId, Vec<i32>)>,
}

/// Builds a fully connected mesh of `worker_count` endpoints, indexed by
/// rank.
pub fn build_mesh(worker_count: usize) -> Vec<MeshChannel> {
    let (senders, inboxes): (Vec<_>, Vec<_>) = (0..worker_count).map(|_| channel()).unzip();
    inboxes
        .into_iter()
        .enumerate()
        .map(|(rank, inbox)| {
            let peers = senders
                .iter()
                .enumerate()
                .map(|(peer, tx)| (peer != rank).then(|| tx.clone()))
                .collect();
            MeshChannel {
                id: WorkerId(rank),
                peers,
                inbox,
                pending: Vec::new(),
            }
        })
        .collect()
}

impl MeshChannel {
    /// The rank this endpoint belongs to.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    fn next_frame(&mut self) -> Result<Frame, TransportError> {
        self.inbox
            .recv()
            .map_err(|_| TransportError::Closed { worker: self.id })
    }
}

impl TransportChannel for MeshChannel {
    fn send(&mut self, to: WorkerId, payload: &[i32]) -> Result<(), TransportError> {
        let tx = self
            .peers
            .get(to.rank())
            .and_then(Option::as_ref)
            .ok_or(TransportError::UnknownPeer { peer: to })?;
        // Ownership transfers by deep copy: the receiver gets fresh storage.
        tx.send(Frame::Data {
            from: self.id,
            payload: payload.to_vec(),
        })
        .map_err(|_| TransportError::Disconnected { peer: to })
    }

    fn probe(&mut self) -> Result<Inbound, TransportError> {
        if let Some((from, payload)) = self.pending.first() {
            return Ok(Inbound::Work {
                from: *from,
                len: payload.len(),
            });
        }
        match self.next_frame()? {
            Frame::Data { from, payload } => {
                let len = payload.len();
                self.pending.push((from, payload));
                Ok(Inbound::Work { from, len })
            }
            Frame::Shutdown { .. } => Ok(Inbound::Shutdown),
            Frame::Abort { from, reason } => Err(TransportError::Aborted {
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
            match self.next_frame()? {
                // Replies arrive in completion order, not wait order; park
                // anything from another sender until its own receive.
                Frame::Data { from: sender, payload } => self.pending.push((sender, payload)),
                Frame::Shutdown { from: sender } => {
                    return Err(TransportError::Protocol {
                        reason: format!("shutdown from worker {sender} while awaiting data"),
                    })
                }
                Frame::Abort { from: origin, reason } => {
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
        // Workers that already exited dropped their inbox; skipping them is
        // the expected case, not a failure.
        for tx in self.peers.iter().flatten() {
            let _ = tx.send(Frame::Shutdown { from: self.id });
        }
        Ok(())
    }

    fn abort(&mut self, reason: &str) {
        for tx in self.peers.iter().flatten() {
            let _ = tx.send(Frame::Abort {
                from: self.id,
                reason: reason.to_string(),
            });
        }
    }
}
