// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic framing and CBOR helpers for the socket transport.
//!
//! Packet layout:
//!
//! ``MAGIC(4) || VERSION(2) || FLAGS(2) || LENGTH(4) || PAYLOAD || CHECKSUM(32)``
//!
//! * PAYLOAD is a CBOR [`Envelope`]
//! * CHECKSUM = blake3-256 over HEADER (first 12 bytes) || PAYLOAD

use blake3::Hasher;
use ciborium::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::{AbortPayload, DataPayload, Envelope, Message, WorkerId};

/// Protocol magic constant "TSR!".
pub const MAGIC: [u8; 4] = [0x54, 0x53, 0x52, 0x21];
/// Wire protocol version (big-endian u16).
pub const VERSION: u16 = 0x0001;
/// Reserved flags (set to zero for v1).
pub const FLAGS: u16 = 0x0000;
/// Upper bound on a single packet's CBOR payload; a sort that needs more
/// than this per transfer should raise the delegation threshold instead.
pub const MAX_PAYLOAD: usize = 1 << 30;

/// Failures decoding or encoding a packet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// Fewer bytes than a complete packet.
    #[error("incomplete packet")]
    Incomplete,
    /// The magic constant did not match.
    #[error("bad magic")]
    BadMagic,
    /// A version this implementation does not speak.
    #[error("unsupported version {0:#06x}")]
    UnsupportedVersion(u16),
    /// Declared payload length exceeds [`MAX_PAYLOAD`].
    #[error("payload length {0} exceeds the packet limit")]
    PayloadTooLarge(usize),
    /// Header/payload checksum did not verify.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// CBOR (de)serialization failure.
    #[error("cbor codec failure: {0}")]
    Codec(String),
    /// An op string this implementation does not know.
    #[error("unknown op {0:?}")]
    UnknownOp(String),
}

/// A full packet (header + payload + checksum).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw header (12 bytes).
    pub header: [u8; 12],
    /// CBOR payload bytes.
    pub payload: Vec<u8>,
    /// blake3 checksum over header||payload.
    pub checksum: [u8; 32],
}

impl Packet {
    /// Builds a packet from CBOR payload bytes.
    pub fn from_payload(payload: Vec<u8>) -> Self {
        let mut header = [0u8; 12];
        header[0..4].copy_from_slice(&MAGIC);
        header[4..6].copy_from_slice(&VERSION.to_be_bytes());
        header[6..8].copy_from_slice(&FLAGS.to_be_bytes());
        header[8..12].copy_from_slice(&(payload.len() as u32).to_be_bytes());

        let mut hasher = Hasher::new();
        hasher.update(&header);
        hasher.update(&payload);
        let checksum = *hasher.finalize().as_bytes();

        Packet {
            header,
            payload,
            checksum,
        }
    }

    /// Encodes an [`Envelope`] into a full packet byte vector.
    ///
    /// # Errors
    ///
    /// [`WireError::Codec`] when the envelope cannot be serialized.
    pub fn encode_envelope<P: Serialize>(env: &Envelope<P>) -> Result<Vec<u8>, WireError> {
        let mut payload = Vec::new();
        ciborium::ser::into_writer(env, &mut payload)
            .map_err(|err| WireError::Codec(err.to_string()))?;
        let packet = Packet::from_payload(payload);
        let mut out =
            Vec::with_capacity(packet.header.len() + packet.payload.len() + packet.checksum.len());
        out.extend_from_slice(&packet.header);
        out.extend_from_slice(&packet.payload);
        out.extend_from_slice(&packet.checksum);
        Ok(out)
    }

    /// Decodes a packet from a byte slice, returning the envelope and bytes
    /// consumed.
    ///
    /// # Errors
    ///
    /// Any [`WireError`]; a verified checksum precedes any payload decode.
    pub fn decode_envelope<P: DeserializeOwned>(
        bytes: &[u8],
    ) -> Result<(Envelope<P>, usize), WireError> {
        if bytes.len() < 12 + 32 {
            return Err(WireError::Incomplete);
        }
        if bytes[0..4] != MAGIC {
            return Err(WireError::BadMagic);
        }
        let version = u16::from_be_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(WireError::UnsupportedVersion(version));
        }
        let len = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        if len > MAX_PAYLOAD {
            return Err(WireError::PayloadTooLarge(len));
        }
        if bytes.len() < 12 + len + 32 {
            return Err(WireError::Incomplete);
        }
        let header = &bytes[0..12];
        let payload = &bytes[12..12 + len];
        let checksum = &bytes[12 + len..12 + len + 32];

        let mut hasher = Hasher::new();
        hasher.update(header);
        hasher.update(payload);
        if hasher.finalize().as_bytes() != checksum {
            return Err(WireError::ChecksumMismatch);
        }

        let env: Envelope<P> =
            ciborium::de::from_reader(payload).map_err(|err| WireError::Codec(err.to_string()))?;
        Ok((env, 12 + len + 32))
    }
}

/// Encodes a [`Message`] from `from` into a packet byte vector.
///
/// # Errors
///
/// [`WireError::Codec`] when the message body cannot be serialized.
pub fn encode_message(msg: &Message, from: WorkerId) -> Result<Vec<u8>, WireError> {
    let payload = match msg {
        Message::Data { values } => Value::serialized(&DataPayload {
            values: values.clone(),
        }),
        Message::Shutdown => Ok(Value::Null),
        Message::Abort { reason } => Value::serialized(&AbortPayload {
            reason: reason.clone(),
        }),
    }
    .map_err(|err| WireError::Codec(err.to_string()))?;

    let env = Envelope {
        op: msg.op_name().to_string(),
        from,
        payload,
    };
    Packet::encode_envelope(&env)
}

/// Decodes bytes into (message, sender, bytes consumed).
///
/// # Errors
///
/// Any [`WireError`], including [`WireError::UnknownOp`] for op strings this
/// implementation does not speak.
pub fn decode_message(bytes: &[u8]) -> Result<(Message, WorkerId, usize), WireError> {
    let (env, used) = Packet::decode_envelope::<Value>(bytes)?;
    let from = env.from;
    let msg = match env.op.as_str() {
        "data" => {
            let p: DataPayload = env
                .payload
                .deserialized()
                .map_err(|err| WireError::Codec(err.to_string()))?;
            Message::Data { values: p.values }
        }
        "shutdown" => Message::Shutdown,
        "abort" => {
            let p: AbortPayload = env
                .payload
                .deserialized()
                .map_err(|err| WireError::Codec(err.to_string()))?;
            Message::Abort { reason: p.reason }
        }
        other => return Err(WireError::UnknownOp(other.to_string())),
    };
    Ok((msg, from, used))
}

// --- Unit tests -----------------------------------------------------------
