//! Commit log record and framing.

use crate::error::{EngineError, EngineResult};
use crate::types::{TransactionId, TupleKey};
use serde::{Deserialize, Serialize};

/// Magic bytes at the start of every record.
pub const LOG_MAGIC: [u8; 4] = *b"TDBL";

/// Current record format version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
pub(crate) const HEADER_SIZE: usize = 10;

pub(crate) const CRC_SIZE: usize = 4;

/// Everything one committed write transaction changed.
///
/// `closed` lists keys whose live row was stamped with `txn`; `inserted` lists
/// the rows created at `txn`. Either may be empty: a commit that changed
/// nothing still advances the head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// The committed transaction.
    pub txn: TransactionId,
    /// Wall-clock commit time, milliseconds since the Unix epoch.
    pub committed_at_ms: u64,
    /// Keys closed by this transaction.
    pub closed: Vec<TupleKey>,
    /// Keys inserted by this transaction.
    pub inserted: Vec<TupleKey>,
}

impl CommitRecord {
    /// Encodes the record inside its envelope:
    ///
    /// ```text
    /// | magic (4) | version (2) | length (4) | CBOR payload (N) | crc32 (4) |
    /// ```
    pub fn encode(&self) -> EngineResult<Vec<u8>> {
        let mut payload = Vec::new();
        ciborium::ser::into_writer(self, &mut payload).map_err(EngineError::codec)?;
        let len = u32::try_from(payload.len())
            .map_err(|_| EngineError::codec("commit record larger than 4 GiB"))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&LOG_MAGIC);
        frame.extend_from_slice(&LOG_VERSION.to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);

        let crc = compute_crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }

    /// Decodes a CBOR payload taken from inside an envelope.
    pub fn decode_payload(payload: &[u8]) -> EngineResult<Self> {
        ciborium::de::from_reader(payload).map_err(EngineError::codec)
    }
}

/// Parsed fixed-size header of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub version: u16,
    pub payload_len: u32,
}

impl FrameHeader {
    /// Parses a header, or `None` if the magic bytes are wrong.
    pub(crate) fn parse(bytes: &[u8; HEADER_SIZE]) -> Option<Self> {
        if bytes[0..4] != LOG_MAGIC {
            return None;
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        let payload_len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        Some(Self {
            version,
            payload_len,
        })
    }

    /// Bytes the whole frame occupies.
    pub(crate) fn frame_len(self) -> u64 {
        (HEADER_SIZE + CRC_SIZE) as u64 + u64::from(self.payload_len)
    }
}

/// CRC-32 (IEEE) over `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}
