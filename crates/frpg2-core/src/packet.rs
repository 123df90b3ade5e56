//! Reliable packet header and wire codec.
//!
//! The header is the 12-byte structure at the front of every reliable
//! packet:
//!
//! ```text
//! magic(u16, BE) || packed_counters(u48, BE) || opcode(u8) || unknown_1(u8) || unknown_2(u16, BE)
//! ```
//!
//! `packed_counters` carries two 24-bit fields: the sender's own sequence
//! index (`local_ack`, high 24 bits) and the latest peer sequence the sender
//! acknowledges (`remote_ack`, low 24 bits). Both unknown fields are echoed
//! as zero.

use std::fmt::Write as _;

use crate::constants::{PACKET_MAGIC, RELIABLE_HEADER_SIZE};
use crate::error::WireError;
use crate::opcode::OpCode;

/// Pack the two 24-bit ack counters into the 6-byte wire field.
///
/// Layout (local big-endian, then remote big-endian) is lifted from the
/// reference binary's counter helpers and still needs confirmation by packet
/// capture against a live client.
#[must_use]
pub fn pack_ack_counters(local_ack: u32, remote_ack: u32) -> [u8; 6] {
    [
        (local_ack >> 16) as u8,
        (local_ack >> 8) as u8,
        local_ack as u8,
        (remote_ack >> 16) as u8,
        (remote_ack >> 8) as u8,
        remote_ack as u8,
    ]
}

/// Unpack the 6-byte wire field into `(local_ack, remote_ack)`.
#[must_use]
pub fn unpack_ack_counters(field: &[u8; 6]) -> (u32, u32) {
    let local = u32::from(field[0]) << 16 | u32::from(field[1]) << 8 | u32::from(field[2]);
    let remote = u32::from(field[3]) << 16 | u32::from(field[4]) << 8 | u32::from(field[5]);
    (local, remote)
}

/// Decoded reliable packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReliableHeader {
    pub local_ack: u32,
    pub remote_ack: u32,
    pub opcode: OpCode,
    pub unknown_1: u8,
    pub unknown_2: u16,
}

impl ReliableHeader {
    pub const SIZE: usize = RELIABLE_HEADER_SIZE;

    pub fn new(opcode: OpCode, local_ack: u32, remote_ack: u32) -> Self {
        Self {
            local_ack,
            remote_ack,
            opcode,
            unknown_1: 0,
            unknown_2: 0,
        }
    }

    /// Encode the header into its wire format.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let counters = pack_ack_counters(self.local_ack, self.remote_ack);
        let mut out = [0u8; Self::SIZE];
        out[0..2].copy_from_slice(&PACKET_MAGIC.to_be_bytes());
        out[2..8].copy_from_slice(&counters);
        out[8] = self.opcode.as_u8();
        out[9] = self.unknown_1;
        out[10..12].copy_from_slice(&self.unknown_2.to_be_bytes());
        out
    }

    /// Decode a header from the front of `data`.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < Self::SIZE {
            return Err(WireError::PacketTooShort {
                actual: data.len(),
                min: Self::SIZE,
            });
        }

        let magic = u16::from_be_bytes([data[0], data[1]]);
        if magic != PACKET_MAGIC {
            return Err(WireError::BadMagic(magic));
        }

        let counters: [u8; 6] = data[2..8].try_into().expect("slice is exactly 6 bytes");
        let (local_ack, remote_ack) = unpack_ack_counters(&counters);
        let opcode = OpCode::from_u8(data[8])?;

        Ok(Self {
            local_ack,
            remote_ack,
            opcode,
            unknown_1: data[9],
            unknown_2: u16::from_be_bytes([data[10], data[11]]),
        })
    }
}

/// One reliable packet: header plus opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReliablePacket {
    pub header: ReliableHeader,
    pub payload: Vec<u8>,
    /// When the packet entered the send queue; drives retransmission age.
    /// Zero until the stream stamps it.
    pub send_time: f64,
}

impl ReliablePacket {
    pub fn new(opcode: OpCode, local_ack: u32, remote_ack: u32, payload: Vec<u8>) -> Self {
        Self {
            header: ReliableHeader::new(opcode, local_ack, remote_ack),
            payload,
            send_time: 0.0,
        }
    }

    /// An application message; the stream resolves the opcode and counters on
    /// send.
    pub fn message(payload: Vec<u8>) -> Self {
        Self::new(OpCode::Unset, 0, 0, payload)
    }

    /// An application message that also acknowledges the peer sequence it
    /// responds to; the stream resolves it to a DAT_ACK on send.
    pub fn response(payload: Vec<u8>, remote_ack: u32) -> Self {
        Self::new(OpCode::Unset, 0, remote_ack, payload)
    }

    /// Encode header and payload into one buffer.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ReliableHeader::SIZE + self.payload.len());
        out.extend_from_slice(&self.header.encode());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode a packet from a full reliable-layer buffer.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let header = ReliableHeader::decode(data)?;

        tracing::trace!(
            opcode = %header.opcode,
            local_ack = header.local_ack,
            remote_ack = header.remote_ack,
            payload_len = data.len() - ReliableHeader::SIZE,
            "decoded reliable packet"
        );

        Ok(Self {
            header,
            payload: data[ReliableHeader::SIZE..].to_vec(),
            send_time: 0.0,
        })
    }

    /// Human-readable rendering for wire-level diagnosis. Payload bytes are
    /// included for control opcodes only; DAT payloads are application data
    /// and usually large.
    #[must_use]
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        out.push_str("Reliable-Packet:\n");
        let _ = writeln!(out, "\t{:<12} = 0x{:04X}", "magic", PACKET_MAGIC);
        let _ = writeln!(out, "\t{:<12} = {}", "local_ack", self.header.local_ack);
        let _ = writeln!(out, "\t{:<12} = {}", "remote_ack", self.header.remote_ack);
        let _ = writeln!(out, "\t{:<12} = {}", "opcode", self.header.opcode);
        let _ = writeln!(out, "\t{:<12} = {}", "unknown_1", self.header.unknown_1);
        let _ = writeln!(out, "\t{:<12} = {}", "unknown_2", self.header.unknown_2);

        if !matches!(self.header.opcode, OpCode::Dat | OpCode::DatAck) {
            out.push_str("Payload:\n\t");
            for byte in &self.payload {
                let _ = write!(out, "{byte:02x}");
            }
            out.push('\n');
        }
        out
    }
}
