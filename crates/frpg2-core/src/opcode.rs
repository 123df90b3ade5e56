//! Reliable-stream opcodes.

use crate::error::WireError;

/// Operation code carried in the reliable header.
///
/// Byte values were lifted from the reference binary and must be confirmed
/// by packet capture against a live client before they can be treated as
/// final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Placeholder for outgoing packets whose opcode the stream resolves on
    /// send. Never valid on the wire.
    Unset = 0x00,
    Syn = 0x02,
    Ack = 0x04,
    /// Believed to be a reject-ACK; ignored on receipt.
    Rack = 0x05,
    SynAck = 0x12,
    Dat = 0x25,
    Hbt = 0x27,
    Fin = 0x30,
    FinAck = 0x31,
    Rst = 0x38,
    DatAck = 0x66,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Result<Self, WireError> {
        match value {
            0x00 => Ok(OpCode::Unset),
            0x02 => Ok(OpCode::Syn),
            0x04 => Ok(OpCode::Ack),
            0x05 => Ok(OpCode::Rack),
            0x12 => Ok(OpCode::SynAck),
            0x25 => Ok(OpCode::Dat),
            0x27 => Ok(OpCode::Hbt),
            0x30 => Ok(OpCode::Fin),
            0x31 => Ok(OpCode::FinAck),
            0x38 => Ok(OpCode::Rst),
            0x66 => Ok(OpCode::DatAck),
            other => Err(WireError::UnknownOpCode(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether transmission consumes a local sequence number and goes through
    /// the retransmission channel. Everything else is sent raw at any time.
    pub fn is_sequenced(self) -> bool {
        matches!(self, OpCode::Dat | OpCode::DatAck | OpCode::FinAck)
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Unset => "UNSET",
            OpCode::Syn => "SYN",
            OpCode::Ack => "ACK",
            OpCode::Rack => "RACK",
            OpCode::SynAck => "SYN_ACK",
            OpCode::Dat => "DAT",
            OpCode::Hbt => "HBT",
            OpCode::Fin => "FIN",
            OpCode::FinAck => "FIN_ACK",
            OpCode::Rst => "RST",
            OpCode::DatAck => "DAT_ACK",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
