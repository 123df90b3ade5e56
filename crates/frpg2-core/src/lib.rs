//! Wire formats and constants for the FRPG2 reliable-datagram protocol.
//!
//! This crate defines everything that appears on the wire below the cipher:
//! the reliable packet header, the opcode set, the connection prefix carried
//! ahead of the first SYN, and the 24-bit modular sequence arithmetic the
//! reliability layer is built on.

pub mod constants;
pub mod error;
pub mod opcode;
pub mod packet;
pub mod prefix;
pub mod sequence;

pub use error::WireError;
pub use opcode::OpCode;
pub use packet::{ReliableHeader, ReliablePacket};
pub use prefix::InitialData;
