//! Wire-format error types.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("packet too short: {actual} bytes (minimum {min})")]
    PacketTooShort { actual: usize, min: usize },

    #[error("bad header magic: 0x{0:04X}")]
    BadMagic(u16),

    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpCode(u8),

    #[error("connection prefix too short: {actual} bytes (expected {expected})")]
    PrefixTooShort { actual: usize, expected: usize },

    #[error("steam id too long: {0} bytes")]
    SteamIdTooLong(usize),
}
