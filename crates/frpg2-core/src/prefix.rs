//! Connection prefix carried ahead of the first SYN.
//!
//! The client's first datagram opens with a 136-byte prefix instead of a
//! reliable header: a 4-byte big-endian auth token (framed by the datagram
//! layer) followed by the client's steam id twice, each as a null-padded
//! 66-byte field. This module handles the steam-id body; the token is the
//! datagram layer's concern.

use crate::constants::{INITIAL_DATA_SIZE, STEAM_ID_FIELD_SIZE};
use crate::error::WireError;

/// Whether a decrypted payload opens with a reliable header rather than the
/// connection prefix. Headers start `0xF5`; `0x25` also appears as a leading
/// byte in captures and is grandfathered into the check.
#[must_use]
pub fn starts_with_header(payload: &[u8]) -> bool {
    matches!(payload.first(), Some(0xF5 | 0x25))
}

/// The steam-id body of the connection prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialData {
    pub steam_id: String,
}

impl InitialData {
    pub const SIZE: usize = INITIAL_DATA_SIZE;

    /// Build the prefix body: the steam id twice, each null-padded to its
    /// fixed field width.
    pub fn encode(steam_id: &str) -> Result<[u8; Self::SIZE], WireError> {
        // Leave room for the terminating NUL.
        if steam_id.len() >= STEAM_ID_FIELD_SIZE {
            return Err(WireError::SteamIdTooLong(steam_id.len()));
        }

        let mut out = [0u8; Self::SIZE];
        out[..steam_id.len()].copy_from_slice(steam_id.as_bytes());
        out[STEAM_ID_FIELD_SIZE..STEAM_ID_FIELD_SIZE + steam_id.len()]
            .copy_from_slice(steam_id.as_bytes());
        Ok(out)
    }

    /// Parse the prefix body from the front of `data`.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < Self::SIZE {
            return Err(WireError::PrefixTooShort {
                actual: data.len(),
                expected: Self::SIZE,
            });
        }

        let field = &data[..STEAM_ID_FIELD_SIZE];
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        let steam_id = String::from_utf8_lossy(&field[..end]).into_owned();

        Ok(Self { steam_id })
    }
}
