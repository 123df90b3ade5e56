//! Cryptographic layer for the FRPG2 datagram protocol.
//!
//! The game client encrypts every UDP datagram with CWC, a legacy
//! authenticated-encryption mode keyed from the per-session key the login
//! service hands out. Interoperability is bit-for-bit, so this crate
//! implements the exact mode rather than a modern AEAD substitute.

mod cwc;
mod error;

pub use cwc::{CwcCipher, CWC_IV_SIZE, CWC_TAG_SIZE};
pub use error::CryptoError;
