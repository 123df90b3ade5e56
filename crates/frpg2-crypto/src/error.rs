//! Crypto error types.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid length: {reason}")]
    InvalidLength { reason: &'static str },

    #[error("authentication tag mismatch")]
    InvalidTag,
}
