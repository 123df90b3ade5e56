//! Stream-layer error types.

use frpg2_core::WireError;
use frpg2_crypto::CryptoError;

use crate::connection::ConnectionError;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
}
