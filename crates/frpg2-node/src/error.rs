//! Node error types.

use frpg2_protocol::error::StreamError;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("peer already connected: {0}")]
    PeerAlreadyConnected(std::net::SocketAddr),
}
