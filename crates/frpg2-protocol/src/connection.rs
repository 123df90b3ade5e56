//! Datagram transport seam.
//!
//! The stream layers never touch a socket directly; they talk to a
//! [`NetConnection`]. The node crate implements it over a shared UDP socket
//! demultiplexed per peer, and [`crate::loopback`] provides an in-memory
//! pair for tests.

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection closed")]
    Closed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A non-blocking datagram endpoint bound to one peer.
pub trait NetConnection {
    /// Human-readable peer name used as log context.
    fn name(&self) -> &str;

    /// Queue one datagram for the peer. Datagram loss is normal UDP
    /// behavior and is not an error; only transport failure is.
    fn send(&mut self, datagram: &[u8]) -> Result<(), ConnectionError>;

    /// Poll one inbound datagram; `None` when nothing is waiting.
    fn poll_recv(&mut self) -> Result<Option<Vec<u8>>, ConnectionError>;

    /// Drive transport housekeeping. Returns true when the transport has
    /// failed and the stream above must be torn down.
    fn pump(&mut self) -> bool;
}
