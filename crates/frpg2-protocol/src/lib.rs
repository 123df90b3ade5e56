//! Reliable-datagram stream state machines for the FRPG2 protocol.
//!
//! Two stacked layers per peer, both synchronous and transport-agnostic:
//!
//! - [`UdpPacketStream`] turns raw datagrams from a [`NetConnection`] into
//!   authenticated plaintext payloads (and back) using the session's CWC
//!   cipher.
//! - [`ReliableUdpStream`] runs the connection state machine on top:
//!   handshake, sequencing, retransmission, in-order delivery, teardown.
//!
//! Everything is driven by `pump()` from a single owning thread; timers read
//! an injected [`clock::TimeSource`].

pub mod clock;
pub mod connection;
pub mod error;
pub mod loopback;
pub mod reliable;
pub mod udp_stream;

pub use connection::{ConnectionError, NetConnection};
pub use reliable::{ReliableUdpStream, StreamState};
pub use udp_stream::{UdpPacket, UdpPacketStream};
