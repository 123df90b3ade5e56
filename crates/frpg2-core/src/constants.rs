//! Protocol constants fixed by the shipped game client.
//!
//! Timer values match the client's expectations; changing them desynchronizes
//! retransmission and keepalive behavior against real peers.

// Wire format sizes
pub const PACKET_MAGIC: u16 = 0xF502;
pub const RELIABLE_HEADER_SIZE: usize = 12;
/// Size of each null-padded steam-id field in the connection prefix.
pub const STEAM_ID_FIELD_SIZE: usize = 66;
/// Steam-id body of the connection prefix (two fields).
pub const INITIAL_DATA_SIZE: usize = 2 * STEAM_ID_FIELD_SIZE;
/// Auth-token prefix framed by the datagram layer.
pub const AUTH_TOKEN_SIZE: usize = 4;
/// Full connection prefix as it appears in a decrypted first-SYN payload.
pub const CONNECTION_PREFIX_SIZE: usize = AUTH_TOKEN_SIZE + INITIAL_DATA_SIZE;

// Sequence counter space
/// Sequence counters are 24-bit modular integers.
pub const MAX_ACK_VALUE: u32 = 1 << 24;
/// Upper quartile threshold for wraparound detection.
pub const MAX_ACK_VALUE_TOP_QUART: u32 = 3 * (1 << 22);
/// Lower quartile threshold for wraparound detection.
pub const MAX_ACK_VALUE_BOTTOM_QUART: u32 = 1 << 22;
/// First local sequence index assigned on a fresh stream.
pub const START_SEQUENCE_INDEX: u32 = 1;

// Flow control
/// Cap on unacknowledged sequenced packets on the wire.
pub const MAX_PACKETS_IN_FLIGHT: usize = 32;

// Timers (seconds)
/// Idle-disconnect threshold enforced by the client supervisor.
pub const CLIENT_TIMEOUT: f64 = 60.0;
/// Age at which an unacknowledged packet triggers retransmission.
pub const RETRANSMIT_INTERVAL: f64 = 1.0;
/// Per-resend cadence while a retransmission cycle is active.
pub const RETRANSMIT_CYCLE_INTERVAL: f64 = 0.3;
/// Rate limit for re-acknowledging duplicate or ahead-of-window arrivals.
pub const MIN_TIME_BETWEEN_RESEND_ACK: f64 = 0.5;
/// Client-side SYN repeat interval (also punches NAT holes).
pub const RESEND_SYN_INTERVAL: f64 = 0.5;
/// Forced `Closing` → `Closed` transition if a graceful FIN is never acked.
pub const CONNECTION_CLOSE_TIMEOUT: f64 = 3.0;
