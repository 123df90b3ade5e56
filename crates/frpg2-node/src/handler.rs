//! External collaborator seams.
//!
//! The core never interprets application payloads. Decoded packets go to a
//! [`MessageHandler`], and the auth token carried by each client's traffic
//! is refreshed through an [`AuthService`] so the login service can expire
//! stale sessions.

use frpg2_core::ReliablePacket;

/// Receives every in-order application packet a client delivers.
pub trait MessageHandler {
    fn on_packet(&mut self, peer: &str, packet: &ReliablePacket);
}

/// Keeps session auth tokens alive while their client is talking.
pub trait AuthService {
    fn refresh_auth_token(&self, token: u32);
}

/// Handler that only logs traffic; stands in until game logic is wired up.
#[derive(Debug, Default)]
pub struct TraceHandler;

impl MessageHandler for TraceHandler {
    fn on_packet(&mut self, peer: &str, packet: &ReliablePacket) {
        tracing::debug!(
            peer,
            opcode = %packet.header.opcode,
            sequence = packet.header.local_ack,
            payload = %hex::encode(&packet.payload),
            "message received"
        );
    }
}

/// Auth service that accepts every token without tracking lifetimes.
#[derive(Debug, Default)]
pub struct NullAuthService;

impl AuthService for NullAuthService {
    fn refresh_auth_token(&self, token: u32) {
        tracing::trace!(token, "auth token refresh ignored");
    }
}
