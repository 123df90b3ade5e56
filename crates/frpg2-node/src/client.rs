//! Per-client supervision.
//!
//! A [`GameClient`] owns one reliable stream and decides when its peer is
//! gone: idle timeout, transport failure, or a terminal stream state all
//! surface as a disconnect request to the owning service. It is the only
//! layer that applies disconnect policy; everything below reports by flag.

use frpg2_core::constants::CLIENT_TIMEOUT;
use frpg2_protocol::clock::SharedClock;
use frpg2_protocol::{NetConnection, ReliableUdpStream};

use crate::handler::{AuthService, MessageHandler};

/// Supervisor for one connected peer.
pub struct GameClient<C: NetConnection> {
    stream: ReliableUdpStream<C>,
    clock: SharedClock,
}

impl<C: NetConnection> GameClient<C> {
    pub fn new(stream: ReliableUdpStream<C>, clock: SharedClock) -> Self {
        Self { stream, clock }
    }

    pub fn name(&self) -> &str {
        self.stream.name()
    }

    pub fn stream(&self) -> &ReliableUdpStream<C> {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut ReliableUdpStream<C> {
        &mut self.stream
    }

    /// Ask the peer to close gracefully.
    pub fn disconnect(&mut self) {
        self.stream.disconnect();
    }

    /// One supervision tick. Returns true when the client should be dropped.
    pub fn poll(&mut self, handler: &mut dyn MessageHandler, auth: &dyn AuthService) -> bool {
        let now = self.clock.now();

        // Nothing valid heard from the peer for too long.
        if now - self.stream.last_packet_received_time() >= CLIENT_TIMEOUT {
            tracing::warn!(client = self.stream.name(), "client timed out");
            return true;
        }

        // Pumping the stream drives the datagram layer and the transport
        // underneath it; a true return covers all three.
        if self.stream.pump() {
            tracing::warn!(
                client = self.stream.name(),
                state = self.stream.state().name(),
                "dropping client, stream reached a terminal state"
            );
            return true;
        }

        // Hand every decoded message to the game logic, keeping the session
        // token alive while the client is talking.
        let mut packets = Vec::new();
        while let Some(packet) = self.stream.receive() {
            packets.push(packet);
        }
        for packet in packets {
            auth.refresh_auth_token(self.stream.auth_token());
            handler.on_packet(self.stream.name(), &packet);
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::Arc;

    use frpg2_core::constants::CLIENT_TIMEOUT;
    use frpg2_core::ReliablePacket;
    use frpg2_protocol::clock::ManualClock;
    use frpg2_protocol::loopback::{loopback_pair, LoopbackConnection};
    use frpg2_protocol::UdpPacketStream;

    const KEY: [u8; 16] = [0x33; 16];
    const TOKEN: u32 = 0x1234_5678;

    #[derive(Default)]
    struct RecordingHandler {
        packets: Vec<(String, Vec<u8>)>,
    }

    impl MessageHandler for RecordingHandler {
        fn on_packet(&mut self, peer: &str, packet: &ReliablePacket) {
            self.packets.push((peer.to_string(), packet.payload.clone()));
        }
    }

    #[derive(Default)]
    struct RecordingAuth {
        tokens: RefCell<Vec<u32>>,
    }

    impl AuthService for RecordingAuth {
        fn refresh_auth_token(&self, token: u32) {
            self.tokens.borrow_mut().push(token);
        }
    }

    fn make_stream(
        connection: LoopbackConnection,
        clock: &Arc<ManualClock>,
    ) -> ReliableUdpStream<LoopbackConnection> {
        ReliableUdpStream::new(
            UdpPacketStream::new(connection, &KEY, TOKEN).unwrap(),
            clock.clone(),
        )
    }

    #[test]
    fn idle_client_times_out() {
        let clock = ManualClock::new(100.0);
        let (_peer, conn) = loopback_pair("peer", "server");
        let mut client = GameClient::new(make_stream(conn, &clock), clock.clone());
        let mut handler = RecordingHandler::default();
        let auth = RecordingAuth::default();

        assert!(!client.poll(&mut handler, &auth));

        clock.advance(CLIENT_TIMEOUT + 0.1);
        assert!(client.poll(&mut handler, &auth));
    }

    #[test]
    fn transport_failure_requests_disconnect() {
        let clock = ManualClock::new(100.0);
        let (_peer, conn) = loopback_pair("peer", "server");
        let mut client = GameClient::new(make_stream(conn, &clock), clock.clone());
        let mut handler = RecordingHandler::default();
        let auth = RecordingAuth::default();

        client.stream_mut().connection_mut().fail();
        assert!(client.poll(&mut handler, &auth));
    }

    #[test]
    fn messages_are_dispatched_with_auth_refresh() {
        let clock = ManualClock::new(100.0);
        let (peer_conn, server_conn) = loopback_pair("peer", "server");
        let mut peer = make_stream(peer_conn, &clock);
        let mut client = GameClient::new(make_stream(server_conn, &clock), clock.clone());
        let mut handler = RecordingHandler::default();
        let auth = RecordingAuth::default();

        // Handshake: the peer connects, the supervised side answers.
        peer.connect("76561198000000001");
        for _ in 0..3 {
            peer.pump();
            client.poll(&mut handler, &auth);
        }
        assert!(peer.is_established());
        assert!(client.stream().is_established());

        peer.send(ReliablePacket::message(b"hello".to_vec()));
        peer.send(ReliablePacket::message(b"world".to_vec()));
        peer.pump();

        assert!(!client.poll(&mut handler, &auth));
        assert_eq!(handler.packets.len(), 2);
        assert_eq!(handler.packets[0].1, b"hello");
        assert_eq!(handler.packets[1].1, b"world");
        assert_eq!(handler.packets[0].0, "server");
        assert_eq!(auth.tokens.borrow().as_slice(), &[TOKEN, TOKEN]);
    }
}
