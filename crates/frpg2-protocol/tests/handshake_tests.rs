//! Handshake and connection-lifecycle coverage for the reliable stream.

mod common;

use frpg2_core::constants::RESEND_SYN_INTERVAL;
use frpg2_core::{OpCode, ReliablePacket};
use frpg2_crypto::CwcCipher;
use frpg2_protocol::clock::ManualClock;
use frpg2_protocol::StreamState;

use common::{establish, pump_both, stream_pair, wire_packets, STEAM_ID};

#[test]
fn clean_handshake_establishes_both_sides() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);

    client.connect(STEAM_ID);

    // The first SYN carries the connection prefix with the steam id.
    let syn_wire = client.connection_mut().outbound_wire();
    let syn = &wire_packets(&syn_wire)[0];
    assert_eq!(syn.header.opcode, OpCode::Syn);
    assert_eq!(syn.header.local_ack, 1);
    assert_eq!(syn.header.remote_ack, 0);

    pump_both(&mut client, &mut server, 3);

    assert_eq!(client.state(), StreamState::Established);
    assert_eq!(server.state(), StreamState::Established);
    assert_eq!(server.remote_steam_id(), Some(STEAM_ID));
}

#[test]
fn server_replies_with_syn_ack_and_ack() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);

    client.connect(STEAM_ID);
    client.pump();
    server.pump();

    let replies = wire_packets(&server.connection_mut().outbound_wire());
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].header.opcode, OpCode::SynAck);
    assert_eq!(replies[0].header.local_ack, 1);
    assert_eq!(replies[0].header.remote_ack, 1);
    assert_eq!(replies[1].header.opcode, OpCode::Ack);
    assert_eq!(replies[1].header.local_ack, 0);
    assert_eq!(replies[1].header.remote_ack, 1);
}

#[test]
fn syn_loss_is_recovered_by_resend() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);

    client.connect(STEAM_ID);

    // Lose the first three SYNs on the wire.
    for _ in 0..3 {
        client
            .connection_mut()
            .outbound_wire()
            .lock()
            .unwrap()
            .clear();
        clock.advance(RESEND_SYN_INTERVAL + 0.1);
        client.pump();
    }

    // The fourth SYN gets through.
    pump_both(&mut client, &mut server, 3);

    assert!(client.is_established());
    assert!(server.is_established());
}

#[test]
fn duplicate_syn_while_established_is_ignored() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);
    establish(&mut client, &mut server);

    // A stray late SYN must not restart the handshake.
    client.send(ReliablePacket::new(OpCode::Syn, 1, 0, Vec::new()));
    pump_both(&mut client, &mut server, 2);

    assert_eq!(server.state(), StreamState::Established);
}

#[test]
fn sequenced_packet_before_handshake_is_fatal() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);

    client.send(ReliablePacket::message(vec![1, 2, 3]));
    client.pump();

    assert!(server.pump(), "server should report a fatal state");
}

#[test]
fn rst_resets_to_listening_and_allows_reconnect() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);
    establish(&mut client, &mut server);

    client.send(ReliablePacket::new(OpCode::Rst, 0, 0, Vec::new()));
    pump_both(&mut client, &mut server, 2);
    assert_eq!(server.state(), StreamState::Listening);

    // The peer can handshake again from scratch.
    client.connect(STEAM_ID);
    pump_both(&mut client, &mut server, 3);
    assert!(client.is_established());
    assert!(server.is_established());
}

#[test]
fn bad_magic_is_fatal() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);

    let cipher = CwcCipher::new(&common::KEY).unwrap();
    let mut bogus = vec![0xF5, 0x03];
    bogus.extend_from_slice(&[0u8; 10]);
    client
        .connection_mut()
        .outbound_wire()
        .lock()
        .unwrap()
        .push_back(cipher.encrypt(&bogus));

    assert!(server.pump());
}

#[test]
fn runt_packet_is_fatal() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);

    let cipher = CwcCipher::new(&common::KEY).unwrap();
    client
        .connection_mut()
        .outbound_wire()
        .lock()
        .unwrap()
        .push_back(cipher.encrypt(&[0xF5, 0x02, 0x00]));

    assert!(server.pump());
}

#[test]
fn undecryptable_noise_does_not_break_the_stream() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);

    client
        .connection_mut()
        .outbound_wire()
        .lock()
        .unwrap()
        .push_back(vec![0x55; 80]);

    client.connect(STEAM_ID);
    pump_both(&mut client, &mut server, 3);

    assert!(client.is_established());
    assert!(server.is_established());
}

#[test]
fn transport_failure_propagates_as_fatal() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);
    establish(&mut client, &mut server);

    server.connection_mut().fail();
    assert!(server.pump());
}

#[test]
fn heartbeat_is_answered() {
    let clock = ManualClock::new(100.0);
    let (mut client, mut server) = stream_pair(&clock);
    establish(&mut client, &mut server);
    server
        .connection_mut()
        .outbound_wire()
        .lock()
        .unwrap()
        .clear();

    client.send(ReliablePacket::new(OpCode::Hbt, 0, 1, Vec::new()));
    server.pump();

    let replies = wire_packets(&server.connection_mut().outbound_wire());
    assert!(
        replies
            .iter()
            .any(|packet| packet.header.opcode == OpCode::Hbt),
        "server should answer a heartbeat with a heartbeat"
    );
}
