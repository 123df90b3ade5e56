//! Shared helpers for driving two reliable streams over a loopback wire.

#![allow(dead_code)]

use std::sync::Arc;

use frpg2_core::constants::START_SEQUENCE_INDEX;
use frpg2_core::prefix::{starts_with_header, InitialData};
use frpg2_core::{OpCode, ReliablePacket};
use frpg2_crypto::CwcCipher;
use frpg2_protocol::clock::ManualClock;
use frpg2_protocol::loopback::{loopback_pair, LoopbackConnection, Wire};
use frpg2_protocol::{ReliableUdpStream, UdpPacketStream};

pub const KEY: [u8; 16] = [0x5A; 16];
pub const TOKEN: u32 = 0x00C0_FFEE;
pub const STEAM_ID: &str = "76561198012345678";

pub type TestStream = ReliableUdpStream<LoopbackConnection>;

/// Fresh client/server pair sharing one manual clock.
pub fn stream_pair(clock: &Arc<ManualClock>) -> (TestStream, TestStream) {
    stream_pair_with_sequences(clock, START_SEQUENCE_INDEX, START_SEQUENCE_INDEX)
}

/// Pair with explicit starting sequence indices, for wraparound coverage.
pub fn stream_pair_with_sequences(
    clock: &Arc<ManualClock>,
    client_sequence: u32,
    server_sequence: u32,
) -> (TestStream, TestStream) {
    let (client_conn, server_conn) = loopback_pair("client", "server");
    let client = ReliableUdpStream::with_initial_sequence(
        UdpPacketStream::new(client_conn, &KEY, TOKEN).unwrap(),
        clock.clone(),
        client_sequence,
    );
    let server = ReliableUdpStream::with_initial_sequence(
        UdpPacketStream::new(server_conn, &KEY, TOKEN).unwrap(),
        clock.clone(),
        server_sequence,
    );
    (client, server)
}

/// Alternate pumps, client first.
pub fn pump_both(client: &mut TestStream, server: &mut TestStream, rounds: usize) {
    for _ in 0..rounds {
        client.pump();
        server.pump();
    }
}

/// Run the three-way handshake to completion.
pub fn establish(client: &mut TestStream, server: &mut TestStream) {
    client.connect(STEAM_ID);
    pump_both(client, server, 3);
    assert!(client.is_established(), "client should be established");
    assert!(server.is_established(), "server should be established");
}

/// Decrypt and decode every datagram currently sitting on a wire, without
/// consuming it.
pub fn wire_packets(wire: &Wire) -> Vec<ReliablePacket> {
    let cipher = CwcCipher::new(&KEY).unwrap();
    wire.lock()
        .unwrap()
        .iter()
        .map(|datagram| {
            let plaintext = cipher.decrypt(datagram).expect("test wire datagram");
            if starts_with_header(&plaintext) {
                ReliablePacket::decode(&plaintext).unwrap()
            } else {
                // auth token + steam-id body ahead of the header
                ReliablePacket::decode(&plaintext[4 + InitialData::SIZE..]).unwrap()
            }
        })
        .collect()
}

/// Count datagrams on a wire carrying the given opcode.
pub fn count_opcode(wire: &Wire, opcode: OpCode) -> usize {
    wire_packets(wire)
        .iter()
        .filter(|packet| packet.header.opcode == opcode)
        .count()
}
