//! Reliable packet stream: the connection state machine.
//!
//! Implements the TCP-like layer the game client expects on top of
//! encrypted datagrams: three-way handshake, 24-bit sequence numbers with
//! wraparound, cumulative acknowledgment, retransmission with a fixed
//! in-flight cap, in-order delivery, heartbeats, and graceful or abortive
//! teardown.
//!
//! # Handshake
//!
//! ```text
//! CLIENT                                     SERVER
//!     |-- SYN  [prefix: auth token +            |
//!     |         steam id x2] ------------------>|  Listening -> SynReceived
//!     |                                         |
//!     |<-- SYN_ACK (local=1, remote=1) ---------|
//!     |<-- ACK     (local=0, remote=1) ---------|
//!     |                                         |
//!  Connecting -> SynReceived                    |
//!     |-- ACK (local=0, remote=1) ------------->|  SynReceived -> Established
//!     |                                         |
//!     |            === ESTABLISHED ===          |
//! ```
//!
//! Everything runs inside `pump()`, driven by the owning supervisor; there
//! is no internal task or thread.

use std::collections::{HashSet, VecDeque};

use frpg2_core::constants::{
    CONNECTION_CLOSE_TIMEOUT, MAX_PACKETS_IN_FLIGHT, MIN_TIME_BETWEEN_RESEND_ACK,
    RESEND_SYN_INTERVAL, RETRANSMIT_CYCLE_INTERVAL, RETRANSMIT_INTERVAL, START_SEQUENCE_INDEX,
};
use frpg2_core::prefix::InitialData;
use frpg2_core::sequence;
use frpg2_core::{OpCode, ReliablePacket, WireError};

use crate::clock::SharedClock;
use crate::connection::NetConnection;
use crate::udp_stream::{UdpPacket, UdpPacketStream};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Server side, before any SYN.
    Listening,
    /// Client side, SYN sent, awaiting SYN_ACK.
    Connecting,
    /// Handshake mid-flight, awaiting the final ACK.
    SynReceived,
    /// Handshake complete; DAT traffic permitted.
    Established,
    /// FIN seen or sent; draining queues.
    Closing,
    /// Terminal; the owner must drop the stream.
    Closed,
}

impl StreamState {
    pub fn name(self) -> &'static str {
        match self {
            StreamState::Listening => "LISTENING",
            StreamState::Connecting => "CONNECTING",
            StreamState::SynReceived => "SYN_RECEIVED",
            StreamState::Established => "ESTABLISHED",
            StreamState::Closing => "CLOSING",
            StreamState::Closed => "CLOSED",
        }
    }
}

/// Reliable stream over one encrypted datagram stream.
pub struct ReliableUdpStream<C: NetConnection> {
    stream: UdpPacketStream<C>,
    clock: SharedClock,
    state: StreamState,

    /// Our steam id, sent in the connection prefix when acting as client.
    steam_id: String,
    /// The peer's steam id, captured from the first SYN when acting as
    /// server.
    remote_steam_id: Option<String>,

    sequence_index: u32,
    sequence_index_acked: u32,
    remote_sequence_index: u32,
    remote_sequence_index_acked: u32,

    send_queue: VecDeque<ReliablePacket>,
    retransmit_buffer: VecDeque<ReliablePacket>,
    pending_receive_queue: Vec<ReliablePacket>,
    receive_queue: VecDeque<ReliablePacket>,

    /// Remote sequences we already acknowledged with an outgoing DAT_ACK.
    dat_ack_responses: HashSet<u32>,
    /// Remote sequences whose messages may still want a DAT_ACK reply.
    expected_dat_ack_responses: HashSet<u32>,

    last_packet_received_time: f64,
    last_ack_send_time: f64,
    resend_syn_timer: f64,
    close_timer: f64,
    retransmission_timer: f64,

    is_retransmitting: bool,
    retransmitting_index: u32,
    retransmit_packet: Option<ReliablePacket>,

    in_error_state: bool,
}

impl<C: NetConnection> ReliableUdpStream<C> {
    pub fn new(stream: UdpPacketStream<C>, clock: SharedClock) -> Self {
        Self::with_initial_sequence(stream, clock, START_SEQUENCE_INDEX)
    }

    /// Construct a stream with an explicit starting sequence index. Used to
    /// exercise counter wraparound without driving 2^24 packets.
    pub fn with_initial_sequence(
        stream: UdpPacketStream<C>,
        clock: SharedClock,
        sequence_index: u32,
    ) -> Self {
        let now = clock.now();
        Self {
            stream,
            clock,
            state: StreamState::Listening,
            steam_id: String::new(),
            remote_steam_id: None,
            sequence_index,
            // Nothing acked yet: the cursor sits just behind the first
            // sequence we will assign.
            sequence_index_acked: sequence::previous(sequence_index),
            remote_sequence_index: 0,
            remote_sequence_index_acked: 0,
            send_queue: VecDeque::new(),
            retransmit_buffer: VecDeque::new(),
            pending_receive_queue: Vec::new(),
            receive_queue: VecDeque::new(),
            dat_ack_responses: HashSet::new(),
            expected_dat_ack_responses: HashSet::new(),
            last_packet_received_time: now,
            last_ack_send_time: 0.0,
            resend_syn_timer: 0.0,
            close_timer: 0.0,
            retransmission_timer: 0.0,
            is_retransmitting: false,
            retransmitting_index: 0,
            retransmit_packet: None,
            in_error_state: false,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        self.stream.name()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == StreamState::Established
    }

    pub fn auth_token(&self) -> u32 {
        self.stream.auth_token()
    }

    /// The peer's steam id, once the connection prefix has been seen.
    pub fn remote_steam_id(&self) -> Option<&str> {
        self.remote_steam_id.as_deref()
    }

    /// Unacknowledged sequenced packets currently on the wire.
    pub fn in_flight_count(&self) -> usize {
        self.retransmit_buffer.len()
    }

    /// Sequenced packets queued but not yet transmitted.
    pub fn pending_send_count(&self) -> usize {
        self.send_queue.len()
    }

    pub fn is_retransmitting(&self) -> bool {
        self.is_retransmitting
    }

    /// When the last valid packet arrived, in clock seconds.
    pub fn last_packet_received_time(&self) -> f64 {
        self.last_packet_received_time
    }

    pub fn connection_mut(&mut self) -> &mut C {
        self.stream.connection_mut()
    }

    // ------------------------------------------------------------------
    // Public contract
    // ------------------------------------------------------------------

    /// Client role: start the handshake toward the server.
    pub fn connect(&mut self, steam_id: &str) {
        self.state = StreamState::Connecting;
        self.steam_id = steam_id.to_string();
        self.resend_syn_timer = self.clock.now();
        tracing::info!(connection = self.name(), steam_id, "connecting");
        self.send_syn();
    }

    /// Queue or transmit one packet.
    ///
    /// Sequenced opcodes and `Unset` go through the send queue and consume a
    /// sequence number; control opcodes go straight to the wire. Returns
    /// false only if framing or the transport failed.
    pub fn send(&mut self, packet: ReliablePacket) -> bool {
        if self.state == StreamState::Closed {
            return false;
        }
        // Swallow anything submitted while the stream is draining.
        if self.state == StreamState::Closing {
            return true;
        }

        if packet.header.opcode.is_sequenced() || packet.header.opcode == OpCode::Unset {
            let mut packet = packet;
            packet.send_time = self.clock.now();

            // An unset opcode means the caller left the sequencing to us:
            // fill in the local counter and pick DAT or DAT_ACK based on
            // whether the packet acknowledges a peer sequence.
            if packet.header.opcode == OpCode::Unset {
                let remote = packet.header.remote_ack;
                packet.header.local_ack = self.sequence_index;

                if remote > 0 {
                    packet.header.opcode = OpCode::DatAck;
                    self.dat_ack_responses.insert(remote);
                    self.remote_sequence_index_acked = remote;
                } else {
                    packet.header.opcode = OpCode::Dat;
                }
            }

            self.sequence_index = sequence::next(self.sequence_index);
            self.send_queue.push_back(packet);
            true
        } else {
            self.send_raw(&packet)
        }
    }

    /// Pop the next in-order application packet, if any.
    pub fn receive(&mut self) -> Option<ReliablePacket> {
        self.receive_queue.pop_front()
    }

    /// Begin a graceful teardown.
    pub fn disconnect(&mut self) {
        if self.state == StreamState::Established {
            self.send_fin();
        }
    }

    /// Acknowledge a message after the layer above has processed it.
    pub fn acknowledge_handled(&mut self, sequence: u32) {
        if self.dat_ack_responses.remove(&sequence) {
            // Already covered by an outgoing DAT_ACK.
            return;
        }

        let _wants_dat_ack = self.expected_dat_ack_responses.remove(&sequence);
        // The client appears content with a plain ACK here; replying with a
        // DAT_ACK instead needs verification against a live peer first.
        self.send_ack(sequence);
    }

    /// One tick of incoming and outgoing handling. Returns true once the
    /// stream is terminally closed or fatally broken.
    pub fn pump(&mut self) -> bool {
        let now = self.clock.now();

        // A draining stream is closed once everything queued has gone out.
        if self.state == StreamState::Closing && self.send_queue.is_empty() {
            tracing::info!(connection = self.name(), "connection closed");
            self.state = StreamState::Closed;
        }

        if self.state == StreamState::Closed {
            self.reset_stream_state();
            return true;
        }

        if self.stream.pump() {
            return true;
        }

        // Repeat the SYN while connecting; this also punches NAT holes.
        if self.state == StreamState::Connecting
            && now - self.resend_syn_timer > RESEND_SYN_INTERVAL
        {
            self.send_syn();
            self.resend_syn_timer = now;
        }

        // Give up on a graceful close that the peer never finishes.
        if self.close_timer > 0.0
            && self.state == StreamState::Closing
            && now - self.close_timer > CONNECTION_CLOSE_TIMEOUT
        {
            tracing::warn!(
                connection = self.name(),
                "graceful close took too long, dropping connection"
            );
            self.state = StreamState::Closed;
            return true;
        }

        self.handle_incoming();
        self.handle_outgoing();

        self.in_error_state
    }

    // ------------------------------------------------------------------
    // Inbound path
    // ------------------------------------------------------------------

    fn handle_incoming(&mut self) {
        // Accept everything the datagram layer has for us.
        while let Some(udp) = self.stream.receive() {
            let packet = match self.decode_packet(&udp) {
                Ok(packet) => packet,
                Err(error) => {
                    tracing::warn!(
                        connection = self.name(),
                        %error,
                        "failed to decode reliable packet"
                    );
                    self.in_error_state = true;
                    continue;
                }
            };
            self.handle_incoming_packet(packet);
        }

        // Process everything now in order off the pending queue, stopping at
        // the first gap.
        loop {
            let next = sequence::next(self.remote_sequence_index);
            let Some(position) = self
                .pending_receive_queue
                .iter()
                .position(|packet| packet.header.local_ack == next)
            else {
                break;
            };
            let packet = self.pending_receive_queue.remove(position);
            self.process_packet(packet);
            self.remote_sequence_index = next;
        }
    }

    fn handle_incoming_packet(&mut self, packet: ReliablePacket) {
        self.last_packet_received_time = self.clock.now();

        tracing::trace!(
            connection = self.name(),
            opcode = %packet.header.opcode,
            local_ack = packet.header.local_ack,
            remote_ack = packet.header.remote_ack,
            "<< recv"
        );

        if !packet.header.opcode.is_sequenced() {
            self.process_packet(packet);
            return;
        }

        // Sequenced traffic is only legal once the handshake completed
        // (Closing still drains in-flight packets).
        if matches!(
            self.state,
            StreamState::Listening | StreamState::Connecting | StreamState::SynReceived
        ) {
            tracing::warn!(
                connection = self.name(),
                state = self.state.name(),
                "sequenced packet before the handshake completed"
            );
            self.in_error_state = true;
            return;
        }

        let local = packet.header.local_ack;
        let already_pending = self
            .pending_receive_queue
            .iter()
            .any(|pending| pending.header.local_ack == local);

        if already_pending || !sequence::is_ahead(local, self.remote_sequence_index) {
            // Duplicate: the peer is likely retransmitting because one of
            // our ACKs was lost.
            tracing::debug!(
                connection = self.name(),
                sequence = local,
                head = self.remote_sequence_index,
                "dropping duplicate sequenced packet"
            );
            self.resend_ack_if_due();
            return;
        }

        let in_order = local == sequence::next(self.remote_sequence_index);
        self.pending_receive_queue.push(packet);

        if !in_order {
            // Ahead of the window; re-acknowledge the last in-order
            // sequence so the peer can close the gap.
            tracing::debug!(
                connection = self.name(),
                sequence = local,
                head = self.remote_sequence_index,
                "queued out-of-order packet"
            );
            self.resend_ack_if_due();
        }
    }

    fn resend_ack_if_due(&mut self) {
        let now = self.clock.now();
        if now - self.last_ack_send_time > MIN_TIME_BETWEEN_RESEND_ACK {
            self.send_ack(self.remote_sequence_index_acked);
        }
    }

    fn process_packet(&mut self, packet: ReliablePacket) {
        match packet.header.opcode {
            OpCode::Syn => self.handle_syn(&packet),
            OpCode::SynAck => self.handle_syn_ack(&packet),
            OpCode::Ack => self.handle_ack(&packet),
            OpCode::Rack => self.handle_rack(),
            OpCode::Dat => self.handle_dat(packet),
            OpCode::DatAck => self.handle_dat_ack(packet),
            OpCode::Hbt => self.handle_hbt(&packet),
            OpCode::Fin => self.handle_fin(&packet),
            OpCode::FinAck => self.handle_fin_ack(),
            OpCode::Rst => self.handle_rst(),
            OpCode::Unset => {
                tracing::error!(connection = self.name(), "received packet with unset opcode");
                self.in_error_state = true;
            }
        }
    }

    fn handle_syn(&mut self, packet: &ReliablePacket) {
        if !matches!(
            self.state,
            StreamState::Listening | StreamState::SynReceived
        ) {
            tracing::debug!(
                connection = self.name(),
                state = self.state.name(),
                "ignoring SYN outside of listen"
            );
            return;
        }

        tracing::debug!(connection = self.name(), "received SYN, starting handshake");
        self.state = StreamState::SynReceived;

        let remote_index = packet.header.local_ack;
        self.send_syn_ack(remote_index);
        // The client expects a bare ACK alongside the SYN_ACK.
        self.send_ack(remote_index);
    }

    fn handle_syn_ack(&mut self, packet: &ReliablePacket) {
        if !matches!(
            self.state,
            StreamState::Connecting | StreamState::SynReceived
        ) {
            tracing::debug!(
                connection = self.name(),
                state = self.state.name(),
                "ignoring SYN_ACK outside of connect"
            );
            return;
        }

        self.state = StreamState::SynReceived;
        self.remote_sequence_index = packet.header.local_ack;
        self.send_ack(self.remote_sequence_index);

        // SYN_ACK consumes a sequence number without entering the
        // retransmission channel.
        self.sequence_index = sequence::next(self.sequence_index);
    }

    fn handle_ack(&mut self, packet: &ReliablePacket) {
        if self.state == StreamState::SynReceived {
            tracing::info!(
                connection = self.name(),
                "handshake complete, connection established"
            );
            self.state = StreamState::Established;
        }

        self.sequence_index_acked =
            sequence::newest(self.sequence_index_acked, packet.header.remote_ack);
    }

    fn handle_rack(&mut self) {
        // Believed to be a reject-ACK; nothing useful to do with it.
        tracing::debug!(connection = self.name(), "ignoring RACK");
    }

    fn handle_dat(&mut self, packet: ReliablePacket) {
        let local = packet.header.local_ack;
        self.expected_dat_ack_responses.insert(local);
        self.receive_queue.push_back(packet);
        self.send_ack(local);
    }

    fn handle_dat_ack(&mut self, packet: ReliablePacket) {
        let local = packet.header.local_ack;
        self.sequence_index_acked =
            sequence::newest(self.sequence_index_acked, packet.header.remote_ack);
        self.send_ack(local);
        self.receive_queue.push_back(packet);
    }

    fn handle_hbt(&mut self, packet: &ReliablePacket) {
        self.sequence_index_acked =
            sequence::newest(self.sequence_index_acked, packet.header.remote_ack);
        self.send_hbt();
    }

    fn handle_fin(&mut self, packet: &ReliablePacket) {
        tracing::debug!(connection = self.name(), "received FIN, closing");
        self.send_fin_ack(packet.header.local_ack);
        self.enter_closing();
    }

    fn handle_fin_ack(&mut self) {
        // Hold in Closing until the send queue drains.
        self.enter_closing();
    }

    fn handle_rst(&mut self) {
        tracing::warn!(connection = self.name(), "received RST, resetting stream");
        self.state = StreamState::Listening;
        self.reset_stream_state();
    }

    fn enter_closing(&mut self) {
        self.state = StreamState::Closing;
        if self.close_timer <= 0.0 {
            self.close_timer = self.clock.now();
        }
    }

    // ------------------------------------------------------------------
    // Outbound path
    // ------------------------------------------------------------------

    fn handle_outgoing(&mut self) {
        let now = self.clock.now();

        // Drop everything the peer has cumulatively acknowledged.
        let acked = self.sequence_index_acked;
        self.retransmit_buffer
            .retain(|packet| !sequence::is_acked(packet.header.local_ack, acked));

        if !self.is_retransmitting {
            // The oldest over-age unacknowledged packet starts a cycle.
            let overdue = self
                .retransmit_buffer
                .iter()
                .find(|packet| now - packet.send_time > RETRANSMIT_INTERVAL)
                .cloned();
            if let Some(packet) = overdue {
                tracing::info!(
                    connection = self.name(),
                    sequence = packet.header.local_ack,
                    "starting retransmission of unacknowledged packet"
                );
                self.send_raw(&packet);
                self.is_retransmitting = true;
                self.retransmitting_index = packet.header.local_ack;
                self.retransmit_packet = Some(packet);
                self.retransmission_timer = now;
            }
        } else if sequence::is_acked(self.retransmitting_index, self.sequence_index_acked) {
            tracing::info!(connection = self.name(), "recovered from retransmission");
            self.is_retransmitting = false;
            self.retransmit_packet = None;
        } else if now - self.retransmission_timer > RETRANSMIT_CYCLE_INTERVAL {
            tracing::debug!(
                connection = self.name(),
                sequence = self.retransmitting_index,
                "resending retransmission packet"
            );
            self.retransmission_timer = now;
            if let Some(packet) = self.retransmit_packet.clone() {
                self.send_raw(&packet);
            }
        }

        // Hold fresh sends while retransmitting or at the in-flight cap.
        while !self.is_retransmitting && self.retransmit_buffer.len() < MAX_PACKETS_IN_FLIGHT {
            let Some(packet) = self.send_queue.pop_front() else {
                break;
            };
            self.send_raw(&packet);
            self.retransmit_buffer.push_back(packet);
        }
    }

    fn send_syn(&mut self) {
        let packet = ReliablePacket::new(OpCode::Syn, self.sequence_index, 0, Vec::new());
        self.send(packet);
    }

    fn send_syn_ack(&mut self, remote_index: u32) {
        let packet = ReliablePacket::new(OpCode::SynAck, self.sequence_index, remote_index, Vec::new());
        self.send(packet);

        self.remote_sequence_index = remote_index;
        // SYN_ACK consumes a sequence number without entering the
        // retransmission channel.
        self.sequence_index = sequence::next(self.sequence_index);
    }

    fn send_ack(&mut self, remote_index: u32) {
        let packet = ReliablePacket::new(OpCode::Ack, 0, remote_index, Vec::new());
        self.send(packet);

        self.remote_sequence_index_acked = remote_index;
        self.last_ack_send_time = self.clock.now();
    }

    fn send_fin_ack(&mut self, remote_index: u32) {
        let packet =
            ReliablePacket::new(OpCode::FinAck, self.sequence_index, remote_index, Vec::new());
        self.send(packet);
    }

    fn send_fin(&mut self) {
        let packet = ReliablePacket::new(OpCode::Fin, self.sequence_index, 0, Vec::new());
        self.send(packet);
        tracing::info!(connection = self.name(), "sent FIN, closing");
        self.enter_closing();
    }

    fn send_hbt(&mut self) {
        let packet =
            ReliablePacket::new(OpCode::Hbt, 0, self.remote_sequence_index_acked, Vec::new());
        self.send(packet);
    }

    fn send_raw(&mut self, packet: &ReliablePacket) -> bool {
        tracing::trace!(
            connection = self.name(),
            opcode = %packet.header.opcode,
            local_ack = packet.header.local_ack,
            remote_ack = packet.header.remote_ack,
            ">> sent"
        );

        let udp = match self.encode_packet(packet) {
            Ok(udp) => udp,
            Err(error) => {
                tracing::warn!(
                    connection = self.name(),
                    %error,
                    "failed to frame reliable packet"
                );
                self.in_error_state = true;
                return false;
            }
        };

        if !self.stream.send(&udp) {
            tracing::warn!(connection = self.name(), "failed to send datagram");
            self.in_error_state = true;
            return false;
        }
        true
    }

    // ------------------------------------------------------------------
    // Framing
    // ------------------------------------------------------------------

    fn encode_packet(&self, packet: &ReliablePacket) -> Result<UdpPacket, WireError> {
        let mut payload = Vec::new();
        let mut has_connection_prefix = false;

        // The first SYN travels with the connection prefix so the server can
        // identify the client before the handshake completes.
        if packet.header.opcode == OpCode::Syn {
            payload.extend_from_slice(&InitialData::encode(&self.steam_id)?);
            has_connection_prefix = true;
        }

        payload.extend_from_slice(&packet.encode());

        Ok(UdpPacket {
            has_connection_prefix,
            auth_token: self.stream.auth_token(),
            payload,
        })
    }

    fn decode_packet(&mut self, udp: &UdpPacket) -> Result<ReliablePacket, WireError> {
        let mut data = udp.payload.as_slice();

        if udp.has_connection_prefix {
            let initial = InitialData::decode(data)?;
            tracing::debug!(
                connection = self.name(),
                steam_id = initial.steam_id,
                "connection prefix received"
            );
            self.remote_steam_id = Some(initial.steam_id);
            data = &data[InitialData::SIZE..];
        }

        ReliablePacket::decode(data)
    }

    fn reset_stream_state(&mut self) {
        self.sequence_index = START_SEQUENCE_INDEX;
        self.sequence_index_acked = sequence::previous(START_SEQUENCE_INDEX);
        self.remote_sequence_index = 0;
        self.remote_sequence_index_acked = 0;

        self.send_queue.clear();
        self.retransmit_buffer.clear();
        self.pending_receive_queue.clear();
        self.receive_queue.clear();
        self.dat_ack_responses.clear();
        self.expected_dat_ack_responses.clear();

        self.last_ack_send_time = 0.0;
        self.resend_syn_timer = 0.0;
        self.close_timer = 0.0;
        self.retransmission_timer = 0.0;

        self.is_retransmitting = false;
        self.retransmit_packet = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::loopback::{loopback_pair, LoopbackConnection};

    const KEY: [u8; 16] = [0x22; 16];

    fn make_stream(
        connection: LoopbackConnection,
        clock: &std::sync::Arc<ManualClock>,
    ) -> ReliableUdpStream<LoopbackConnection> {
        let udp = UdpPacketStream::new(connection, &KEY, 0xDEAD_BEEF).unwrap();
        ReliableUdpStream::new(udp, clock.clone())
    }

    #[test]
    fn send_resolves_unset_to_dat() {
        let clock = ManualClock::new(100.0);
        let (a, _b) = loopback_pair("a", "b");
        let mut stream = make_stream(a, &clock);

        assert!(stream.send(ReliablePacket::message(vec![1, 2, 3])));
        assert_eq!(stream.pending_send_count(), 1);
        assert_eq!(stream.send_queue[0].header.opcode, OpCode::Dat);
        assert_eq!(stream.send_queue[0].header.local_ack, START_SEQUENCE_INDEX);
        assert_eq!(stream.sequence_index, START_SEQUENCE_INDEX + 1);
    }

    #[test]
    fn send_resolves_response_to_dat_ack() {
        let clock = ManualClock::new(100.0);
        let (a, _b) = loopback_pair("a", "b");
        let mut stream = make_stream(a, &clock);

        assert!(stream.send(ReliablePacket::response(vec![1], 7)));
        assert_eq!(stream.send_queue[0].header.opcode, OpCode::DatAck);
        assert_eq!(stream.send_queue[0].header.remote_ack, 7);
        assert!(stream.dat_ack_responses.contains(&7));
        assert_eq!(stream.remote_sequence_index_acked, 7);
    }

    #[test]
    fn send_while_closing_is_swallowed() {
        let clock = ManualClock::new(100.0);
        let (a, _b) = loopback_pair("a", "b");
        let mut stream = make_stream(a, &clock);

        stream.state = StreamState::Closing;
        assert!(stream.send(ReliablePacket::message(vec![1])));
        assert_eq!(stream.pending_send_count(), 0);
    }

    #[test]
    fn control_packets_bypass_the_send_queue() {
        let clock = ManualClock::new(100.0);
        let (a, _b) = loopback_pair("a", "b");
        let mut stream = make_stream(a, &clock);

        let before = stream.sequence_index;
        assert!(stream.send(ReliablePacket::new(OpCode::Ack, 0, 3, Vec::new())));
        assert_eq!(stream.pending_send_count(), 0);
        assert_eq!(stream.sequence_index, before);
        assert_eq!(
            stream.connection_mut().outbound_wire().lock().unwrap().len(),
            1
        );
    }

    #[test]
    fn acknowledge_handled_skips_already_sent_dat_ack() {
        let clock = ManualClock::new(100.0);
        let (a, _b) = loopback_pair("a", "b");
        let mut stream = make_stream(a, &clock);

        stream.send(ReliablePacket::response(vec![1], 9));
        let wire = stream.connection_mut().outbound_wire();
        let before = wire.lock().unwrap().len();

        stream.acknowledge_handled(9);
        assert_eq!(wire.lock().unwrap().len(), before, "no extra ACK expected");

        // A sequence with no DAT_ACK coverage gets a plain ACK.
        stream.acknowledge_handled(10);
        assert_eq!(wire.lock().unwrap().len(), before + 1);
    }

    #[test]
    fn closed_stream_pump_reports_terminal() {
        let clock = ManualClock::new(100.0);
        let (a, _b) = loopback_pair("a", "b");
        let mut stream = make_stream(a, &clock);

        stream.state = StreamState::Closed;
        assert!(stream.pump());
        assert_eq!(stream.sequence_index, START_SEQUENCE_INDEX);
    }

    #[test]
    fn rst_resets_counters_and_queues() {
        let clock = ManualClock::new(100.0);
        let (a, _b) = loopback_pair("a", "b");
        let mut stream = make_stream(a, &clock);

        stream.state = StreamState::Established;
        stream.send(ReliablePacket::message(vec![1]));
        stream.handle_rst();

        assert_eq!(stream.state(), StreamState::Listening);
        assert_eq!(stream.pending_send_count(), 0);
        assert_eq!(stream.sequence_index, START_SEQUENCE_INDEX);
    }
}
