//! UDP listener service.
//!
//! Owns the game port and the supervisor table. Each tick drains the
//! socket, routes datagrams to the owning peer's inbound queue, polls every
//! supervisor, and drops the ones that request disconnect. Exactly one
//! reliable stream exists per peer address.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;

use frpg2_protocol::clock::SharedClock;
use frpg2_protocol::{ConnectionError, NetConnection, ReliableUdpStream, UdpPacketStream};

use crate::client::GameClient;
use crate::error::NodeError;
use crate::handler::{AuthService, MessageHandler};

/// Size of the datagram receive buffer.
const RECV_BUFFER: usize = 2048;

type InboundQueue = Arc<Mutex<VecDeque<Vec<u8>>>>;

/// One peer's view of the shared server socket.
///
/// Outbound datagrams go straight to the socket; inbound ones are routed
/// into the per-peer queue by the service's demultiplexer.
pub struct PeerConnection {
    name: String,
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    inbound: InboundQueue,
    failed: bool,
}

impl NetConnection for PeerConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), ConnectionError> {
        match self.socket.try_send_to(datagram, self.peer) {
            Ok(_) => Ok(()),
            // A full send buffer loses the datagram, which is ordinary UDP
            // behavior; retransmission recovers it.
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                tracing::debug!(peer = %self.peer, "send buffer full, datagram dropped");
                Ok(())
            }
            Err(error) => {
                self.failed = true;
                Err(ConnectionError::Io(error))
            }
        }
    }

    fn poll_recv(&mut self) -> Result<Option<Vec<u8>>, ConnectionError> {
        if self.failed {
            return Err(ConnectionError::Closed);
        }
        Ok(self
            .inbound
            .lock()
            .expect("peer inbound queue lock poisoned")
            .pop_front())
    }

    fn pump(&mut self) -> bool {
        self.failed
    }
}

/// The game service: one UDP socket, one supervisor per peer.
pub struct GameService<H: MessageHandler, A: AuthService> {
    socket: Arc<UdpSocket>,
    clock: SharedClock,
    handler: H,
    auth: A,
    clients: HashMap<SocketAddr, GameClient<PeerConnection>>,
    queues: HashMap<SocketAddr, InboundQueue>,
}

impl<H: MessageHandler, A: AuthService> GameService<H, A> {
    /// Bind the listener and construct an empty service.
    pub async fn bind(
        addr: SocketAddr,
        clock: SharedClock,
        handler: H,
        auth: A,
    ) -> Result<Self, NodeError> {
        let socket = UdpSocket::bind(addr).await?;
        tracing::info!(addr = %socket.local_addr()?, "game service listening");

        Ok(Self {
            socket: Arc::new(socket),
            clock,
            handler,
            auth,
            clients: HashMap::new(),
            queues: HashMap::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NodeError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Register a peer the login service has issued a session for. The
    /// stream starts listening for the peer's SYN.
    pub fn accept(
        &mut self,
        addr: SocketAddr,
        session_key: &[u8],
        auth_token: u32,
    ) -> Result<(), NodeError> {
        if self.clients.contains_key(&addr) {
            return Err(NodeError::PeerAlreadyConnected(addr));
        }

        let inbound: InboundQueue = Arc::new(Mutex::new(VecDeque::new()));
        let connection = PeerConnection {
            name: addr.to_string(),
            socket: Arc::clone(&self.socket),
            peer: addr,
            inbound: Arc::clone(&inbound),
            failed: false,
        };

        let udp = UdpPacketStream::new(connection, session_key, auth_token)?;
        let stream = ReliableUdpStream::new(udp, Arc::clone(&self.clock));

        self.queues.insert(addr, inbound);
        self.clients
            .insert(addr, GameClient::new(stream, Arc::clone(&self.clock)));

        tracing::info!(peer = %addr, "accepted client session");
        Ok(())
    }

    /// One service tick: drain the socket, route datagrams, poll clients.
    pub fn tick(&mut self) {
        self.drain_socket();

        let mut disconnected = Vec::new();
        for (addr, client) in self.clients.iter_mut() {
            if client.poll(&mut self.handler, &self.auth) {
                disconnected.push(*addr);
            }
        }

        for addr in disconnected {
            tracing::info!(peer = %addr, "dropping client");
            self.clients.remove(&addr);
            self.queues.remove(&addr);
        }
    }

    /// Run tick forever at the given cadence. Intended to be raced against
    /// a shutdown signal by the caller.
    pub async fn run(&mut self, tick_interval: Duration) {
        let mut interval = tokio::time::interval(tick_interval);
        loop {
            interval.tick().await;
            self.tick();
        }
    }

    /// Ask every client to close gracefully and flush the FINs out.
    pub fn shutdown(&mut self) {
        tracing::info!(clients = self.clients.len(), "shutting down game service");
        for client in self.clients.values_mut() {
            client.disconnect();
        }
        for _ in 0..3 {
            self.tick();
        }
        self.clients.clear();
        self.queues.clear();
    }

    fn drain_socket(&mut self) {
        let mut buf = [0u8; RECV_BUFFER];
        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, src)) => match self.queues.get(&src) {
                    Some(queue) => {
                        queue
                            .lock()
                            .expect("peer inbound queue lock poisoned")
                            .push_back(buf[..len].to_vec());
                    }
                    None => {
                        tracing::debug!(peer = %src, len, "datagram from unknown peer dropped");
                    }
                },
                Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(error) => {
                    tracing::warn!(%error, "socket receive error");
                    break;
                }
            }
        }
    }
}
