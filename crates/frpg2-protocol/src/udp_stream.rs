//! Encrypted datagram stream.
//!
//! Sits between the transport and the reliable layer: every outbound payload
//! is CWC-encrypted into one datagram, every inbound datagram is decrypted
//! and authenticated before the reliable layer sees it. Undecryptable
//! datagrams are dropped and logged; only transport failure is fatal.

use frpg2_core::constants::AUTH_TOKEN_SIZE;
use frpg2_core::prefix;
use frpg2_crypto::CwcCipher;

use crate::connection::NetConnection;
use crate::error::StreamError;

/// One plaintext datagram as the reliable layer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpPacket {
    /// Whether the payload travels with the connection prefix. Outbound,
    /// the reliable layer sets this on the first SYN; inbound, it means the
    /// auth token was parsed out of the datagram rather than recalled from
    /// the session.
    pub has_connection_prefix: bool,
    pub auth_token: u32,
    pub payload: Vec<u8>,
}

/// Encrypted datagram stream over one [`NetConnection`].
pub struct UdpPacketStream<C: NetConnection> {
    connection: C,
    cipher: CwcCipher,
    auth_token: u32,
    in_error_state: bool,
}

impl<C: NetConnection> UdpPacketStream<C> {
    /// Create a stream from a connection and the session credentials the
    /// login service issued for this peer.
    pub fn new(connection: C, session_key: &[u8], auth_token: u32) -> Result<Self, StreamError> {
        let cipher = CwcCipher::new(session_key)?;
        Ok(Self {
            connection,
            cipher,
            auth_token,
            in_error_state: false,
        })
    }

    pub fn name(&self) -> &str {
        self.connection.name()
    }

    pub fn auth_token(&self) -> u32 {
        self.auth_token
    }

    /// Encrypt and transmit one datagram. Returns false on failure, which
    /// also marks the stream fatal.
    pub fn send(&mut self, packet: &UdpPacket) -> bool {
        let mut plaintext =
            Vec::with_capacity(AUTH_TOKEN_SIZE + packet.payload.len());
        if packet.has_connection_prefix {
            plaintext.extend_from_slice(&packet.auth_token.to_be_bytes());
        }
        plaintext.extend_from_slice(&packet.payload);

        let datagram = self.cipher.encrypt(&plaintext);

        if let Err(error) = self.connection.send(&datagram) {
            tracing::warn!(
                connection = self.connection.name(),
                %error,
                "failed to transmit datagram"
            );
            self.in_error_state = true;
            return false;
        }
        true
    }

    /// Poll the next decryptable inbound datagram. Datagrams that fail
    /// authentication are skipped; a transport error ends the poll and marks
    /// the stream fatal.
    pub fn receive(&mut self) -> Option<UdpPacket> {
        loop {
            let datagram = match self.connection.poll_recv() {
                Ok(Some(datagram)) => datagram,
                Ok(None) => return None,
                Err(error) => {
                    tracing::warn!(
                        connection = self.connection.name(),
                        %error,
                        "transport error while receiving"
                    );
                    self.in_error_state = true;
                    return None;
                }
            };

            let plaintext = match self.cipher.decrypt(&datagram) {
                Ok(plaintext) => plaintext,
                Err(error) => {
                    tracing::warn!(
                        connection = self.connection.name(),
                        %error,
                        datagram_len = datagram.len(),
                        "dropping undecryptable datagram"
                    );
                    continue;
                }
            };

            // A payload that does not open with a header magic byte carries
            // the connection prefix; its first four bytes are the auth token.
            if !prefix::starts_with_header(&plaintext) {
                if plaintext.len() < AUTH_TOKEN_SIZE {
                    tracing::warn!(
                        connection = self.connection.name(),
                        payload_len = plaintext.len(),
                        "dropping runt prefixed datagram"
                    );
                    continue;
                }
                let token = u32::from_be_bytes(
                    plaintext[..AUTH_TOKEN_SIZE]
                        .try_into()
                        .expect("slice is exactly AUTH_TOKEN_SIZE bytes"),
                );
                return Some(UdpPacket {
                    has_connection_prefix: true,
                    auth_token: token,
                    payload: plaintext[AUTH_TOKEN_SIZE..].to_vec(),
                });
            }

            return Some(UdpPacket {
                has_connection_prefix: false,
                auth_token: self.auth_token,
                payload: plaintext,
            });
        }
    }

    /// Drive the transport. Returns true once the stream is fatally broken.
    pub fn pump(&mut self) -> bool {
        if self.connection.pump() {
            self.in_error_state = true;
        }
        self.in_error_state
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}
