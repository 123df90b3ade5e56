//! FRPG2 game server node.
//!
//! Hosts the per-client protocol stacks behind one UDP listener: the
//! [`GameService`] owns the socket and demultiplexes datagrams per peer, a
//! [`GameClient`] supervises each peer's reliable stream, and decoded
//! messages are handed to the [`handler::MessageHandler`] collaborator.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod service;

pub use client::GameClient;
pub use config::ServerConfig;
pub use error::NodeError;
pub use service::GameService;
