//! In-memory connection pair for tests.
//!
//! A [`loopback_pair`] wires two [`LoopbackConnection`]s back to back
//! through shared queues. Tests drive packet loss by dropping sends,
//! reordering or duplicating by editing a wire handle directly, and
//! transport failure by calling [`LoopbackConnection::fail`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::connection::{ConnectionError, NetConnection};

/// Shared datagram queue between two endpoints.
pub type Wire = Arc<Mutex<VecDeque<Vec<u8>>>>;

/// One side of an in-memory connection.
pub struct LoopbackConnection {
    name: String,
    rx: Wire,
    tx: Wire,
    drop_sends: bool,
    failed: bool,
}

/// Create a connected pair of in-memory endpoints.
pub fn loopback_pair(name_a: &str, name_b: &str) -> (LoopbackConnection, LoopbackConnection) {
    let a_to_b: Wire = Arc::new(Mutex::new(VecDeque::new()));
    let b_to_a: Wire = Arc::new(Mutex::new(VecDeque::new()));

    let a = LoopbackConnection {
        name: name_a.to_string(),
        rx: Arc::clone(&b_to_a),
        tx: Arc::clone(&a_to_b),
        drop_sends: false,
        failed: false,
    };
    let b = LoopbackConnection {
        name: name_b.to_string(),
        rx: a_to_b,
        tx: b_to_a,
        drop_sends: false,
        failed: false,
    };
    (a, b)
}

impl LoopbackConnection {
    /// Handle to the queue of datagrams this endpoint has sent but the peer
    /// has not yet read. Tests reorder, duplicate, or drop entries here.
    pub fn outbound_wire(&self) -> Wire {
        Arc::clone(&self.tx)
    }

    /// While set, every send is silently lost.
    pub fn set_drop_sends(&mut self, drop: bool) {
        self.drop_sends = drop;
    }

    /// Force the endpoint into a failed state; `pump` reports it.
    pub fn fail(&mut self) {
        self.failed = true;
    }
}

impl NetConnection for LoopbackConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), ConnectionError> {
        if self.failed {
            return Err(ConnectionError::Closed);
        }
        if self.drop_sends {
            return Ok(());
        }
        self.tx
            .lock()
            .expect("loopback wire lock poisoned")
            .push_back(datagram.to_vec());
        Ok(())
    }

    fn poll_recv(&mut self) -> Result<Option<Vec<u8>>, ConnectionError> {
        if self.failed {
            return Err(ConnectionError::Closed);
        }
        Ok(self
            .rx
            .lock()
            .expect("loopback wire lock poisoned")
            .pop_front())
    }

    fn pump(&mut self) -> bool {
        self.failed
    }
}
