//! One rendezvoused pair of named-segment endpoints, exposing
//! `mtcl_core::transport::Channel`.
use std::sync::Arc;

use mtcl_core::error::{ErrorKind, MtclError, Result};
use mtcl_core::transport::{Channel, ShutdownDirection};

use crate::ring::Ring;

/// The two directional rings one connected pair shares: `inbound` is what
/// this endpoint reads, `outbound` is what it writes.
pub(crate) struct RingPair {
    pub(crate) inbound: Ring,
    pub(crate) outbound: Ring,
}

impl RingPair {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self { inbound: Ring::new(), outbound: Ring::new() })
    }
}

pub struct MemChannel {
    id: u64,
    name: String,
    pair: Arc<RingPair>,
    flipped: bool,
}

impl MemChannel {
    /// The "server" (listener-accepted) side: reads what the connector wrote.
    pub(crate) fn server_side(id: u64, name: String, pair: Arc<RingPair>) -> Self {
        Self { id, name, pair, flipped: false }
    }

    /// The "client" (connector) side: reads what the server wrote.
    pub(crate) fn client_side(id: u64, name: String, pair: Arc<RingPair>) -> Self {
        Self { id, name, pair, flipped: true }
    }

    fn inbound(&self) -> &Ring {
        if self.flipped { &self.pair.outbound } else { &self.pair.inbound }
    }

    fn outbound(&self) -> &Ring {
        if self.flipped { &self.pair.inbound } else { &self.pair.outbound }
    }
}

impl Channel for MemChannel {
    fn id(&self) -> u64 {
        self.id
    }

    fn peer_addr(&self) -> Option<String> {
        Some(format!("SHM:{}", self.name))
    }

    fn send(&self, payload: &[u8]) -> Result<()> {
        self.outbound().push(payload.to_vec());
        Ok(())
    }

    fn probe_raw(&self, blocking: bool) -> Result<u64> {
        match self.inbound().peek_len(blocking) {
            Some(len) => Ok(len as u64),
            None => Err(MtclError::would_block("no message ready on memory segment")),
        }
    }

    fn receive_raw(&self, buf: &mut [u8]) -> Result<usize> {
        let message = self.inbound().pop();
        if message.is_empty() {
            return Ok(0);
        }
        if message.len() != buf.len() {
            return Err(MtclError::new(
                ErrorKind::Io,
                "memory segment message length changed between probe and receive",
            ));
        }
        buf.copy_from_slice(&message);
        Ok(buf.len())
    }

    fn shutdown(&self, direction: ShutdownDirection) -> Result<()> {
        if matches!(direction, ShutdownDirection::Write | ShutdownDirection::Both) {
            self.outbound().close();
        }
        Ok(())
    }
}
