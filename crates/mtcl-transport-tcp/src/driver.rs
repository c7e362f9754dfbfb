//! The TCP `TransportDriver`: listener bookkeeping, accept loop, and
//! re-arming of yielded channels inside `update()`.
//!
//! # Why
//! `mtcl_core::handle::HandleCore` is the owner of per-handle state
//! (`closed_rd`/`closed_wr`/`probed`); this driver only has to track which
//! raw [`TcpChannel`]s exist and which of them the runtime currently owns
//! (`armed`). A channel still registered but not armed means the
//! application currently holds it — the driver must not touch it.
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use mtcl_core::dispatch::{DispatchEvent, DispatchQueue};
use mtcl_core::error::{ErrorKind, MtclError, Result};
use mtcl_core::handle::{Busy, HandleCore, SharedHandle};
use mtcl_core::transport::{Channel, TransportDriver};

use crate::channel::TcpChannel;

const SCHEME: &str = "TCP";

pub struct TcpDriver {
    self_ref: OnceLock<Arc<dyn TransportDriver>>,
    next_id: AtomicU64,
    listeners: Mutex<Vec<TcpListener>>,
    channels: Mutex<HashMap<u64, Arc<TcpChannel>>>,
    armed: Mutex<HashMap<u64, Arc<TcpChannel>>>,
}

impl TcpDriver {
    pub fn new() -> Arc<Self> {
        let driver = Arc::new(Self {
            self_ref: OnceLock::new(),
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
            channels: Mutex::new(HashMap::new()),
            armed: Mutex::new(HashMap::new()),
        });
        let as_trait: Arc<dyn TransportDriver> = driver.clone();
        driver
            .self_ref
            .set(as_trait)
            .unwrap_or_else(|_| unreachable!("TcpDriver::new initializes self_ref exactly once"));
        driver
    }

    fn self_arc(&self) -> Arc<dyn TransportDriver> {
        self.self_ref
            .get()
            .expect("TcpDriver self-reference is set by TcpDriver::new")
            .clone()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn register(&self, channel: Arc<TcpChannel>) {
        self.channels.lock().unwrap().insert(channel.id(), channel);
    }

    fn new_handle_event(&self, channel: Arc<TcpChannel>, is_new_connection: bool) -> DispatchEvent {
        let core = HandleCore::new(SCHEME, self.self_arc(), channel as Arc<dyn Channel>, Busy::Runtime);
        DispatchEvent { is_new_connection, handle: SharedHandle::new(core) }
    }
}

impl TransportDriver for TcpDriver {
    fn scheme(&self) -> &'static str {
        SCHEME
    }

    fn listen(&self, endpoint: &str) -> Result<()> {
        let addr: SocketAddr = endpoint
            .parse()
            .map_err(|_| MtclError::invalid_argument(format!("'{endpoint}' is not a valid TCP host:port")))?;
        let listener = std::net::TcpListener::bind(addr).map_err(|e| MtclError::new(ErrorKind::Io, e.to_string()).with_source(e))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| MtclError::new(ErrorKind::Io, e.to_string()).with_source(e))?;
        self.listeners.lock().unwrap().push(listener);
        Ok(())
    }

    fn connect(&self, address: &str, timeout: Duration) -> Result<Arc<dyn Channel>> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| MtclError::invalid_argument(format!("'{address}' is not a valid TCP host:port")))?;
        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut => MtclError::new(ErrorKind::Timeout, e.to_string()).with_source(e),
            _ => MtclError::new(ErrorKind::Unreachable, e.to_string()).with_source(e),
        })?;
        let peer = stream.peer_addr().ok().map(|a| a.to_string());
        let channel = Arc::new(TcpChannel::new(self.next_id(), stream, peer));
        self.register(channel.clone());
        Ok(channel)
    }

    fn update(&self, queue: &DispatchQueue) -> Result<()> {
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            loop {
                match listener.accept() {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nonblocking(true) {
                            tracing::warn!(error = %e, "failed to configure accepted tcp stream");
                            continue;
                        }
                        let channel = Arc::new(TcpChannel::new(self.next_id(), stream, Some(peer.to_string())));
                        self.register(channel.clone());
                        queue.push(self.new_handle_event(channel, true));
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "tcp accept failed");
                        break;
                    }
                }
            }
        }
        drop(listeners);

        let ready: Vec<(u64, Arc<TcpChannel>)> = {
            let armed = self.armed.lock().unwrap();
            armed
                .iter()
                .filter_map(|(&id, channel)| match channel.has_pending_bytes() {
                    Ok(true) => Some((id, channel.clone())),
                    Ok(false) => None,
                    Err(e) => {
                        tracing::warn!(error = %e, "tcp readiness probe failed");
                        None
                    }
                })
                .collect()
        };
        if !ready.is_empty() {
            let mut armed = self.armed.lock().unwrap();
            for (id, channel) in ready {
                armed.remove(&id);
                queue.push(self.new_handle_event(channel, false));
            }
        }
        Ok(())
    }

    fn notify_yield(&self, channel_id: u64) {
        if let Some(channel) = self.channels.lock().unwrap().get(&channel_id).cloned() {
            self.armed.lock().unwrap().insert(channel_id, channel);
        }
    }

    fn notify_close(&self, channel_id: u64, close_wr: bool, close_rd: bool) {
        self.armed.lock().unwrap().remove(&channel_id);
        if close_wr && close_rd {
            self.channels.lock().unwrap().remove(&channel_id);
        }
    }

    fn end(&self) -> Result<()> {
        self.armed.lock().unwrap().clear();
        self.channels.lock().unwrap().clear();
        self.listeners.lock().unwrap().clear();
        Ok(())
    }
}
