//! The `SHM` `TransportDriver`: named-segment bookkeeping and rendezvous,
//! the in-process analogue of `shmBuffer::create`/`open`/`close` from
//! `examples/original_source/protocols/shm_buffer.hpp`.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use mtcl_core::dispatch::{DispatchEvent, DispatchQueue};
use mtcl_core::error::{ErrorKind, MtclError, Result};
use mtcl_core::handle::{Busy, HandleCore, SharedHandle};
use mtcl_core::transport::{Channel, TransportDriver};

use crate::channel::MemChannel;
use crate::registry;

const SCHEME: &str = "SHM";

pub struct MemDriver {
    self_ref: OnceLock<Arc<dyn TransportDriver>>,
    next_id: AtomicU64,
    /// Names this driver instance is listening on, so `update()` knows which
    /// registry entries to drain.
    listening: Mutex<Vec<String>>,
    channels: Mutex<HashMap<u64, Arc<MemChannel>>>,
    armed: Mutex<HashMap<u64, Arc<MemChannel>>>,
}

impl MemDriver {
    pub fn new() -> Arc<Self> {
        let driver = Arc::new(Self {
            self_ref: OnceLock::new(),
            next_id: AtomicU64::new(1),
            listening: Mutex::new(Vec::new()),
            channels: Mutex::new(HashMap::new()),
            armed: Mutex::new(HashMap::new()),
        });
        let as_trait: Arc<dyn TransportDriver> = driver.clone();
        driver
            .self_ref
            .set(as_trait)
            .unwrap_or_else(|_| unreachable!("MemDriver::new initializes self_ref exactly once"));
        driver
    }

    fn self_arc(&self) -> Arc<dyn TransportDriver> {
        self.self_ref.get().expect("MemDriver self-reference is set by MemDriver::new").clone()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn new_handle_event(&self, channel: Arc<MemChannel>, is_new_connection: bool) -> DispatchEvent {
        let core = HandleCore::new(SCHEME, self.self_arc(), channel as Arc<dyn Channel>, Busy::Runtime);
        DispatchEvent { is_new_connection, handle: SharedHandle::new(core) }
    }
}

impl TransportDriver for MemDriver {
    fn scheme(&self) -> &'static str {
        SCHEME
    }

    fn listen(&self, endpoint: &str) -> Result<()> {
        if registry::register(endpoint).is_none() {
            return Err(MtclError::new(
                ErrorKind::InvalidArgument,
                format!("segment '{endpoint}' is already registered"),
            ));
        }
        self.listening.lock().unwrap().push(endpoint.to_string());
        Ok(())
    }

    fn connect(&self, address: &str, _timeout: Duration) -> Result<Arc<dyn Channel>> {
        let pair = registry::connect(address).ok_or_else(|| {
            MtclError::new(ErrorKind::Unreachable, format!("no segment named '{address}' is listening"))
        })?;
        let channel = Arc::new(MemChannel::client_side(self.next_id(), address.to_string(), pair));
        self.channels.lock().unwrap().insert(channel.id(), Arc::clone(&channel));
        Ok(channel)
    }

    fn update(&self, queue: &DispatchQueue) -> Result<()> {
        let names: Vec<String> = self.listening.lock().unwrap().clone();
        for name in names {
            let Some(listener) = registry::listener(&name) else { continue };
            let mut pending = listener.pending.lock().unwrap();
            while let Some(pair) = pending.pop_front() {
                let channel = Arc::new(MemChannel::server_side(self.next_id(), name.clone(), pair));
                self.channels.lock().unwrap().insert(channel.id(), Arc::clone(&channel));
                queue.push(self.new_handle_event(channel, true));
            }
        }

        let ready: Vec<(u64, Arc<MemChannel>)> = {
            let armed = self.armed.lock().unwrap();
            armed
                .iter()
                .filter_map(|(&id, channel)| match channel.probe_raw(false) {
                    Ok(_) => Some((id, channel.clone())),
                    Err(err) if err.kind() == ErrorKind::WouldBlock => None,
                    Err(err) => {
                        tracing::warn!(error = %err, "mem segment readiness probe failed");
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
        for name in self.listening.lock().unwrap().drain(..) {
            registry::unregister(&name);
        }
        Ok(())
    }
}
