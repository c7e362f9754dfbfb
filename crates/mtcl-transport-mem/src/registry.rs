//! Process-wide named-segment namespace, standing in for `shm_open`'s
//! filesystem-backed name lookup (`examples/original_source/protocols/
//! shm_buffer.hpp`: `createBuffer`/`openSegment` both key off a shared
//! string name under `/dev/shm`).
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};

use crate::channel::RingPair;

/// A registered listener: the rendezvous point `connect` deposits new pairs
/// into and `update` drains from.
pub(crate) struct Listener {
    pub(crate) pending: Mutex<VecDeque<Arc<RingPair>>>,
}

impl Listener {
    fn new() -> Self {
        Self { pending: Mutex::new(VecDeque::new()) }
    }
}

fn registry() -> &'static Mutex<HashMap<String, Arc<Listener>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<Listener>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Registers `name` as a listening segment. Mirrors `shmBuffer::create`:
/// idempotent re-registration is rejected the way re-creating an open
/// segment is (`EPERM` in the original).
pub(crate) fn register(name: &str) -> Option<Arc<Listener>> {
    let mut map = registry().lock().unwrap();
    if map.contains_key(name) {
        return None;
    }
    let listener = Arc::new(Listener::new());
    map.insert(name.to_string(), Arc::clone(&listener));
    Some(listener)
}

/// Looks up a listener by name and deposits a freshly created pair for it
/// to pick up on its next `update()`. Mirrors `shmBuffer::open` locating an
/// existing segment by name.
pub(crate) fn connect(name: &str) -> Option<Arc<RingPair>> {
    let map = registry().lock().unwrap();
    let listener = map.get(name)?.clone();
    drop(map);
    let pair = RingPair::new();
    listener.pending.lock().unwrap().push_back(Arc::clone(&pair));
    Some(pair)
}

/// Returns the listener registered under `name`, if any, so a driver's
/// `update()` can drain its pending connections without holding the whole
/// registry lock.
pub(crate) fn listener(name: &str) -> Option<Arc<Listener>> {
    registry().lock().unwrap().get(name).cloned()
}

/// Removes `name` from the namespace, mirroring `shm_unlink`.
pub(crate) fn unregister(name: &str) {
    registry().lock().unwrap().remove(name);
}
