//! Property and idempotence checks for spec.md §8's point-to-point
//! invariants, run against `mtcl-transport-mem` since it needs no sockets
//! and gives deterministic same-process rendezvous.
use std::thread;

use mtcl_core::error::ErrorKind;
use mtcl_core::manager::Manager;
use mtcl_core::transport::ShutdownDirection;
use mtcl_transport_mem::MemDriver;
use proptest::prelude::*;

fn register_mem(manager: &Manager) {
    manager.register_driver(MemDriver::new()).unwrap();
}

/// spec.md §8 "Idempotence: close on an already-closed handle is a no-op".
#[test]
fn close_after_close_is_a_no_op() {
    let manager = Manager::new();
    register_mem(&manager);
    manager.init("tck-prop-close").unwrap();
    manager.listen("SHM:prop-close").unwrap();

    let client = thread::spawn(|| {
        let manager = Manager::new();
        register_mem(&manager);
        manager.init("tck-prop-close-client").unwrap();
        let mut handle = manager.connect("SHM:prop-close", Default::default()).unwrap();
        handle.close(ShutdownDirection::Both);
        handle.close(ShutdownDirection::Both);
        manager.finalize(true).unwrap();
    });

    let mut handle = manager.get_next().unwrap();
    handle.close(ShutdownDirection::Both);
    handle.close(ShutdownDirection::Both);
    client.join().unwrap();
    manager.finalize(true).unwrap();
}

/// spec.md §8 "finalize after finalize is rejected with invalid-state".
#[test]
fn finalize_twice_is_rejected() {
    let manager = Manager::new();
    register_mem(&manager);
    manager.init("tck-prop-finalize").unwrap();
    manager.finalize(true).unwrap();
    let err = manager.finalize(true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

proptest! {
    /// For every probed frame, the size it reports equals the byte count the
    /// following `receive` yields, and once end-of-stream is reached every
    /// further probe/receive permanently reports 0.
    #[test]
    fn probed_size_matches_receive_then_permanent_eos(payload in prop::collection::vec(any::<u8>(), 0..256)) {
        let manager = Manager::new();
        register_mem(&manager);
        manager.init("tck-prop-probe").unwrap();
        manager.listen("SHM:prop-probe").unwrap();

        let sent = payload.clone();
        let client = thread::spawn(move || {
            let manager = Manager::new();
            register_mem(&manager);
            manager.init("tck-prop-probe-client").unwrap();
            let mut handle = manager.connect("SHM:prop-probe", Default::default()).unwrap();
            handle.send(&sent).unwrap();
            handle.close(ShutdownDirection::Write);
            let mut buf = [0u8; 1];
            assert_eq!(handle.receive(&mut buf).unwrap(), 0);
            handle.close(ShutdownDirection::Both);
            manager.finalize(true).unwrap();
        });

        let mut handle = manager.get_next().unwrap();
        let probed = handle.probe(true).unwrap();
        prop_assert_eq!(probed, payload.len() as u64);
        let mut buf = vec![0u8; payload.len()];
        let n = handle.receive(&mut buf).unwrap();
        prop_assert_eq!(n, payload.len());
        prop_assert_eq!(&buf[..n], payload.as_slice());

        prop_assert_eq!(handle.probe(true).unwrap(), 0);
        prop_assert_eq!(handle.probe(true).unwrap(), 0);
        let mut eos_buf = [0u8; 1];
        prop_assert_eq!(handle.receive(&mut eos_buf).unwrap(), 0);

        handle.close(ShutdownDirection::Both);
        client.join().unwrap();
        manager.finalize(true).unwrap();
    }
}
