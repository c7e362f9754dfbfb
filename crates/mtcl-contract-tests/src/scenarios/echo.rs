//! Point-to-point scenarios: spec.md §8 scenarios 1 (TCP echo) and 2 (SHM
//! hello), written generically over any registered [`TransportDriver`] so a
//! concrete driver crate only has to supply the `register` closure and
//! scheme-tagged addresses.
use std::sync::Arc;
use std::thread;

use mtcl_core::manager::Manager;
use mtcl_core::transport::ShutdownDirection;

use crate::support::join_with_context;

/// Scenario 1: `client_count` clients connect, each sends `payload`, the
/// server echoes it back verbatim, everyone closes. Exercises the full
/// accept → yield → re-arm → dispatch cycle: the server consumes one
/// new-connection event per client and, after yielding, one data-ready
/// event per client — `2 * client_count` total `get_next` calls.
pub fn run_ping_echo_scenario(
    register: impl Fn(&Manager) + Send + Sync + 'static,
    listen_endpoint: &'static str,
    connect_endpoint: &'static str,
    client_count: usize,
    payload: &'static [u8],
) {
    let register = Arc::new(register);

    let server_register = Arc::clone(&register);
    let server = thread::spawn(move || {
        let manager = Manager::new();
        server_register(&manager);
        manager.init("tck-echo-server").unwrap();
        manager.listen(listen_endpoint).unwrap();

        let mut accepted = Vec::with_capacity(client_count);
        for _ in 0..client_count {
            let mut handle = manager.get_next().unwrap();
            assert!(handle.is_new_connection(), "first event per client must be a new-connection event");
            handle.yield_to_runtime();
            accepted.push(handle);
        }

        for _ in 0..client_count {
            let mut handle = manager.get_next().unwrap();
            assert!(!handle.is_new_connection(), "second event per client must be a data-ready event");
            let mut buf = vec![0u8; payload.len()];
            let n = handle.receive(&mut buf).unwrap();
            assert_eq!(&buf[..n], payload, "server must see exactly what the client sent");
            handle.send(&buf[..n]).unwrap();
            handle.close(ShutdownDirection::Both);
        }
        drop(accepted);
        manager.finalize(true).unwrap();
    });

    let mut clients = Vec::with_capacity(client_count);
    for _ in 0..client_count {
        let client_register = Arc::clone(&register);
        clients.push(thread::spawn(move || {
            let manager = Manager::new();
            client_register(&manager);
            manager.init("tck-echo-client").unwrap();
            let mut handle = manager.connect(connect_endpoint, Default::default()).unwrap();
            handle.send(payload).unwrap();
            let mut buf = vec![0u8; payload.len()];
            let n = handle.receive(&mut buf).unwrap();
            assert_eq!(&buf[..n], payload, "client must read back its own echoed payload");
            handle.close(ShutdownDirection::Both);
            manager.finalize(true).unwrap();
        }));
    }

    for client in clients {
        join_with_context("ping_echo::client", client);
    }
    join_with_context("ping_echo::server", server);
}

/// Scenario 2: the listener ("parent") sends one message then closes; the
/// connector ("child") probes, receives exactly that message, then observes
/// a permanent end-of-stream.
pub fn run_send_then_close_scenario(
    register: impl Fn(&Manager) + Send + Sync + 'static,
    listen_endpoint: &'static str,
    connect_endpoint: &'static str,
    payload: &'static [u8],
) {
    let register = Arc::new(register);

    let parent_register = Arc::clone(&register);
    let parent = thread::spawn(move || {
        let manager = Manager::new();
        parent_register(&manager);
        manager.init("tck-hello-parent").unwrap();
        manager.listen(listen_endpoint).unwrap();

        let mut handle = manager.get_next().unwrap();
        assert!(handle.is_new_connection());
        handle.send(payload).unwrap();
        handle.close(ShutdownDirection::Both);
        manager.finalize(true).unwrap();
    });

    let child_register = Arc::clone(&register);
    let child = thread::spawn(move || {
        let manager = Manager::new();
        child_register(&manager);
        manager.init("tck-hello-child").unwrap();
        let mut handle = manager.connect(connect_endpoint, Default::default()).unwrap();

        let size = handle.probe(true).unwrap();
        assert_eq!(size, payload.len() as u64);
        let mut buf = vec![0u8; payload.len()];
        let n = handle.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], payload);

        // Keep probing: spec.md §3 "once closed_rd is set, every subsequent
        // probe/receive returns the end-of-stream indication (0)".
        assert_eq!(handle.probe(true).unwrap(), 0);
        assert_eq!(handle.probe(true).unwrap(), 0);
        handle.close(ShutdownDirection::Both);
        manager.finalize(true).unwrap();
    });

    join_with_context("send_then_close::parent", parent);
    join_with_context("send_then_close::child", child);
}
