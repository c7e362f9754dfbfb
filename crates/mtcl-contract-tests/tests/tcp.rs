//! Spec.md §8 scenarios exercised against `mtcl-transport-tcp`.
use mtcl_contract_tests::scenarios::{broadcast, echo, fan_in, fan_out, gather};
use mtcl_core::manager::Manager;
use mtcl_transport_tcp::TcpDriver;

fn register_tcp(manager: &Manager) {
    manager.register_driver(TcpDriver::new()).unwrap();
}

#[test]
fn ping_echo_roundtrips_for_every_client() {
    echo::run_ping_echo_scenario(register_tcp, "127.0.0.1:32901", "TCP:127.0.0.1:32901", 4, b"hello over tcp");
}

#[test]
fn send_then_close_observes_permanent_eos() {
    echo::run_send_then_close_scenario(register_tcp, "127.0.0.1:32902", "TCP:127.0.0.1:32902", b"single frame hello");
}

#[test]
fn broadcast_delivers_in_order_to_every_non_root() {
    broadcast::run_broadcast_scenario(
        register_tcp,
        "127.0.0.1:32903",
        "TCP:127.0.0.1:32903",
        &["App2", "App3", "App4"],
        &[b"first", b"second"],
    );
}

#[test]
fn fan_in_sums_every_producer_share() {
    let sum = fan_in::run_fan_in_sum_scenario(
        register_tcp,
        "127.0.0.1:32904",
        "TCP:127.0.0.1:32904",
        &["App2", "App3", "App4"],
        100,
    );
    assert_eq!(sum, (1..=100).sum::<u64>());
}

#[test]
fn fan_out_round_robins_across_non_roots() {
    fan_out::run_fan_out_round_robin_scenario(
        register_tcp,
        "127.0.0.1:32905",
        "TCP:127.0.0.1:32905",
        &["App2", "App3", "App4"],
        30,
    );
}

#[test]
fn gather_concatenates_symbolic_names_by_rank() {
    let out = gather::run_gather_scenario(
        register_tcp,
        "127.0.0.1:32906",
        "TCP:127.0.0.1:32906",
        "TCP",
        "App1",
        &["App2", "App3", "App4"],
        5,
    );
    let mut expected = Vec::new();
    for name in ["App1", "App2", "App3", "App4"] {
        let mut slot = vec![0u8; 5];
        slot[..name.len()].copy_from_slice(name.as_bytes());
        expected.extend_from_slice(&slot);
    }
    assert_eq!(out, expected);
}
