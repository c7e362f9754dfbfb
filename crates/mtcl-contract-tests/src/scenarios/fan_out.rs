//! Spec.md §8 scenario 5: the root sends `1..=count` one at a time into a
//! team of non-roots; the cursor advances modulo the non-root count, so
//! non-root `k` (1-indexed, by rank) receives values `i` where
//! `(i - 1) % size == k - 1`.
//!
//! `non_root_names` must already be in lexical order: team-builder ranks are
//! assigned by sorting non-root names (spec.md §4.7), and this scenario's
//! `idx` stands in for rank - 1, so callers must hand the names in the same
//! order the rank assignment will produce.
use std::sync::Arc;
use std::thread;

use mtcl_core::collective::CollectiveKind;
use mtcl_core::manager::Manager;
use mtcl_core::time::RetryPolicy;

use crate::support::join_with_context;

pub fn run_fan_out_round_robin_scenario(
    register: impl Fn(&Manager) + Send + Sync + 'static,
    root_listen: &'static str,
    root_address: &'static str,
    non_root_names: &'static [&'static str],
    count: u64,
) {
    let register = Arc::new(register);
    let participants: Vec<String> =
        std::iter::once(root_address.to_string()).chain(non_root_names.iter().map(|s| s.to_string())).collect();
    let k = non_root_names.len() as u64;

    let root_register = Arc::clone(&register);
    let root_participants = participants.clone();
    let root = thread::spawn(move || {
        let manager = Manager::new();
        root_register(&manager);
        manager.init("tck-fan-out-root").unwrap();
        manager.listen(root_listen).unwrap();

        let mut team = manager
            .create_team(&root_participants, root_address, root_address, CollectiveKind::FanOut, RetryPolicy::default())
            .unwrap();
        for value in 1..=count {
            team.context_mut().send(&value.to_be_bytes()).unwrap();
        }
        team.context().close().unwrap();
        manager.finalize(true).unwrap();
    });

    let mut non_roots = Vec::with_capacity(non_root_names.len());
    for (idx, &name) in non_root_names.iter().enumerate() {
        let register = Arc::clone(&register);
        let participants = participants.clone();
        non_roots.push(thread::spawn(move || {
            let manager = Manager::new();
            register(&manager);
            manager.init("tck-fan-out-non-root").unwrap();

            let mut team = manager
                .create_team(&participants, root_address, name, CollectiveKind::FanOut, RetryPolicy::default())
                .unwrap();

            let expected: Vec<u64> = (1..=count).filter(|i| (i - 1) % k == idx as u64).collect();
            for value in &expected {
                let mut buf = [0u8; 8];
                let n = team.context_mut().receive(&mut buf).unwrap();
                assert_eq!(n, 8);
                assert_eq!(u64::from_be_bytes(buf), *value, "{name} out of round-robin order");
            }
            let mut buf = [0u8; 1];
            assert_eq!(team.context_mut().receive(&mut buf).unwrap(), 0);
            team.context().close().unwrap();
            manager.finalize(true).unwrap();
        }));
    }

    for non_root in non_roots {
        join_with_context("fan_out::non_root", non_root);
    }
    join_with_context("fan_out::root", root);
}
